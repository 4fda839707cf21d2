use std::cmp::Ordering;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error;

const MAX_OFFSET_SECONDS: i32 = 14 * 3600;

/// An `xs:dateTime`: local components plus an optional timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NaiveDateTimeWithOffset {
    pub date_time: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

/// An `xs:date`: a calendar day plus an optional timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NaiveDateWithOffset {
    pub date: NaiveDate,
    pub offset: Option<FixedOffset>,
}

/// An `xs:time`: a time of day plus an optional timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NaiveTimeWithOffset {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

/// An `xs:yearMonthDuration`, a whole number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct YearMonthDuration {
    pub months: i64,
}

impl YearMonthDuration {
    pub fn new(months: i64) -> Self {
        YearMonthDuration { months }
    }
}

/// An `xs:duration`: a month component and a day/time component.
///
/// Full durations admit equality but no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    pub months: i64,
    pub day_time: chrono::Duration,
}

impl Duration {
    pub fn new(months: i64, day_time: chrono::Duration) -> Self {
        Duration { months, day_time }
    }

    pub fn from_year_month(duration: YearMonthDuration) -> Self {
        Duration {
            months: duration.months,
            day_time: chrono::Duration::zero(),
        }
    }

    pub fn from_day_time(day_time: chrono::Duration) -> Self {
        Duration {
            months: 0,
            day_time,
        }
    }
}

/// An `xs:gYearMonth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GYearMonth {
    pub year: i32,
    pub month: u32,
    pub offset: Option<FixedOffset>,
}

/// An `xs:gYear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GYear {
    pub year: i32,
    pub offset: Option<FixedOffset>,
}

/// An `xs:gMonthDay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GMonthDay {
    pub month: u32,
    pub day: u32,
    pub offset: Option<FixedOffset>,
}

/// An `xs:gMonth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GMonth {
    pub month: u32,
    pub offset: Option<FixedOffset>,
}

/// An `xs:gDay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GDay {
    pub day: u32,
    pub offset: Option<FixedOffset>,
}

/// Comparison of calendar values where a missing timezone is filled in with
/// the implicit timezone of the dynamic context.
pub(crate) trait OrdWithDefaultOffset {
    fn cmp_with_default_offset(&self, other: &Self, default_offset: FixedOffset) -> Ordering;

    fn eq_with_default_offset(&self, other: &Self, default_offset: FixedOffset) -> bool {
        self.cmp_with_default_offset(other, default_offset) == Ordering::Equal
    }
}

impl NaiveDateTimeWithOffset {
    pub fn new(date_time: NaiveDateTime, offset: Option<FixedOffset>) -> Self {
        NaiveDateTimeWithOffset { date_time, offset }
    }

    /// The moment on the global timeline, using the default offset when the
    /// value carries none.
    pub(crate) fn to_instant(&self, default_offset: FixedOffset) -> NaiveDateTime {
        let offset = self.offset.unwrap_or(default_offset);
        self.date_time - offset
    }

    /// Adjust to a new timezone, or strip the timezone with `None`.
    ///
    /// A value that already has a timezone keeps its instant and changes
    /// its local components; a value without one keeps its components.
    pub fn adjust_timezone(
        &self,
        offset: Option<FixedOffset>,
        default_offset: FixedOffset,
    ) -> Self {
        match (self.offset, offset) {
            (_, None) => NaiveDateTimeWithOffset::new(self.date_time, None),
            (None, Some(new_offset)) => {
                let instant = self.date_time - default_offset;
                NaiveDateTimeWithOffset::new(instant + new_offset, Some(new_offset))
            }
            (Some(old_offset), Some(new_offset)) => {
                let instant = self.date_time - old_offset;
                NaiveDateTimeWithOffset::new(instant + new_offset, Some(new_offset))
            }
        }
    }
}

impl OrdWithDefaultOffset for NaiveDateTimeWithOffset {
    fn cmp_with_default_offset(&self, other: &Self, default_offset: FixedOffset) -> Ordering {
        self.to_instant(default_offset)
            .cmp(&other.to_instant(default_offset))
    }
}

impl NaiveDateWithOffset {
    pub fn new(date: NaiveDate, offset: Option<FixedOffset>) -> Self {
        NaiveDateWithOffset { date, offset }
    }

    // a date behaves as its starting instant
    pub(crate) fn to_date_time(&self) -> NaiveDateTimeWithOffset {
        NaiveDateTimeWithOffset::new(
            self.date.and_time(NaiveTime::default()),
            self.offset,
        )
    }

    pub fn adjust_timezone(
        &self,
        offset: Option<FixedOffset>,
        default_offset: FixedOffset,
    ) -> Self {
        let date_time = self.to_date_time().adjust_timezone(offset, default_offset);
        NaiveDateWithOffset::new(date_time.date_time.date(), date_time.offset)
    }
}

impl OrdWithDefaultOffset for NaiveDateWithOffset {
    fn cmp_with_default_offset(&self, other: &Self, default_offset: FixedOffset) -> Ordering {
        self.to_date_time()
            .cmp_with_default_offset(&other.to_date_time(), default_offset)
    }
}

impl NaiveTimeWithOffset {
    pub fn new(time: NaiveTime, offset: Option<FixedOffset>) -> Self {
        NaiveTimeWithOffset { time, offset }
    }

    // times compare on an arbitrary shared reference date
    pub(crate) fn to_date_time(&self) -> NaiveDateTimeWithOffset {
        let reference = NaiveDate::from_ymd_opt(1972, 12, 31).unwrap();
        NaiveDateTimeWithOffset::new(reference.and_time(self.time), self.offset)
    }

    pub fn adjust_timezone(
        &self,
        offset: Option<FixedOffset>,
        default_offset: FixedOffset,
    ) -> Self {
        let date_time = self.to_date_time().adjust_timezone(offset, default_offset);
        NaiveTimeWithOffset::new(date_time.date_time.time(), date_time.offset)
    }
}

impl OrdWithDefaultOffset for NaiveTimeWithOffset {
    fn cmp_with_default_offset(&self, other: &Self, default_offset: FixedOffset) -> Ordering {
        self.to_date_time()
            .cmp_with_default_offset(&other.to_date_time(), default_offset)
    }
}

/// Validate a timezone offset: whole minutes, within ±14 hours.
pub(crate) fn check_offset(seconds: i32) -> error::Result<FixedOffset> {
    if seconds % 60 != 0 || seconds.abs() > MAX_OFFSET_SECONDS {
        return Err(error::Error::FODT0003);
    }
    FixedOffset::east_opt(seconds).ok_or(error::Error::FODT0003)
}

/// Convert a day/time duration to a timezone offset, per the
/// adjust-*-to-timezone functions.
pub(crate) fn offset_from_duration(duration: chrono::Duration) -> error::Result<FixedOffset> {
    let seconds = duration.num_seconds();
    if seconds * 1000 != duration.num_milliseconds() {
        return Err(error::Error::FODT0003);
    }
    let seconds: i32 = seconds.try_into().map_err(|_| error::Error::FODT0003)?;
    check_offset(seconds)
}

// ---- lexical forms ----

fn parse_offset(s: &str) -> error::Result<(Option<FixedOffset>, &str)> {
    if let Some(rest) = s.strip_suffix('Z') {
        return Ok((Some(FixedOffset::east_opt(0).unwrap()), rest));
    }
    if let Some(tail) = s.len().checked_sub(6).and_then(|start| s.get(start..)) {
        let bytes = tail.as_bytes();
        if bytes.len() == 6 && (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let hours: i32 = tail[1..3].parse().map_err(|_| error::Error::FORG0001)?;
            let minutes: i32 = tail[4..6].parse().map_err(|_| error::Error::FORG0001)?;
            if minutes > 59 {
                return Err(error::Error::FORG0001);
            }
            let mut seconds = hours * 3600 + minutes * 60;
            if bytes[0] == b'-' {
                seconds = -seconds;
            }
            let offset = check_offset(seconds)?;
            return Ok((Some(offset), &s[..s.len() - 6]));
        }
    }
    Ok((None, s))
}

fn parse_naive_time(s: &str) -> error::Result<NaiveTime> {
    let format = if s.contains('.') { "%H:%M:%S%.f" } else { "%H:%M:%S" };
    NaiveTime::parse_from_str(s, format).map_err(|_| error::Error::FORG0001)
}

fn parse_naive_date(s: &str) -> error::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| error::Error::FORG0001)
}

impl NaiveDateTimeWithOffset {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let (date_part, time_part) = rest.split_once('T').ok_or(error::Error::FORG0001)?;
        let date = parse_naive_date(date_part)?;
        let time = parse_naive_time(time_part)?;
        Ok(NaiveDateTimeWithOffset::new(date.and_time(time), offset))
    }
}

impl NaiveDateWithOffset {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        Ok(NaiveDateWithOffset::new(parse_naive_date(rest)?, offset))
    }
}

impl NaiveTimeWithOffset {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        Ok(NaiveTimeWithOffset::new(parse_naive_time(rest)?, offset))
    }
}

impl GYear {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let year: i32 = rest.parse().map_err(|_| error::Error::FORG0001)?;
        Ok(GYear { year, offset })
    }
}

impl GYearMonth {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let (year, month) = rest.rsplit_once('-').ok_or(error::Error::FORG0001)?;
        let year: i32 = year.parse().map_err(|_| error::Error::FORG0001)?;
        let month: u32 = month.parse().map_err(|_| error::Error::FORG0001)?;
        if !(1..=12).contains(&month) {
            return Err(error::Error::FORG0001);
        }
        Ok(GYearMonth {
            year,
            month,
            offset,
        })
    }
}

impl GMonthDay {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let rest = rest.strip_prefix("--").ok_or(error::Error::FORG0001)?;
        let (month, day) = rest.split_once('-').ok_or(error::Error::FORG0001)?;
        let month: u32 = month.parse().map_err(|_| error::Error::FORG0001)?;
        let day: u32 = day.parse().map_err(|_| error::Error::FORG0001)?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(error::Error::FORG0001);
        }
        Ok(GMonthDay { month, day, offset })
    }
}

impl GMonth {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let month_str = rest.strip_prefix("--").ok_or(error::Error::FORG0001)?;
        let month: u32 = month_str.parse().map_err(|_| error::Error::FORG0001)?;
        if !(1..=12).contains(&month) {
            return Err(error::Error::FORG0001);
        }
        Ok(GMonth { month, offset })
    }
}

impl GDay {
    pub(crate) fn parse(s: &str) -> error::Result<Self> {
        let (offset, rest) = parse_offset(s)?;
        let day_str = rest.strip_prefix("---").ok_or(error::Error::FORG0001)?;
        let day: u32 = day_str.parse().map_err(|_| error::Error::FORG0001)?;
        if !(1..=31).contains(&day) {
            return Err(error::Error::FORG0001);
        }
        Ok(GDay { day, offset })
    }
}

// duration lexical form: -?PnYnMnDTnHnMnS with at least one component
struct DurationParser<'a> {
    rest: &'a str,
}

impl<'a> DurationParser<'a> {
    fn number(&mut self) -> Option<u64> {
        let digits: usize = self
            .rest
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let value = self.rest[..digits].parse().ok()?;
        self.rest = &self.rest[digits..];
        Some(value)
    }

    fn component(&mut self, designator: char) -> error::Result<Option<u64>> {
        let saved = self.rest;
        match self.number() {
            Some(value) => {
                if self.rest.starts_with(designator) {
                    self.rest = &self.rest[1..];
                    Ok(Some(value))
                } else {
                    self.rest = saved;
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }
}

pub(crate) struct ParsedDuration {
    pub(crate) negative: bool,
    pub(crate) months: i64,
    pub(crate) day_time: chrono::Duration,
    pub(crate) has_year_month: bool,
    pub(crate) has_day_time: bool,
}

pub(crate) fn parse_duration_lexical(s: &str) -> error::Result<ParsedDuration> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or(error::Error::FORG0001)?;
    let mut parser = DurationParser { rest };
    let years = parser.component('Y')?;
    let months = parser.component('M')?;
    let days = parser.component('D')?;
    let mut hours = None;
    let mut minutes = None;
    let mut seconds = None;
    let mut millis = 0i64;
    if parser.rest.starts_with('T') {
        parser.rest = &parser.rest[1..];
        hours = parser.component('H')?;
        minutes = parser.component('M')?;
        // seconds may carry a fraction
        let saved = parser.rest;
        if let Some(whole) = parser.number() {
            if parser.rest.starts_with('.') {
                parser.rest = &parser.rest[1..];
                let digits: usize = parser
                    .rest
                    .bytes()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits == 0 || !parser.rest[digits..].starts_with('S') {
                    return Err(error::Error::FORG0001);
                }
                let fraction = &parser.rest[..digits.min(3)];
                let mut value: i64 = fraction.parse().map_err(|_| error::Error::FORG0001)?;
                for _ in fraction.len()..3 {
                    value *= 10;
                }
                millis = value;
                parser.rest = &parser.rest[digits + 1..];
                seconds = Some(whole);
            } else if parser.rest.starts_with('S') {
                parser.rest = &parser.rest[1..];
                seconds = Some(whole);
            } else {
                parser.rest = saved;
            }
        }
        if hours.is_none() && minutes.is_none() && seconds.is_none() {
            return Err(error::Error::FORG0001);
        }
    }
    if !parser.rest.is_empty() {
        return Err(error::Error::FORG0001);
    }
    let has_year_month = years.is_some() || months.is_some();
    let has_day_time =
        days.is_some() || hours.is_some() || minutes.is_some() || seconds.is_some();
    if !has_year_month && !has_day_time {
        return Err(error::Error::FORG0001);
    }
    let total_months = (years.unwrap_or(0) as i64)
        .checked_mul(12)
        .and_then(|v| v.checked_add(months.unwrap_or(0) as i64))
        .ok_or(error::Error::FODT0002)?;
    let total_seconds = (days.unwrap_or(0) as i64)
        .checked_mul(86400)
        .and_then(|v| v.checked_add((hours.unwrap_or(0) as i64).checked_mul(3600)?))
        .and_then(|v| v.checked_add((minutes.unwrap_or(0) as i64).checked_mul(60)?))
        .and_then(|v| v.checked_add(seconds.unwrap_or(0) as i64))
        .ok_or(error::Error::FODT0002)?;
    let day_time = chrono::Duration::try_seconds(total_seconds)
        .and_then(|d| d.checked_add(&chrono::Duration::try_milliseconds(millis)?))
        .ok_or(error::Error::FODT0002)?;
    Ok(ParsedDuration {
        negative,
        months: total_months,
        day_time,
        has_year_month,
        has_day_time,
    })
}

// ---- canonical forms ----

pub(crate) fn offset_lexical(offset: Option<FixedOffset>) -> String {
    match offset {
        None => String::new(),
        Some(offset) => {
            let seconds = offset.local_minus_utc();
            if seconds == 0 {
                "Z".to_string()
            } else {
                let sign = if seconds < 0 { '-' } else { '+' };
                let seconds = seconds.abs();
                format!("{}{:02}:{:02}", sign, seconds / 3600, (seconds % 3600) / 60)
            }
        }
    }
}

fn time_lexical(time: NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        let formatted = time.format("%H:%M:%S%.3f").to_string();
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

impl std::fmt::Display for NaiveDateTimeWithOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}T{}{}",
            self.date_time.date().format("%Y-%m-%d"),
            time_lexical(self.date_time.time()),
            offset_lexical(self.offset)
        )
    }
}

impl std::fmt::Display for NaiveDateWithOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            self.date.format("%Y-%m-%d"),
            offset_lexical(self.offset)
        )
    }
}

impl std::fmt::Display for NaiveTimeWithOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", time_lexical(self.time), offset_lexical(self.offset))
    }
}

impl std::fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let months = self.months;
        if months == 0 {
            return write!(f, "P0M");
        }
        if months < 0 {
            write!(f, "-")?;
        }
        let months = months.abs();
        write!(f, "P")?;
        if months / 12 != 0 {
            write!(f, "{}Y", months / 12)?;
        }
        if months % 12 != 0 {
            write!(f, "{}M", months % 12)?;
        }
        Ok(())
    }
}

pub(crate) fn day_time_lexical(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds();
    if millis == 0 {
        return "PT0S".to_string();
    }
    let mut result = String::new();
    if millis < 0 {
        result.push('-');
    }
    let millis = millis.abs();
    let (days, rest) = (millis / 86_400_000, millis % 86_400_000);
    let (hours, rest) = (rest / 3_600_000, rest % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (seconds, millis) = (rest / 1000, rest % 1000);
    result.push('P');
    if days != 0 {
        result.push_str(&format!("{}D", days));
    }
    if hours != 0 || minutes != 0 || seconds != 0 || millis != 0 {
        result.push('T');
        if hours != 0 {
            result.push_str(&format!("{}H", hours));
        }
        if minutes != 0 {
            result.push_str(&format!("{}M", minutes));
        }
        if millis != 0 {
            let fraction = format!("{:03}", millis);
            result.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
        } else if seconds != 0 {
            result.push_str(&format!("{}S", seconds));
        }
    }
    result
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.months == 0 {
            return write!(f, "{}", day_time_lexical(self.day_time));
        }
        if self.day_time.is_zero() {
            return write!(f, "{}", YearMonthDuration::new(self.months));
        }
        // mixed durations have the same sign on both components
        let negative = self.months < 0;
        if negative {
            write!(f, "-")?;
        }
        let year_month = YearMonthDuration::new(self.months.abs()).to_string();
        let day_time = day_time_lexical(if negative {
            -self.day_time
        } else {
            self.day_time
        });
        write!(f, "{}{}", &year_month, &day_time[1..])
    }
}

impl std::fmt::Display for GYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}{}", self.year, offset_lexical(self.offset))
    }
}

impl std::fmt::Display for GYearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}{}",
            self.year,
            self.month,
            offset_lexical(self.offset)
        )
    }
}

impl std::fmt::Display for GMonthDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "--{:02}-{:02}{}",
            self.month,
            self.day,
            offset_lexical(self.offset)
        )
    }
}

impl std::fmt::Display for GMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--{:02}{}", self.month, offset_lexical(self.offset))
    }
}

impl std::fmt::Display for GDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "---{:02}{}", self.day, offset_lexical(self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_east(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_parse_date_time_with_offset() {
        let dt = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00+05:00").unwrap();
        assert_eq!(dt.offset, Some(offset_east(5)));
        assert_eq!(dt.to_string(), "2020-01-15T12:00:00+05:00");
    }

    #[test]
    fn test_parse_date_time_zulu() {
        let dt = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.offset, Some(offset_east(0)));
        assert_eq!(dt.to_string(), "2020-01-15T12:00:00Z");
    }

    #[test]
    fn test_adjust_timezone_keeps_instant() {
        let dt = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00+05:00").unwrap();
        let adjusted = dt.adjust_timezone(Some(offset_east(-8)), offset_east(0));
        assert_eq!(adjusted.to_string(), "2020-01-14T23:00:00-08:00");
    }

    #[test]
    fn test_adjust_timezone_attaches_to_naive() {
        let dt = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00").unwrap();
        let adjusted = dt.adjust_timezone(Some(offset_east(0)), offset_east(0));
        assert_eq!(adjusted.to_string(), "2020-01-15T12:00:00Z");
    }

    #[test]
    fn test_remove_timezone() {
        let dt = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00+05:00").unwrap();
        let adjusted = dt.adjust_timezone(None, offset_east(0));
        assert_eq!(adjusted.to_string(), "2020-01-15T12:00:00");
    }

    #[test]
    fn test_compare_mixed_timezones() {
        let a = NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00+05:00").unwrap();
        let b = NaiveDateTimeWithOffset::parse("2020-01-15T07:00:00Z").unwrap();
        assert!(a.eq_with_default_offset(&b, offset_east(0)));
        let naive = NaiveDateTimeWithOffset::parse("2020-01-15T07:00:00").unwrap();
        assert!(naive.eq_with_default_offset(&b, offset_east(0)));
        assert!(!naive.eq_with_default_offset(&b, offset_east(1)));
    }

    #[test]
    fn test_offset_range_checked() {
        assert!(NaiveDateTimeWithOffset::parse("2020-01-15T12:00:00+15:00").is_err());
        assert!(check_offset(14 * 3600).is_ok());
        assert!(check_offset(14 * 3600 + 60).is_err());
        assert!(check_offset(90).is_err());
    }

    #[test]
    fn test_parse_durations() {
        let d = parse_duration_lexical("P1Y2M3DT4H5M6.5S").unwrap();
        assert_eq!(d.months, 14);
        assert_eq!(d.day_time.num_milliseconds(), ((3 * 24 + 4) * 3600 + 5 * 60 + 6) * 1000 + 500);
        assert!(!d.negative);
        let d = parse_duration_lexical("-PT8H").unwrap();
        assert!(d.negative);
        assert_eq!(d.day_time.num_hours(), 8);
        assert!(parse_duration_lexical("P").is_err());
        assert!(parse_duration_lexical("PT").is_err());
        assert!(parse_duration_lexical("1Y").is_err());
    }

    #[test]
    fn test_duration_lexical_forms() {
        assert_eq!(
            YearMonthDuration::new(15).to_string(),
            "P1Y3M"
        );
        assert_eq!(YearMonthDuration::new(-12).to_string(), "-P1Y");
        assert_eq!(YearMonthDuration::new(0).to_string(), "P0M");
        assert_eq!(
            day_time_lexical(chrono::Duration::try_seconds(90061).unwrap()),
            "P1DT1H1M1S"
        );
        assert_eq!(day_time_lexical(chrono::Duration::zero()), "PT0S");
    }

    #[test]
    fn test_gregorian_parsing() {
        assert_eq!(GMonthDay::parse("--02-29").unwrap().month, 2);
        assert_eq!(GDay::parse("---15Z").unwrap().day, 15);
        assert!(GMonth::parse("--13").is_err());
        assert_eq!(GYearMonth::parse("2020-05").unwrap().month, 5);
    }

    #[test]
    fn test_time_comparison_across_offsets() {
        let a = NaiveTimeWithOffset::parse("12:00:00+05:00").unwrap();
        let b = NaiveTimeWithOffset::parse("07:00:00Z").unwrap();
        assert!(a.eq_with_default_offset(&b, offset_east(0)));
    }
}
