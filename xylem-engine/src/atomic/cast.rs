use std::rc::Rc;
use std::str::FromStr;

use ibig::IBig;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use xylem_name::Name;
use xylem_schema_type::Xs;

use crate::error;

use super::datetime::{
    parse_duration_lexical, Duration, GDay, GMonth, GMonthDay, GYear, GYearMonth,
    NaiveDateTimeWithOffset, NaiveDateWithOffset, NaiveTimeWithOffset, YearMonthDuration,
};
use super::types::{BinaryType, IntegerType, StringType};
use super::Atomic;

/// Convert a lexical form to a value of the target type.
///
/// This is the `string -> value | validation error` entry point every
/// built-in type carries; [`error::Error::FORG0001`] reports lexical
/// failures.
pub fn parse_atomic(s: &str, target: Xs) -> error::Result<Atomic> {
    let collapsed = collapse_whitespace(s);
    let trimmed = collapsed.as_str();
    let atomic = match target {
        Xs::UntypedAtomic => Atomic::Untyped(Rc::from(s)),
        Xs::String => Atomic::String(StringType::String, Rc::from(s)),
        Xs::NormalizedString => {
            let replaced: String = s
                .chars()
                .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
                .collect();
            Atomic::String(StringType::NormalizedString, Rc::from(replaced))
        }
        Xs::Token
        | Xs::Language
        | Xs::NMTOKEN
        | Xs::Name
        | Xs::NCName
        | Xs::ID
        | Xs::IDREF
        | Xs::ENTITY => {
            let string_type = StringType::from_schema_type(target).unwrap();
            Atomic::String(string_type, Rc::from(trimmed))
        }
        Xs::AnyURI => Atomic::String(StringType::AnyURI, Rc::from(trimmed)),
        Xs::Boolean => match trimmed {
            "true" | "1" => Atomic::Boolean(true),
            "false" | "0" => Atomic::Boolean(false),
            _ => return Err(error::Error::FORG0001),
        },
        Xs::Decimal => {
            if trimmed.contains(['e', 'E']) {
                return Err(error::Error::FORG0001);
            }
            Atomic::Decimal(Decimal::from_str(trimmed).map_err(|_| error::Error::FORG0001)?)
        }
        Xs::Integer
        | Xs::NonPositiveInteger
        | Xs::NegativeInteger
        | Xs::NonNegativeInteger
        | Xs::PositiveInteger
        | Xs::Long
        | Xs::Int
        | Xs::Short
        | Xs::Byte
        | Xs::UnsignedLong
        | Xs::UnsignedInt
        | Xs::UnsignedShort
        | Xs::UnsignedByte => {
            let integer_type = IntegerType::from_schema_type(target).unwrap();
            let value = parse_ibig(trimmed)?;
            check_integer_range(&value, integer_type)?;
            Atomic::Integer(integer_type, Rc::new(value))
        }
        Xs::Float => Atomic::Float(OrderedFloat(parse_xs_float(trimmed)? as f32)),
        Xs::Double => Atomic::Double(OrderedFloat(parse_xs_float(trimmed)?)),
        Xs::Duration => {
            let parsed = parse_duration_lexical(trimmed)?;
            let sign = if parsed.negative { -1 } else { 1 };
            Atomic::Duration(Duration::new(
                sign as i64 * parsed.months,
                parsed.day_time * sign,
            ))
        }
        Xs::YearMonthDuration => {
            let parsed = parse_duration_lexical(trimmed)?;
            if parsed.has_day_time {
                return Err(error::Error::FORG0001);
            }
            let sign = if parsed.negative { -1i64 } else { 1 };
            Atomic::YearMonthDuration(YearMonthDuration::new(sign * parsed.months))
        }
        Xs::DayTimeDuration => {
            let parsed = parse_duration_lexical(trimmed)?;
            if parsed.has_year_month {
                return Err(error::Error::FORG0001);
            }
            let sign = if parsed.negative { -1 } else { 1 };
            Atomic::DayTimeDuration(parsed.day_time * sign)
        }
        Xs::DateTime => Atomic::DateTime(Rc::new(NaiveDateTimeWithOffset::parse(trimmed)?)),
        Xs::DateTimeStamp => {
            let parsed = NaiveDateTimeWithOffset::parse(trimmed)?;
            match parsed.offset {
                Some(offset) => Atomic::DateTimeStamp(Rc::new(
                    chrono::DateTime::from_naive_utc_and_offset(parsed.date_time - offset, offset),
                )),
                None => return Err(error::Error::FORG0001),
            }
        }
        Xs::Date => Atomic::Date(Rc::new(NaiveDateWithOffset::parse(trimmed)?)),
        Xs::Time => Atomic::Time(Rc::new(NaiveTimeWithOffset::parse(trimmed)?)),
        Xs::GYearMonth => Atomic::GYearMonth(GYearMonth::parse(trimmed)?),
        Xs::GYear => Atomic::GYear(GYear::parse(trimmed)?),
        Xs::GMonthDay => Atomic::GMonthDay(GMonthDay::parse(trimmed)?),
        Xs::GMonth => Atomic::GMonth(GMonth::parse(trimmed)?),
        Xs::GDay => Atomic::GDay(GDay::parse(trimmed)?),
        Xs::HexBinary => {
            let data = hex::decode(trimmed).map_err(|_| error::Error::FORG0001)?;
            Atomic::Binary(BinaryType::Hex, Rc::new(data))
        }
        Xs::Base64Binary => {
            use base64::Engine;
            let data = base64::engine::general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|_| error::Error::FORG0001)?;
            Atomic::Binary(BinaryType::Base64, Rc::new(data))
        }
        Xs::QName => {
            // constructing a prefixed QName needs statically known
            // namespaces, which are gone at evaluation time
            if trimmed.contains(':') {
                return Err(error::Error::FORG0001);
            }
            if trimmed.is_empty() {
                return Err(error::Error::FORG0001);
            }
            Atomic::QName(Rc::new(Name::unprefixed(trimmed)))
        }
        _ => return Err(error::Error::XPST0080),
    };
    Ok(atomic)
}

/// Cast a value to the target type.
pub fn cast_atomic(value: &Atomic, target: Xs) -> error::Result<Atomic> {
    if value.xs_type() == target {
        return Ok(value.clone());
    }
    // casts from the string family go through the lexical space
    match value {
        Atomic::Untyped(s) => return parse_atomic(s, target),
        Atomic::String(_, s) => return parse_atomic(s, target),
        _ => {}
    }
    let atomic = match target {
        Xs::UntypedAtomic => Atomic::Untyped(Rc::from(value.string_value())),
        Xs::String => Atomic::String(StringType::String, Rc::from(value.string_value())),
        Xs::AnyURI => match value {
            Atomic::String(_, s) => Atomic::String(StringType::AnyURI, s.clone()),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::Boolean => match value {
            Atomic::Decimal(_) | Atomic::Integer(_, _) | Atomic::Float(_) | Atomic::Double(_) => {
                let double = value.double_value()?;
                Atomic::Boolean(!(double == 0.0 || double.is_nan()))
            }
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::Decimal => match value {
            Atomic::Boolean(b) => Atomic::Decimal(Decimal::from(*b as i64)),
            Atomic::Float(f) if f.is_nan() || f.is_infinite() => {
                return Err(error::Error::FOCA0002)
            }
            Atomic::Double(d) if d.is_nan() || d.is_infinite() => {
                return Err(error::Error::FOCA0002)
            }
            _ => value.cast_to_decimal()?,
        },
        Xs::Integer
        | Xs::NonPositiveInteger
        | Xs::NegativeInteger
        | Xs::NonNegativeInteger
        | Xs::PositiveInteger
        | Xs::Long
        | Xs::Int
        | Xs::Short
        | Xs::Byte
        | Xs::UnsignedLong
        | Xs::UnsignedInt
        | Xs::UnsignedShort
        | Xs::UnsignedByte => {
            let integer_type = IntegerType::from_schema_type(target).unwrap();
            let value = cast_to_ibig(value)?;
            check_integer_range(&value, integer_type)?;
            Atomic::Integer(integer_type, Rc::new(value))
        }
        Xs::Float => match value {
            Atomic::Boolean(b) => Atomic::Float(OrderedFloat(*b as i64 as f32)),
            _ => value.cast_to_float()?,
        },
        Xs::Double => match value {
            Atomic::Boolean(b) => Atomic::Double(OrderedFloat(*b as i64 as f64)),
            _ => value.cast_to_double()?,
        },
        Xs::Duration => match value {
            Atomic::YearMonthDuration(d) => Atomic::Duration(Duration::from_year_month(*d)),
            Atomic::DayTimeDuration(d) => Atomic::Duration(Duration::from_day_time(*d)),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::YearMonthDuration => match value {
            Atomic::Duration(d) => {
                Atomic::YearMonthDuration(YearMonthDuration::new(d.months))
            }
            Atomic::DayTimeDuration(_) => {
                Atomic::YearMonthDuration(YearMonthDuration::default())
            }
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::DayTimeDuration => match value {
            Atomic::Duration(d) => Atomic::DayTimeDuration(d.day_time),
            Atomic::YearMonthDuration(_) => Atomic::DayTimeDuration(chrono::Duration::zero()),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::DateTime => value.cast_to_date_time()?,
        Xs::DateTimeStamp => match value {
            Atomic::DateTime(dt) => match dt.offset {
                Some(offset) => Atomic::DateTimeStamp(Rc::new(
                    chrono::DateTime::from_naive_utc_and_offset(dt.date_time - offset, offset),
                )),
                None => return Err(error::Error::FORG0001),
            },
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::Date => match value {
            Atomic::DateTime(dt) => Atomic::Date(Rc::new(NaiveDateWithOffset::new(
                dt.date_time.date(),
                dt.offset,
            ))),
            Atomic::DateTimeStamp(dt) => Atomic::Date(Rc::new(NaiveDateWithOffset::new(
                dt.naive_local().date(),
                Some(*dt.offset()),
            ))),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::Time => match value {
            Atomic::DateTime(dt) => Atomic::Time(Rc::new(NaiveTimeWithOffset::new(
                dt.date_time.time(),
                dt.offset,
            ))),
            Atomic::DateTimeStamp(dt) => Atomic::Time(Rc::new(NaiveTimeWithOffset::new(
                dt.naive_local().time(),
                Some(*dt.offset()),
            ))),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::GYearMonth | Xs::GYear | Xs::GMonthDay | Xs::GMonth | Xs::GDay => {
            use chrono::Datelike;
            let (date, offset) = match value {
                Atomic::DateTime(dt) => (dt.date_time.date(), dt.offset),
                Atomic::Date(d) => (d.date, d.offset),
                _ => return Err(error::Error::XPTY0004),
            };
            match target {
                Xs::GYearMonth => Atomic::GYearMonth(GYearMonth {
                    year: date.year(),
                    month: date.month(),
                    offset,
                }),
                Xs::GYear => Atomic::GYear(GYear {
                    year: date.year(),
                    offset,
                }),
                Xs::GMonthDay => Atomic::GMonthDay(GMonthDay {
                    month: date.month(),
                    day: date.day(),
                    offset,
                }),
                Xs::GMonth => Atomic::GMonth(GMonth {
                    month: date.month(),
                    offset,
                }),
                _ => Atomic::GDay(GDay {
                    day: date.day(),
                    offset,
                }),
            }
        }
        Xs::HexBinary => match value {
            Atomic::Binary(_, data) => Atomic::Binary(BinaryType::Hex, data.clone()),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::Base64Binary => match value {
            Atomic::Binary(_, data) => Atomic::Binary(BinaryType::Base64, data.clone()),
            _ => return Err(error::Error::XPTY0004),
        },
        Xs::NormalizedString
        | Xs::Token
        | Xs::Language
        | Xs::NMTOKEN
        | Xs::Name
        | Xs::NCName
        | Xs::ID
        | Xs::IDREF
        | Xs::ENTITY => {
            let string_type = StringType::from_schema_type(target).unwrap();
            Atomic::String(string_type, Rc::from(value.string_value()))
        }
        Xs::QName => return Err(error::Error::XPTY0004),
        _ => return Err(error::Error::XPST0080),
    };
    Ok(atomic)
}

/// Whether a cast would succeed.
pub fn castable(value: &Atomic, target: Xs) -> bool {
    cast_atomic(value, target).is_ok()
}

fn cast_to_ibig(value: &Atomic) -> error::Result<IBig> {
    match value {
        Atomic::Integer(_, i) => Ok(i.as_ref().clone()),
        Atomic::Boolean(b) => Ok(IBig::from(*b as i64)),
        Atomic::Decimal(d) => {
            let truncated = d.trunc();
            let as_i128: i128 = truncated.to_i128().ok_or(error::Error::FOCA0003)?;
            Ok(IBig::from(as_i128))
        }
        Atomic::Float(f) => float_to_ibig(f.into_inner() as f64),
        Atomic::Double(d) => float_to_ibig(d.into_inner()),
        _ => Err(error::Error::XPTY0004),
    }
}

fn float_to_ibig(value: f64) -> error::Result<IBig> {
    if value.is_nan() || value.is_infinite() {
        return Err(error::Error::FOCA0002);
    }
    let truncated = value.trunc();
    if truncated.abs() < 9.2e18 {
        Ok(IBig::from(truncated as i64))
    } else {
        Err(error::Error::FOCA0003)
    }
}

fn parse_ibig(s: &str) -> error::Result<IBig> {
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() || !s.strip_prefix('-').unwrap_or(s).bytes().all(|b| b.is_ascii_digit()) {
        return Err(error::Error::FORG0001);
    }
    IBig::from_str(s).map_err(|_| error::Error::FORG0001)
}

fn check_integer_range(value: &IBig, integer_type: IntegerType) -> error::Result<()> {
    let (min, max): (Option<i128>, Option<i128>) = match integer_type {
        IntegerType::Integer => (None, None),
        IntegerType::NonPositiveInteger => (None, Some(0)),
        IntegerType::NegativeInteger => (None, Some(-1)),
        IntegerType::NonNegativeInteger => (Some(0), None),
        IntegerType::PositiveInteger => (Some(1), None),
        IntegerType::Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
        IntegerType::Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
        IntegerType::Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
        IntegerType::Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
        IntegerType::UnsignedLong => (Some(0), Some(u64::MAX as i128)),
        IntegerType::UnsignedInt => (Some(0), Some(u32::MAX as i128)),
        IntegerType::UnsignedShort => (Some(0), Some(u16::MAX as i128)),
        IntegerType::UnsignedByte => (Some(0), Some(u8::MAX as i128)),
    };
    if let Some(min) = min {
        if value < &IBig::from(min) {
            return Err(error::Error::FORG0001);
        }
    }
    if let Some(max) = max {
        if value > &IBig::from(max) {
            return Err(error::Error::FORG0001);
        }
    }
    Ok(())
}

// the XSD lexical space for float/double: no "Infinity", no hex forms
fn parse_xs_float(s: &str) -> error::Result<f64> {
    match s {
        "INF" | "+INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    if !is_float_lexical(s) {
        return Err(error::Error::FORG0001);
    }
    s.parse().map_err(|_| error::Error::FORG0001)
}

fn is_float_lexical(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (s, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (mantissa, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = match fraction {
        Some(fraction) => {
            (digits(whole) && (fraction.is_empty() || digits(fraction)))
                || (whole.is_empty() && digits(fraction))
        }
        None => digits(whole),
    };
    if !mantissa_ok {
        return false;
    }
    match exponent {
        Some(exponent) => {
            let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            digits(exponent)
        }
        None => true,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_atomic("true", Xs::Boolean).unwrap(), Atomic::Boolean(true));
        assert_eq!(parse_atomic(" 0 ", Xs::Boolean).unwrap(), Atomic::Boolean(false));
        assert!(parse_atomic("TRUE", Xs::Boolean).is_err());
    }

    #[test]
    fn test_parse_numerics() {
        assert_eq!(
            parse_atomic("1.5", Xs::Decimal).unwrap(),
            Atomic::from(dec!(1.5))
        );
        assert!(parse_atomic("1e2", Xs::Decimal).is_err());
        assert_eq!(parse_atomic("42", Xs::Integer).unwrap(), Atomic::from(42i64));
        assert!(parse_atomic("4.2", Xs::Integer).is_err());
        assert_eq!(
            parse_atomic("-INF", Xs::Double).unwrap(),
            Atomic::from(f64::NEG_INFINITY)
        );
        assert!(parse_atomic("nine", Xs::Double).is_err());
        assert!(parse_atomic("Infinity", Xs::Double).is_err());
    }

    #[test]
    fn test_integer_ranges() {
        assert!(parse_atomic("127", Xs::Byte).is_ok());
        assert!(parse_atomic("128", Xs::Byte).is_err());
        assert!(parse_atomic("-1", Xs::UnsignedInt).is_err());
        assert!(parse_atomic("0", Xs::PositiveInteger).is_err());
        assert!(parse_atomic("-42", Xs::NonPositiveInteger).is_ok());
    }

    #[test]
    fn test_parse_durations() {
        assert_eq!(
            parse_atomic("P1Y3M", Xs::YearMonthDuration).unwrap(),
            Atomic::YearMonthDuration(YearMonthDuration::new(15))
        );
        assert!(parse_atomic("P1D", Xs::YearMonthDuration).is_err());
        assert!(parse_atomic("P1Y", Xs::DayTimeDuration).is_err());
        match parse_atomic("-PT8H", Xs::DayTimeDuration).unwrap() {
            Atomic::DayTimeDuration(d) => assert_eq!(d.num_hours(), -8),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cast_numeric_to_integer_truncates() {
        let value = Atomic::from(dec!(3.9));
        assert_eq!(cast_atomic(&value, Xs::Integer).unwrap(), Atomic::from(3i64));
        let value = Atomic::from(-3.9f64);
        assert_eq!(cast_atomic(&value, Xs::Integer).unwrap(), Atomic::from(-3i64));
        assert!(cast_atomic(&Atomic::from(f64::NAN), Xs::Integer).is_err());
    }

    #[test]
    fn test_cast_string_through_lexical_space() {
        let value = Atomic::from("1.5");
        assert_eq!(cast_atomic(&value, Xs::Double).unwrap(), Atomic::from(1.5f64));
        assert!(cast_atomic(&Atomic::from("nine"), Xs::Integer).is_err());
    }

    #[test]
    fn test_cast_date_time_components() {
        let dt = parse_atomic("2020-01-15T12:30:00+05:00", Xs::DateTime).unwrap();
        let date = cast_atomic(&dt, Xs::Date).unwrap();
        assert_eq!(date.string_value(), "2020-01-15+05:00");
        let time = cast_atomic(&dt, Xs::Time).unwrap();
        assert_eq!(time.string_value(), "12:30:00+05:00");
        let g = cast_atomic(&dt, Xs::GYear).unwrap();
        assert_eq!(g.string_value(), "2020+05:00");
    }

    #[test]
    fn test_cast_binary_between_forms() {
        let hex = parse_atomic("DEAD", Xs::HexBinary).unwrap();
        let b64 = cast_atomic(&hex, Xs::Base64Binary).unwrap();
        assert_eq!(cast_atomic(&b64, Xs::HexBinary).unwrap(), hex);
    }

    #[test]
    fn test_castable() {
        assert!(castable(&Atomic::from("42"), Xs::Integer));
        assert!(!castable(&Atomic::from("forty-two"), Xs::Integer));
    }

    #[test]
    fn test_untyped_casts_via_lexical() {
        let untyped = Atomic::Untyped(Rc::from("  true  "));
        assert_eq!(
            cast_atomic(&untyped, Xs::Boolean).unwrap(),
            Atomic::Boolean(true)
        );
    }
}
