use std::cmp::Ordering;
use std::rc::Rc;

use chrono::Offset;
use ordered_float::OrderedFloat;
use xylem_name::Name;
use xylem_schema_type::Xs;

use crate::atomic::{self, Atomic, BinaryType, OrdWithDefaultOffset};
use crate::error;
use crate::string::{Collation, CollationKey};

/// Compares full atomic values, with empty treated as the minimum
/// element.
///
/// Implementations agree with their [`comparison_key`] output: two values
/// compare equal exactly when their keys are equal.
///
/// [`comparison_key`]: AtomicComparer::comparison_key
pub trait AtomicComparer {
    /// Compare two operands; `None` is the missing operand.
    fn compare(
        &self,
        a: Option<&Atomic>,
        b: Option<&Atomic>,
    ) -> error::Result<Ordering>;

    /// Whether the operands are equal under this comparer.
    fn equals(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<bool> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }

    /// The comparison key of a value.
    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey>;
}

/// A hashable stand-in for an atomic value under a comparer.
///
/// Keys partition by primitive category, so cross-category equality is
/// always false.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonKey {
    /// All three numeric primitives key by their double value.
    Numeric(OrderedFloat<f64>),
    /// Strings and untyped atomics key by their collation key.
    String(CollationKey),
    Boolean(bool),
    /// All duration flavors key by their two components.
    Duration { months: i64, millis: i64 },
    /// Dates and times key by their kind and normalized instant.
    Calendar { kind: CalendarKind, instant: i64 },
    /// Gregorian values key by packed components including the timezone.
    Gregorian { kind: CalendarKind, packed: i64 },
    Binary(BinaryType, Rc<Vec<u8>>),
    QName(Rc<Name>),
}

/// The calendar categories that never compare equal to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarKind {
    DateTime,
    Date,
    Time,
    GYearMonth,
    GYear,
    GMonthDay,
    GMonth,
    GDay,
}

/// Build the comparison key of a value under a collation and implicit
/// timezone.
pub(crate) fn make_comparison_key(
    value: &Atomic,
    collation: &Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
) -> error::Result<ComparisonKey> {
    let key = match value {
        Atomic::Untyped(s) => ComparisonKey::String(CollationKey::new(collation, s)),
        Atomic::String(_, s) => ComparisonKey::String(CollationKey::new(collation, s)),
        Atomic::Boolean(b) => ComparisonKey::Boolean(*b),
        Atomic::Decimal(_) | Atomic::Integer(_, _) | Atomic::Float(_) | Atomic::Double(_) => {
            ComparisonKey::Numeric(OrderedFloat(value.double_value()?))
        }
        Atomic::Duration(d) => ComparisonKey::Duration {
            months: d.months,
            millis: d.day_time.num_milliseconds(),
        },
        Atomic::YearMonthDuration(d) => ComparisonKey::Duration {
            months: d.months,
            millis: 0,
        },
        Atomic::DayTimeDuration(d) => ComparisonKey::Duration {
            months: 0,
            millis: d.num_milliseconds(),
        },
        Atomic::DateTime(dt) => ComparisonKey::Calendar {
            kind: CalendarKind::DateTime,
            instant: dt
                .to_instant(implicit_timezone)
                .and_utc()
                .timestamp_millis(),
        },
        Atomic::DateTimeStamp(dt) => ComparisonKey::Calendar {
            kind: CalendarKind::DateTime,
            instant: dt.timestamp_millis(),
        },
        Atomic::Date(d) => ComparisonKey::Calendar {
            kind: CalendarKind::Date,
            instant: d
                .to_date_time()
                .to_instant(implicit_timezone)
                .and_utc()
                .timestamp_millis(),
        },
        Atomic::Time(t) => ComparisonKey::Calendar {
            kind: CalendarKind::Time,
            instant: t
                .to_date_time()
                .to_instant(implicit_timezone)
                .and_utc()
                .timestamp_millis(),
        },
        Atomic::GYearMonth(g) => ComparisonKey::Gregorian {
            kind: CalendarKind::GYearMonth,
            packed: pack_gregorian(g.year, g.month, 0, g.offset),
        },
        Atomic::GYear(g) => ComparisonKey::Gregorian {
            kind: CalendarKind::GYear,
            packed: pack_gregorian(g.year, 0, 0, g.offset),
        },
        Atomic::GMonthDay(g) => ComparisonKey::Gregorian {
            kind: CalendarKind::GMonthDay,
            packed: pack_gregorian(0, g.month, g.day, g.offset),
        },
        Atomic::GMonth(g) => ComparisonKey::Gregorian {
            kind: CalendarKind::GMonth,
            packed: pack_gregorian(0, g.month, 0, g.offset),
        },
        Atomic::GDay(g) => ComparisonKey::Gregorian {
            kind: CalendarKind::GDay,
            packed: pack_gregorian(0, 0, g.day, g.offset),
        },
        Atomic::Binary(binary_type, data) => ComparisonKey::Binary(*binary_type, data.clone()),
        Atomic::QName(name) => ComparisonKey::QName(name.clone()),
    };
    Ok(key)
}

fn pack_gregorian(
    year: i32,
    month: u32,
    day: u32,
    offset: Option<chrono::FixedOffset>,
) -> i64 {
    // offsets are whole minutes in [-840, 840]; 2000 marks "no timezone"
    let offset_key = offset
        .map(|o| (o.local_minus_utc() / 60) as i64)
        .unwrap_or(2000);
    (((year as i64) << 16) | ((month as i64) << 8) | day as i64) * 4096 + (offset_key + 2048)
}

// shared dispatch: untyped coercion first, then the promoted comparison,
// with empty as the minimum element
fn base_compare(
    a: Option<&Atomic>,
    b: Option<&Atomic>,
    collation: &Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
) -> error::Result<Ordering> {
    match (a, b) {
        (None, None) => Ok(Ordering::Equal),
        (None, Some(_)) => Ok(Ordering::Less),
        (Some(_), None) => Ok(Ordering::Greater),
        (Some(a), Some(b)) => {
            let (a, b) = atomic::coerce_untyped_pair(a.clone(), b.clone())?;
            let (a, b) = atomic::cast_binary(a, b)?;
            if a.is_nan() || b.is_nan() {
                return Err(error::Error::XPTY0004);
            }
            match atomic::atomic_cmp(&a, &b, |x, y| collation.compare(x, y), implicit_timezone) {
                Ok(ordering) => Ok(ordering),
                // unordered types still admit equality
                Err(_) => {
                    if atomic::atomic_equals(
                        &a,
                        &b,
                        |x, y| collation.compare(x, y),
                        implicit_timezone,
                    )? {
                        Ok(Ordering::Equal)
                    } else {
                        Err(error::Error::XPTY0004)
                    }
                }
            }
        }
    }
}

/// The fallback comparer: full untyped coercion and promotion on every
/// comparison.
pub struct GenericAtomicComparer {
    collation: Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
}

impl GenericAtomicComparer {
    pub fn new(collation: Rc<Collation>, implicit_timezone: chrono::FixedOffset) -> Self {
        Self {
            collation,
            implicit_timezone,
        }
    }
}

impl AtomicComparer for GenericAtomicComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        base_compare(a, b, &self.collation, self.implicit_timezone)
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        make_comparison_key(value, &self.collation, self.implicit_timezone)
    }
}

/// Specialized comparer for decimals and integers.
pub struct DecimalComparer {
    collation: Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
}

impl AtomicComparer for DecimalComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        match (a, b) {
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                Ok(a.decimal_value()?.cmp(&b.decimal_value()?))
            }
            _ => base_compare(a, b, &self.collation, self.implicit_timezone),
        }
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        make_comparison_key(value, &self.collation, self.implicit_timezone)
    }
}

/// Specialized comparer for doubles, floats, and mixed numerics.
pub struct DoubleComparer {
    collation: Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
}

impl AtomicComparer for DoubleComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        match (a, b) {
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => a
                .double_value()?
                .partial_cmp(&b.double_value()?)
                .ok_or(error::Error::XPTY0004),
            _ => base_compare(a, b, &self.collation, self.implicit_timezone),
        }
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        make_comparison_key(value, &self.collation, self.implicit_timezone)
    }
}

/// Specialized comparer for dates and times.
pub struct CalendarComparer {
    collation: Rc<Collation>,
    implicit_timezone: chrono::FixedOffset,
}

impl AtomicComparer for CalendarComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        match (a, b) {
            (Some(Atomic::DateTime(x)), Some(Atomic::DateTime(y))) => {
                Ok(x.cmp_with_default_offset(y, self.implicit_timezone))
            }
            (Some(Atomic::Date(x)), Some(Atomic::Date(y))) => {
                Ok(x.cmp_with_default_offset(y, self.implicit_timezone))
            }
            (Some(Atomic::Time(x)), Some(Atomic::Time(y))) => {
                Ok(x.cmp_with_default_offset(y, self.implicit_timezone))
            }
            _ => base_compare(a, b, &self.collation, self.implicit_timezone),
        }
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        make_comparison_key(value, &self.collation, self.implicit_timezone)
    }
}

/// Reverses the ordering of an inner comparer.
pub struct DescendingComparer {
    inner: Box<dyn AtomicComparer>,
}

impl DescendingComparer {
    pub fn new(inner: Box<dyn AtomicComparer>) -> Self {
        Self { inner }
    }
}

impl AtomicComparer for DescendingComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        Ok(self.inner.compare(a, b)?.reverse())
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        self.inner.comparison_key(value)
    }
}

/// Treats the missing operand as the maximum element instead of the
/// minimum.
pub struct EmptyGreatestComparer {
    inner: Box<dyn AtomicComparer>,
}

impl EmptyGreatestComparer {
    pub fn new(inner: Box<dyn AtomicComparer>) -> Self {
        Self { inner }
    }
}

impl AtomicComparer for EmptyGreatestComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        match (a, b) {
            (None, None) => Ok(Ordering::Equal),
            (None, Some(_)) => Ok(Ordering::Greater),
            (Some(_), None) => Ok(Ordering::Less),
            _ => self.inner.compare(a, b),
        }
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        self.inner.comparison_key(value)
    }
}

/// Sort semantics for NaN: NaN equals NaN and precedes every other
/// value.
pub struct SortKeyComparer {
    inner: Box<dyn AtomicComparer>,
}

impl SortKeyComparer {
    pub fn new(inner: Box<dyn AtomicComparer>) -> Self {
        Self { inner }
    }
}

impl AtomicComparer for SortKeyComparer {
    fn compare(&self, a: Option<&Atomic>, b: Option<&Atomic>) -> error::Result<Ordering> {
        let a_nan = a.is_some_and(|v| v.is_nan());
        let b_nan = b.is_some_and(|v| v.is_nan());
        match (a_nan, b_nan) {
            (true, true) => Ok(Ordering::Equal),
            (true, false) => Ok(if b.is_none() {
                // the missing operand stays below NaN
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            (false, true) => Ok(if a.is_none() {
                Ordering::Less
            } else {
                Ordering::Greater
            }),
            (false, false) => self.inner.compare(a, b),
        }
    }

    fn comparison_key(&self, value: &Atomic) -> error::Result<ComparisonKey> {
        self.inner.comparison_key(value)
    }
}

/// Pick a specialized comparer for a collation and a statically known
/// primitive item type.
pub fn atomic_comparer(
    collation: Rc<Collation>,
    item_type: Option<Xs>,
    implicit_timezone: chrono::FixedOffset,
) -> Box<dyn AtomicComparer> {
    let primitive = item_type.and_then(|xs| xs.primitive());
    match primitive {
        Some(Xs::Decimal) => Box::new(DecimalComparer {
            collation,
            implicit_timezone,
        }),
        Some(Xs::Double) | Some(Xs::Float) => Box::new(DoubleComparer {
            collation,
            implicit_timezone,
        }),
        Some(Xs::DateTime) | Some(Xs::Date) | Some(Xs::Time) => Box::new(CalendarComparer {
            collation,
            implicit_timezone,
        }),
        // strings under the codepoint collation take the byte-compare
        // fast path inside the collation itself
        _ => Box::new(GenericAtomicComparer {
            collation,
            implicit_timezone,
        }),
    }
}

/// UTC, the implicit timezone used where no dynamic context is at hand.
pub fn default_implicit_timezone() -> chrono::FixedOffset {
    chrono::Utc.fix()
}
