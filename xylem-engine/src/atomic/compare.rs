use std::cmp::Ordering;

use xylem_ast::ast::CompOp;
use xylem_schema_type::Xs;

use crate::error;

use super::cast::parse_atomic;
use super::datetime::OrdWithDefaultOffset;
use super::types::StringType;
use super::{Atomic, BinaryType};

// Binary promotion: after this both operands are the same concrete variant
// whenever the pair is comparable at all.
pub(crate) fn cast_binary(a: Atomic, b: Atomic) -> error::Result<(Atomic, Atomic)> {
    use Atomic::*;

    match (&a, &b) {
        // cast a to a float
        (Decimal(_), Float(_)) | (Integer(_, _), Float(_)) => Ok((a.cast_to_float()?, b)),
        // cast b to a float
        (Float(_), Decimal(_)) | (Float(_), Integer(_, _)) => Ok((a, b.cast_to_float()?)),
        // cast a to a double
        (Decimal(_), Double(_)) | (Integer(_, _), Double(_)) | (Float(_), Double(_)) => {
            Ok((a.cast_to_double()?, b))
        }
        // cast b to a double
        (Double(_), Decimal(_)) | (Double(_), Integer(_, _)) | (Double(_), Float(_)) => {
            Ok((a, b.cast_to_double()?))
        }
        // cast integer to decimal
        (Decimal(_), Integer(_, _)) => Ok((a, b.cast_to_decimal()?)),
        (Integer(_, _), Decimal(_)) => Ok((a.cast_to_decimal()?, b)),

        // cast any dateTimeStamp to a dateTime
        (DateTimeStamp(_), DateTime(_)) => Ok((a.cast_to_date_time()?, b)),
        (DateTime(_), DateTimeStamp(_)) => Ok((a, b.cast_to_date_time()?)),
        // otherwise, we don't cast
        _ => Ok((a, b)),
    }
}

// value comparison rule: an untyped operand compares as a string
pub(crate) fn coerce_untyped_value(value: Atomic) -> Atomic {
    if let Atomic::Untyped(s) = value {
        Atomic::String(StringType::String, s)
    } else {
        value
    }
}

// general comparison and atomic-comparer rule: an untyped operand is cast
// to the primitive type of the other operand; two untyped operands compare
// as strings, and numeric operands pull the untyped side to double
pub(crate) fn coerce_untyped_pair(a: Atomic, b: Atomic) -> error::Result<(Atomic, Atomic)> {
    match (&a, &b) {
        (Atomic::Untyped(_), Atomic::Untyped(_)) => {
            Ok((coerce_untyped_value(a), coerce_untyped_value(b)))
        }
        (Atomic::Untyped(s), _) => {
            let target = untyped_coercion_target(&b);
            let coerced = parse_atomic(s, target)?;
            Ok((coerced, b))
        }
        (_, Atomic::Untyped(s)) => {
            let target = untyped_coercion_target(&a);
            let coerced = parse_atomic(s, target)?;
            Ok((a, coerced))
        }
        _ => Ok((a, b)),
    }
}

fn untyped_coercion_target(other: &Atomic) -> Xs {
    if other.is_numeric() {
        Xs::Double
    } else {
        other.primitive_type()
    }
}

/// Equality of two promoted operands.
pub(crate) fn atomic_equals<F>(
    a: &Atomic,
    b: &Atomic,
    string_compare: F,
    default_offset: chrono::FixedOffset,
) -> error::Result<bool>
where
    F: Fn(&str, &str) -> Ordering,
{
    use Atomic::*;

    match (a, b) {
        (Decimal(a), Decimal(b)) => Ok(a == b),
        (Integer(_, a), Integer(_, b)) => Ok(a == b),
        (Float(a), Float(b)) => Ok(a.into_inner() == b.into_inner()),
        (Double(a), Double(b)) => Ok(a.into_inner() == b.into_inner()),
        (Boolean(a), Boolean(b)) => Ok(a == b),
        (String(_, a), String(_, b)) => Ok(string_compare(a.as_ref(), b.as_ref()).is_eq()),
        (Date(a), Date(b)) => Ok(a.eq_with_default_offset(b, default_offset)),
        (Time(a), Time(b)) => Ok(a.eq_with_default_offset(b, default_offset)),
        (DateTime(a), DateTime(b)) => Ok(a.eq_with_default_offset(b, default_offset)),
        (DateTimeStamp(a), DateTimeStamp(b)) => Ok(a == b),
        (Duration(a), Duration(b)) => Ok(a == b),
        (YearMonthDuration(a), YearMonthDuration(b)) => Ok(a == b),
        (DayTimeDuration(a), DayTimeDuration(b)) => Ok(a == b),
        (Duration(a), YearMonthDuration(b)) => {
            Ok(a.day_time.is_zero() && a.months == b.months)
        }
        (YearMonthDuration(a), Duration(b)) => {
            Ok(b.day_time.is_zero() && a.months == b.months)
        }
        (Duration(a), DayTimeDuration(b)) => Ok(a.months == 0 && &a.day_time == b),
        (DayTimeDuration(a), Duration(b)) => Ok(b.months == 0 && a == &b.day_time),
        (YearMonthDuration(a), DayTimeDuration(b)) => Ok(a.months == 0 && b.is_zero()),
        (DayTimeDuration(a), YearMonthDuration(b)) => Ok(a.is_zero() && b.months == 0),
        (GYearMonth(a), GYearMonth(b)) => Ok(a == b),
        (GYear(a), GYear(b)) => Ok(a == b),
        (GMonthDay(a), GMonthDay(b)) => Ok(a == b),
        (GDay(a), GDay(b)) => Ok(a == b),
        (GMonth(a), GMonth(b)) => Ok(a == b),
        (Binary(BinaryType::Hex, a), Binary(BinaryType::Hex, b)) => Ok(a == b),
        (Binary(BinaryType::Base64, a), Binary(BinaryType::Base64, b)) => Ok(a == b),
        (QName(a), QName(b)) => Ok(a == b),
        _ => Err(error::Error::XPTY0004),
    }
}

/// Ordering of two promoted operands; only ordered types succeed.
///
/// NaN never reaches this point; callers decide NaN semantics first.
pub(crate) fn atomic_cmp<F>(
    a: &Atomic,
    b: &Atomic,
    string_compare: F,
    default_offset: chrono::FixedOffset,
) -> error::Result<Ordering>
where
    F: Fn(&str, &str) -> Ordering,
{
    use Atomic::*;

    match (a, b) {
        (Decimal(a), Decimal(b)) => Ok(a.cmp(b)),
        (Integer(_, a), Integer(_, b)) => Ok(a.cmp(b)),
        (Float(a), Float(b)) => a
            .into_inner()
            .partial_cmp(&b.into_inner())
            .ok_or(error::Error::XPTY0004),
        (Double(a), Double(b)) => a
            .into_inner()
            .partial_cmp(&b.into_inner())
            .ok_or(error::Error::XPTY0004),
        (Boolean(a), Boolean(b)) => Ok(a.cmp(b)),
        (String(_, a), String(_, b)) => Ok(string_compare(a.as_ref(), b.as_ref())),
        (Date(a), Date(b)) => Ok(a.cmp_with_default_offset(b, default_offset)),
        (Time(a), Time(b)) => Ok(a.cmp_with_default_offset(b, default_offset)),
        (DateTime(a), DateTime(b)) => Ok(a.cmp_with_default_offset(b, default_offset)),
        (DateTimeStamp(a), DateTimeStamp(b)) => Ok(a.cmp(b)),
        (YearMonthDuration(a), YearMonthDuration(b)) => Ok(a.cmp(b)),
        (DayTimeDuration(a), DayTimeDuration(b)) => Ok(a.cmp(b)),
        (Binary(BinaryType::Hex, a), Binary(BinaryType::Hex, b)) => Ok(a.cmp(b)),
        (Binary(BinaryType::Base64, a), Binary(BinaryType::Base64, b)) => Ok(a.cmp(b)),
        _ => Err(error::Error::XPTY0004),
    }
}

/// An XPath value comparison (`eq`, `lt`, ...) of two atomized operands.
pub(crate) fn value_compare<F>(
    op: CompOp,
    a: Atomic,
    b: Atomic,
    string_compare: F,
    default_offset: chrono::FixedOffset,
) -> error::Result<bool>
where
    F: Fn(&str, &str) -> Ordering,
{
    let a = coerce_untyped_value(a);
    let b = coerce_untyped_value(b);
    compare_coerced(op, a, b, string_compare, default_offset)
}

/// One pair of a general comparison (`=`, `<`, ...); untyped operands
/// coerce to the other operand's primitive type.
pub(crate) fn general_compare_pair<F>(
    op: CompOp,
    a: Atomic,
    b: Atomic,
    string_compare: F,
    default_offset: chrono::FixedOffset,
) -> error::Result<bool>
where
    F: Fn(&str, &str) -> Ordering,
{
    let (a, b) = coerce_untyped_pair(a, b)?;
    compare_coerced(op, a, b, string_compare, default_offset)
}

fn compare_coerced<F>(
    op: CompOp,
    a: Atomic,
    b: Atomic,
    string_compare: F,
    default_offset: chrono::FixedOffset,
) -> error::Result<bool>
where
    F: Fn(&str, &str) -> Ordering,
{
    let (a, b) = cast_binary(a, b)?;
    // NaN compares false under everything except ne
    if a.is_nan() || b.is_nan() {
        // the pair must still be a comparable one
        if !(a.is_numeric() && b.is_numeric()) {
            return Err(error::Error::XPTY0004);
        }
        return Ok(op == CompOp::Ne);
    }
    match op {
        CompOp::Eq => atomic_equals(&a, &b, string_compare, default_offset),
        CompOp::Ne => Ok(!atomic_equals(&a, &b, string_compare, default_offset)?),
        CompOp::Lt => Ok(atomic_cmp(&a, &b, string_compare, default_offset)?.is_lt()),
        CompOp::Le => Ok(atomic_cmp(&a, &b, string_compare, default_offset)?.is_le()),
        CompOp::Gt => Ok(atomic_cmp(&a, &b, string_compare, default_offset)?.is_gt()),
        CompOp::Ge => Ok(atomic_cmp(&a, &b, string_compare, default_offset)?.is_ge()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;
    use rust_decimal_macros::dec;
    use std::rc::Rc;

    fn default_offset() -> chrono::FixedOffset {
        chrono::offset::Utc.fix()
    }

    fn eq(a: Atomic, b: Atomic) -> bool {
        value_compare(CompOp::Eq, a, b, str::cmp, default_offset()).unwrap()
    }

    #[test]
    fn test_numeric_promotion() {
        assert!(eq(Atomic::from(dec!(1.5)), Atomic::from(1.5f64)));
        assert!(eq(Atomic::from(1i64), Atomic::from(dec!(1.0))));
        assert!(eq(Atomic::from(1i64), Atomic::from(1.0f32)));
    }

    #[test]
    fn test_untyped_compares_as_string_in_value_comparison() {
        assert!(eq(Atomic::Untyped(Rc::from("foo")), Atomic::from("foo")));
        // untyped never equals a number under value comparison rules
        assert!(
            value_compare(
                CompOp::Eq,
                Atomic::Untyped(Rc::from("1")),
                Atomic::from(1i64),
                str::cmp,
                default_offset()
            )
            .is_err()
        );
    }

    #[test]
    fn test_untyped_coerces_in_general_comparison() {
        assert!(general_compare_pair(
            CompOp::Eq,
            Atomic::Untyped(Rc::from("1")),
            Atomic::from(1i64),
            str::cmp,
            default_offset()
        )
        .unwrap());
        assert!(general_compare_pair(
            CompOp::Lt,
            Atomic::Untyped(Rc::from("09")),
            Atomic::Untyped(Rc::from("1")),
            str::cmp,
            default_offset()
        )
        .unwrap());
    }

    #[test]
    fn test_nan_comparisons() {
        let nan = Atomic::from(f64::NAN);
        assert!(!value_compare(
            CompOp::Eq,
            nan.clone(),
            nan.clone(),
            str::cmp,
            default_offset()
        )
        .unwrap());
        assert!(value_compare(
            CompOp::Ne,
            nan.clone(),
            nan.clone(),
            str::cmp,
            default_offset()
        )
        .unwrap());
        assert!(!value_compare(
            CompOp::Lt,
            nan.clone(),
            Atomic::from(1i64),
            str::cmp,
            default_offset()
        )
        .unwrap());
        assert!(!value_compare(CompOp::Gt, nan, Atomic::from(1i64), str::cmp, default_offset())
            .unwrap());
    }

    #[test]
    fn test_cross_category_comparison_is_an_error() {
        assert!(value_compare(
            CompOp::Eq,
            Atomic::from("1"),
            Atomic::from(1i64),
            str::cmp,
            default_offset()
        )
        .is_err());
        assert!(value_compare(
            CompOp::Lt,
            Atomic::Boolean(true),
            Atomic::from(1i64),
            str::cmp,
            default_offset()
        )
        .is_err());
    }

    #[test]
    fn test_duration_equality_across_subtypes() {
        use super::super::datetime::{Duration, YearMonthDuration};
        let full = Atomic::Duration(Duration::new(12, chrono::Duration::zero()));
        let ym = Atomic::YearMonthDuration(YearMonthDuration::new(12));
        assert!(eq(full, ym));
    }

    #[test]
    fn test_durations_are_not_ordered_across_kinds() {
        use super::super::datetime::Duration;
        let full = Atomic::Duration(Duration::new(12, chrono::Duration::zero()));
        assert!(value_compare(
            CompOp::Lt,
            full.clone(),
            full,
            str::cmp,
            default_offset()
        )
        .is_err());
    }
}
