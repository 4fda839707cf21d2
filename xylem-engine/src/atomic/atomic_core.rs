use std::rc::Rc;

use ibig::IBig;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use xylem_name::Name;
use xylem_schema_type::Xs;

use crate::error;

use super::datetime::{
    Duration, GDay, GMonth, GMonthDay, GYear, GYearMonth, NaiveDateTimeWithOffset,
    NaiveDateWithOffset, NaiveTimeWithOffset, YearMonthDuration,
};
use super::types::{BinaryType, IntegerType, StringType};

/// A single atomic value.
///
/// Payloads that are expensive to clone sit behind `Rc` so that sequences
/// and variable bindings can share them.
#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    /// xs:untypedAtomic; compares by coercion to the other operand.
    Untyped(Rc<str>),
    /// The string family, including xs:anyURI.
    String(StringType, Rc<str>),
    Boolean(bool),
    Decimal(Decimal),
    /// The integer family, represented without bounds.
    Integer(IntegerType, Rc<IBig>),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    /// xs:duration with both components.
    Duration(Duration),
    YearMonthDuration(YearMonthDuration),
    DayTimeDuration(chrono::Duration),
    DateTime(Rc<NaiveDateTimeWithOffset>),
    /// xs:dateTimeStamp, where the timezone is required.
    DateTimeStamp(Rc<chrono::DateTime<chrono::FixedOffset>>),
    Date(Rc<NaiveDateWithOffset>),
    Time(Rc<NaiveTimeWithOffset>),
    GYearMonth(GYearMonth),
    GYear(GYear),
    GMonthDay(GMonthDay),
    GMonth(GMonth),
    GDay(GDay),
    Binary(BinaryType, Rc<Vec<u8>>),
    QName(Rc<Name>),
}

impl Atomic {
    /// The schema type label of this value.
    pub fn xs_type(&self) -> Xs {
        match self {
            Atomic::Untyped(_) => Xs::UntypedAtomic,
            Atomic::String(string_type, _) => string_type.schema_type(),
            Atomic::Boolean(_) => Xs::Boolean,
            Atomic::Decimal(_) => Xs::Decimal,
            Atomic::Integer(integer_type, _) => integer_type.schema_type(),
            Atomic::Float(_) => Xs::Float,
            Atomic::Double(_) => Xs::Double,
            Atomic::Duration(_) => Xs::Duration,
            Atomic::YearMonthDuration(_) => Xs::YearMonthDuration,
            Atomic::DayTimeDuration(_) => Xs::DayTimeDuration,
            Atomic::DateTime(_) => Xs::DateTime,
            Atomic::DateTimeStamp(_) => Xs::DateTimeStamp,
            Atomic::Date(_) => Xs::Date,
            Atomic::Time(_) => Xs::Time,
            Atomic::GYearMonth(_) => Xs::GYearMonth,
            Atomic::GYear(_) => Xs::GYear,
            Atomic::GMonthDay(_) => Xs::GMonthDay,
            Atomic::GMonth(_) => Xs::GMonth,
            Atomic::GDay(_) => Xs::GDay,
            Atomic::Binary(binary_type, _) => binary_type.schema_type(),
            Atomic::QName(_) => Xs::QName,
        }
    }

    /// The primitive ancestor of the value's type.
    pub fn primitive_type(&self) -> Xs {
        // every concrete atomic has a primitive
        self.xs_type().primitive().unwrap_or(Xs::AnyAtomicType)
    }

    /// Whether the value belongs to one of the three numeric primitives.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Atomic::Decimal(_) | Atomic::Integer(_, _) | Atomic::Float(_) | Atomic::Double(_)
        )
    }

    /// Whether the value is a float or double NaN.
    pub fn is_nan(&self) -> bool {
        match self {
            Atomic::Float(f) => f.is_nan(),
            Atomic::Double(d) => d.is_nan(),
            _ => false,
        }
    }

    /// Whether the value compares as a string.
    pub fn is_string_like(&self) -> bool {
        matches!(self, Atomic::Untyped(_) | Atomic::String(_, _))
    }

    /// The string payload of string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atomic::Untyped(s) => Some(s),
            Atomic::String(_, s) => Some(s),
            _ => None,
        }
    }

    /// Whether a string-like value contains code points outside the basic
    /// multilingual plane. Codepoint comparison of two values where this is
    /// false coincides with UTF-16 code unit comparison.
    pub fn has_non_bmp(&self) -> bool {
        match self.as_str() {
            Some(s) => s.chars().any(|c| c as u32 > 0xffff),
            None => false,
        }
    }

    /// The numeric value as a double; numeric values only.
    pub fn double_value(&self) -> error::Result<f64> {
        match self {
            Atomic::Decimal(d) => d.to_f64().ok_or(error::Error::FOCA0002),
            Atomic::Integer(_, i) => Ok(i.to_f64()),
            Atomic::Float(f) => Ok(f.into_inner() as f64),
            Atomic::Double(d) => Ok(d.into_inner()),
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// The numeric value as a decimal; fails for NaN, infinities, and
    /// values outside the decimal range.
    pub fn decimal_value(&self) -> error::Result<Decimal> {
        match self {
            Atomic::Decimal(d) => Ok(*d),
            Atomic::Integer(_, i) => {
                let i: i128 = i.as_ref().try_into().map_err(|_| error::Error::FOCA0001)?;
                Decimal::try_from(i).map_err(|_| error::Error::FOCA0001)
            }
            Atomic::Float(f) => {
                Decimal::from_f32_retain(f.into_inner()).ok_or(error::Error::FOCA0002)
            }
            Atomic::Double(d) => {
                Decimal::from_f64_retain(d.into_inner()).ok_or(error::Error::FOCA0002)
            }
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// The numeric value as a signed 64-bit integer; fails when lossy.
    pub fn long_value(&self) -> error::Result<i64> {
        match self {
            Atomic::Integer(_, i) => i.as_ref().try_into().map_err(|_| error::Error::FOCA0003),
            Atomic::Decimal(d) => {
                if d.fract().is_zero() {
                    d.trunc().to_i64().ok_or(error::Error::FOCA0003)
                } else {
                    Err(error::Error::FOCA0003)
                }
            }
            Atomic::Float(f) => whole_float_to_long(f.into_inner() as f64),
            Atomic::Double(d) => whole_float_to_long(d.into_inner()),
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// The sign of a numeric value: -1, 0 or 1; NaN answers 0.
    pub fn signum(&self) -> error::Result<i32> {
        match self {
            Atomic::Decimal(d) => Ok(if d.is_zero() {
                0
            } else if d.is_sign_negative() {
                -1
            } else {
                1
            }),
            Atomic::Integer(_, i) => Ok(match i.as_ref().signum() {
                s if s == IBig::from(0) => 0,
                s if s == IBig::from(-1) => -1,
                _ => 1,
            }),
            Atomic::Float(f) => Ok(float_signum(f.into_inner() as f64)),
            Atomic::Double(d) => Ok(float_signum(d.into_inner())),
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// Whether a numeric value is a whole number.
    pub fn is_whole_number(&self) -> bool {
        match self {
            Atomic::Integer(_, _) => true,
            Atomic::Decimal(d) => d.fract().is_zero(),
            Atomic::Float(f) => {
                let f = f.into_inner();
                f.is_finite() && f == f.trunc()
            }
            Atomic::Double(d) => {
                let d = d.into_inner();
                d.is_finite() && d == d.trunc()
            }
            _ => false,
        }
    }

    /// The [effective boolean value](https://www.w3.org/TR/xpath20/#id-ebv)
    /// of a singleton atomic.
    pub fn effective_boolean_value(&self) -> error::Result<bool> {
        match self {
            Atomic::Boolean(b) => Ok(*b),
            Atomic::Untyped(s) => Ok(!s.is_empty()),
            Atomic::String(_, s) => Ok(!s.is_empty()),
            Atomic::Decimal(d) => Ok(!d.is_zero()),
            Atomic::Integer(_, i) => Ok(i.as_ref() != &IBig::from(0)),
            Atomic::Float(f) => Ok(!(f.is_nan() || f.into_inner() == 0.0)),
            Atomic::Double(d) => Ok(!(d.is_nan() || d.into_inner() == 0.0)),
            _ => Err(error::Error::FORG0006),
        }
    }

    /// The canonical lexical form.
    pub fn string_value(&self) -> String {
        match self {
            Atomic::Untyped(s) => s.to_string(),
            Atomic::String(_, s) => s.to_string(),
            Atomic::Boolean(b) => b.to_string(),
            Atomic::Decimal(d) => canonical_decimal(d),
            Atomic::Integer(_, i) => i.to_string(),
            Atomic::Float(f) => canonical_float(f.into_inner()),
            Atomic::Double(d) => canonical_double(d.into_inner()),
            Atomic::Duration(d) => d.to_string(),
            Atomic::YearMonthDuration(d) => d.to_string(),
            Atomic::DayTimeDuration(d) => super::datetime::day_time_lexical(*d),
            Atomic::DateTime(dt) => dt.to_string(),
            Atomic::DateTimeStamp(dt) => NaiveDateTimeWithOffset::new(
                dt.naive_local(),
                Some(*dt.offset()),
            )
            .to_string(),
            Atomic::Date(d) => d.to_string(),
            Atomic::Time(t) => t.to_string(),
            Atomic::GYearMonth(g) => g.to_string(),
            Atomic::GYear(g) => g.to_string(),
            Atomic::GMonthDay(g) => g.to_string(),
            Atomic::GMonth(g) => g.to_string(),
            Atomic::GDay(g) => g.to_string(),
            Atomic::Binary(BinaryType::Hex, data) => hex::encode_upper(data.as_ref()),
            Atomic::Binary(BinaryType::Base64, data) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(data.as_ref())
            }
            Atomic::QName(name) => name.to_full_name(),
        }
    }

    // promotion helpers used by binary dispatch

    pub(crate) fn cast_to_float(&self) -> error::Result<Atomic> {
        match self {
            Atomic::Float(_) => Ok(self.clone()),
            Atomic::Decimal(d) => Ok(Atomic::Float(OrderedFloat(
                d.to_f32().ok_or(error::Error::FOCA0002)?,
            ))),
            Atomic::Integer(_, i) => Ok(Atomic::Float(OrderedFloat(i.to_f32()))),
            Atomic::Double(d) => Ok(Atomic::Float(OrderedFloat(d.into_inner() as f32))),
            _ => Err(error::Error::XPTY0004),
        }
    }

    pub(crate) fn cast_to_double(&self) -> error::Result<Atomic> {
        Ok(Atomic::Double(OrderedFloat(self.double_value()?)))
    }

    pub(crate) fn cast_to_decimal(&self) -> error::Result<Atomic> {
        Ok(Atomic::Decimal(self.decimal_value()?))
    }

    pub(crate) fn cast_to_date_time(&self) -> error::Result<Atomic> {
        match self {
            Atomic::DateTime(_) => Ok(self.clone()),
            Atomic::DateTimeStamp(dt) => Ok(Atomic::DateTime(Rc::new(
                NaiveDateTimeWithOffset::new(dt.naive_local(), Some(*dt.offset())),
            ))),
            Atomic::Date(d) => Ok(Atomic::DateTime(Rc::new(d.to_date_time()))),
            _ => Err(error::Error::XPTY0004),
        }
    }
}

fn float_signum(value: f64) -> i32 {
    if value.is_nan() || value == 0.0 {
        0
    } else if value < 0.0 {
        -1
    } else {
        1
    }
}

fn whole_float_to_long(value: f64) -> error::Result<i64> {
    if value.is_finite() && value == value.trunc() && value.abs() < 9.2e18 {
        Ok(value as i64)
    } else {
        Err(error::Error::FOCA0003)
    }
}

pub(crate) fn canonical_decimal(d: &Decimal) -> String {
    d.normalize().to_string()
}

/// The XPath canonical form of a double: plain notation within
/// [1e-6, 1e18), scientific notation with an upper-case E outside it.
pub(crate) fn canonical_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = value.abs();
    if (1e-6..1e18).contains(&abs) {
        if value == value.trunc() {
            format!("{}", value as i128)
        } else {
            format!("{}", value)
        }
    } else {
        let formatted = format!("{:e}", value);
        // 1e20 -> 1.0E20
        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                if mantissa.contains('.') {
                    format!("{}E{}", mantissa, exponent)
                } else {
                    format!("{}.0E{}", mantissa, exponent)
                }
            }
            None => formatted,
        }
    }
}

pub(crate) fn canonical_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    canonical_double(value as f64)
}

// ---- conversions in ----

impl From<bool> for Atomic {
    fn from(b: bool) -> Self {
        Atomic::Boolean(b)
    }
}

impl From<i64> for Atomic {
    fn from(i: i64) -> Self {
        Atomic::Integer(IntegerType::Integer, Rc::new(IBig::from(i)))
    }
}

impl From<IBig> for Atomic {
    fn from(i: IBig) -> Self {
        Atomic::Integer(IntegerType::Integer, Rc::new(i))
    }
}

impl From<Decimal> for Atomic {
    fn from(d: Decimal) -> Self {
        Atomic::Decimal(d)
    }
}

impl From<f64> for Atomic {
    fn from(d: f64) -> Self {
        Atomic::Double(OrderedFloat(d))
    }
}

impl From<f32> for Atomic {
    fn from(f: f32) -> Self {
        Atomic::Float(OrderedFloat(f))
    }
}

impl From<&str> for Atomic {
    fn from(s: &str) -> Self {
        Atomic::String(StringType::String, Rc::from(s))
    }
}

impl From<String> for Atomic {
    fn from(s: String) -> Self {
        Atomic::String(StringType::String, Rc::from(s))
    }
}

impl From<Name> for Atomic {
    fn from(name: Name) -> Self {
        Atomic::QName(Rc::new(name))
    }
}

// ---- conversions out ----

impl TryFrom<Atomic> for bool {
    type Error = error::Error;

    fn try_from(atomic: Atomic) -> error::Result<bool> {
        match atomic {
            Atomic::Boolean(b) => Ok(b),
            _ => Err(error::Error::XPTY0004),
        }
    }
}

impl TryFrom<Atomic> for f64 {
    type Error = error::Error;

    fn try_from(atomic: Atomic) -> error::Result<f64> {
        atomic.double_value()
    }
}

impl TryFrom<Atomic> for i64 {
    type Error = error::Error;

    fn try_from(atomic: Atomic) -> error::Result<i64> {
        atomic.long_value()
    }
}

impl TryFrom<Atomic> for String {
    type Error = error::Error;

    fn try_from(atomic: Atomic) -> error::Result<String> {
        match atomic {
            Atomic::Untyped(s) => Ok(s.to_string()),
            Atomic::String(_, s) => Ok(s.to_string()),
            _ => Err(error::Error::XPTY0004),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_canonical_double() {
        assert_eq!(canonical_double(1.0), "1");
        assert_eq!(canonical_double(-2.5), "-2.5");
        assert_eq!(canonical_double(0.0), "0");
        assert_eq!(canonical_double(-0.0), "-0");
        assert_eq!(canonical_double(f64::NAN), "NaN");
        assert_eq!(canonical_double(f64::INFINITY), "INF");
        assert_eq!(canonical_double(1e20), "1.0E20");
        assert_eq!(canonical_double(1.5e-7), "1.5E-7");
    }

    #[test]
    fn test_canonical_decimal() {
        assert_eq!(canonical_decimal(&dec!(1.500)), "1.5");
        assert_eq!(canonical_decimal(&dec!(2.000)), "2");
    }

    #[test]
    fn test_effective_boolean_value() {
        assert!(Atomic::from("x").effective_boolean_value().unwrap());
        assert!(!Atomic::from("").effective_boolean_value().unwrap());
        assert!(!Atomic::from(0i64).effective_boolean_value().unwrap());
        assert!(Atomic::from(0.5f64).effective_boolean_value().unwrap());
        assert!(!Atomic::from(f64::NAN).effective_boolean_value().unwrap());
        assert!(Atomic::Date(Rc::new(
            NaiveDateWithOffset::parse("2020-01-01").unwrap()
        ))
        .effective_boolean_value()
        .is_err());
    }

    #[test]
    fn test_numeric_contract() {
        let d = Atomic::from(dec!(2.5));
        assert_eq!(d.double_value().unwrap(), 2.5);
        assert!(d.long_value().is_err());
        assert!(!d.is_whole_number());
        let i = Atomic::from(12i64);
        assert_eq!(i.long_value().unwrap(), 12);
        assert!(i.is_whole_number());
        assert_eq!(Atomic::from(-3.0f64).signum().unwrap(), -1);
        assert_eq!(Atomic::from(f64::NAN).signum().unwrap(), 0);
    }

    #[test]
    fn test_has_non_bmp() {
        assert!(!Atomic::from("plain ascii").has_non_bmp());
        assert!(Atomic::from("outside \u{10300} bmp").has_non_bmp());
    }

    #[test]
    fn test_binary_string_value() {
        let hex = Atomic::Binary(BinaryType::Hex, Rc::new(vec![0xde, 0xad]));
        assert_eq!(hex.string_value(), "DEAD");
        let b64 = Atomic::Binary(BinaryType::Base64, Rc::new(vec![1, 2, 3]));
        assert_eq!(b64.string_value(), "AQID");
    }
}
