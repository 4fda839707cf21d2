use std::rc::Rc;

use ibig::IBig;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use xylem_ast::ast::ArithOp;
use xylem_schema_type::Xs;

use crate::error;

use super::cast::parse_atomic;
use super::compare::cast_binary;
use super::datetime::{NaiveDateTimeWithOffset, NaiveDateWithOffset, NaiveTimeWithOffset, YearMonthDuration};
use super::types::IntegerType;
use super::Atomic;

// arithmetic casts an untyped operand to xs:double
fn cast_untyped(value: Atomic) -> error::Result<Atomic> {
    if let Atomic::Untyped(s) = value {
        parse_atomic(&s, Xs::Double)
    } else {
        Ok(value)
    }
}

/// Apply a binary arithmetic operator to two atomized operands.
pub(crate) fn arithmetic(op: ArithOp, a: Atomic, b: Atomic) -> error::Result<Atomic> {
    let a = cast_untyped(a)?;
    let b = cast_untyped(b)?;
    let (a, b) = cast_binary(a, b)?;

    use Atomic::*;

    match (&a, &b) {
        (Integer(_, x), Integer(_, y)) => integer_arithmetic(op, x, y),
        (Decimal(x), Decimal(y)) => decimal_arithmetic(op, *x, *y),
        (Float(x), Float(y)) => float_arithmetic(op, x.into_inner(), y.into_inner()),
        (Double(x), Double(y)) => double_arithmetic(op, x.into_inner(), y.into_inner()),

        (YearMonthDuration(x), YearMonthDuration(y)) => year_month_arithmetic(op, *x, *y),
        (DayTimeDuration(x), DayTimeDuration(y)) => day_time_arithmetic(op, *x, *y),
        (YearMonthDuration(x), Decimal(_) | Integer(_, _) | Float(_) | Double(_)) => {
            year_month_by_number(op, *x, b.double_value()?)
        }
        (DayTimeDuration(x), Decimal(_) | Integer(_, _) | Float(_) | Double(_)) => {
            day_time_by_number(op, *x, b.double_value()?)
        }
        (Decimal(_) | Integer(_, _) | Float(_) | Double(_), YearMonthDuration(y)) => {
            match op {
                ArithOp::Mul => year_month_by_number(op, *y, a.double_value()?),
                _ => Err(error::Error::XPTY0004),
            }
        }
        (Decimal(_) | Integer(_, _) | Float(_) | Double(_), DayTimeDuration(y)) => match op {
            ArithOp::Mul => day_time_by_number(op, *y, a.double_value()?),
            _ => Err(error::Error::XPTY0004),
        },

        (DateTime(x), DayTimeDuration(y)) => {
            date_time_plus_day_time(op, x.as_ref(), *y).map(|dt| DateTime(Rc::new(dt)))
        }
        (DateTime(x), YearMonthDuration(y)) => {
            date_time_plus_months(op, x.as_ref(), *y).map(|dt| DateTime(Rc::new(dt)))
        }
        (Date(x), DayTimeDuration(y)) => {
            let dt = date_time_plus_day_time(op, &x.to_date_time(), *y)?;
            Ok(Date(Rc::new(NaiveDateWithOffset::new(
                dt.date_time.date(),
                dt.offset,
            ))))
        }
        (Date(x), YearMonthDuration(y)) => {
            let dt = date_time_plus_months(op, &x.to_date_time(), *y)?;
            Ok(Date(Rc::new(NaiveDateWithOffset::new(
                dt.date_time.date(),
                dt.offset,
            ))))
        }
        (Time(x), DayTimeDuration(y)) => {
            let dt = date_time_plus_day_time(op, &x.to_date_time(), *y)?;
            Ok(Time(Rc::new(NaiveTimeWithOffset::new(
                dt.date_time.time(),
                dt.offset,
            ))))
        }
        (DateTime(x), DateTime(y)) if op == ArithOp::Sub => {
            let default = chrono::FixedOffset::east_opt(0).unwrap();
            Ok(DayTimeDuration(
                x.to_instant(default) - y.to_instant(default),
            ))
        }
        (Date(x), Date(y)) if op == ArithOp::Sub => {
            let default = chrono::FixedOffset::east_opt(0).unwrap();
            Ok(DayTimeDuration(
                x.to_date_time().to_instant(default) - y.to_date_time().to_instant(default),
            ))
        }
        (Time(x), Time(y)) if op == ArithOp::Sub => {
            let default = chrono::FixedOffset::east_opt(0).unwrap();
            Ok(DayTimeDuration(
                x.to_date_time().to_instant(default) - y.to_date_time().to_instant(default),
            ))
        }
        _ => Err(error::Error::XPTY0004),
    }
}

/// Unary minus.
pub(crate) fn negate(value: Atomic) -> error::Result<Atomic> {
    let value = cast_untyped(value)?;
    use Atomic::*;
    match value {
        Integer(_, i) => Ok(Integer(
            IntegerType::Integer,
            Rc::new(-i.as_ref().clone()),
        )),
        Decimal(d) => Ok(Decimal(-d)),
        Float(f) => Ok(Float(OrderedFloat(-f.into_inner()))),
        Double(d) => Ok(Double(OrderedFloat(-d.into_inner()))),
        YearMonthDuration(d) => Ok(YearMonthDuration(super::datetime::YearMonthDuration::new(
            -d.months,
        ))),
        DayTimeDuration(d) => Ok(DayTimeDuration(-d)),
        _ => Err(error::Error::XPTY0004),
    }
}

fn integer_arithmetic(op: ArithOp, x: &IBig, y: &IBig) -> error::Result<Atomic> {
    let zero = IBig::from(0);
    match op {
        ArithOp::Add => Ok(Atomic::from(x + y)),
        ArithOp::Sub => Ok(Atomic::from(x - y)),
        ArithOp::Mul => Ok(Atomic::from(x * y)),
        // integer division with div yields a decimal
        ArithOp::Div => {
            if y == &zero {
                return Err(error::Error::FOAR0001);
            }
            let x: i128 = x.try_into().map_err(|_| error::Error::FOAR0002)?;
            let y: i128 = y.try_into().map_err(|_| error::Error::FOAR0002)?;
            let x = Decimal::try_from(x).map_err(|_| error::Error::FOAR0002)?;
            let y = Decimal::try_from(y).map_err(|_| error::Error::FOAR0002)?;
            decimal_arithmetic(ArithOp::Div, x, y)
        }
        ArithOp::IntDiv => {
            if y == &zero {
                return Err(error::Error::FOAR0001);
            }
            // truncate towards zero
            let quotient = x / y;
            Ok(Atomic::from(quotient))
        }
        ArithOp::Mod => {
            if y == &zero {
                return Err(error::Error::FOAR0001);
            }
            Ok(Atomic::from(x % y))
        }
    }
}

fn decimal_arithmetic(op: ArithOp, x: Decimal, y: Decimal) -> error::Result<Atomic> {
    let result = match op {
        ArithOp::Add => x.checked_add(y).ok_or(error::Error::FOAR0002)?,
        ArithOp::Sub => x.checked_sub(y).ok_or(error::Error::FOAR0002)?,
        ArithOp::Mul => x.checked_mul(y).ok_or(error::Error::FOAR0002)?,
        ArithOp::Div => {
            if y.is_zero() {
                return Err(error::Error::FOAR0001);
            }
            x.checked_div(y).ok_or(error::Error::FOAR0002)?
        }
        ArithOp::IntDiv => {
            if y.is_zero() {
                return Err(error::Error::FOAR0001);
            }
            let quotient = x.checked_div(y).ok_or(error::Error::FOAR0002)?.trunc();
            let as_i128 = quotient.to_i128().ok_or(error::Error::FOAR0002)?;
            return Ok(Atomic::from(IBig::from(as_i128)));
        }
        ArithOp::Mod => {
            if y.is_zero() {
                return Err(error::Error::FOAR0001);
            }
            x.checked_rem(y).ok_or(error::Error::FOAR0002)?
        }
    };
    Ok(Atomic::Decimal(result))
}

fn float_arithmetic(op: ArithOp, x: f32, y: f32) -> error::Result<Atomic> {
    double_arithmetic(op, x as f64, y as f64).map(|value| match value {
        Atomic::Double(d) => Atomic::Float(OrderedFloat(d.into_inner() as f32)),
        other => other,
    })
}

fn double_arithmetic(op: ArithOp, x: f64, y: f64) -> error::Result<Atomic> {
    let result = match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        // IEEE division: infinities and NaN instead of errors
        ArithOp::Div => x / y,
        ArithOp::IntDiv => {
            if y == 0.0 {
                return Err(error::Error::FOAR0001);
            }
            if x.is_nan() || x.is_infinite() || y.is_nan() {
                return Err(error::Error::FOAR0002);
            }
            let quotient = (x / y).trunc();
            if quotient.abs() >= 9.2e18 {
                return Err(error::Error::FOAR0002);
            }
            return Ok(Atomic::from(quotient as i64));
        }
        ArithOp::Mod => x % y,
    };
    Ok(Atomic::Double(OrderedFloat(result)))
}

fn year_month_arithmetic(
    op: ArithOp,
    x: YearMonthDuration,
    y: YearMonthDuration,
) -> error::Result<Atomic> {
    match op {
        ArithOp::Add => Ok(Atomic::YearMonthDuration(YearMonthDuration::new(
            x.months.checked_add(y.months).ok_or(error::Error::FODT0002)?,
        ))),
        ArithOp::Sub => Ok(Atomic::YearMonthDuration(YearMonthDuration::new(
            x.months.checked_sub(y.months).ok_or(error::Error::FODT0002)?,
        ))),
        ArithOp::Div => {
            if y.months == 0 {
                return Err(error::Error::FOAR0001);
            }
            let ratio = Decimal::from(x.months)
                .checked_div(Decimal::from(y.months))
                .ok_or(error::Error::FOAR0002)?;
            Ok(Atomic::Decimal(ratio))
        }
        _ => Err(error::Error::XPTY0004),
    }
}

fn day_time_arithmetic(
    op: ArithOp,
    x: chrono::Duration,
    y: chrono::Duration,
) -> error::Result<Atomic> {
    match op {
        ArithOp::Add => x
            .checked_add(&y)
            .map(Atomic::DayTimeDuration)
            .ok_or(error::Error::FODT0002),
        ArithOp::Sub => x
            .checked_sub(&y)
            .map(Atomic::DayTimeDuration)
            .ok_or(error::Error::FODT0002),
        ArithOp::Div => {
            let y_millis = y.num_milliseconds();
            if y_millis == 0 {
                return Err(error::Error::FOAR0001);
            }
            let ratio = Decimal::from(x.num_milliseconds())
                .checked_div(Decimal::from(y_millis))
                .ok_or(error::Error::FOAR0002)?;
            Ok(Atomic::Decimal(ratio))
        }
        _ => Err(error::Error::XPTY0004),
    }
}

fn year_month_by_number(
    op: ArithOp,
    x: YearMonthDuration,
    factor: f64,
) -> error::Result<Atomic> {
    if factor.is_nan() {
        return Err(error::Error::FOCA0005);
    }
    let months = match op {
        ArithOp::Mul => x.months as f64 * factor,
        ArithOp::Div => {
            if factor == 0.0 {
                return Err(error::Error::FOAR0001);
            }
            x.months as f64 / factor
        }
        _ => return Err(error::Error::XPTY0004),
    };
    if !months.is_finite() || months.abs() >= 9.2e18 {
        return Err(error::Error::FODT0002);
    }
    Ok(Atomic::YearMonthDuration(YearMonthDuration::new(
        months.round() as i64,
    )))
}

fn day_time_by_number(op: ArithOp, x: chrono::Duration, factor: f64) -> error::Result<Atomic> {
    if factor.is_nan() {
        return Err(error::Error::FOCA0005);
    }
    let millis = match op {
        ArithOp::Mul => x.num_milliseconds() as f64 * factor,
        ArithOp::Div => {
            if factor == 0.0 {
                return Err(error::Error::FOAR0001);
            }
            x.num_milliseconds() as f64 / factor
        }
        _ => return Err(error::Error::XPTY0004),
    };
    if !millis.is_finite() || millis.abs() >= 9.2e18 {
        return Err(error::Error::FODT0002);
    }
    chrono::Duration::try_milliseconds(millis.round() as i64)
        .map(Atomic::DayTimeDuration)
        .ok_or(error::Error::FODT0002)
}

fn date_time_plus_day_time(
    op: ArithOp,
    x: &NaiveDateTimeWithOffset,
    y: chrono::Duration,
) -> error::Result<NaiveDateTimeWithOffset> {
    let result = match op {
        ArithOp::Add => x.date_time.checked_add_signed(y),
        ArithOp::Sub => x.date_time.checked_sub_signed(y),
        _ => return Err(error::Error::XPTY0004),
    };
    result
        .map(|date_time| NaiveDateTimeWithOffset::new(date_time, x.offset))
        .ok_or(error::Error::FODT0001)
}

fn date_time_plus_months(
    op: ArithOp,
    x: &NaiveDateTimeWithOffset,
    y: YearMonthDuration,
) -> error::Result<NaiveDateTimeWithOffset> {
    let months = match op {
        ArithOp::Add => y.months,
        ArithOp::Sub => -y.months,
        _ => return Err(error::Error::XPTY0004),
    };
    let months: i32 = months.try_into().map_err(|_| error::Error::FODT0001)?;
    let delta = chrono::Months::new(months.unsigned_abs());
    let result = if months >= 0 {
        x.date_time.checked_add_months(delta)
    } else {
        x.date_time.checked_sub_months(delta)
    };
    result
        .map(|date_time| NaiveDateTimeWithOffset::new(date_time, x.offset))
        .ok_or(error::Error::FODT0001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_integer_div_yields_decimal() {
        let result = arithmetic(ArithOp::Div, Atomic::from(1i64), Atomic::from(2i64)).unwrap();
        assert_eq!(result, Atomic::from(dec!(0.5)));
    }

    #[test]
    fn test_idiv_truncates() {
        let result =
            arithmetic(ArithOp::IntDiv, Atomic::from(7i64), Atomic::from(2i64)).unwrap();
        assert_eq!(result, Atomic::from(3i64));
        let result =
            arithmetic(ArithOp::IntDiv, Atomic::from(-7i64), Atomic::from(2i64)).unwrap();
        assert_eq!(result, Atomic::from(-3i64));
    }

    #[test]
    fn test_mod_follows_dividend_sign() {
        let result = arithmetic(ArithOp::Mod, Atomic::from(-7i64), Atomic::from(2i64)).unwrap();
        assert_eq!(result, Atomic::from(-1i64));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            arithmetic(ArithOp::Div, Atomic::from(1i64), Atomic::from(0i64)),
            Err(error::Error::FOAR0001)
        );
        // IEEE semantics for doubles
        let result =
            arithmetic(ArithOp::Div, Atomic::from(1.0f64), Atomic::from(0.0f64)).unwrap();
        assert_eq!(result, Atomic::from(f64::INFINITY));
    }

    #[test]
    fn test_untyped_operand_goes_to_double() {
        let result = arithmetic(
            ArithOp::Add,
            Atomic::Untyped(std::rc::Rc::from("1.5")),
            Atomic::from(1i64),
        )
        .unwrap();
        assert_eq!(result, Atomic::from(2.5f64));
    }

    #[test]
    fn test_date_time_plus_duration() {
        let dt = crate::atomic::cast::parse_atomic("2020-01-15T12:00:00Z", Xs::DateTime).unwrap();
        let dur = crate::atomic::cast::parse_atomic("PT12H", Xs::DayTimeDuration).unwrap();
        let result = arithmetic(ArithOp::Add, dt, dur).unwrap();
        assert_eq!(result.string_value(), "2020-01-16T00:00:00Z");
    }

    #[test]
    fn test_date_time_minus_date_time() {
        let a = crate::atomic::cast::parse_atomic("2020-01-16T00:00:00Z", Xs::DateTime).unwrap();
        let b = crate::atomic::cast::parse_atomic("2020-01-15T12:00:00Z", Xs::DateTime).unwrap();
        match arithmetic(ArithOp::Sub, a, b).unwrap() {
            Atomic::DayTimeDuration(d) => assert_eq!(d.num_hours(), 12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duration_times_number() {
        let dur = crate::atomic::cast::parse_atomic("PT1H", Xs::DayTimeDuration).unwrap();
        match arithmetic(ArithOp::Mul, dur, Atomic::from(2.5f64)).unwrap() {
            Atomic::DayTimeDuration(d) => assert_eq!(d.num_minutes(), 150),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(Atomic::from(3i64)).unwrap(), Atomic::from(-3i64));
        assert_eq!(negate(Atomic::from(dec!(1.5))).unwrap(), Atomic::from(dec!(-1.5)));
    }
}
