use std::rc::Rc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use xylem_schema_type::Xs;

use crate::atomic::{self, Atomic};
use crate::context::DynamicContext;
use crate::error;
use crate::sequence::{Item, Sequence};
use crate::sort::{AtomicComparer, GenericAtomicComparer};

use super::core::ExprRef;
use super::eval::{effective_boolean_value, evaluate, iterate};
use super::functions::BuiltinFunction;

/// Evaluate a call on a built-in function.
pub(crate) fn call(
    function: BuiltinFunction,
    args: &[ExprRef],
    context: &DynamicContext,
) -> error::Result<Sequence> {
    use BuiltinFunction::*;
    match function {
        Position => {
            let focus = context.focus()?;
            Ok(Sequence::from(Atomic::from(focus.position as i64)))
        }
        Last => {
            let focus = context.focus()?;
            Ok(Sequence::from(Atomic::from(focus.size as i64)))
        }
        Count => {
            let mut iter = iterate(&args[0], context)?;
            let mut count = 0i64;
            while let Some(item) = iter.next() {
                item?;
                count += 1;
            }
            Ok(Sequence::from(Atomic::from(count)))
        }
        Empty => {
            let mut iter = iterate(&args[0], context)?;
            let empty = match iter.next() {
                None => true,
                Some(item) => {
                    item?;
                    false
                }
            };
            Ok(Sequence::from(Atomic::Boolean(empty)))
        }
        Exists => {
            let mut iter = iterate(&args[0], context)?;
            let exists = match iter.next() {
                None => false,
                Some(item) => {
                    item?;
                    true
                }
            };
            Ok(Sequence::from(Atomic::Boolean(exists)))
        }
        Not => {
            let value = effective_boolean_value(&args[0], context)?;
            Ok(Sequence::from(Atomic::Boolean(!value)))
        }
        Boolean => {
            let value = effective_boolean_value(&args[0], context)?;
            Ok(Sequence::from(Atomic::Boolean(value)))
        }
        String => {
            let item = contextual_item(args, context)?;
            let value = match item {
                None => std::string::String::new(),
                Some(item) => context.string_value(&item),
            };
            Ok(Sequence::from(Atomic::from(value)))
        }
        StringLength => {
            let item = contextual_item(args, context)?;
            let value = match item {
                None => 0,
                Some(item) => context.string_value(&item).chars().count() as i64,
            };
            Ok(Sequence::from(Atomic::from(value)))
        }
        Number => {
            let item = contextual_item(args, context)?;
            let value = match item {
                None => f64::NAN,
                Some(item) => {
                    let atomized = context.atomize(&item);
                    match atomized {
                        value if value.is_numeric() => value.double_value()?,
                        Atomic::Boolean(b) => {
                            if b {
                                1.0
                            } else {
                                0.0
                            }
                        }
                        Atomic::Untyped(s) | Atomic::String(_, s) => {
                            match atomic::parse_atomic(&s, Xs::Double) {
                                Ok(parsed) => parsed.double_value()?,
                                Err(_) => f64::NAN,
                            }
                        }
                        _ => f64::NAN,
                    }
                }
            };
            Ok(Sequence::from(Atomic::from(value)))
        }
        Concat => {
            let mut result = std::string::String::new();
            for arg in args {
                if let Some(value) = atomized_option(arg, context)? {
                    result.push_str(&value.string_value());
                }
            }
            Ok(Sequence::from(Atomic::from(result)))
        }
        True => Ok(Sequence::from(Atomic::Boolean(true))),
        False => Ok(Sequence::from(Atomic::Boolean(false))),
        Name => {
            let node = contextual_node(args, context)?;
            let value = match node {
                None => std::string::String::new(),
                Some(node) => {
                    let documents = context.documents().borrow();
                    crate::xml::node_name(documents.xot(), node)
                        .map(|name| name.to_full_name())
                        .unwrap_or_default()
                }
            };
            Ok(Sequence::from(Atomic::from(value)))
        }
        LocalName => {
            let node = contextual_node(args, context)?;
            let value = match node {
                None => std::string::String::new(),
                Some(node) => {
                    let documents = context.documents().borrow();
                    crate::xml::node_name(documents.xot(), node)
                        .map(|name| name.local_name().to_string())
                        .unwrap_or_default()
                }
            };
            Ok(Sequence::from(Atomic::from(value)))
        }
        Root => {
            let node = match contextual_node(args, context)? {
                None => return Ok(Sequence::Empty),
                Some(node) => node,
            };
            let documents = context.documents().borrow();
            let mut root = node;
            while let Some(parent) = documents.xot().parent(root) {
                root = parent;
            }
            Ok(Sequence::from(root))
        }
        Doc => {
            let uri = match atomized_option(&args[0], context)? {
                None => return Ok(Sequence::Empty),
                Some(value) => value.string_value(),
            };
            context.resolve_document(&uri).map(Sequence::from)
        }
        Data => {
            let mut result = Vec::new();
            let mut iter = iterate(&args[0], context)?;
            while let Some(item) = iter.next() {
                result.push(Item::Atomic(context.atomize(&item?)));
            }
            Ok(Sequence::from_items(result))
        }
        CurrentDateTime => {
            let now = context.current_datetime();
            Ok(Sequence::from(Atomic::DateTimeStamp(Rc::new(now))))
        }
        CurrentDate => {
            let now = context.current_datetime();
            Ok(Sequence::from(Atomic::Date(Rc::new(
                atomic::NaiveDateWithOffset::new(now.naive_local().date(), Some(*now.offset())),
            ))))
        }
        CurrentTime => {
            let now = context.current_datetime();
            Ok(Sequence::from(Atomic::Time(Rc::new(
                atomic::NaiveTimeWithOffset::new(now.naive_local().time(), Some(*now.offset())),
            ))))
        }
        ImplicitTimezone => {
            let offset = context.implicit_timezone();
            Ok(Sequence::from(Atomic::DayTimeDuration(
                chrono::Duration::try_seconds(offset.local_minus_utc() as i64)
                    .ok_or(error::Error::FODT0002)?,
            )))
        }
        AdjustDateTimeToTimezone | AdjustDateToTimezone | AdjustTimeToTimezone => {
            adjust_to_timezone(function, args, context)
        }
        StringJoin => {
            let mut parts = Vec::new();
            let mut iter = iterate(&args[0], context)?;
            while let Some(item) = iter.next() {
                parts.push(context.atomize(&item?).string_value());
            }
            let separator = atomized_option(&args[1], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            Ok(Sequence::from(Atomic::from(parts.join(&separator))))
        }
        DistinctValues => {
            let comparer = collation_comparer(args.get(1), context)?;
            let mut seen = Vec::new();
            let mut result = Vec::new();
            let mut iter = iterate(&args[0], context)?;
            while let Some(item) = iter.next() {
                let value = context.atomize(&item?);
                // NaN is distinct exactly once
                let key = comparer.comparison_key(&value)?;
                if !seen.contains(&key) {
                    seen.push(key);
                    result.push(Item::Atomic(value));
                }
            }
            Ok(Sequence::from_items(result))
        }
        Min | Max => {
            let comparer = collation_comparer(args.get(1), context)?;
            let mut iter = iterate(&args[0], context)?;
            let mut best: Option<Atomic> = None;
            let mut saw_nan = false;
            while let Some(item) = iter.next() {
                let value = untyped_to_double(context.atomize(&item?))?;
                if value.is_nan() {
                    saw_nan = true;
                    continue;
                }
                best = Some(match best {
                    None => value,
                    Some(current) => {
                        let ordering = comparer
                            .compare(Some(&current), Some(&value))
                            .map_err(|_| error::Error::FORG0006)?;
                        let replace = match function {
                            Min => ordering == std::cmp::Ordering::Greater,
                            _ => ordering == std::cmp::Ordering::Less,
                        };
                        if replace {
                            value
                        } else {
                            current
                        }
                    }
                });
            }
            if saw_nan {
                return Ok(Sequence::from(Atomic::from(f64::NAN)));
            }
            Ok(best.map(|value| Sequence::from(value)).unwrap_or_default())
        }
        Sum => {
            let mut iter = iterate(&args[0], context)?;
            let mut total: Option<Atomic> = None;
            while let Some(item) = iter.next() {
                let value = untyped_to_double(context.atomize(&item?))?;
                total = Some(match total {
                    None => value,
                    Some(current) => {
                        atomic::arithmetic(xylem_ast::ast::ArithOp::Add, current, value)
                            .map_err(|_| error::Error::FORG0006)?
                    }
                });
            }
            match total {
                Some(total) => Ok(Sequence::from(total)),
                None => match args.get(1) {
                    Some(zero) => evaluate(zero, context),
                    None => Ok(Sequence::from(Atomic::from(0i64))),
                },
            }
        }
        Avg => {
            let mut iter = iterate(&args[0], context)?;
            let mut total: Option<Atomic> = None;
            let mut count = 0i64;
            while let Some(item) = iter.next() {
                let value = untyped_to_double(context.atomize(&item?))?;
                count += 1;
                total = Some(match total {
                    None => value,
                    Some(current) => {
                        atomic::arithmetic(xylem_ast::ast::ArithOp::Add, current, value)
                            .map_err(|_| error::Error::FORG0006)?
                    }
                });
            }
            match total {
                None => Ok(Sequence::Empty),
                Some(total) => atomic::arithmetic(
                    xylem_ast::ast::ArithOp::Div,
                    total,
                    Atomic::from(count),
                )
                .map(Sequence::from),
            }
        }
        Floor | Ceiling | Round | Abs => {
            let value = match atomized_option(&args[0], context)? {
                None => return Ok(Sequence::Empty),
                Some(value) => untyped_to_double(value)?,
            };
            rounding(function, value).map(Sequence::from)
        }
        Compare => {
            let a = match atomized_option(&args[0], context)? {
                None => return Ok(Sequence::Empty),
                Some(value) => value.string_value(),
            };
            let b = match atomized_option(&args[1], context)? {
                None => return Ok(Sequence::Empty),
                Some(value) => value.string_value(),
            };
            let collation = argument_collation(args.get(2), context)?;
            let ordering = collation.compare(&a, &b);
            Ok(Sequence::from(Atomic::from(match ordering {
                std::cmp::Ordering::Less => -1i64,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })))
        }
        Contains | StartsWith | EndsWith => {
            let a = atomized_option(&args[0], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            let b = atomized_option(&args[1], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            // substring matching is codepoint-based; a collation argument
            // other than codepoint is not supported
            let value = match function {
                Contains => a.contains(&b),
                StartsWith => a.starts_with(&b),
                _ => a.ends_with(&b),
            };
            Ok(Sequence::from(Atomic::Boolean(value)))
        }
        Substring => {
            let source = atomized_option(&args[0], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            let start = match atomized_option(&args[1], context)? {
                None => return Ok(Sequence::from(Atomic::from(""))),
                Some(value) => untyped_to_double(value)?.double_value()?,
            };
            let length = match args.get(2) {
                None => f64::INFINITY,
                Some(arg) => match atomized_option(arg, context)? {
                    None => return Ok(Sequence::from(Atomic::from(""))),
                    Some(value) => untyped_to_double(value)?.double_value()?,
                },
            };
            Ok(Sequence::from(Atomic::from(substring(
                &source, start, length,
            ))))
        }
        UpperCase => {
            let value = atomized_option(&args[0], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            Ok(Sequence::from(Atomic::from(value.to_uppercase())))
        }
        LowerCase => {
            let value = atomized_option(&args[0], context)?
                .map(|value| value.string_value())
                .unwrap_or_default();
            Ok(Sequence::from(Atomic::from(value.to_lowercase())))
        }
        NormalizeSpace => {
            let item = contextual_item(args, context)?;
            let value = match item {
                None => std::string::String::new(),
                Some(item) => context.string_value(&item),
            };
            let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
            Ok(Sequence::from(Atomic::from(normalized)))
        }
        Reverse => {
            let mut items: Vec<Item> = Vec::new();
            let mut iter = iterate(&args[0], context)?;
            while let Some(item) = iter.next() {
                items.push(item?);
            }
            items.reverse();
            Ok(Sequence::from_items(items))
        }
        Subsequence => {
            let start = match atomized_option(&args[1], context)? {
                None => return Ok(Sequence::Empty),
                Some(value) => untyped_to_double(value)?.double_value()?.round(),
            };
            let length = match args.get(2) {
                None => f64::INFINITY,
                Some(arg) => match atomized_option(arg, context)? {
                    None => return Ok(Sequence::Empty),
                    Some(value) => untyped_to_double(value)?.double_value()?.round(),
                },
            };
            let mut result = Vec::new();
            let mut iter = iterate(&args[0], context)?;
            let mut position = 0f64;
            while let Some(item) = iter.next() {
                let item = item?;
                position += 1.0;
                if position >= start && position < start + length {
                    result.push(item);
                }
            }
            Ok(Sequence::from_items(result))
        }
        CurrentGroup => {
            let group = context.current_group()?;
            Ok(Sequence::from_items(group.members.as_ref().clone()))
        }
        CurrentGroupingKey => {
            let group = context.current_group()?;
            Ok(group.key.clone())
        }
    }
}

// zero-argument string functions operate on the context item
fn contextual_item(
    args: &[ExprRef],
    context: &DynamicContext,
) -> error::Result<Option<Item>> {
    match args.first() {
        Some(arg) => {
            let mut iter = iterate(arg, context)?;
            match iter.next() {
                None => Ok(None),
                Some(item) => {
                    let item = item?;
                    if iter.next().is_some() {
                        return Err(error::Error::XPTY0004);
                    }
                    Ok(Some(item))
                }
            }
        }
        None => context.context_item().map(Some),
    }
}

fn contextual_node(
    args: &[ExprRef],
    context: &DynamicContext,
) -> error::Result<Option<xot::Node>> {
    match contextual_item(args, context)? {
        None => Ok(None),
        Some(item) => item.to_node().map(Some).map_err(|_| error::Error::XPTY0004),
    }
}

fn atomized_option(
    expr: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Option<Atomic>> {
    let mut iter = iterate(expr, context)?;
    let first = match iter.next() {
        None => return Ok(None),
        Some(item) => context.atomize(&item?),
    };
    if iter.next().is_some() {
        return Err(error::Error::XPTY0004);
    }
    Ok(Some(first))
}

// aggregate arguments pull untyped values to double
fn untyped_to_double(value: Atomic) -> error::Result<Atomic> {
    match value {
        Atomic::Untyped(s) => atomic::parse_atomic(&s, Xs::Double),
        other => Ok(other),
    }
}

fn argument_collation(
    arg: Option<&ExprRef>,
    context: &DynamicContext,
) -> error::Result<Rc<crate::string::Collation>> {
    let uri = match arg {
        None => None,
        Some(arg) => atomized_option(arg, context)?.map(|value| value.string_value()),
    };
    context.static_context().collation(uri.as_deref())
}

fn collation_comparer(
    arg: Option<&ExprRef>,
    context: &DynamicContext,
) -> error::Result<Box<dyn AtomicComparer>> {
    let collation = argument_collation(arg, context)?;
    Ok(Box::new(GenericAtomicComparer::new(
        collation,
        context.implicit_timezone(),
    )))
}

fn adjust_to_timezone(
    function: BuiltinFunction,
    args: &[ExprRef],
    context: &DynamicContext,
) -> error::Result<Sequence> {
    let value = match atomized_option(&args[0], context)? {
        None => return Ok(Sequence::Empty),
        Some(value) => value,
    };
    // the timezone argument: absent means the implicit timezone, an empty
    // sequence removes the timezone
    let offset = match args.get(1) {
        None => Some(context.implicit_timezone()),
        Some(arg) => match atomized_option(arg, context)? {
            None => None,
            Some(Atomic::DayTimeDuration(duration)) => {
                Some(atomic::offset_from_duration(duration)?)
            }
            Some(_) => return Err(error::Error::XPTY0004),
        },
    };
    let default = context.implicit_timezone();
    let result = match (function, value) {
        (BuiltinFunction::AdjustDateTimeToTimezone, Atomic::DateTime(dt)) => {
            Atomic::DateTime(Rc::new(dt.adjust_timezone(offset, default)))
        }
        (BuiltinFunction::AdjustDateTimeToTimezone, Atomic::DateTimeStamp(dt)) => {
            let with_offset = atomic::NaiveDateTimeWithOffset::new(
                dt.naive_local(),
                Some(*dt.offset()),
            );
            Atomic::DateTime(Rc::new(with_offset.adjust_timezone(offset, default)))
        }
        (BuiltinFunction::AdjustDateToTimezone, Atomic::Date(date)) => {
            Atomic::Date(Rc::new(date.adjust_timezone(offset, default)))
        }
        (BuiltinFunction::AdjustTimeToTimezone, Atomic::Time(time)) => {
            Atomic::Time(Rc::new(time.adjust_timezone(offset, default)))
        }
        _ => return Err(error::Error::XPTY0004),
    };
    Ok(Sequence::from(result))
}

fn rounding(function: BuiltinFunction, value: Atomic) -> error::Result<Atomic> {
    use BuiltinFunction::*;
    match value {
        Atomic::Integer(_, _) => match function {
            Abs => {
                let negative = value.signum()? < 0;
                if negative {
                    atomic::negate(value)
                } else {
                    Ok(value)
                }
            }
            _ => Ok(value),
        },
        Atomic::Decimal(d) => {
            let result = match function {
                Floor => d.floor(),
                Ceiling => d.ceil(),
                Round => round_half_up(d),
                _ => d.abs(),
            };
            Ok(Atomic::Decimal(result))
        }
        Atomic::Double(d) => {
            let d = d.into_inner();
            let result = match function {
                Floor => d.floor(),
                Ceiling => d.ceil(),
                // round halves towards positive infinity
                Round => (d + 0.5).floor(),
                _ => d.abs(),
            };
            Ok(Atomic::from(result))
        }
        Atomic::Float(f) => {
            let rounded = rounding(function, Atomic::from(f.into_inner() as f64))?;
            Ok(Atomic::from(rounded.double_value()? as f32))
        }
        _ => Err(error::Error::XPTY0004),
    }
}

fn round_half_up(d: Decimal) -> Decimal {
    let floor = d.floor();
    let fraction = d - floor;
    if fraction.to_f64().unwrap_or(0.0) >= 0.5 {
        floor + Decimal::ONE
    } else {
        floor
    }
}

fn substring(source: &str, start: f64, length: f64) -> String {
    if start.is_nan() || length.is_nan() {
        return String::new();
    }
    let start = start.round();
    let end = if length.is_infinite() {
        f64::INFINITY
    } else {
        start + length.round()
    };
    source
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (*index + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect()
}
