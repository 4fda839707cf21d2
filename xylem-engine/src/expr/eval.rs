use std::rc::Rc;

use xylem_ast::ast::{CompOp, EmptyOrder, NodeCompOp, Quantifier, SetOp};
use xylem_schema_type::Xs;
use xylem_xpath_type::{ItemType, Occurrence};

use crate::atomic::{self, Atomic};
use crate::context::{DynamicContext, GroupContext};
use crate::error;
use crate::sequence::{ErrorSource, Item, ItemSource, IterProperties, Sequence, SequenceIter};
use crate::sort::{
    atomic_comparer, group_adjacent, group_by, group_ending_with, group_starting_with,
    sort_records, SortRecord, SortSpec,
};
use crate::xml::{sort_into_document_order, NodeOrderComparer};

use super::core::{Expr, ExprRef, GroupVariant};
use super::props::SpecialProperties;

/// The primary evaluator: a pull iterator over the expression's result.
///
/// Range, concatenation, `for`, filters and paths iterate lazily; other
/// shapes evaluate eagerly and iterate their grounded result.
pub fn iterate(expr: &ExprRef, context: &DynamicContext) -> error::Result<SequenceIter> {
    match expr.as_ref() {
        Expr::Literal(sequence) => Ok(SequenceIter::from_sequence(sequence.clone())),
        Expr::Range { start, end } => {
            // a failing bound is not swallowed: it defers to the first next()
            let bounds = || -> error::Result<Sequence> {
                let start = match single_integer(start, context)? {
                    Some(value) => value,
                    None => return Ok(Sequence::Empty),
                };
                let end = match single_integer(end, context)? {
                    Some(value) => value,
                    None => return Ok(Sequence::Empty),
                };
                Ok(Sequence::range(start, end))
            };
            match bounds() {
                Ok(sequence) => Ok(SequenceIter::from_sequence(sequence)),
                Err(e) => Ok(SequenceIter::new(Box::new(ErrorSource::new(e)))),
            }
        }
        Expr::Append(parts) => Ok(SequenceIter::new(Box::new(AppendSource {
            parts: Rc::new(parts.clone()),
            context: context.clone(),
            index: 0,
            current: None,
        }))),
        Expr::For {
            var,
            in_expr,
            return_expr,
        } => Ok(SequenceIter::new(Box::new(ForSource {
            var: var.clone(),
            in_iter: iterate(in_expr, context)?,
            return_expr: return_expr.clone(),
            context: context.clone(),
            current: None,
        }))),
        Expr::Filter { base, predicates } => {
            let mut iter = iterate(base, context)?;
            for predicate in predicates {
                iter = SequenceIter::new(Box::new(FilterSource::new(
                    iter,
                    predicate.clone(),
                    context.clone(),
                )));
            }
            Ok(iter)
        }
        Expr::Path { left, right } => {
            let left_items = iterate(left, context)?.grounded()?;
            let size = left_items.len();
            Ok(SequenceIter::new(Box::new(PathSource {
                left: left_items,
                index: 0,
                size,
                right: right.clone(),
                context: context.clone(),
                current: None,
                require_nodes: true,
            })))
        }
        Expr::ForEach { select, body } => {
            let selected = iterate(select, context)?.grounded()?;
            let size = selected.len();
            Ok(SequenceIter::new(Box::new(PathSource {
                left: selected,
                index: 0,
                size,
                right: body.clone(),
                context: context.clone(),
                current: None,
                require_nodes: false,
            })))
        }
        _ => Ok(SequenceIter::from_sequence(evaluate(expr, context)?)),
    }
}

/// Evaluate to a grounded sequence.
pub fn evaluate(expr: &ExprRef, context: &DynamicContext) -> error::Result<Sequence> {
    match expr.as_ref() {
        Expr::Literal(sequence) => Ok(sequence.clone()),
        Expr::ContextItem => context.context_item().map(Sequence::from),
        Expr::Root => {
            let item = context.context_item()?;
            let node = item.to_node().map_err(|_| error::Error::XPTY0020)?;
            let documents = context.documents().borrow();
            let mut root = node;
            while let Some(parent) = documents.xot().parent(root) {
                root = parent;
            }
            Ok(Sequence::from(root))
        }
        Expr::AxisStep { axis, node_test } => {
            let item = context.context_item()?;
            let node = item.to_node().map_err(|_| error::Error::XPTY0020)?;
            let documents = context.documents().borrow();
            let items = crate::xml::resolve_step(*axis, node_test, documents.xot(), node);
            Ok(Sequence::from_items(items))
        }
        Expr::Range { .. }
        | Expr::Append(_)
        | Expr::For { .. }
        | Expr::ForEach { .. }
        | Expr::Filter { .. }
        | Expr::Path { .. } => iterate(expr, context)?.grounded(),
        Expr::VarRef(name) => context
            .variable(name)
            .cloned()
            .ok_or(error::Error::XPDY0002),
        Expr::FunctionCall { function, args } => {
            super::library::call(*function, args, context)
        }
        Expr::Arith { op, left, right } => {
            let a = match atomized_option(left, context)? {
                Some(a) => a,
                None => return Ok(Sequence::Empty),
            };
            let b = match atomized_option(right, context)? {
                Some(b) => b,
                None => return Ok(Sequence::Empty),
            };
            atomic::arithmetic(*op, a, b).map(Sequence::from)
        }
        Expr::Negate(base) => match atomized_option(base, context)? {
            Some(a) => atomic::negate(a).map(Sequence::from),
            None => Ok(Sequence::Empty),
        },
        Expr::And(left, right) => {
            let value = effective_boolean_value(left, context)?
                && effective_boolean_value(right, context)?;
            Ok(Sequence::from(Atomic::Boolean(value)))
        }
        Expr::Or(left, right) => {
            let value = effective_boolean_value(left, context)?
                || effective_boolean_value(right, context)?;
            Ok(Sequence::from(Atomic::Boolean(value)))
        }
        Expr::ValueComp { op, left, right } => {
            let a = match atomized_option(left, context)? {
                Some(a) => a,
                None => return Ok(Sequence::Empty),
            };
            let b = match atomized_option(right, context)? {
                Some(b) => b,
                None => return Ok(Sequence::Empty),
            };
            let collation = context.static_context().default_collation()?;
            let value = atomic::value_compare(
                *op,
                a,
                b,
                |x, y| collation.compare(x, y),
                context.implicit_timezone(),
            )?;
            Ok(Sequence::from(Atomic::Boolean(value)))
        }
        Expr::GeneralComp { op, left, right } => {
            general_comparison(*op, left, right, context).map(|b| {
                Sequence::from(Atomic::Boolean(b))
            })
        }
        Expr::NodeComp { op, left, right } => node_comparison(*op, left, right, context),
        Expr::SetOp { op, left, right } => set_operation(*op, left, right, context),
        Expr::Let {
            var,
            value,
            return_expr,
        } => {
            let bound = evaluate(value, context)?;
            let inner = context.with_variable(var.clone(), bound);
            evaluate(return_expr, &inner)
        }
        Expr::Quantified {
            quantifier,
            var,
            in_expr,
            satisfies,
        } => {
            let mut iter = iterate(in_expr, context)?;
            let mut result = *quantifier == Quantifier::Every;
            while let Some(item) = iter.next() {
                let inner = context.with_variable(var.clone(), Sequence::from(item?));
                let satisfied = effective_boolean_value(satisfies, &inner)?;
                match quantifier {
                    Quantifier::Some if satisfied => {
                        result = true;
                        break;
                    }
                    Quantifier::Every if !satisfied => {
                        result = false;
                        break;
                    }
                    _ => {}
                }
            }
            Ok(Sequence::from(Atomic::Boolean(result)))
        }
        Expr::If {
            condition,
            then_branch,
            else_branch,
        } => {
            if effective_boolean_value(condition, context)? {
                evaluate(then_branch, context)
            } else {
                evaluate(else_branch, context)
            }
        }
        Expr::InstanceOf {
            expr: inner,
            sequence_type,
        } => {
            let value = evaluate(inner, context)?;
            let matches = sequence_matches(&value, sequence_type, context);
            Ok(Sequence::from(Atomic::Boolean(matches)))
        }
        Expr::Castable {
            expr: inner,
            target,
            allows_empty,
        } => {
            let value = match cast_operand(inner, context)? {
                None => {
                    return Ok(Sequence::from(Atomic::Boolean(*allows_empty)));
                }
                Some(CastOperand::TooMany) => {
                    return Ok(Sequence::from(Atomic::Boolean(false)));
                }
                Some(CastOperand::One(value)) => value,
            };
            Ok(Sequence::from(Atomic::Boolean(atomic::castable(
                &value, *target,
            ))))
        }
        Expr::Cast {
            expr: inner,
            target,
            allows_empty,
        } => {
            let value = match cast_operand(inner, context)? {
                None => {
                    return if *allows_empty {
                        Ok(Sequence::Empty)
                    } else {
                        Err(error::Error::XPTY0004)
                    };
                }
                Some(CastOperand::TooMany) => return Err(error::Error::XPTY0004),
                Some(CastOperand::One(value)) => value,
            };
            atomic::cast_atomic(&value, *target).map(Sequence::from)
        }
        Expr::Sort {
            select,
            bind_var,
            keys,
        } => evaluate_sort(select, bind_var.as_ref(), keys, context),
        Expr::Group {
            population,
            variant,
            body,
        } => evaluate_group(population, variant, body, context),
        Expr::DocumentOrder(base) => {
            let items: Vec<Item> = {
                let mut collected = Vec::new();
                let mut iter = iterate(base, context)?;
                while let Some(item) = iter.next() {
                    collected.push(item?);
                }
                collected
            };
            // an all-atomic result passes through; nodes sort; a mixture
            // is the inconsistency error
            let node_count = items.iter().filter(|item| item.is_node()).count();
            if node_count == 0 {
                return Ok(Sequence::from_items(items));
            }
            if node_count != items.len() {
                return Err(error::Error::XPTY0018);
            }
            let comparer = if base
                .special_properties()
                .contains(SpecialProperties::SINGLE_DOCUMENT_NODESET)
            {
                NodeOrderComparer::Local
            } else {
                NodeOrderComparer::Global
            };
            let mut documents = context.documents().borrow_mut();
            let (xot, annotations) = documents.order_parts();
            let sorted = sort_into_document_order(items, comparer, annotations, xot)?;
            Ok(Sequence::from_items(sorted))
        }
        Expr::Atomizer(base) => {
            let mut result = Vec::new();
            let mut iter = iterate(base, context)?;
            while let Some(item) = iter.next() {
                result.push(Item::Atomic(context.atomize(&item?)));
            }
            Ok(Sequence::from_items(result))
        }
        Expr::CardinalityChecker {
            base,
            cardinality,
            error,
        } => {
            let value = evaluate(base, context)?;
            let ok = match value.len() {
                0 => cardinality.allows_empty(),
                1 => *cardinality != Occurrence::Empty,
                _ => cardinality.allows_many(),
            };
            if ok {
                Ok(value)
            } else {
                Err(context.fatal(error.clone()))
            }
        }
        Expr::ItemTypeChecker {
            base,
            item_type,
            error,
        } => {
            let value = evaluate(base, context)?;
            for item in value.iter() {
                if !item_matches(&item, item_type, context) {
                    return Err(context.fatal(error.clone()));
                }
            }
            Ok(value)
        }
        Expr::UntypedConverter { base, target } => {
            let value = evaluate(base, context)?;
            let mut result = Vec::with_capacity(value.len());
            for item in value.iter() {
                match item {
                    Item::Atomic(Atomic::Untyped(s)) => {
                        result.push(Item::Atomic(atomic::parse_atomic(&s, *target)?));
                    }
                    other => result.push(other),
                }
            }
            Ok(Sequence::from_items(result))
        }
        Expr::Trace { base, label } => {
            context.trace_enter(label);
            let result = evaluate(base, context);
            context.trace_leave(label);
            result
        }
    }
}

/// The first item of the result.
///
/// When the static cardinality permits at most one item, a second item is
/// the type error the checkpoint exists for.
pub fn evaluate_item(
    expr: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Option<Item>> {
    let mut iter = iterate(expr, context)?;
    let first = match iter.next() {
        None => return Ok(None),
        Some(item) => item?,
    };
    if matches!(
        expr.cardinality(),
        Occurrence::One | Occurrence::Option | Occurrence::Empty
    ) && iter.next().is_some()
    {
        return Err(error::Error::XPTY0004);
    }
    Ok(Some(first))
}

/// The effective boolean value of the result, per the XPath rules.
pub fn effective_boolean_value(
    expr: &ExprRef,
    context: &DynamicContext,
) -> error::Result<bool> {
    let mut iter = iterate(expr, context)?;
    let first = match iter.next() {
        None => return Ok(false),
        Some(item) => item?,
    };
    if first.is_node() {
        return Ok(true);
    }
    if iter.next().is_some() {
        return Err(error::Error::FORG0006);
    }
    first.effective_boolean_value()
}

// ---- helpers ----

fn single_integer(expr: &ExprRef, context: &DynamicContext) -> error::Result<Option<i64>> {
    match atomized_option(expr, context)? {
        None => Ok(None),
        Some(value) => {
            let value = match value {
                Atomic::Untyped(s) => atomic::parse_atomic(&s, Xs::Integer)?,
                other => other,
            };
            value.long_value().map(Some).map_err(|_| error::Error::XPTY0004)
        }
    }
}

// atomize an operand expecting at most one value
fn atomized_option(expr: &ExprRef, context: &DynamicContext) -> error::Result<Option<Atomic>> {
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

enum CastOperand {
    One(Atomic),
    TooMany,
}

fn cast_operand(
    expr: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Option<CastOperand>> {
    let mut iter = iterate(expr, context)?;
    let first = match iter.next() {
        None => return Ok(None),
        Some(item) => context.atomize(&item?),
    };
    if iter.next().is_some() {
        return Ok(Some(CastOperand::TooMany));
    }
    Ok(Some(CastOperand::One(first)))
}

fn general_comparison(
    op: CompOp,
    left: &ExprRef,
    right: &ExprRef,
    context: &DynamicContext,
) -> error::Result<bool> {
    let collation = context.static_context().default_collation()?;
    let timezone = context.implicit_timezone();
    // existential semantics: true as soon as one pair compares true
    let mut left_iter = iterate(left, context)?;
    let mut left_values = Vec::new();
    while let Some(item) = left_iter.next() {
        left_values.push(context.atomize(&item?));
    }
    if left_values.is_empty() {
        return Ok(false);
    }
    let mut right_iter = iterate(right, context)?;
    while let Some(item) = right_iter.next() {
        let b = context.atomize(&item?);
        for a in &left_values {
            if atomic::general_compare_pair(
                op,
                a.clone(),
                b.clone(),
                |x, y| collation.compare(x, y),
                timezone,
            )? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn node_comparison(
    op: NodeCompOp,
    left: &ExprRef,
    right: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Sequence> {
    let a = match evaluate(left, context)?.option()? {
        None => return Ok(Sequence::Empty),
        Some(item) => item.to_node()?,
    };
    let b = match evaluate(right, context)?.option()? {
        None => return Ok(Sequence::Empty),
        Some(item) => item.to_node()?,
    };
    let value = match op {
        NodeCompOp::Is => a == b,
        NodeCompOp::Precedes | NodeCompOp::Follows => {
            let mut documents = context.documents().borrow_mut();
            let order_a = documents.document_order(a);
            let order_b = documents.document_order(b);
            match op {
                NodeCompOp::Precedes => order_a < order_b,
                _ => order_a > order_b,
            }
        }
    };
    Ok(Sequence::from(Atomic::Boolean(value)))
}

fn set_operation(
    op: SetOp,
    left: &ExprRef,
    right: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Sequence> {
    fn keyed(
        nodes: Vec<xot::Node>,
        documents: &mut crate::xml::Documents,
    ) -> Vec<(crate::xml::DocumentOrder, xot::Node)> {
        let mut result: Vec<(crate::xml::DocumentOrder, xot::Node)> = nodes
            .into_iter()
            .map(|node| (documents.document_order(node), node))
            .collect();
        result.sort_by_key(|(order, _)| *order);
        result.dedup_by_key(|(order, _)| *order);
        result
    }
    let left_nodes = evaluate(left, context)?.nodes()?;
    let right_nodes = evaluate(right, context)?.nodes()?;
    let mut documents = context.documents().borrow_mut();
    let a = keyed(left_nodes, &mut documents);
    let b = keyed(right_nodes, &mut documents);
    let mut result = Vec::new();
    let mut ai = a.iter().peekable();
    let mut bi = b.iter().peekable();
    match op {
        SetOp::Union => loop {
            match (ai.peek(), bi.peek()) {
                (Some((ka, na)), Some((kb, _))) if ka < kb => {
                    result.push(Item::Node(*na));
                    ai.next();
                }
                (Some((ka, _)), Some((kb, nb))) if kb < ka => {
                    result.push(Item::Node(*nb));
                    bi.next();
                }
                (Some((_, na)), Some(_)) => {
                    result.push(Item::Node(*na));
                    ai.next();
                    bi.next();
                }
                (Some((_, na)), None) => {
                    result.push(Item::Node(*na));
                    ai.next();
                }
                (None, Some((_, nb))) => {
                    result.push(Item::Node(*nb));
                    bi.next();
                }
                (None, None) => break,
            }
        },
        SetOp::Intersect => loop {
            match (ai.peek(), bi.peek()) {
                (Some((ka, _)), Some((kb, _))) if ka < kb => {
                    ai.next();
                }
                (Some((ka, _)), Some((kb, _))) if kb < ka => {
                    bi.next();
                }
                (Some((_, na)), Some(_)) => {
                    result.push(Item::Node(*na));
                    ai.next();
                    bi.next();
                }
                _ => break,
            }
        },
        SetOp::Except => loop {
            match (ai.peek(), bi.peek()) {
                (Some((ka, na)), Some((kb, _))) if ka < kb => {
                    result.push(Item::Node(*na));
                    ai.next();
                }
                (Some((ka, _)), Some((kb, _))) if kb < ka => {
                    bi.next();
                }
                (Some(_), Some(_)) => {
                    ai.next();
                    bi.next();
                }
                (Some((_, na)), None) => {
                    result.push(Item::Node(*na));
                    ai.next();
                }
                _ => break,
            }
        },
    }
    Ok(Sequence::from_items(result))
}

fn evaluate_sort(
    select: &ExprRef,
    bind_var: Option<&xylem_name::Name>,
    keys: &[super::core::SortKeyDef],
    context: &DynamicContext,
) -> error::Result<Sequence> {
    let population = iterate(select, context)?.grounded()?;
    let size = population.len();
    // resolve one comparer per key
    let mut specs = Vec::with_capacity(keys.len());
    for key in keys {
        let collation = context
            .static_context()
            .collation(key.collation_uri.as_deref())?;
        let item_type = match key.key.item_type() {
            ItemType::Atomic(xs) => Some(xs),
            _ => None,
        };
        let base = atomic_comparer(collation, item_type, context.implicit_timezone());
        specs.push(SortSpec::new(
            key.order,
            key.empty_order.unwrap_or(EmptyOrder::Least),
            base,
        ));
    }
    let mut records = Vec::with_capacity(size);
    for (index, item) in population.iter().enumerate() {
        let mut focus = context.with_focus(item.clone(), index + 1, size);
        if let Some(var) = bind_var {
            focus = focus.with_variable(var.clone(), Sequence::from(item.clone()));
        }
        let mut key_values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match atomized_option(&key.key, &focus)? {
                None => None,
                Some(value) => Some(key.data_type.coerce(value)?),
            };
            key_values.push(value);
        }
        records.push(SortRecord {
            item,
            keys: key_values,
            position: index,
        });
    }
    sort_records(&mut records, &specs)?;
    Ok(Sequence::from_items(
        records.into_iter().map(|record| record.item).collect(),
    ))
}

fn evaluate_group(
    population: &ExprRef,
    variant: &GroupVariant,
    body: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Sequence> {
    let items = iterate(population, context)?.grounded()?;
    let size = items.len();
    let collation = context.static_context().default_collation()?;
    let comparer = atomic_comparer(collation, None, context.implicit_timezone());

    let groups: Vec<crate::sort::Group> = match variant {
        GroupVariant::By(key_expr) => {
            let mut keyed = Vec::with_capacity(size);
            for (index, item) in items.iter().enumerate() {
                let focus = context.with_focus(item.clone(), index + 1, size);
                let mut keys = Vec::new();
                let mut iter = iterate(key_expr, &focus)?;
                while let Some(value) = iter.next() {
                    keys.push(focus.atomize(&value?));
                }
                keyed.push((item, keys));
            }
            group_by(keyed, comparer.as_ref())?.collect()
        }
        GroupVariant::Adjacent(key_expr) => {
            let mut keyed = Vec::with_capacity(size);
            for (index, item) in items.iter().enumerate() {
                let focus = context.with_focus(item.clone(), index + 1, size);
                // group-adjacent requires exactly one key value
                let key = atomized_option(key_expr, &focus)?.ok_or(error::Error::XPTY0004)?;
                keyed.push((item, key));
            }
            group_adjacent(keyed, comparer.as_ref())?.collect()
        }
        GroupVariant::StartingWith(pattern) => {
            let flagged = match_flags(&items, pattern, context)?;
            group_starting_with(flagged).collect()
        }
        GroupVariant::EndingWith(pattern) => {
            let flagged = match_flags(&items, pattern, context)?;
            group_ending_with(flagged).collect()
        }
    };

    let group_count = groups.len();
    let mut result = Vec::new();
    for (index, group) in groups.into_iter().enumerate() {
        let leader = group.members[0].clone();
        let inner = context
            .with_focus(leader, index + 1, group_count)
            .with_group(GroupContext {
                members: group.members.clone(),
                key: group.key.clone(),
            });
        let mut iter = iterate(body, &inner)?;
        while let Some(item) = iter.next() {
            result.push(item?);
        }
    }
    Ok(Sequence::from_items(result))
}

// evaluate a match test per population item
fn match_flags(
    items: &Sequence,
    pattern: &ExprRef,
    context: &DynamicContext,
) -> error::Result<Vec<(Item, bool)>> {
    let size = items.len();
    let mut result = Vec::with_capacity(size);
    for (index, item) in items.iter().enumerate() {
        let focus = context.with_focus(item.clone(), index + 1, size);
        let matches = effective_boolean_value(pattern, &focus)?;
        result.push((item, matches));
    }
    Ok(result)
}

/// Whether a single item matches an item type.
pub(crate) fn item_matches(item: &Item, item_type: &ItemType, context: &DynamicContext) -> bool {
    match (item, item_type) {
        (_, ItemType::Item) => true,
        (Item::Atomic(a), ItemType::Atomic(xs)) => a.xs_type().matches(*xs),
        (Item::Node(node), ItemType::Node(kind_test)) => {
            let documents = context.documents().borrow();
            crate::xml::matches_kind_test(kind_test, documents.xot(), *node)
        }
        _ => false,
    }
}

/// Whether a sequence matches a sequence type.
pub fn sequence_matches(
    value: &Sequence,
    sequence_type: &xylem_xpath_type::SequenceType,
    context: &DynamicContext,
) -> bool {
    let occurrence_ok = match value.len() {
        0 => sequence_type.occurrence().allows_empty(),
        1 => sequence_type.occurrence() != Occurrence::Empty,
        _ => sequence_type.occurrence().allows_many(),
    };
    if !occurrence_ok {
        return false;
    }
    match sequence_type.item_type() {
        None => true,
        Some(item_type) => value
            .iter()
            .all(|item| item_matches(&item, item_type, context)),
    }
}

// ---- lazy sources ----

struct AppendSource {
    parts: Rc<Vec<ExprRef>>,
    context: DynamicContext,
    index: usize,
    current: Option<SequenceIter>,
}

impl ItemSource for AppendSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        loop {
            if let Some(current) = &mut self.current {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            if self.index >= self.parts.len() {
                return None;
            }
            let part = self.parts[self.index].clone();
            self.index += 1;
            match iterate(&part, &self.context) {
                Ok(iter) => self.current = Some(iter),
                Err(e) => {
                    self.index = self.parts.len();
                    return Some(Err(e));
                }
            }
        }
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(AppendSource {
            parts: self.parts.clone(),
            context: self.context.clone(),
            index: 0,
            current: None,
        })
    }
}

struct ForSource {
    var: xylem_name::Name,
    in_iter: SequenceIter,
    return_expr: ExprRef,
    context: DynamicContext,
    current: Option<SequenceIter>,
}

impl ItemSource for ForSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        loop {
            if let Some(current) = &mut self.current {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            let binding = match self.in_iter.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            let inner = self
                .context
                .with_variable(self.var.clone(), Sequence::from(binding));
            match iterate(&self.return_expr, &inner) {
                Ok(iter) => self.current = Some(iter),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(ForSource {
            var: self.var.clone(),
            in_iter: self.in_iter.another(),
            return_expr: self.return_expr.clone(),
            context: self.context.clone(),
            current: None,
        })
    }
}

struct FilterSource {
    base: SequenceIter,
    predicate: ExprRef,
    context: DynamicContext,
    // the size of the base sequence, computed on demand for last()
    size: Option<usize>,
}

impl FilterSource {
    fn new(base: SequenceIter, predicate: ExprRef, context: DynamicContext) -> Self {
        FilterSource {
            base,
            predicate,
            context,
            size: None,
        }
    }

    fn base_size(&mut self) -> error::Result<usize> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        // a restart of the base lets us count without disturbing it
        let size = match self.base.last_position() {
            Some(size) => size,
            None => {
                let mut counter = self.base.another();
                let mut size = 0;
                while let Some(item) = counter.next() {
                    item?;
                    size += 1;
                }
                size
            }
        };
        self.size = Some(size);
        Ok(size)
    }
}

impl ItemSource for FilterSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        loop {
            let item = match self.base.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            let position = self.base.position();
            let size = match self.base_size() {
                Ok(size) => size,
                Err(e) => return Some(Err(e)),
            };
            let focus = self.context.with_focus(item.clone(), position, size);
            let keep = match predicate_matches(&self.predicate, &focus, position) {
                Ok(keep) => keep,
                Err(e) => return Some(Err(e)),
            };
            if keep {
                return Some(Ok(item));
            }
        }
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(FilterSource {
            base: self.base.another(),
            predicate: self.predicate.clone(),
            context: self.context.clone(),
            size: self.size,
        })
    }

    fn properties(&self) -> IterProperties {
        IterProperties::empty()
    }
}

// a numeric predicate selects by position; anything else by its
// effective boolean value
fn predicate_matches(
    predicate: &ExprRef,
    focus: &DynamicContext,
    position: usize,
) -> error::Result<bool> {
    let mut iter = iterate(predicate, focus)?;
    let first = match iter.next() {
        None => return Ok(false),
        Some(item) => item?,
    };
    if let Item::Atomic(atomic) = &first {
        if atomic.is_numeric() {
            if iter.next().is_some() {
                return Err(error::Error::FORG0006);
            }
            let value = atomic.double_value()?;
            return Ok(value == position as f64);
        }
    }
    if first.is_node() {
        return Ok(true);
    }
    if iter.next().is_some() {
        return Err(error::Error::FORG0006);
    }
    first.effective_boolean_value()
}

struct PathSource {
    left: Sequence,
    index: usize,
    size: usize,
    right: ExprRef,
    context: DynamicContext,
    current: Option<SequenceIter>,
    // a path requires its operand items to be nodes; for-each does not
    require_nodes: bool,
}

impl ItemSource for PathSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        loop {
            if let Some(current) = &mut self.current {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            let item = self.left.get(self.index)?;
            self.index += 1;
            if self.require_nodes && !item.is_node() {
                return Some(Err(error::Error::XPTY0019));
            }
            let focus = self.context.with_focus(item, self.index, self.size);
            match iterate(&self.right, &focus) {
                Ok(iter) => self.current = Some(iter),
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(PathSource {
            left: self.left.clone(),
            index: 0,
            size: self.size,
            right: self.right.clone(),
            context: self.context.clone(),
            current: None,
            require_nodes: self.require_nodes,
        })
    }
}
