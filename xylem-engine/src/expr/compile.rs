use std::rc::Rc;
use std::str::FromStr;

use ibig::IBig;
use rust_decimal::Decimal;

use xylem_ast::ast;
use xylem_schema_type::Xs;
use xylem_xpath_type::Occurrence;

use crate::context::StaticContext;
use crate::error;
use crate::sequence::{Item, Sequence};
use crate::sort::DataTypeForce;

use super::core::{Expr, ExprRef, GroupVariant, SortKeyDef};
use super::functions::BuiltinFunction;
use super::optimize::optimize;
use super::promote::promote;
use super::simplify::simplify;
use super::typecheck::type_check;

/// Compile a parsed expression into its executable form.
///
/// Runs the four passes in order: simplify, type check, optimize,
/// promote. Each pass preserves semantics and may return a different
/// root; the result is immutable and safe to share.
pub fn compile(source: &ast::ExprS, static_context: &StaticContext) -> error::Result<ExprRef> {
    let lowered = lower(source)?;
    let lowered = if static_context.trace_enabled() {
        Rc::new(Expr::Trace {
            base: lowered,
            label: "query".to_string(),
        })
    } else {
        lowered
    };
    run_passes(&lowered, static_context)
}

/// Lower a parsed expression without running the passes; the stylesheet
/// translator assembles trees from fragments and runs the passes once.
pub(crate) fn lower_ast(source: &ast::ExprS) -> error::Result<ExprRef> {
    lower(source)
}

/// Run the four passes over an assembled tree.
pub(crate) fn run_passes(
    expr: &ExprRef,
    static_context: &StaticContext,
) -> error::Result<ExprRef> {
    let simplified = simplify(expr)?;
    let checked = type_check(&simplified, static_context)?;
    let optimized = optimize(&checked)?;
    promote(&optimized)
}

fn lower(source: &ast::ExprS) -> error::Result<ExprRef> {
    let expr = match &source.expr {
        ast::Expr::Literal(literal) => Expr::Literal(lower_literal(literal)?),
        ast::Expr::Sequence(items) => {
            if items.is_empty() {
                Expr::Literal(Sequence::Empty)
            } else {
                Expr::Append(items.iter().map(lower).collect::<error::Result<_>>()?)
            }
        }
        ast::Expr::ContextItem => Expr::ContextItem,
        ast::Expr::Root => Expr::Root,
        ast::Expr::AxisStep { axis, node_test } => {
            if *axis == ast::Axis::Namespace {
                // the namespace axis is not supported
                return Err(error::Error::Unsupported);
            }
            Expr::AxisStep {
                axis: *axis,
                node_test: node_test.clone(),
            }
        }
        ast::Expr::PathStep { left, right } => {
            // every path is wrapped; the optimizer drops the wrapper when
            // the operand is already ordered
            Expr::DocumentOrder(Rc::new(Expr::Path {
                left: lower(left)?,
                right: lower(right)?,
            }))
        }
        ast::Expr::Filter { base, predicates } => Expr::Filter {
            base: lower(base)?,
            predicates: predicates.iter().map(lower).collect::<error::Result<_>>()?,
        },
        ast::Expr::VarRef(name) => Expr::VarRef(name.clone()),
        ast::Expr::FunctionCall { name, args } => {
            // a schema type name used as a function is a constructor,
            // which is a cast in disguise
            if name.namespace() == Some(xylem_name::XS_NAMESPACE) && args.len() == 1 {
                let target = Xs::by_name(name.namespace(), name.local_name())
                    .ok_or(error::Error::XPST0017)?;
                check_cast_target(target)?;
                Expr::Cast {
                    expr: lower(&args[0])?,
                    target,
                    allows_empty: true,
                }
            } else {
                let function = BuiltinFunction::resolve(name, args.len())
                    .ok_or(error::Error::XPST0017)?;
                Expr::FunctionCall {
                    function,
                    args: args.iter().map(lower).collect::<error::Result<_>>()?,
                }
            }
        }
        ast::Expr::Arith { op, left, right } => Expr::Arith {
            op: *op,
            left: lower(left)?,
            right: lower(right)?,
        },
        ast::Expr::Negate(base) => Expr::Negate(lower(base)?),
        ast::Expr::Or(left, right) => Expr::Or(lower(left)?, lower(right)?),
        ast::Expr::And(left, right) => Expr::And(lower(left)?, lower(right)?),
        ast::Expr::ValueComp { op, left, right } => Expr::ValueComp {
            op: *op,
            left: lower(left)?,
            right: lower(right)?,
        },
        ast::Expr::GeneralComp { op, left, right } => Expr::GeneralComp {
            op: *op,
            left: lower(left)?,
            right: lower(right)?,
        },
        ast::Expr::NodeComp { op, left, right } => Expr::NodeComp {
            op: *op,
            left: lower(left)?,
            right: lower(right)?,
        },
        ast::Expr::SetOp { op, left, right } => Expr::SetOp {
            op: *op,
            left: lower(left)?,
            right: lower(right)?,
        },
        ast::Expr::Range { start, end } => Expr::Range {
            start: lower(start)?,
            end: lower(end)?,
        },
        ast::Expr::For {
            bindings,
            order_by,
            where_clause,
            return_expr,
        } => return lower_flwor(bindings, order_by, where_clause.as_deref(), return_expr),
        ast::Expr::Let {
            bindings,
            return_expr,
        } => {
            let mut result = lower(return_expr)?;
            for binding in bindings.iter().rev() {
                result = Rc::new(Expr::Let {
                    var: binding.name.clone(),
                    value: lower(&binding.expr)?,
                    return_expr: result,
                });
            }
            return Ok(result);
        }
        ast::Expr::Quantified {
            quantifier,
            bindings,
            satisfies,
        } => {
            let mut result = lower(satisfies)?;
            for binding in bindings.iter().rev() {
                result = Rc::new(Expr::Quantified {
                    quantifier: *quantifier,
                    var: binding.name.clone(),
                    in_expr: lower(&binding.expr)?,
                    satisfies: result,
                });
            }
            return Ok(result);
        }
        ast::Expr::If {
            condition,
            then_branch,
            else_branch,
        } => Expr::If {
            condition: lower(condition)?,
            then_branch: lower(then_branch)?,
            else_branch: lower(else_branch)?,
        },
        ast::Expr::InstanceOf {
            expr,
            sequence_type,
        } => Expr::InstanceOf {
            expr: lower(expr)?,
            sequence_type: sequence_type.clone(),
        },
        ast::Expr::TreatAs {
            expr,
            sequence_type,
        } => {
            // treat as expands into the runtime checkers
            let base = lower(expr)?;
            let checked = match sequence_type.item_type() {
                Some(item_type) => Rc::new(Expr::ItemTypeChecker {
                    base,
                    item_type: item_type.clone(),
                    error: error::Error::XPDY0050,
                }),
                None => base,
            };
            Expr::CardinalityChecker {
                base: checked,
                cardinality: sequence_type.occurrence(),
                error: error::Error::XPDY0050,
            }
        }
        ast::Expr::CastableAs { expr, single_type } => {
            check_cast_target(single_type.atomic)?;
            Expr::Castable {
                expr: lower(expr)?,
                target: single_type.atomic,
                allows_empty: single_type.optional,
            }
        }
        ast::Expr::CastAs { expr, single_type } => {
            check_cast_target(single_type.atomic)?;
            Expr::Cast {
                expr: lower(expr)?,
                target: single_type.atomic,
                allows_empty: single_type.optional,
            }
        }
    };
    Ok(Rc::new(expr))
}

// the target of a cast must be a concrete atomic type
fn check_cast_target(target: Xs) -> error::Result<()> {
    if target.is_abstract() || target == Xs::Untyped || target == Xs::AnyType {
        return Err(error::Error::XPST0080);
    }
    Ok(())
}

fn lower_literal(literal: &ast::Literal) -> error::Result<Sequence> {
    let atomic = match literal {
        ast::Literal::Integer(text) => {
            let value = IBig::from_str(text).map_err(|_| error::Error::XPST0003)?;
            crate::atomic::Atomic::from(value)
        }
        ast::Literal::Decimal(text) => {
            let value = Decimal::from_str(text).map_err(|_| error::Error::XPST0003)?;
            crate::atomic::Atomic::from(value)
        }
        ast::Literal::Double(value) => crate::atomic::Atomic::from(*value),
        ast::Literal::String(value) => crate::atomic::Atomic::from(value.as_str()),
    };
    Ok(Sequence::One(Item::Atomic(atomic)))
}

// for $x in E [where W] [order by K] return R
//
// lowers to nested fors; a where clause filters the binding sequence, and
// an order by sorts the (single) binding sequence with the range variable
// bound to each candidate item
fn lower_flwor(
    bindings: &[ast::Binding],
    order_by: &[ast::OrderSpec],
    where_clause: Option<&ast::ExprS>,
    return_expr: &ast::ExprS,
) -> error::Result<ExprRef> {
    if !order_by.is_empty() && bindings.len() != 1 {
        // ordering a multi-variable tuple stream is beyond this engine
        return Err(error::Error::Unsupported);
    }
    let mut result = lower(return_expr)?;
    let last = bindings.len() - 1;
    for (index, binding) in bindings.iter().enumerate().rev() {
        let mut in_expr = lower(&binding.expr)?;
        if index == last {
            if let Some(where_clause) = where_clause {
                // the filtered binding sequence: items whose condition holds
                let condition = lower(where_clause)?;
                in_expr = Rc::new(Expr::For {
                    var: binding.name.clone(),
                    in_expr,
                    return_expr: Rc::new(Expr::If {
                        condition,
                        then_branch: Rc::new(Expr::VarRef(binding.name.clone())),
                        else_branch: Rc::new(Expr::Literal(Sequence::Empty)),
                    }),
                });
            }
            if !order_by.is_empty() {
                let keys = order_by
                    .iter()
                    .map(|spec| {
                        Ok(SortKeyDef {
                            key: lower(&spec.key)?,
                            order: spec.order,
                            empty_order: spec.empty_order,
                            data_type: DataTypeForce::Default,
                            collation_uri: spec.collation.clone(),
                        })
                    })
                    .collect::<error::Result<_>>()?;
                in_expr = Rc::new(Expr::Sort {
                    select: in_expr,
                    bind_var: Some(binding.name.clone()),
                    keys,
                });
            }
        }
        result = Rc::new(Expr::For {
            var: binding.name.clone(),
            in_expr,
            return_expr: result,
        });
    }
    Ok(result)
}

/// Require a cardinality on top of an expression unless it already
/// satisfies it statically.
pub(crate) fn require_cardinality(
    base: ExprRef,
    cardinality: Occurrence,
    error: error::Error,
) -> ExprRef {
    if cardinality.subsumes(base.cardinality()) {
        base
    } else {
        Rc::new(Expr::CardinalityChecker {
            base,
            cardinality,
            error,
        })
    }
}
