use std::rc::Rc;

use xylem_name::Name;
use xylem_schema_type::Xs;
use xylem_xpath_type::{ItemType, Occurrence};

use crate::context::StaticContext;
use crate::error;

use super::core::{rewrite_children, Expr, ExprRef};

/// The second pass: propagate expected types, insert the runtime
/// checkpoints (atomizer, cardinality checker, untyped converter) where
/// the static type leaves room for a mismatch, and reject what can never
/// match.
pub(crate) fn type_check(
    expr: &ExprRef,
    static_context: &StaticContext,
) -> error::Result<ExprRef> {
    let mut bound = Vec::new();
    check(expr, static_context, &mut bound)
}

fn check(
    expr: &ExprRef,
    static_context: &StaticContext,
    bound: &mut Vec<Name>,
) -> error::Result<ExprRef> {
    match expr.as_ref() {
        Expr::VarRef(name) => {
            if !bound.contains(name) && static_context.variable_declaration(name).is_none() {
                return Err(error::Error::XPST0008);
            }
            Ok(expr.clone())
        }
        Expr::For {
            var,
            in_expr,
            return_expr,
        } => {
            let in_expr = check(in_expr, static_context, bound)?;
            bound.push(var.clone());
            let return_expr = check(return_expr, static_context, bound);
            bound.pop();
            Ok(Rc::new(Expr::For {
                var: var.clone(),
                in_expr,
                return_expr: return_expr?,
            }))
        }
        Expr::Let {
            var,
            value,
            return_expr,
        } => {
            let value = check(value, static_context, bound)?;
            bound.push(var.clone());
            let return_expr = check(return_expr, static_context, bound);
            bound.pop();
            Ok(Rc::new(Expr::Let {
                var: var.clone(),
                value,
                return_expr: return_expr?,
            }))
        }
        Expr::Quantified {
            quantifier,
            var,
            in_expr,
            satisfies,
        } => {
            let in_expr = check(in_expr, static_context, bound)?;
            bound.push(var.clone());
            let satisfies = check(satisfies, static_context, bound);
            bound.pop();
            Ok(Rc::new(Expr::Quantified {
                quantifier: *quantifier,
                var: var.clone(),
                in_expr,
                satisfies: satisfies?,
            }))
        }
        Expr::Sort {
            select,
            bind_var,
            keys,
        } => {
            let select = check(select, static_context, bound)?;
            if let Some(var) = bind_var {
                bound.push(var.clone());
            }
            let mut checked_keys = Vec::with_capacity(keys.len());
            let mut failure = None;
            for key in keys {
                match check(&key.key, static_context, bound) {
                    Ok(checked) => checked_keys.push(super::core::SortKeyDef {
                        key: atomized(checked),
                        order: key.order,
                        empty_order: key.empty_order,
                        data_type: key.data_type,
                        collation_uri: key.collation_uri.clone(),
                    }),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if bind_var.is_some() {
                bound.pop();
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(Rc::new(Expr::Sort {
                    select,
                    bind_var: bind_var.clone(),
                    keys: checked_keys,
                })),
            }
        }
        Expr::Path { left, right } => {
            let left = check(left, static_context, bound)?;
            // a path whose operand can only be atomic can never succeed
            if matches!(left.item_type(), ItemType::Atomic(_)) {
                return Err(error::Error::XPTY0019);
            }
            let right = check(right, static_context, bound)?;
            Ok(Rc::new(Expr::Path { left, right }))
        }
        Expr::Arith { op, left, right } => {
            let left = convert_operand(check(left, static_context, bound)?, Xs::Double);
            let right = convert_operand(check(right, static_context, bound)?, Xs::Double);
            Ok(Rc::new(Expr::Arith {
                op: *op,
                left,
                right,
            }))
        }
        Expr::ValueComp { op, left, right } => {
            let left = atomized(check(left, static_context, bound)?);
            let right = atomized(check(right, static_context, bound)?);
            Ok(Rc::new(Expr::ValueComp {
                op: *op,
                left,
                right,
            }))
        }
        Expr::GeneralComp { op, left, right } => {
            let left = atomized(check(left, static_context, bound)?);
            let right = atomized(check(right, static_context, bound)?);
            Ok(Rc::new(Expr::GeneralComp {
                op: *op,
                left,
                right,
            }))
        }
        Expr::Cast {
            expr: inner,
            target,
            allows_empty,
        } => {
            let inner = check(inner, static_context, bound)?;
            let cardinality = if *allows_empty {
                Occurrence::Option
            } else {
                Occurrence::One
            };
            let inner = super::compile::require_cardinality(
                atomized(inner),
                cardinality,
                error::Error::XPTY0004,
            );
            Ok(Rc::new(Expr::Cast {
                expr: inner,
                target: *target,
                allows_empty: *allows_empty,
            }))
        }
        Expr::Castable {
            expr: inner,
            target,
            allows_empty,
        } => {
            let inner = check(inner, static_context, bound)?;
            Ok(Rc::new(Expr::Castable {
                expr: atomized(inner),
                target: *target,
                allows_empty: *allows_empty,
            }))
        }
        _ => rewrite_children(expr, &mut |child| check(child, static_context, bound)),
    }
}

// wrap in an atomizer unless the static type is already atomic
fn atomized(expr: ExprRef) -> ExprRef {
    match expr.item_type() {
        ItemType::Atomic(_) => expr,
        _ => Rc::new(Expr::Atomizer(expr)),
    }
}

// arithmetic operands: atomize, and pull untyped values to the target
fn convert_operand(expr: ExprRef, target: Xs) -> ExprRef {
    let expr = atomized(expr);
    match expr.item_type() {
        ItemType::Atomic(Xs::UntypedAtomic) | ItemType::Atomic(Xs::AnyAtomicType) => {
            Rc::new(Expr::UntypedConverter { base: expr, target })
        }
        _ => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;

    #[test]
    fn test_unknown_variable_is_static_error() {
        let static_context = StaticContext::default();
        let expr = Rc::new(Expr::VarRef(Name::unprefixed("nowhere")));
        assert_eq!(
            type_check(&expr, &static_context),
            Err(error::Error::XPST0008)
        );
    }

    #[test]
    fn test_declared_variable_is_accepted() {
        let static_context = crate::context::StaticContextBuilder::new()
            .variable(
                Name::unprefixed("x"),
                xylem_xpath_type::SequenceType::any(),
            )
            .build();
        let expr = Rc::new(Expr::VarRef(Name::unprefixed("x")));
        assert!(type_check(&expr, &static_context).is_ok());
    }

    #[test]
    fn test_bound_variable_is_accepted() {
        let static_context = StaticContext::default();
        let expr = Rc::new(Expr::For {
            var: Name::unprefixed("x"),
            in_expr: Rc::new(Expr::Literal(Sequence::range(1, 3))),
            return_expr: Rc::new(Expr::VarRef(Name::unprefixed("x"))),
        });
        assert!(type_check(&expr, &static_context).is_ok());
    }

    #[test]
    fn test_path_over_atomic_rejected() {
        let static_context = StaticContext::default();
        let expr = Rc::new(Expr::Path {
            left: Rc::new(Expr::Literal(Sequence::range(1, 3))),
            right: Rc::new(Expr::ContextItem),
        });
        assert_eq!(
            type_check(&expr, &static_context),
            Err(error::Error::XPTY0019)
        );
    }

    #[test]
    fn test_atomizer_inserted_for_node_operands() {
        let static_context = StaticContext::default();
        let step = Rc::new(Expr::AxisStep {
            axis: xylem_ast::ast::Axis::Child,
            node_test: xylem_ast::ast::NodeTest::Name(xylem_xpath_type::NameTest::Wildcard),
        });
        let expr = Rc::new(Expr::ValueComp {
            op: xylem_ast::ast::CompOp::Eq,
            left: step,
            right: Rc::new(Expr::Literal(Sequence::from(crate::atomic::Atomic::from(
                1i64,
            )))),
        });
        let checked = type_check(&expr, &static_context).unwrap();
        match checked.as_ref() {
            Expr::ValueComp { left, right, .. } => {
                assert!(matches!(left.as_ref(), Expr::Atomizer(_)));
                // the literal side is already atomic
                assert!(matches!(right.as_ref(), Expr::Literal(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
