use std::rc::Rc;

use crate::atomic::{self, Atomic};
use crate::error;
use crate::sequence::{Item, Sequence};

use super::core::{rewrite_children, Expr, ExprRef};

/// The first pass: strip trivial wrappers and fold constants whose
/// evaluation has no runtime dependency.
pub(crate) fn simplify(expr: &ExprRef) -> error::Result<ExprRef> {
    let expr = rewrite_children(expr, &mut |child| simplify(child))?;
    let simplified = match expr.as_ref() {
        // a one-element concatenation is its element
        Expr::Append(items) if items.len() == 1 => items[0].clone(),
        Expr::Append(items) if items.iter().all(|item| literal_value(item).is_some()) => {
            let mut combined = Vec::new();
            for item in items {
                combined.extend(literal_value(item).unwrap().iter());
            }
            Rc::new(Expr::Literal(Sequence::from_items(combined)))
        }
        // predicates gone means the filter is gone
        Expr::Filter { base, predicates } if predicates.is_empty() => base.clone(),
        Expr::Negate(inner) => match inner.as_ref() {
            // --x is x
            Expr::Negate(x) => x.clone(),
            Expr::Literal(_) => match constant_atomic(inner) {
                Some(value) if value.is_numeric() => match atomic::negate(value) {
                    Ok(negated) => Rc::new(Expr::Literal(Sequence::from(negated))),
                    Err(_) => expr.clone(),
                },
                _ => expr.clone(),
            },
            _ => expr.clone(),
        },
        Expr::Arith { op, left, right } => {
            // numeric literals fold; errors stay dynamic
            match (constant_atomic(left), constant_atomic(right)) {
                (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                    match atomic::arithmetic(*op, a, b) {
                        Ok(folded) => Rc::new(Expr::Literal(Sequence::from(folded))),
                        Err(_) => expr.clone(),
                    }
                }
                _ => expr.clone(),
            }
        }
        Expr::Range { start, end } => {
            match (constant_integer(start), constant_integer(end)) {
                (Some(start), Some(end)) => {
                    Rc::new(Expr::Literal(Sequence::range(start, end)))
                }
                _ => expr.clone(),
            }
        }
        Expr::If {
            condition,
            then_branch,
            else_branch,
        } => match literal_value(condition) {
            Some(value) => match value.effective_boolean_value() {
                Ok(true) => then_branch.clone(),
                Ok(false) => else_branch.clone(),
                Err(_) => expr.clone(),
            },
            None => expr.clone(),
        },
        Expr::Cast {
            expr: inner,
            target,
            allows_empty,
        } => {
            // an identity cast of a known singleton disappears
            if inner.item_type() == xylem_xpath_type::ItemType::Atomic(*target)
                && inner.cardinality() == xylem_xpath_type::Occurrence::One
            {
                inner.clone()
            } else if let Some(value) = constant_atomic(inner) {
                match atomic::cast_atomic(&value, *target) {
                    Ok(cast) => Rc::new(Expr::Literal(Sequence::from(cast))),
                    // a failing constant cast keeps its dynamic error
                    Err(_) => expr.clone(),
                }
            } else if *allows_empty && matches!(inner.as_ref(), Expr::Literal(s) if s.is_empty())
            {
                Rc::new(Expr::Literal(Sequence::Empty))
            } else {
                expr.clone()
            }
        }
        _ => expr.clone(),
    };
    Ok(simplified)
}

fn literal_value(expr: &ExprRef) -> Option<&Sequence> {
    match expr.as_ref() {
        Expr::Literal(sequence) => Some(sequence),
        _ => None,
    }
}

fn constant_atomic(expr: &ExprRef) -> Option<Atomic> {
    match literal_value(expr) {
        Some(Sequence::One(Item::Atomic(atomic))) => Some(atomic.clone()),
        _ => None,
    }
}

fn constant_integer(expr: &ExprRef) -> Option<i64> {
    constant_atomic(expr).and_then(|value| value.long_value().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Item;

    fn literal(value: i64) -> ExprRef {
        Rc::new(Expr::Literal(Sequence::from(Atomic::from(value))))
    }

    #[test]
    fn test_fold_arithmetic() {
        let expr = Rc::new(Expr::Arith {
            op: xylem_ast::ast::ArithOp::Add,
            left: literal(2),
            right: literal(3),
        });
        let simplified = simplify(&expr).unwrap();
        assert!(
            matches!(simplified.as_ref(), Expr::Literal(s) if s.clone().one().unwrap() == Item::from(5i64))
        );
    }

    #[test]
    fn test_failing_fold_stays_dynamic() {
        // 1 div 0 must raise at evaluation time, not at compile time
        let expr = Rc::new(Expr::Arith {
            op: xylem_ast::ast::ArithOp::Div,
            left: literal(1),
            right: literal(0),
        });
        let simplified = simplify(&expr).unwrap();
        assert!(matches!(simplified.as_ref(), Expr::Arith { .. }));
    }

    #[test]
    fn test_constant_condition_selects_branch() {
        let expr = Rc::new(Expr::If {
            condition: literal(1),
            then_branch: literal(10),
            else_branch: literal(20),
        });
        let simplified = simplify(&expr).unwrap();
        assert!(
            matches!(simplified.as_ref(), Expr::Literal(s) if s.clone().one().unwrap() == Item::from(10i64))
        );
    }

    #[test]
    fn test_empty_filter_unwrapped() {
        let expr = Rc::new(Expr::Filter {
            base: literal(1),
            predicates: vec![],
        });
        let simplified = simplify(&expr).unwrap();
        assert!(matches!(simplified.as_ref(), Expr::Literal(_)));
    }

    #[test]
    fn test_double_negation() {
        let expr = Rc::new(Expr::Negate(Rc::new(Expr::Negate(Rc::new(
            Expr::ContextItem,
        )))));
        let simplified = simplify(&expr).unwrap();
        assert!(matches!(simplified.as_ref(), Expr::ContextItem));
    }

    #[test]
    fn test_range_folds() {
        let expr = Rc::new(Expr::Range {
            start: literal(1),
            end: literal(3),
        });
        let simplified = simplify(&expr).unwrap();
        assert!(matches!(simplified.as_ref(), Expr::Literal(s) if s.len() == 3));
    }
}
