use xylem_xpath_type::ItemType;

use crate::error;

use super::core::{rewrite_children, Expr, ExprRef};
use super::props::SpecialProperties;

/// The third pass: rewrite for efficiency.
///
/// The main rewrites elide document-order sorting around operands that
/// are statically known to be ordered already, and drop the wrapper
/// entirely when the operand cannot produce nodes.
pub(crate) fn optimize(expr: &ExprRef) -> error::Result<ExprRef> {
    let expr = rewrite_children(expr, &mut |child| optimize(child))?;
    let optimized = match expr.as_ref() {
        Expr::DocumentOrder(base) => {
            if base
                .special_properties()
                .contains(SpecialProperties::ORDERED_NODESET)
            {
                // sorting an ordered operand is the identity
                base.clone()
            } else if matches!(base.item_type(), ItemType::Atomic(_)) {
                // an atomic-only path result keeps its evaluation order
                base.clone()
            } else {
                expr.clone()
            }
        }
        _ => expr.clone(),
    };
    Ok(optimized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use xylem_ast::ast::{Axis, NodeTest};
    use xylem_xpath_type::NameTest;

    fn child_step() -> ExprRef {
        Rc::new(Expr::AxisStep {
            axis: Axis::Child,
            node_test: NodeTest::Name(NameTest::Wildcard),
        })
    }

    #[test]
    fn test_document_order_elided_for_ordered_operand() {
        // child::* is delivered in document order already
        let expr = Rc::new(Expr::DocumentOrder(child_step()));
        let optimized = optimize(&expr).unwrap();
        assert!(matches!(optimized.as_ref(), Expr::AxisStep { .. }));
    }

    #[test]
    fn test_document_order_kept_for_reverse_axis() {
        let step = Rc::new(Expr::AxisStep {
            axis: Axis::Ancestor,
            node_test: NodeTest::Name(NameTest::Wildcard),
        });
        let expr = Rc::new(Expr::DocumentOrder(step));
        let optimized = optimize(&expr).unwrap();
        assert!(matches!(optimized.as_ref(), Expr::DocumentOrder(_)));
    }

    #[test]
    fn test_nested_document_order_collapses() {
        let inner = Rc::new(Expr::DocumentOrder(Rc::new(Expr::Path {
            left: child_step(),
            right: Rc::new(Expr::AxisStep {
                axis: Axis::Ancestor,
                node_test: NodeTest::Name(NameTest::Wildcard),
            }),
        })));
        let outer = Rc::new(Expr::DocumentOrder(inner));
        let optimized = optimize(&outer).unwrap();
        // the inner wrapper satisfies the outer one
        match optimized.as_ref() {
            Expr::DocumentOrder(base) => {
                assert!(matches!(base.as_ref(), Expr::Path { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
