use std::rc::Rc;

use xylem_name::Name;

use crate::error;

use super::core::{rewrite_children, Expr, ExprRef};
use super::props::SpecialProperties;

const HOIST_NAMESPACE: &str = "http://xylem-xml.org/internal";

/// The fourth pass: hoist loop invariants.
///
/// Each `for` offers its body's sub-expressions the chance to move into
/// the enclosing scope; a sub-expression that depends neither on the
/// range variable nor on the focus is adopted, bound to a generated
/// variable, and evaluated once instead of once per iteration.
pub(crate) fn promote(expr: &ExprRef) -> error::Result<ExprRef> {
    let mut counter = 0;
    promote_walk(expr, &mut counter)
}

fn promote_walk(expr: &ExprRef, counter: &mut usize) -> error::Result<ExprRef> {
    let expr = rewrite_children(expr, &mut |child| promote_walk(child, counter))?;
    match expr.as_ref() {
        Expr::For {
            var,
            in_expr,
            return_expr,
        } => {
            let mut offer = PromotionOffer::new(var.clone(), counter);
            let new_return = offer.walk(return_expr)?;
            let mut result = Rc::new(Expr::For {
                var: var.clone(),
                in_expr: in_expr.clone(),
                return_expr: new_return,
            });
            // adopted expressions bind just outside the loop
            for (name, value) in offer.bindings.into_iter().rev() {
                result = Rc::new(Expr::Let {
                    var: name,
                    value,
                    return_expr: result,
                });
            }
            *counter = offer.counter;
            Ok(result)
        }
        _ => Ok(expr),
    }
}

/// The visitor a `for` passes down its body during promotion.
///
/// `accept` answers with a replacement variable reference when it adopts
/// a sub-expression.
struct PromotionOffer {
    // variables bound between the offering scope and the visit point
    blocked: Vec<Name>,
    bindings: Vec<(Name, ExprRef)>,
    counter: usize,
}

impl PromotionOffer {
    fn new(range_var: Name, counter: &usize) -> Self {
        PromotionOffer {
            blocked: vec![range_var],
            bindings: Vec::new(),
            counter: *counter,
        }
    }

    fn accept(&mut self, expr: &ExprRef) -> Option<ExprRef> {
        if !self.is_hoistable(expr) {
            return None;
        }
        let name = Name::uri_qualified(HOIST_NAMESPACE, &format!("hoist-{}", self.counter));
        self.counter += 1;
        self.bindings.push((name.clone(), expr.clone()));
        Some(Rc::new(Expr::VarRef(name)))
    }

    fn is_hoistable(&self, expr: &ExprRef) -> bool {
        // trivial expressions are cheaper in place than behind a binding
        if matches!(
            expr.as_ref(),
            Expr::Literal(_) | Expr::VarRef(_) | Expr::ContextItem
        ) {
            return false;
        }
        if expr.depends_on_focus() {
            return false;
        }
        if !expr
            .special_properties()
            .contains(SpecialProperties::NON_CREATIVE)
        {
            return false;
        }
        let free = expr.free_variables();
        self.blocked.iter().all(|blocked| !free.contains(blocked))
    }

    fn walk(&mut self, expr: &ExprRef) -> error::Result<ExprRef> {
        if let Some(replacement) = self.accept(expr) {
            return Ok(replacement);
        }
        // scoped variants block their variable for the inner walk
        match expr.as_ref() {
            Expr::For {
                var,
                in_expr,
                return_expr,
            } => {
                let in_expr = self.walk(in_expr)?;
                self.blocked.push(var.clone());
                let return_expr = self.walk(return_expr);
                self.blocked.pop();
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
                let value = self.walk(value)?;
                self.blocked.push(var.clone());
                let return_expr = self.walk(return_expr);
                self.blocked.pop();
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
                let in_expr = self.walk(in_expr)?;
                self.blocked.push(var.clone());
                let satisfies = self.walk(satisfies);
                self.blocked.pop();
                Ok(Rc::new(Expr::Quantified {
                    quantifier: *quantifier,
                    var: var.clone(),
                    in_expr,
                    satisfies: satisfies?,
                }))
            }
            _ => rewrite_children(&expr.clone(), &mut |child| self.walk(child)),
        }
    }
}
