//! The compiled expression tree: the tagged node type, the four compile
//! passes, and the evaluators.

mod compile;
mod core;
mod eval;
mod functions;
mod library;
mod optimize;
mod promote;
mod props;
mod simplify;
mod typecheck;

pub use self::core::{Expr, ExprRef, GroupVariant, SortKeyDef};
pub use compile::compile;
pub(crate) use compile::{lower_ast, run_passes};
pub use eval::{effective_boolean_value, evaluate, evaluate_item, iterate, sequence_matches};
pub use functions::BuiltinFunction;
pub use props::SpecialProperties;
