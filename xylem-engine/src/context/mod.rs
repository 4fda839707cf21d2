//! Static (compile-time) and dynamic (evaluation-time) contexts.

mod dynamic_context;
mod dynamic_context_builder;
mod static_context;
mod static_context_builder;

pub use dynamic_context::{DynamicContext, Focus, GroupContext, UriResolver, Variables};
pub use dynamic_context_builder::DynamicContextBuilder;
pub use static_context::StaticContext;
pub use static_context_builder::StaticContextBuilder;
