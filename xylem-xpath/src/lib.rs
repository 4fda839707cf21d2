//! The compile/load/evaluate façade over the Xylem engine.
//!
//! A [`Compiler`] turns source text into an immutable [`Executable`];
//! loading an executable yields a [`Selector`] that carries the dynamic
//! state of one evaluation: context item, external variables, resolvers
//! and listeners.

mod compiler;
mod selector;

pub use compiler::{Compiler, Executable};
pub use selector::Selector;

pub use xylem_engine::{
    Atomic, Destination, Documents, Error, ErrorListener, Item, LocatedError, Location,
    Sequence, SequenceCollector, SequenceIter, StaticContextBuilder, TraceListener,
    TreeBuilder, Uri,
};
pub use xylem_name::Name;
pub use xylem_schema_type::Xs;
pub use xylem_xpath_type::{ItemType, Occurrence, SequenceType};
