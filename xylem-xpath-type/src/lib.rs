//! Sequence types: an item type paired with an occurrence indicator, plus
//! the subsumption relations static type checking is built on.

mod types;

pub use types::{ItemType, KindTest, NameTest, NodeKind, Occurrence, SequenceType};
