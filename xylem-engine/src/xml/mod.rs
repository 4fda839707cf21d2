//! The node side of the data model: document registration, document
//! order, axes and node tests.

mod axis;
mod document;
mod node_test;
mod order;

pub(crate) use axis::resolve_step;
pub use document::{Document, Documents, Uri};
pub(crate) use node_test::{matches_kind_test, node_name};
pub use order::{sort_into_document_order, Annotations, DocumentOrder, NodeOrderComparer};
