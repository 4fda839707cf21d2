//! String collation support.

mod collation;

pub use collation::{Collation, CollationKey, Collations, CODEPOINT_URI};
