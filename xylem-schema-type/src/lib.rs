//! The built-in XML Schema type hierarchy as used by XPath 2.0.
//!
//! String to value conversion lives with the value classes in the engine
//! crate; this crate only knows the shape of the hierarchy.

mod xs;

pub use xs::Xs;
