#![warn(missing_docs)]

//! Manage XML names, namespaces and the process-wide name pool in Xylem.

mod name;
mod namespaces;
mod pool;

pub use name::Name;
pub use namespaces::{NamespaceLookup, Namespaces, FN_NAMESPACE, XSLT_NAMESPACE, XS_NAMESPACE};
pub use pool::{NameCode, NamePool, FINGERPRINT_MASK};
