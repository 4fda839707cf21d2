//! The Xylem runtime core: the expression tree with its compile passes,
//! the pull-based evaluation engine, the XDM value and node model, and
//! the sort/group/compare machinery shared by XPath, XQuery `order by`
//! and XSLT.

pub mod atomic;
pub mod collections;
pub mod context;
pub mod destination;
pub mod error;
pub mod expr;
pub mod sequence;
pub mod sort;
pub mod string;
pub mod xml;
pub mod xslt;

pub use crate::atomic::Atomic;
pub use crate::atomic::{
    Duration, GDay, GMonth, GMonthDay, GYear, GYearMonth, NaiveDateTimeWithOffset,
    NaiveDateWithOffset, NaiveTimeWithOffset, YearMonthDuration,
};
pub use crate::context::{DynamicContext, DynamicContextBuilder, StaticContext, StaticContextBuilder, Variables};
pub use crate::destination::{Destination, SequenceCollector, TreeBuilder};
pub use crate::error::{Error, ErrorListener, LocatedError, Location, Result, TraceListener};
pub use crate::expr::{compile, Expr, ExprRef};
pub use crate::sequence::{Item, Sequence, SequenceIter};
pub use crate::string::Collation;
pub use crate::xml::{Document, Documents, Uri};
