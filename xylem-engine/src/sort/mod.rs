//! Comparers, sort keys, and grouping.
//!
//! The layering follows the comparison machinery of the runtime: string
//! collations at the bottom, atomic comparers above them, and the sort and
//! group drivers on top.

mod comparer;
mod group;
mod sort_key;

pub use comparer::{
    atomic_comparer, default_implicit_timezone, AtomicComparer, CalendarComparer, CalendarKind,
    ComparisonKey, DecimalComparer, DescendingComparer, DoubleComparer, EmptyGreatestComparer,
    GenericAtomicComparer, SortKeyComparer,
};
pub use group::{
    group_adjacent, group_by, group_ending_with, group_starting_with, Group, GroupIterator,
};
pub use sort_key::{sort_records, DataTypeForce, SortRecord, SortSpec};
