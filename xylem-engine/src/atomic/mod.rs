/// Atomic values.
///
/// XPath defines a host of atomic values, and rules for how to do
/// arithmetic on them, compare them, and cast them to other value types.
mod atomic_core;
mod cast;
mod compare;
mod datetime;
mod op_arith;
mod types;

pub use atomic_core::Atomic;
pub use cast::{cast_atomic, castable, parse_atomic};
pub(crate) use compare::{
    atomic_cmp, atomic_equals, cast_binary, coerce_untyped_pair, coerce_untyped_value,
    general_compare_pair, value_compare,
};
pub use datetime::{
    Duration, GDay, GMonth, GMonthDay, GYear, GYearMonth, NaiveDateTimeWithOffset,
    NaiveDateWithOffset, NaiveTimeWithOffset, YearMonthDuration,
};
pub(crate) use datetime::{offset_from_duration, OrdWithDefaultOffset};
pub(crate) use op_arith::{arithmetic, negate};
pub use types::{BinaryType, IntegerType, StringType};
