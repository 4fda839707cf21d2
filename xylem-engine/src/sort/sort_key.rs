use std::cmp::Ordering;

use xylem_ast::ast::{EmptyOrder, SortOrder};

use crate::atomic::{self, Atomic};
use crate::error;
use crate::sequence::Item;

use super::comparer::AtomicComparer;

/// The forced data type of a sort key: `data-type="text"` or
/// `data-type="number"` on `xsl:sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataTypeForce {
    #[default]
    Default,
    Text,
    Number,
}

impl DataTypeForce {
    /// Parse the `data-type` attribute; anything but "text" and "number"
    /// is the error the specification assigns.
    pub fn parse(value: &str) -> error::Result<Self> {
        match value {
            "text" => Ok(DataTypeForce::Text),
            "number" => Ok(DataTypeForce::Number),
            _ => Err(error::Error::XTDE0030),
        }
    }

    /// Coerce a computed key value according to the forced type.
    pub fn coerce(&self, value: Atomic) -> error::Result<Atomic> {
        match self {
            DataTypeForce::Default => {
                // untyped keys compare as strings
                Ok(atomic::coerce_untyped_value(value))
            }
            DataTypeForce::Text => Ok(Atomic::from(value.string_value())),
            DataTypeForce::Number => {
                // fn:number semantics: anything unparseable is NaN
                let double = match &value {
                    _ if value.is_numeric() => value.double_value()?,
                    Atomic::Untyped(s) | Atomic::String(_, s) => {
                        match atomic::parse_atomic(s, xylem_schema_type::Xs::Double) {
                            Ok(parsed) => parsed.double_value()?,
                            Err(_) => f64::NAN,
                        }
                    }
                    Atomic::Boolean(b) => {
                        if *b {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    _ => f64::NAN,
                };
                Ok(Atomic::from(double))
            }
        }
    }
}

/// One sort key definition, ready to compare precomputed key values.
///
/// Direction and empty placement are layered onto the base comparer as
/// wrappers, so a descending sort reverses the empty placement along with
/// everything else.
pub struct SortSpec {
    comparer: Box<dyn AtomicComparer>,
}

impl SortSpec {
    pub fn new(
        order: SortOrder,
        empty_order: EmptyOrder,
        base: Box<dyn AtomicComparer>,
    ) -> Self {
        let comparer: Box<dyn AtomicComparer> = Box::new(super::SortKeyComparer::new(base));
        let comparer: Box<dyn AtomicComparer> = match empty_order {
            EmptyOrder::Least => comparer,
            EmptyOrder::Greatest => Box::new(super::EmptyGreatestComparer::new(comparer)),
        };
        let comparer: Box<dyn AtomicComparer> = match order {
            SortOrder::Ascending => comparer,
            SortOrder::Descending => Box::new(super::DescendingComparer::new(comparer)),
        };
        SortSpec { comparer }
    }

    fn compare_keys(
        &self,
        a: Option<&Atomic>,
        b: Option<&Atomic>,
    ) -> error::Result<Ordering> {
        self.comparer.compare(a, b)
    }
}

/// One record of the sort buffer: the item, its key slots, and the
/// original position as the stability tiebreaker.
pub struct SortRecord {
    pub item: Item,
    pub keys: Vec<Option<Atomic>>,
    pub position: usize,
}

/// Sort records stably by their key slots.
///
/// A comparison failure inside the sort surfaces after the pass; the
/// order of the records is then unspecified but the error is not lost.
pub fn sort_records(records: &mut [SortRecord], specs: &[SortSpec]) -> error::Result<()> {
    let mut failure: Option<error::Error> = None;
    records.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        for (index, spec) in specs.iter().enumerate() {
            let ordering = match spec.compare_keys(
                a.keys.get(index).and_then(|k| k.as_ref()),
                b.keys.get(index).and_then(|k| k.as_ref()),
            ) {
                Ok(ordering) => ordering,
                Err(e) => {
                    failure = Some(e);
                    return Ordering::Equal;
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        // equal keys keep their input order
        a.position.cmp(&b.position)
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::comparer::{atomic_comparer, default_implicit_timezone};
    use crate::string::{Collation, CODEPOINT_URI};
    use std::rc::Rc;

    fn codepoint_spec(order: SortOrder, empty_order: EmptyOrder) -> SortSpec {
        let collation = Rc::new(Collation::resolve(CODEPOINT_URI).unwrap());
        SortSpec::new(
            order,
            empty_order,
            atomic_comparer(collation, None, default_implicit_timezone()),
        )
    }

    fn record(item: i64, key: Option<Atomic>, position: usize) -> SortRecord {
        SortRecord {
            item: Item::from(item),
            keys: vec![key],
            position,
        }
    }

    fn items(records: &[SortRecord]) -> Vec<Item> {
        records.iter().map(|r| r.item.clone()).collect()
    }

    #[test]
    fn test_ascending_sort() {
        let mut records = vec![
            record(3, Some(Atomic::from(3i64)), 0),
            record(1, Some(Atomic::from(1i64)), 1),
            record(2, Some(Atomic::from(2i64)), 2),
        ];
        let specs = vec![codepoint_spec(SortOrder::Ascending, EmptyOrder::Least)];
        sort_records(&mut records, &specs).unwrap();
        assert_eq!(
            items(&records),
            vec![Item::from(1i64), Item::from(2i64), Item::from(3i64)]
        );
    }

    #[test]
    fn test_stability_on_equal_keys() {
        let mut records = vec![
            record(10, Some(Atomic::from("same")), 0),
            record(20, Some(Atomic::from("same")), 1),
            record(30, Some(Atomic::from("same")), 2),
        ];
        let specs = vec![codepoint_spec(SortOrder::Ascending, EmptyOrder::Least)];
        sort_records(&mut records, &specs).unwrap();
        assert_eq!(
            items(&records),
            vec![Item::from(10i64), Item::from(20i64), Item::from(30i64)]
        );
    }

    #[test]
    fn test_empty_greatest() {
        let mut records = vec![
            record(3, Some(Atomic::from(3i64)), 0),
            record(-1, None, 1),
            record(1, Some(Atomic::from(1i64)), 2),
            record(-2, None, 3),
            record(2, Some(Atomic::from(2i64)), 4),
        ];
        let specs = vec![codepoint_spec(SortOrder::Ascending, EmptyOrder::Greatest)];
        sort_records(&mut records, &specs).unwrap();
        assert_eq!(
            items(&records),
            vec![
                Item::from(1i64),
                Item::from(2i64),
                Item::from(3i64),
                Item::from(-1i64),
                Item::from(-2i64),
            ]
        );
    }

    #[test]
    fn test_descending_reverses_empty_placement() {
        // empty is least, so descending order puts it last
        let mut records = vec![
            record(1, Some(Atomic::from(1i64)), 0),
            record(-1, None, 1),
            record(2, Some(Atomic::from(2i64)), 2),
        ];
        let specs = vec![codepoint_spec(SortOrder::Descending, EmptyOrder::Least)];
        sort_records(&mut records, &specs).unwrap();
        assert_eq!(
            items(&records),
            vec![Item::from(2i64), Item::from(1i64), Item::from(-1i64)]
        );
    }

    #[test]
    fn test_nan_sorts_least_and_equal() {
        let mut records = vec![
            record(1, Some(Atomic::from(1.0f64)), 0),
            record(-1, Some(Atomic::from(f64::NAN)), 1),
            record(-2, Some(Atomic::from(f64::NAN)), 2),
            record(0, Some(Atomic::from(0.0f64)), 3),
        ];
        let specs = vec![codepoint_spec(SortOrder::Ascending, EmptyOrder::Least)];
        sort_records(&mut records, &specs).unwrap();
        // the two NaN records are equal, so their input order is kept
        assert_eq!(
            items(&records),
            vec![
                Item::from(-1i64),
                Item::from(-2i64),
                Item::from(0i64),
                Item::from(1i64),
            ]
        );
    }

    #[test]
    fn test_data_type_force() {
        assert_eq!(DataTypeForce::parse("text").unwrap(), DataTypeForce::Text);
        assert_eq!(
            DataTypeForce::parse("number").unwrap(),
            DataTypeForce::Number
        );
        assert_eq!(
            DataTypeForce::parse("other"),
            Err(error::Error::XTDE0030)
        );
        assert_eq!(
            DataTypeForce::Text.coerce(Atomic::from(10i64)).unwrap(),
            Atomic::from("10")
        );
        let number = DataTypeForce::Number.coerce(Atomic::from("abc")).unwrap();
        assert!(number.is_nan());
        assert_eq!(
            DataTypeForce::Number.coerce(Atomic::from("1.5")).unwrap(),
            Atomic::from(1.5f64)
        );
    }

    #[test]
    fn test_multi_key_sort() {
        let make = |item: i64, first: &str, second: i64, position: usize| SortRecord {
            item: Item::from(item),
            keys: vec![
                Some(Atomic::from(first)),
                Some(Atomic::from(second)),
            ],
            position,
        };
        let mut records = vec![
            make(1, "b", 2, 0),
            make(2, "a", 2, 1),
            make(3, "a", 1, 2),
        ];
        let specs = vec![
            codepoint_spec(SortOrder::Ascending, EmptyOrder::Least),
            codepoint_spec(SortOrder::Ascending, EmptyOrder::Least),
        ];
        sort_records(&mut records, &specs).unwrap();
        assert_eq!(
            items(&records),
            vec![Item::from(3i64), Item::from(2i64), Item::from(1i64)]
        );
    }
}
