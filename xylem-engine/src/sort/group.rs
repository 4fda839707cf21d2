use std::rc::Rc;

use ahash::{HashMap, HashMapExt};

use crate::atomic::Atomic;
use crate::error;
use crate::sequence::{Item, Sequence};

use super::comparer::{AtomicComparer, ComparisonKey};

/// One group: its grouping key (empty for the pattern variants) and its
/// members in population order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: Sequence,
    pub members: Rc<Vec<Item>>,
}

/// Iterates groups in order of first appearance; within a group, members
/// keep population order.
///
/// Each `next` hands out the finished group; the leading item of a group
/// is `members[0]`.
pub struct GroupIterator {
    groups: std::vec::IntoIter<Group>,
}

impl GroupIterator {
    fn new(groups: Vec<Group>) -> Self {
        GroupIterator {
            groups: groups.into_iter(),
        }
    }
}

impl Iterator for GroupIterator {
    type Item = Group;

    fn next(&mut self) -> Option<Group> {
        self.groups.next()
    }
}

/// `group-by`: an item with several key values joins several groups;
/// groups are ordered by the first appearance of their key.
///
/// Keys are matched through the comparer's comparison keys, so untyped
/// keys group with the strings they equal and `1` groups with `1.0`.
pub fn group_by(
    population: Vec<(Item, Vec<Atomic>)>,
    comparer: &dyn AtomicComparer,
) -> error::Result<GroupIterator> {
    let mut groups: Vec<(Atomic, Vec<Item>)> = Vec::new();
    let mut index_by_key: HashMap<ComparisonKey, usize> = HashMap::new();
    for (item, keys) in population {
        for key in keys {
            let comparison_key = comparer
                .comparison_key(&key)
                .map_err(|_| error::Error::XPTY0004)?;
            match index_by_key.get(&comparison_key) {
                Some(index) => {
                    let members = &mut groups[*index].1;
                    // an item that generated the same key twice still
                    // appears once in the group
                    if members.last() != Some(&item) {
                        members.push(item.clone());
                    }
                }
                None => {
                    index_by_key.insert(comparison_key, groups.len());
                    groups.push((key, vec![item.clone()]));
                }
            }
        }
    }
    Ok(GroupIterator::new(
        groups
            .into_iter()
            .map(|(key, members)| Group {
                key: Sequence::from(Item::Atomic(key)),
                members: Rc::new(members),
            })
            .collect(),
    ))
}

/// `group-adjacent`: an item joins the running group exactly when its key
/// equals the running key; any key change starts a new group.
pub fn group_adjacent(
    population: Vec<(Item, Atomic)>,
    comparer: &dyn AtomicComparer,
) -> error::Result<GroupIterator> {
    let mut groups: Vec<Group> = Vec::new();
    let mut running: Option<(Atomic, Vec<Item>)> = None;
    for (item, key) in population {
        running = match running.take() {
            None => Some((key, vec![item])),
            Some((running_key, mut members)) => {
                let same = comparer
                    .equals(Some(&running_key), Some(&key))
                    .map_err(|_| error::Error::XPTY0004)?;
                if same {
                    members.push(item);
                    Some((running_key, members))
                } else {
                    groups.push(Group {
                        key: Sequence::from(Item::Atomic(running_key)),
                        members: Rc::new(members),
                    });
                    Some((key, vec![item]))
                }
            }
        };
    }
    if let Some((running_key, members)) = running {
        groups.push(Group {
            key: Sequence::from(Item::Atomic(running_key)),
            members: Rc::new(members),
        });
    }
    Ok(GroupIterator::new(groups))
}

/// `group-starting-with`: a new group opens at every item matching the
/// pattern, and always at the first item.
pub fn group_starting_with(population: Vec<(Item, bool)>) -> GroupIterator {
    let mut groups: Vec<Group> = Vec::new();
    let mut members: Vec<Item> = Vec::new();
    for (item, matches) in population {
        if matches && !members.is_empty() {
            groups.push(Group {
                key: Sequence::Empty,
                members: Rc::new(std::mem::take(&mut members)),
            });
        }
        members.push(item);
    }
    if !members.is_empty() {
        groups.push(Group {
            key: Sequence::Empty,
            members: Rc::new(members),
        });
    }
    GroupIterator::new(groups)
}

/// `group-ending-with`: the running group closes after every item
/// matching the pattern.
pub fn group_ending_with(population: Vec<(Item, bool)>) -> GroupIterator {
    let mut groups: Vec<Group> = Vec::new();
    let mut members: Vec<Item> = Vec::new();
    for (item, matches) in population {
        members.push(item);
        if matches {
            groups.push(Group {
                key: Sequence::Empty,
                members: Rc::new(std::mem::take(&mut members)),
            });
        }
    }
    if !members.is_empty() {
        groups.push(Group {
            key: Sequence::Empty,
            members: Rc::new(members),
        });
    }
    GroupIterator::new(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::comparer::{
        atomic_comparer, default_implicit_timezone, GenericAtomicComparer,
    };
    use crate::string::{Collation, CODEPOINT_URI};

    fn comparer() -> GenericAtomicComparer {
        let collation = Rc::new(Collation::resolve(CODEPOINT_URI).unwrap());
        GenericAtomicComparer::new(collation, default_implicit_timezone())
    }

    fn member_values(group: &Group) -> Vec<i64> {
        group
            .members
            .iter()
            .map(|item| item.to_atomic().unwrap().long_value().unwrap())
            .collect()
    }

    #[test]
    fn test_group_by_multi_key() {
        // keys: $x mod 2, $x mod 3 over (1, 2, 3, 4)
        let population = (1i64..=4)
            .map(|x| {
                (
                    Item::from(x),
                    vec![Atomic::from(x % 2), Atomic::from(x % 3)],
                )
            })
            .collect();
        let groups: Vec<Group> = group_by(population, &comparer()).unwrap().collect();
        // item keys are (1,1), (0,2), (1,0), (0,1), so the groups appear
        // in the order 1, 0, 2
        let keys: Vec<i64> = groups
            .iter()
            .map(|g| {
                g.key
                    .clone()
                    .one()
                    .unwrap()
                    .to_atomic()
                    .unwrap()
                    .long_value()
                    .unwrap()
            })
            .collect();
        assert_eq!(keys, vec![1, 0, 2]);
        assert_eq!(member_values(&groups[0]), vec![1, 3, 4]);
        assert_eq!(member_values(&groups[1]), vec![2, 3, 4]);
        assert_eq!(member_values(&groups[2]), vec![2]);
    }

    #[test]
    fn test_group_by_item_not_duplicated_for_repeated_key() {
        let population = vec![(
            Item::from(1i64),
            vec![Atomic::from(7i64), Atomic::from(7i64)],
        )];
        let groups: Vec<Group> = group_by(population, &comparer()).unwrap().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(member_values(&groups[0]), vec![1]);
    }

    #[test]
    fn test_group_by_numeric_promotion() {
        let population = vec![
            (Item::from(1i64), vec![Atomic::from(1i64)]),
            (Item::from(2i64), vec![Atomic::from(1.0f64)]),
        ];
        let groups: Vec<Group> = group_by(population, &comparer()).unwrap().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(member_values(&groups[0]), vec![1, 2]);
    }

    #[test]
    fn test_group_by_membership_union() {
        // every item appears once per distinct key it generates
        let population: Vec<(Item, Vec<Atomic>)> = (1i64..=4)
            .map(|x| {
                (
                    Item::from(x),
                    vec![Atomic::from(x % 2), Atomic::from(x % 3)],
                )
            })
            .collect();
        let expected: usize = population
            .iter()
            .map(|(_, keys)| {
                let mut distinct = keys.clone();
                distinct.dedup_by(|a, b| a == b);
                distinct.len()
            })
            .sum();
        let groups: Vec<Group> = group_by(population, &comparer()).unwrap().collect();
        let total: usize = groups.iter().map(|g| g.members.len()).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn test_group_adjacent() {
        let population = vec![
            (Item::from(1i64), Atomic::from("a")),
            (Item::from(2i64), Atomic::from("a")),
            (Item::from(3i64), Atomic::from("b")),
            (Item::from(4i64), Atomic::from("a")),
        ];
        let groups: Vec<Group> = group_adjacent(population, &comparer()).unwrap().collect();
        assert_eq!(groups.len(), 3);
        assert_eq!(member_values(&groups[0]), vec![1, 2]);
        assert_eq!(member_values(&groups[1]), vec![3]);
        assert_eq!(member_values(&groups[2]), vec![4]);
    }

    #[test]
    fn test_group_starting_with() {
        // pattern matches items 1 and 3
        let population = vec![
            (Item::from(0i64), false),
            (Item::from(1i64), true),
            (Item::from(2i64), false),
            (Item::from(3i64), true),
        ];
        let groups: Vec<Group> = group_starting_with(population).collect();
        assert_eq!(groups.len(), 3);
        assert_eq!(member_values(&groups[0]), vec![0]);
        assert_eq!(member_values(&groups[1]), vec![1, 2]);
        assert_eq!(member_values(&groups[2]), vec![3]);
    }

    #[test]
    fn test_group_ending_with() {
        let population = vec![
            (Item::from(0i64), false),
            (Item::from(1i64), true),
            (Item::from(2i64), false),
            (Item::from(3i64), false),
        ];
        let groups: Vec<Group> = group_ending_with(population).collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(member_values(&groups[0]), vec![0, 1]);
        assert_eq!(member_values(&groups[1]), vec![2, 3]);
    }

    #[test]
    fn test_group_by_with_untyped_keys() {
        let untyped = |s: &str| Atomic::Untyped(Rc::from(s));
        let population = vec![
            (Item::from(1i64), vec![untyped("x")]),
            (Item::from(2i64), vec![Atomic::from("x")]),
        ];
        let groups: Vec<Group> = group_by(population, &comparer()).unwrap().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(member_values(&groups[0]), vec![1, 2]);
    }

    #[test]
    fn test_used_comparer_factory() {
        // the factory path works for grouping too
        let collation = Rc::new(Collation::resolve(CODEPOINT_URI).unwrap());
        let comparer = atomic_comparer(collation, None, default_implicit_timezone());
        let population = vec![(Item::from(1i64), vec![Atomic::from(1i64)])];
        let groups: Vec<Group> = group_by(population, comparer.as_ref()).unwrap().collect();
        assert_eq!(groups.len(), 1);
    }
}
