use super::IntSet;

// golden-ratio multiplicative hashing
const HASH_FACTOR: u32 = 0x9e37_79b9;

// slots hold i32 values widened to i64 so the sentinels can never collide
// with a stored value
const EMPTY: i64 = i64::MAX;
const TOMBSTONE: i64 = i64::MAX - 1;

/// An open-addressed hash set of 32-bit integers.
///
/// Power-of-two table, linear probing, and a load factor kept at or below
/// 1/4 so probe chains stay short.
#[derive(Debug, Clone)]
pub struct IntHashSet {
    slots: Vec<i64>,
    len: usize,
    // live entries plus tombstones, for the load check
    used: usize,
}

impl IntHashSet {
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // table size at least 4x the expected population
        let size = (capacity.max(1) * 4).next_power_of_two();
        IntHashSet {
            slots: vec![EMPTY; size],
            len: 0,
            used: 0,
        }
    }

    fn index_of(&self, value: i32) -> usize {
        let shift = self.slots.len().trailing_zeros();
        let hash = (value as u32).wrapping_mul(HASH_FACTOR);
        (hash >> (32 - shift)) as usize
    }

    // the slot holding the value, or the first free slot of its probe
    // chain
    fn probe(&self, value: i32) -> (bool, usize) {
        let mask = self.slots.len() - 1;
        let mut index = self.index_of(value);
        let mut first_free = None;
        loop {
            match self.slots[index] {
                EMPTY => {
                    return (false, first_free.unwrap_or(index));
                }
                TOMBSTONE => {
                    first_free.get_or_insert(index);
                }
                stored if stored == value as i64 => {
                    return (true, index);
                }
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let values: Vec<i32> = self.iter().collect();
        let size = self.slots.len() * 2;
        self.slots = vec![EMPTY; size];
        self.len = 0;
        self.used = 0;
        for value in values {
            self.add(value);
        }
    }

    /// Union with any other set.
    pub fn union(&self, other: &dyn IntSet) -> IntHashSet {
        let mut result = self.clone();
        for value in other.iter() {
            result.add(value);
        }
        result
    }

    /// Intersection with any other set.
    pub fn intersect(&self, other: &dyn IntSet) -> IntHashSet {
        let mut result = IntHashSet::with_capacity(self.len().min(other.len()));
        for value in self.iter() {
            if other.contains(value) {
                result.add(value);
            }
        }
        result
    }

    /// Difference: members of `self` not in `other`.
    pub fn except(&self, other: &dyn IntSet) -> IntHashSet {
        let mut result = IntHashSet::with_capacity(self.len());
        for value in self.iter() {
            if !other.contains(value) {
                result.add(value);
            }
        }
        result
    }
}

impl Default for IntHashSet {
    fn default() -> Self {
        Self::new()
    }
}

impl IntSet for IntHashSet {
    fn add(&mut self, value: i32) -> bool {
        let (found, index) = self.probe(value);
        if found {
            return false;
        }
        if self.slots[index] == EMPTY {
            self.used += 1;
        }
        self.slots[index] = value as i64;
        self.len += 1;
        // keep the load factor at or below 0.25
        if self.used * 4 > self.slots.len() {
            self.grow();
        }
        true
    }

    fn remove(&mut self, value: i32) -> bool {
        let (found, index) = self.probe(value);
        if !found {
            return false;
        }
        self.slots[index] = TOMBSTONE;
        self.len -= 1;
        true
    }

    fn contains(&self, value: i32) -> bool {
        self.probe(value).0
    }

    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> Box<dyn Iterator<Item = i32> + '_> {
        Box::new(
            self.slots
                .iter()
                .filter(|slot| **slot != EMPTY && **slot != TOMBSTONE)
                .map(|slot| *slot as i32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains_remove() {
        let mut set = IntHashSet::new();
        assert!(set.add(42));
        assert!(!set.add(42));
        assert!(set.contains(42));
        assert_eq!(set.len(), 1);
        assert!(set.remove(42));
        assert!(!set.remove(42));
        assert!(!set.contains(42));
        assert!(set.is_empty());
    }

    #[test]
    fn test_negative_values_and_growth() {
        let mut set = IntHashSet::new();
        for value in -500..500 {
            assert!(set.add(value));
        }
        assert_eq!(set.len(), 1000);
        for value in -500..500 {
            assert!(set.contains(value), "missing {}", value);
        }
        assert!(!set.contains(500));
        // load factor stays at or below 1/4
        assert!(set.slots.len() >= set.len * 4);
    }

    #[test]
    fn test_reuse_after_remove() {
        let mut set = IntHashSet::new();
        for value in 0..100 {
            set.add(value);
        }
        for value in 0..100 {
            set.remove(value);
        }
        assert!(set.is_empty());
        for value in 0..100 {
            assert!(set.add(value));
        }
        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_set_operations() {
        let mut a = IntHashSet::new();
        let mut b = IntHashSet::new();
        for value in 0..10 {
            a.add(value);
        }
        for value in 5..15 {
            b.add(value);
        }
        let union = a.union(&b);
        assert_eq!(union.len(), 15);
        let intersection = a.intersect(&b);
        assert_eq!(intersection.len(), 5);
        assert!(intersection.contains(7));
        let except = a.except(&b);
        assert_eq!(except.len(), 5);
        assert!(except.contains(3));
        assert!(!except.contains(7));
        assert!(union.contains_all(&a));
        assert!(!a.contains_all(&b));
    }
}
