// the open-addressed layout of IntHashSet, refitted to an int -> int map

const HASH_FACTOR: u32 = 0x9e37_79b9;

const EMPTY: i64 = i64::MAX;
const TOMBSTONE: i64 = i64::MAX - 1;

/// An open-addressed `i32 -> i32` hash map with a configurable
/// default value for absent keys.
#[derive(Debug, Clone)]
pub struct IntToIntMap {
    keys: Vec<i64>,
    values: Vec<i32>,
    len: usize,
    used: usize,
    default_value: i32,
}

impl IntToIntMap {
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let size = (capacity.max(1) * 4).next_power_of_two();
        IntToIntMap {
            keys: vec![EMPTY; size],
            values: vec![0; size],
            len: 0,
            used: 0,
            default_value: 0,
        }
    }

    /// Set the value reported for absent keys.
    pub fn set_default_value(&mut self, value: i32) {
        self.default_value = value;
    }

    pub fn default_value(&self) -> i32 {
        self.default_value
    }

    fn probe(&self, key: i32) -> (bool, usize) {
        let shift = self.keys.len().trailing_zeros();
        let mask = self.keys.len() - 1;
        let mut index = ((key as u32).wrapping_mul(HASH_FACTOR) >> (32 - shift)) as usize;
        let mut first_free = None;
        loop {
            match self.keys[index] {
                EMPTY => return (false, first_free.unwrap_or(index)),
                TOMBSTONE => {
                    first_free.get_or_insert(index);
                }
                stored if stored == key as i64 => return (true, index),
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let entries: Vec<(i32, i32)> = self.iter().collect();
        let size = self.keys.len() * 2;
        self.keys = vec![EMPTY; size];
        self.values = vec![0; size];
        self.len = 0;
        self.used = 0;
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    /// Insert or replace; answers the previous value when replacing.
    pub fn put(&mut self, key: i32, value: i32) -> Option<i32> {
        let (found, index) = self.probe(key);
        if found {
            let previous = self.values[index];
            self.values[index] = value;
            return Some(previous);
        }
        if self.keys[index] == EMPTY {
            self.used += 1;
        }
        self.keys[index] = key as i64;
        self.values[index] = value;
        self.len += 1;
        if self.used * 4 > self.keys.len() {
            self.grow();
        }
        None
    }

    /// The value for a key, or the default value when absent.
    pub fn get(&self, key: i32) -> i32 {
        let (found, index) = self.probe(key);
        if found {
            self.values[index]
        } else {
            self.default_value
        }
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.probe(key).0
    }

    pub fn remove(&mut self, key: i32) -> bool {
        let (found, index) = self.probe(key);
        if !found {
            return false;
        }
        self.keys[index] = TOMBSTONE;
        self.len -= 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter(|(key, _)| **key != EMPTY && **key != TOMBSTONE)
            .map(|(key, value)| (*key as i32, *value))
    }
}

impl Default for IntToIntMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let mut map = IntToIntMap::new();
        assert_eq!(map.put(1, 10), None);
        assert_eq!(map.put(1, 11), Some(10));
        assert_eq!(map.get(1), 11);
        assert!(map.contains_key(1));
        assert!(map.remove(1));
        assert!(!map.remove(1));
        assert!(map.is_empty());
    }

    #[test]
    fn test_default_value_sentinel() {
        let mut map = IntToIntMap::new();
        assert_eq!(map.get(99), 0);
        map.set_default_value(-1);
        assert_eq!(map.get(99), -1);
        map.put(99, 7);
        assert_eq!(map.get(99), 7);
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut map = IntToIntMap::new();
        for key in -200..200 {
            map.put(key, key * 2);
        }
        assert_eq!(map.len(), 400);
        for key in -200..200 {
            assert_eq!(map.get(key), key * 2);
        }
    }
}
