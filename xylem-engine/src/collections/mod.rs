//! Supporting containers: integer sets and maps tuned for name-pool
//! fingerprints, and a small LRU cache.
//!
//! None of these are thread-safe; callers that share them synchronize.

mod int_array_set;
mod int_hash_set;
mod int_to_int_map;
mod lru_cache;

pub use int_array_set::IntArraySet;
pub use int_hash_set::IntHashSet;
pub use int_to_int_map::IntToIntMap;
pub use lru_cache::LruCache;

/// A set of signed 32-bit integers.
pub trait IntSet {
    fn add(&mut self, value: i32) -> bool;
    fn remove(&mut self, value: i32) -> bool;
    fn contains(&self, value: i32) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The members, in implementation order.
    fn iter(&self) -> Box<dyn Iterator<Item = i32> + '_>;

    /// Whether every member of `other` is a member of `self`.
    fn contains_all(&self, other: &dyn IntSet) -> bool {
        other.iter().all(|value| self.contains(value))
    }
}
