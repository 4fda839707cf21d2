use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{OnceLock, RwLock};

use ahash::{HashMap, HashMapExt};

/// The low 20 bits of a [`NameCode`] are the fingerprint; the bits above
/// identify the prefix used at allocation time.
pub const FINGERPRINT_MASK: i32 = 0xfffff;

const PREFIX_SHIFT: u32 = 20;

/// An interned name: prefix index in the high bits, fingerprint in the low
/// 20 bits.
///
/// Two codes with the same fingerprint denote the same expanded name even
/// when they were allocated through different prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameCode(i32);

impl NameCode {
    /// The fingerprint, identifying the `(namespace, local)` pair.
    #[inline]
    pub fn fingerprint(&self) -> i32 {
        self.0 & FINGERPRINT_MASK
    }

    /// The raw code value.
    #[inline]
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Whether two codes name the same expanded name.
    #[inline]
    pub fn same_name(&self, other: &NameCode) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

#[derive(Debug)]
struct PoolEntry {
    namespace: String,
    local: String,
}

#[derive(Debug, Default)]
struct PoolState {
    // (namespace, local) -> fingerprint, which indexes entries
    fingerprints: HashMap<(String, String), i32>,
    entries: Vec<PoolEntry>,
    // prefix -> prefix index, which indexes prefixes
    prefix_indexes: HashMap<String, i32>,
    prefixes: Vec<String>,
}

impl PoolState {
    fn new() -> Self {
        let mut state = PoolState {
            fingerprints: HashMap::new(),
            entries: Vec::new(),
            prefix_indexes: HashMap::new(),
            prefixes: Vec::new(),
        };
        // prefix index 0 is the empty prefix
        state.prefix_indexes.insert(String::new(), 0);
        state.prefixes.push(String::new());
        state
    }
}

/// The process-wide name pool.
///
/// Interns `(prefix, namespace, local)` triples. The `(namespace, local)`
/// pair maps to a fingerprint; fingerprint equality is expanded-name
/// equality. Writes happen during tree construction and compilation and are
/// serialized by the pool; reads are concurrent.
///
/// Entries live until [`NamePool::reset`], which is only sound once no
/// compiled expression or document built against the pool is still in use.
#[derive(Debug)]
pub struct NamePool {
    state: RwLock<PoolState>,
    allocations: AtomicUsize,
}

static GLOBAL_POOL: OnceLock<NamePool> = OnceLock::new();

impl NamePool {
    /// A fresh, empty pool. Most callers want [`NamePool::global`].
    pub fn new() -> Self {
        NamePool {
            state: RwLock::new(PoolState::new()),
            allocations: AtomicUsize::new(0),
        }
    }

    /// The shared process-wide pool.
    pub fn global() -> &'static NamePool {
        GLOBAL_POOL.get_or_init(NamePool::new)
    }

    /// Intern a name, returning its code.
    ///
    /// Allocating the same `(namespace, local)` under different prefixes
    /// yields different codes with the same fingerprint.
    pub fn allocate(&self, prefix: &str, namespace: &str, local: &str) -> NameCode {
        // fast path: everything already known
        if let Some(code) = self.lookup(prefix, namespace, local) {
            return code;
        }
        let mut state = self.state.write().unwrap();
        let fingerprint = match state
            .fingerprints
            .get(&(namespace.to_string(), local.to_string()))
        {
            Some(fingerprint) => *fingerprint,
            None => {
                let fingerprint = state.entries.len() as i32;
                assert!(
                    fingerprint <= FINGERPRINT_MASK,
                    "name pool fingerprint space exhausted"
                );
                state.entries.push(PoolEntry {
                    namespace: namespace.to_string(),
                    local: local.to_string(),
                });
                state
                    .fingerprints
                    .insert((namespace.to_string(), local.to_string()), fingerprint);
                fingerprint
            }
        };
        let prefix_index = match state.prefix_indexes.get(prefix) {
            Some(index) => *index,
            None => {
                let index = state.prefixes.len() as i32;
                state.prefixes.push(prefix.to_string());
                state.prefix_indexes.insert(prefix.to_string(), index);
                index
            }
        };
        self.allocations.fetch_add(1, Ordering::Relaxed);
        NameCode((prefix_index << PREFIX_SHIFT) | fingerprint)
    }

    /// Look up a code without allocating.
    pub fn lookup(&self, prefix: &str, namespace: &str, local: &str) -> Option<NameCode> {
        let state = self.state.read().unwrap();
        let fingerprint = *state
            .fingerprints
            .get(&(namespace.to_string(), local.to_string()))?;
        let prefix_index = *state.prefix_indexes.get(prefix)?;
        Some(NameCode((prefix_index << PREFIX_SHIFT) | fingerprint))
    }

    /// Look up just the fingerprint of an expanded name.
    pub fn fingerprint(&self, namespace: &str, local: &str) -> Option<i32> {
        let state = self.state.read().unwrap();
        state
            .fingerprints
            .get(&(namespace.to_string(), local.to_string()))
            .copied()
    }

    /// The namespace URI of a code.
    pub fn namespace(&self, code: NameCode) -> String {
        let state = self.state.read().unwrap();
        state.entries[code.fingerprint() as usize].namespace.clone()
    }

    /// The local part of a code.
    pub fn local_name(&self, code: NameCode) -> String {
        let state = self.state.read().unwrap();
        state.entries[code.fingerprint() as usize].local.clone()
    }

    /// The prefix the code was allocated under.
    pub fn prefix(&self, code: NameCode) -> String {
        let state = self.state.read().unwrap();
        state.prefixes[(code.code() >> PREFIX_SHIFT) as usize].clone()
    }

    /// The lexical `prefix:local` form of a code.
    pub fn display_name(&self, code: NameCode) -> String {
        let prefix = self.prefix(code);
        let local = self.local_name(code);
        if prefix.is_empty() {
            local
        } else {
            format!("{}:{}", prefix, local)
        }
    }

    /// How many allocations the pool has served.
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Discard all entries.
    ///
    /// Codes handed out before the reset are invalidated; calling this while
    /// any compiled expression or registered document still references the
    /// pool leaves those holders with dangling fingerprints.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap();
        *state = PoolState::new();
        self.allocations.store(0, Ordering::Relaxed);
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_fingerprint() {
        let pool = NamePool::new();
        let a = pool.allocate("a", "http://ns", "item");
        let b = pool.allocate("b", "http://ns", "item");
        assert_ne!(a, b);
        assert!(a.same_name(&b));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_different_names_different_fingerprints() {
        let pool = NamePool::new();
        let a = pool.allocate("", "http://ns", "item");
        let b = pool.allocate("", "http://ns", "other");
        let c = pool.allocate("", "http://other", "item");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let pool = NamePool::new();
        let a = pool.allocate("p", "http://ns", "item");
        let b = pool.allocate("p", "http://ns", "item");
        assert_eq!(a, b);
        assert_eq!(pool.allocation_count(), 1);
    }

    #[test]
    fn test_round_trip_parts() {
        let pool = NamePool::new();
        let code = pool.allocate("p", "http://ns", "item");
        assert_eq!(pool.prefix(code), "p");
        assert_eq!(pool.namespace(code), "http://ns");
        assert_eq!(pool.local_name(code), "item");
        assert_eq!(pool.display_name(code), "p:item");
    }

    #[test]
    fn test_reset_clears() {
        let pool = NamePool::new();
        pool.allocate("", "http://ns", "item");
        pool.reset();
        assert_eq!(pool.fingerprint("http://ns", "item"), None);
        assert_eq!(pool.allocation_count(), 0);
    }
}
