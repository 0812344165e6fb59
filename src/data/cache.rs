//! Explicit memoisation for loads and filter results.
//!
//! Entries are keyed by source fingerprint (and filter criteria); callers
//! decide when to invalidate.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A keyed result cache with optional oldest-first eviction.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: Option<usize>,
}

impl<K: Clone + Eq + Hash, V: Clone> Memo<K, V> {
    /// A cache that never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: None,
        }
    }

    /// A cache holding at most `capacity` entries (minimum one).
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::unbounded()
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
    }

    /// Return the cached value or compute, store and return it.
    /// Failed computations are not stored.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Infallible variant of [`Memo::get_or_try_insert_with`].
    pub fn get_or_insert_with(&mut self, key: &K, compute: impl FnOnce() -> V) -> V {
        match self.get_or_try_insert_with::<std::convert::Infallible>(key, || Ok(compute())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    /// Drop every entry whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| keep(k));
        let entries = &self.entries;
        self.order.retain(|k| entries.contains_key(k));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Clone + Eq + Hash, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_get_or_insert_computes_once() {
        let mut memo: Memo<&str, u32> = Memo::unbounded();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            7
        };
        assert_eq!(memo.get_or_insert_with(&"k", compute), 7);
        assert_eq!(memo.get_or_insert_with(&"k", compute), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut memo: Memo<&str, u32> = Memo::unbounded();
        let first: Result<u32, &str> = memo.get_or_try_insert_with(&"k", || Err("offline"));
        assert!(first.is_err());
        assert!(memo.is_empty());
        let second: Result<u32, &str> = memo.get_or_try_insert_with(&"k", || Ok(3));
        assert_eq!(second, Ok(3));
        assert_eq!(memo.get(&"k"), Some(3));
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut memo = Memo::bounded(2);
        memo.insert(1, "a");
        memo.insert(2, "b");
        memo.insert(1, "a2");
        memo.insert(3, "c");
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get(&1), None);
        assert_eq!(memo.get(&2), Some("b"));
        assert_eq!(memo.get(&3), Some("c"));
    }

    #[test]
    fn test_invalidate_and_retain() {
        let mut memo = Memo::unbounded();
        memo.insert(("src1", 1), 10);
        memo.insert(("src1", 2), 20);
        memo.insert(("src2", 1), 30);

        assert_eq!(memo.invalidate(&("src1", 1)), Some(10));
        assert_eq!(memo.invalidate(&("src1", 1)), None);

        memo.retain(|(src, _)| *src == "src2");
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get(&("src2", 1)), Some(30));

        memo.retain(|_| false);
        assert!(memo.is_empty());
    }
}
