//! Cache of derived records
//!
//! Extraction results are immutable once computed for an activity, so the
//! batch runner asks the store before doing any work and writes new results
//! back afterwards. Persistence is left to implementors of [`DerivedStore`].

use std::collections::HashMap;
use std::hash::Hash;

/// Keyed cache of derived records
pub trait DerivedStore<K, V> {
    /// Whether a value has already been computed for `key`
    fn exists(&self, key: &K) -> bool;

    fn get(&self, key: &K) -> Option<&V>;

    /// Store `value`, replacing any previous value for `key`
    fn put(&mut self, key: K, value: V);
}

/// HashMap backed store
#[derive(Debug, Clone)]
pub struct InMemoryStore<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for InMemoryStore<K, V> {
    fn default() -> Self {
        InMemoryStore {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> InMemoryStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K: Eq + Hash, V> DerivedStore<K, V> for InMemoryStore<K, V> {
    fn exists(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn put(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamKey, StreamType};

    #[test]
    fn test_put_and_get() {
        let mut store: InMemoryStore<String, Vec<f64>> = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(!store.exists(&"a1".to_string()));

        store.put("a1".to_string(), vec![180.0]);

        assert!(store.exists(&"a1".to_string()));
        assert_eq!(store.get(&"a1".to_string()), Some(&vec![180.0]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_replaces() {
        let mut store = InMemoryStore::new();
        let key = StreamKey::new("a1", StreamType::Watts);

        store.put(key.clone(), 200.0);
        store.put(key.clone(), 250.0);

        assert_eq!(store.get(&key), Some(&250.0));
        assert_eq!(store.len(), 1);
        assert!(!store.exists(&StreamKey::new("a1", StreamType::HeartRate)));
    }
}
