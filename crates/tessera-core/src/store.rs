//! Context store - the private key/value map of one execution context

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::StateKey;

/// Type-erased value held by a context store
pub type StateValue = Arc<dyn Any + Send + Sync>;

/// Entries of a context store
pub type StateEntries = HashMap<StateKey, StateValue>;

/// Context store - owned by exactly one execution context
///
/// A store is stamped with the registry generation it was last reconciled
/// with. Entries written under an older generation are stale and get
/// discarded by [`ContextStore::reconcile`].
#[derive(Clone, Default)]
pub struct ContextStore {
    entries: StateEntries,
    generation: u64,
}

impl ContextStore {
    pub fn new() -> Self {
        ContextStore::default()
    }

    /// Empty store already reconciled with `generation`
    pub fn with_generation(generation: u64) -> Self {
        ContextStore {
            entries: StateEntries::new(),
            generation,
        }
    }

    /// Generation this store was last reconciled with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bring the store up to `generation`.
    ///
    /// Returns the discarded entries when the store was stale, so the caller
    /// can drop them outside of any borrow on the store.
    pub fn reconcile(&mut self, generation: u64) -> Option<StateEntries> {
        if self.generation == generation {
            return None;
        }
        self.generation = generation;
        if self.entries.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.entries))
        }
    }

    /// Get the raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    /// Get the value under `key` if it has type `T`
    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Insert or overwrite a value, returning the replaced one
    pub fn insert(&mut self, key: StateKey, value: StateValue) -> Option<StateValue> {
        self.entries.insert(key, value)
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.entries.keys()
    }

    /// Empty the store in place, handing back what it held
    pub fn take(&mut self) -> StateEntries {
        std::mem::take(&mut self.entries)
    }
}

// Values are opaque, so only keys are shown.
impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(StateKey::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ContextStore")
            .field("generation", &self.generation)
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn value<T: Any + Send + Sync>(v: T) -> StateValue {
        Arc::new(v)
    }

    #[test]
    fn test_store_basic() {
        let mut store = ContextStore::new();
        assert!(store.is_empty());

        store.insert("locale".into(), value("en".to_string()));
        assert!(store.contains_key("locale"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_as::<String>("locale").map(String::as_str), Some("en"));
    }

    #[test]
    fn test_get_as_wrong_type() {
        let mut store = ContextStore::new();
        store.insert("request_id".into(), value(42u64));

        assert!(store.get("request_id").is_some());
        assert_eq!(store.get_as::<u32>("request_id"), None);
        assert_eq!(store.get_as::<u64>("request_id"), Some(&42));
    }

    #[test]
    fn test_insert_returns_replaced() {
        let mut store = ContextStore::new();
        assert!(store.insert("k".into(), value(1i32)).is_none());

        let old = store.insert("k".into(), value(2i32)).unwrap();
        assert_eq!(old.downcast_ref::<i32>(), Some(&1));
        assert_eq!(store.get_as::<i32>("k"), Some(&2));
    }

    #[test]
    fn test_take_empties_in_place() {
        let mut store = ContextStore::with_generation(3);
        store.insert("a".into(), value(1u8));
        store.insert("b".into(), value(2u8));

        let taken = store.take();
        assert_eq!(taken.len(), 2);
        assert!(store.is_empty());
        assert_eq!(store.generation(), 3);
    }

    #[test]
    fn test_reconcile_discards_stale_entries() {
        let mut store = ContextStore::with_generation(0);
        store.insert("a".into(), value(1u8));

        assert!(store.reconcile(0).is_none());
        assert!(store.contains_key("a"));

        let stale = store.reconcile(1).unwrap();
        assert!(stale.contains_key("a"));
        assert!(store.is_empty());
        assert_eq!(store.generation(), 1);

        // An empty stale store just gets re-stamped
        assert!(store.reconcile(2).is_none());
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_debug_lists_sorted_keys() {
        let mut store = ContextStore::new();
        store.insert("zeta".into(), value(()));
        store.insert("alpha".into(), value(()));

        let rendered = format!("{:?}", store);
        assert!(rendered.contains(r#"keys: ["alpha", "zeta"]"#));
    }

    proptest! {
        #[test]
        fn prop_last_write_wins(writes in proptest::collection::vec(("[a-d]", any::<i64>()), 0..32)) {
            let mut store = ContextStore::new();
            let mut model = HashMap::new();

            for (k, v) in writes {
                store.insert(StateKey::from(k.clone()), value(v));
                model.insert(k, v);
            }

            prop_assert_eq!(store.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(store.get_as::<i64>(k), Some(v));
            }
        }
    }
}
