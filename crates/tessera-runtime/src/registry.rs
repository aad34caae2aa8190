//! Isolation registry - one key/value interface over per-context stores
//!
//! The registry resolves "the current store" through the active
//! [`IsolationMode`]: the calling thread's store when thread-scoped, the
//! calling task's store when task-scoped. It never keeps a directory of
//! stores; each store lives inside the execution context that owns it.
//!
//! # Mode transitions
//!
//! [`IsolationRegistry::set_mode`] first empties the store the caller sees
//! under the old mode, then flips the mode for every context. Each real
//! transition also advances the registry generation, and any store last
//! touched under an older generation is emptied on its next access. After a
//! switch, no context can read an entry written before it.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{
    ContextStore, IsolationMode, RegistryId, StateEntries, StateKey, StateValue, TesseraResult,
};

use crate::backend::{Backend, ContextBackend, TaskLocalBackend, ThreadLocalBackend};
use crate::config::RegistryConfig;
use crate::task::TaskContext;

/// Mode and generation packed in one word: bit 0 is the mode, the rest is
/// the generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ModeWord(u64);

impl ModeWord {
    fn new(mode: IsolationMode, generation: u64) -> Self {
        ModeWord((generation << 1) | u64::from(mode.to_byte()))
    }

    fn mode(self) -> IsolationMode {
        if self.0 & 1 == 0 {
            IsolationMode::ThreadScoped
        } else {
            IsolationMode::TaskScoped
        }
    }

    fn generation(self) -> u64 {
        self.0 >> 1
    }
}

/// Isolated execution-state registry
///
/// Task-scoped isolation covers tasks run through [`crate::scope`],
/// [`crate::scope_with`], [`crate::sync_scope`], [`crate::spawn`] or
/// [`crate::spawn_local`]. A tokio task spawned directly has no task context;
/// touching task-scoped state from one is logged and panics in debug builds.
///
/// A mode switch does more than empty the switching caller's view: through
/// the generation counter, entries written by *any* context before the switch
/// become unreachable, including stores under the mode that was not active.
/// A context that toggles away and back never finds its old entries again,
/// whichever context did the toggling.
pub struct IsolationRegistry {
    id: RegistryId,
    state: AtomicU64,
    /// Serializes mode transitions; reads never take it
    transition: Mutex<()>,
}

impl IsolationRegistry {
    /// Create a thread-scoped registry
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let id = RegistryId::next();
        tracing::debug!(
            "isolation registry {} created in {} mode",
            id,
            config.initial_mode
        );
        IsolationRegistry {
            id,
            state: AtomicU64::new(ModeWord::new(config.initial_mode, 0).0),
            transition: Mutex::new(()),
        }
    }

    /// Registry identity
    pub fn id(&self) -> RegistryId {
        self.id
    }

    fn load(&self) -> ModeWord {
        ModeWord(self.state.load(Ordering::Acquire))
    }

    /// Currently active isolation mode
    pub fn mode(&self) -> IsolationMode {
        self.load().mode()
    }

    /// Number of mode transitions performed so far
    pub fn generation(&self) -> u64 {
        self.load().generation()
    }

    /// Change the isolation mode.
    ///
    /// A no-op when `mode` is already active. Otherwise the caller's current
    /// store is emptied and every context resolves through `mode` from now on.
    pub fn set_mode(&self, mode: IsolationMode) {
        let guard = self.transition.lock();
        let word = self.load();
        if word.mode() == mode {
            return;
        }

        let (stale, discarded) = self.resolve(word, ContextStore::take);
        let next = ModeWord::new(mode, word.generation().wrapping_add(1));
        self.state.store(next.0, Ordering::Release);
        drop(guard);

        // Destructors run only now, so they may switch modes themselves
        self.release_stale(stale);

        tracing::debug!(
            "registry {} isolation {} -> {} (generation {}, {} entries cleared)",
            self.id,
            word.mode(),
            mode,
            next.generation(),
            discarded.len()
        );
    }

    /// Change the isolation mode by name (`thread`, `task` or `fiber`).
    ///
    /// Unknown names fail with `InvalidArgument` and leave the mode unchanged.
    pub fn set_mode_named(&self, name: &str) -> TesseraResult<()> {
        let mode = name.parse::<IsolationMode>().map_err(|e| {
            tracing::warn!("registry {} rejected isolation mode: {}", self.id, e);
            e
        })?;
        self.set_mode(mode);
        Ok(())
    }

    /// Run `f` against the store current under `word`, handing back any
    /// stale entries undropped alongside `f`'s result.
    fn resolve<R>(
        &self,
        word: ModeWord,
        f: impl FnOnce(&mut ContextStore) -> R,
    ) -> (Option<StateEntries>, R) {
        Backend::for_mode(word.mode()).with_store(self.id, |store| {
            let stale = store.reconcile(word.generation());
            (stale, f(store))
        })
    }

    fn release_stale(&self, stale: Option<StateEntries>) {
        if let Some(stale) = stale {
            tracing::trace!(
                "registry {} dropped {} stale entries",
                self.id,
                stale.len()
            );
        }
    }

    /// Run `f` against the current context's store.
    ///
    /// Stale entries are dropped only after the store borrow is released, so
    /// their destructors may use the registry again.
    fn with_current<R>(&self, f: impl FnOnce(&mut ContextStore) -> R) -> R {
        let (stale, out) = self.resolve(self.load(), f);
        self.release_stale(stale);
        out
    }

    /// Value stored under `key` in the current context, if it has type `T`
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        // Clone outside the store borrow; `T::clone` may use the registry
        self.get_value(key).and_then(|v| v.downcast_ref::<T>().cloned())
    }

    /// Shared handle to the value stored under `key`, if it has type `T`
    pub fn get_shared<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get_value(key).and_then(|v| v.downcast::<T>().ok())
    }

    /// Type-erased value stored under `key`
    pub fn get_value(&self, key: &str) -> Option<StateValue> {
        self.with_current(|store| store.get(key).cloned())
    }

    /// Store `value` under `key` in the current context, replacing any
    /// previous value
    pub fn set<T>(&self, key: impl Into<StateKey>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.set_value(key, Arc::new(value));
    }

    /// Store an already type-erased value
    pub fn set_value(&self, key: impl Into<StateKey>, value: StateValue) {
        let key = key.into();
        let replaced = self.with_current(|store| store.insert(key, value));
        drop(replaced);
    }

    /// Remove `key` from the current context.
    ///
    /// The entry is removed whatever its type; the value is returned only if
    /// it has type `T`.
    pub fn remove<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        let removed = self.with_current(|store| store.remove(key))?;
        let typed = removed.downcast::<T>().ok()?;
        Some(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.with_current(|store| store.contains_key(key))
    }

    /// Number of entries in the current context's store
    pub fn len(&self) -> usize {
        self.with_current(|store| store.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with_current(|store| store.is_empty())
    }

    /// Empty the current context's store. Other contexts and the mode are
    /// unaffected.
    pub fn clear(&self) {
        let cleared: StateEntries = self.with_current(ContextStore::take);
        drop(cleared);
    }

    /// Copy of the current context's store
    pub fn snapshot(&self) -> ContextStore {
        self.with_current(|store| store.clone())
    }

    /// Task context seeded with a copy of the caller's current store.
    ///
    /// Run a task in it with [`crate::scope_with`]; the task starts with the
    /// caller's entries and writes from either side stay private.
    pub fn inherit(&self) -> TaskContext {
        TaskContext::new().with_store(self.id, self.snapshot())
    }
}

impl Default for IsolationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IsolationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let word = self.load();
        f.debug_struct("IsolationRegistry")
            .field("id", &self.id)
            .field("mode", &word.mode())
            .field("generation", &word.generation())
            .finish()
    }
}

// Stores held by other threads and tasks go away with their owners.
impl Drop for IsolationRegistry {
    fn drop(&mut self) {
        drop(ThreadLocalBackend.discard(self.id));
        drop(TaskLocalBackend.discard(self.id));
    }
}
