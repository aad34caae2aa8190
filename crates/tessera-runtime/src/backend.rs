//! Storage backends - where "the current store" lives
//!
//! - [`ThreadLocalBackend`]: one store per OS thread (`thread_local!`)
//! - [`TaskLocalBackend`]: one store per task context, with the thread's
//!   root task standing in when no task context is active
//!
//! [`Backend`] selects between them from the active isolation mode.

use std::cell::RefCell;
use std::collections::HashMap;

use tessera_core::{ContextStore, IsolationMode, RegistryId};

use crate::task;

type StoreMap = HashMap<RegistryId, ContextStore>;

thread_local! {
    /// Stores owned by the OS thread itself
    static THREAD_STORES: RefCell<StoreMap> = RefCell::new(StoreMap::new());
    /// Stores owned by the thread's root task
    static ROOT_TASK_STORES: RefCell<StoreMap> = RefCell::new(StoreMap::new());
}

/// Access to the current execution context's store for a registry
pub trait ContextBackend {
    /// Run `f` against the current store, creating it empty if needed
    fn with_store<R>(&self, registry: RegistryId, f: impl FnOnce(&mut ContextStore) -> R) -> R;

    /// Detach the current store for `registry`, if it exists
    fn discard(&self, registry: RegistryId) -> Option<ContextStore>;
}

fn with_entry<R>(
    stores: &mut StoreMap,
    registry: RegistryId,
    f: impl FnOnce(&mut ContextStore) -> R,
) -> R {
    let store = stores.entry(registry).or_insert_with(|| {
        tracing::trace!("creating context store for registry {}", registry);
        ContextStore::new()
    });
    f(store)
}

/// Thread-scoped backend
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadLocalBackend;

impl ContextBackend for ThreadLocalBackend {
    fn with_store<R>(&self, registry: RegistryId, f: impl FnOnce(&mut ContextStore) -> R) -> R {
        THREAD_STORES.with(|stores| with_entry(&mut stores.borrow_mut(), registry, f))
    }

    fn discard(&self, registry: RegistryId) -> Option<ContextStore> {
        // try_with: may run while thread locals are being torn down
        THREAD_STORES
            .try_with(|stores| stores.borrow_mut().remove(&registry))
            .ok()
            .flatten()
    }
}

/// Task-scoped backend
///
/// Isolation holds only for tasks started through [`crate::scope`],
/// [`crate::spawn`] or their siblings. A tokio task spawned directly has no
/// task context and would land in its worker thread's root-task store,
/// shared with every other such task on that thread. That case is logged as
/// a warning and panics in debug builds.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskLocalBackend;

impl ContextBackend for TaskLocalBackend {
    fn with_store<R>(&self, registry: RegistryId, f: impl FnOnce(&mut ContextStore) -> R) -> R {
        if task::in_task_context() {
            task::with_current(|ctx| with_entry(ctx.stores_mut(), registry, f))
        } else {
            if let Some(id) = tokio::task::try_id() {
                unscoped_task(registry, id);
            }
            ROOT_TASK_STORES.with(|stores| with_entry(&mut stores.borrow_mut(), registry, f))
        }
    }

    fn discard(&self, registry: RegistryId) -> Option<ContextStore> {
        match task::try_with_current(|ctx| ctx.stores_mut().remove(&registry)) {
            Some(store) => store,
            None => ROOT_TASK_STORES
                .try_with(|stores| stores.borrow_mut().remove(&registry))
                .ok()
                .flatten(),
        }
    }
}

fn unscoped_task(registry: RegistryId, id: tokio::task::Id) {
    tracing::warn!(
        "registry {}: tokio task {} has no task context, falling back to the thread's root-task store; \
         start it with tessera_runtime::spawn or scope",
        registry,
        id
    );
    if cfg!(debug_assertions) {
        panic!(
            "task-scoped state accessed from tokio task {} without a task context",
            id
        );
    }
}

/// Backend selected by an isolation mode
#[derive(Clone, Copy, Debug)]
pub enum Backend {
    Thread(ThreadLocalBackend),
    Task(TaskLocalBackend),
}

impl Backend {
    pub fn for_mode(mode: IsolationMode) -> Self {
        match mode {
            IsolationMode::ThreadScoped => Backend::Thread(ThreadLocalBackend),
            IsolationMode::TaskScoped => Backend::Task(TaskLocalBackend),
        }
    }

    pub fn mode(&self) -> IsolationMode {
        match self {
            Backend::Thread(_) => IsolationMode::ThreadScoped,
            Backend::Task(_) => IsolationMode::TaskScoped,
        }
    }
}

impl ContextBackend for Backend {
    fn with_store<R>(&self, registry: RegistryId, f: impl FnOnce(&mut ContextStore) -> R) -> R {
        match self {
            Backend::Thread(backend) => backend.with_store(registry, f),
            Backend::Task(backend) => backend.with_store(registry, f),
        }
    }

    fn discard(&self, registry: RegistryId) -> Option<ContextStore> {
        match self {
            Backend::Thread(backend) => backend.discard(registry),
            Backend::Task(backend) => backend.discard(registry),
        }
    }
}
