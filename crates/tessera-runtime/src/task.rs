//! Task contexts
//!
//! A task context carries the context stores of one cooperative task. It is
//! established with [`scope`], [`scope_with`] or [`sync_scope`], or by
//! spawning through [`spawn`] / [`spawn_local`]. Code running outside any
//! task context belongs to its thread's root task.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

use tessera_core::{ContextStore, RegistryId};
use tokio::task::futures::TaskLocalFuture;
use tokio::task::JoinHandle;

tokio::task_local! {
    static CURRENT: RefCell<TaskContext>;
}

/// The context stores owned by one task, keyed by registry
#[derive(Clone, Debug, Default)]
pub struct TaskContext {
    stores: HashMap<RegistryId, ContextStore>,
}

impl TaskContext {
    pub fn new() -> Self {
        TaskContext::default()
    }

    /// Seed the context with a store for `registry`
    pub fn with_store(mut self, registry: RegistryId, store: ContextStore) -> Self {
        self.stores.insert(registry, store);
        self
    }

    /// Store for `registry`, if one exists yet
    pub fn store(&self, registry: RegistryId) -> Option<&ContextStore> {
        self.stores.get(&registry)
    }

    /// Number of registries holding a store in this context
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub(crate) fn stores_mut(&mut self) -> &mut HashMap<RegistryId, ContextStore> {
        &mut self.stores
    }
}

/// Whether the caller is running inside a task context
pub fn in_task_context() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Run `f` against the current task context.
///
/// Callers check [`in_task_context`] first; outside a task context this panics.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut TaskContext) -> R) -> R {
    CURRENT.with(|ctx| f(&mut ctx.borrow_mut()))
}

/// Run `f` against the current task context, if there is one
pub(crate) fn try_with_current<R>(f: impl FnOnce(&mut TaskContext) -> R) -> Option<R> {
    CURRENT.try_with(|ctx| f(&mut ctx.borrow_mut())).ok()
}

/// Run `future` as a task with a fresh, empty task context
pub fn scope<F: Future>(future: F) -> TaskLocalFuture<RefCell<TaskContext>, F> {
    scope_with(TaskContext::new(), future)
}

/// Run `future` as a task owning `context`
pub fn scope_with<F: Future>(
    context: TaskContext,
    future: F,
) -> TaskLocalFuture<RefCell<TaskContext>, F> {
    CURRENT.scope(RefCell::new(context), future)
}

/// Run a synchronous closure as a task with a fresh task context
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(RefCell::new(TaskContext::new()), f)
}

/// Spawn `future` on the tokio runtime with its own task context
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(scope(future))
}

/// Spawn `future` on the current `LocalSet` with its own task context
pub fn spawn_local<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    tokio::task::spawn_local(scope(future))
}
