//! Tessera Runtime - Isolated execution state
//!
//! This crate implements the isolation registry:
//! - One get/set/clear interface over per-context stores
//! - Thread-scoped isolation (one store per OS thread)
//! - Task-scoped isolation (one store per cooperative task)
//! - Runtime switching between the two
//! - Task context helpers for tokio
//!
//! ```rust
//! use tessera_runtime::{IsolationMode, IsolationRegistry};
//!
//! let registry = IsolationRegistry::new();
//! registry.set("current_user", "alice".to_string());
//! assert_eq!(registry.get::<String>("current_user").as_deref(), Some("alice"));
//!
//! // Switching modes drops what the caller could see before
//! registry.set_mode(IsolationMode::TaskScoped);
//! assert_eq!(registry.get::<String>("current_user"), None);
//! ```

pub mod backend;
pub mod config;
pub mod registry;
pub mod task;

pub use backend::*;
pub use config::*;
pub use registry::*;
pub use task::{
    in_task_context, scope, scope_with, spawn, spawn_local, sync_scope, TaskContext,
};

pub use tessera_core::{
    ContextStore, IsolationMode, RegistryId, StateKey, StateValue, TesseraError, TesseraResult,
};
