//! Tessera Core - Fundamental types for isolated execution state
//!
//! This crate defines the vocabulary shared by every Tessera layer:
//! - Isolation modes (thread-scoped vs task-scoped)
//! - Context stores (the private key/value map of one execution context)
//! - Keys and registry identifiers
//! - Error types

pub mod error;
pub mod key;
pub mod mode;
pub mod store;

pub use error::*;
pub use key::*;
pub use mode::*;
pub use store::*;
