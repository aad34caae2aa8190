//! Identity types for Tessera
//!
//! Keys are caller-chosen names for context-local values. Registry ids
//! partition context stores between independently constructed registries.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Key under which a value is stored in a context store
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(Cow<'static, str>);

impl StateKey {
    /// Key backed by a static string, no allocation
    #[inline]
    pub const fn from_static(name: &'static str) -> Self {
        StateKey(Cow::Borrowed(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for StateKey {
    fn from(name: &'static str) -> Self {
        StateKey(Cow::Borrowed(name))
    }
}

impl From<String> for StateKey {
    fn from(name: String) -> Self {
        StateKey(Cow::Owned(name))
    }
}

// Lets stores be probed with a plain `&str`.
impl Borrow<str> for StateKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry identity - unique for the life of the process
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(pub u64);

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

impl RegistryId {
    /// Allocate a fresh id. Ids are never reused.
    pub fn next() -> Self {
        RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registry({})", self.0)
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
