//! Isolation modes
//!
//! The isolation mode decides which execution context owns "the current
//! store": the OS thread, or the cooperative task running on it.

use std::fmt;
use std::str::FromStr;

use crate::{TesseraError, TesseraResult};

/// Isolation granularity for context-local state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IsolationMode {
    /// One store per OS thread. Every task multiplexed onto a thread
    /// shares that thread's store.
    #[default]
    ThreadScoped = 0,
    /// One store per cooperative task. A task's store is independent of
    /// the store of the thread running it.
    TaskScoped = 1,
}

impl IsolationMode {
    /// All modes, in wire order
    pub const ALL: [IsolationMode; 2] = [IsolationMode::ThreadScoped, IsolationMode::TaskScoped];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            IsolationMode::ThreadScoped => "thread",
            IsolationMode::TaskScoped => "task",
        }
    }

    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            IsolationMode::ThreadScoped => IsolationMode::TaskScoped,
            IsolationMode::TaskScoped => IsolationMode::ThreadScoped,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Decode a mode byte. Unknown values are rejected.
    pub fn from_byte(byte: u8) -> TesseraResult<Self> {
        match byte {
            0 => Ok(IsolationMode::ThreadScoped),
            1 => Ok(IsolationMode::TaskScoped),
            other => Err(TesseraError::InvalidArgument(format!(
                "isolation mode must be 0 (thread) or 1 (task), got: {}",
                other
            ))),
        }
    }
}

impl TryFrom<u8> for IsolationMode {
    type Error = TesseraError;

    fn try_from(byte: u8) -> TesseraResult<Self> {
        IsolationMode::from_byte(byte)
    }
}

impl FromStr for IsolationMode {
    type Err = TesseraError;

    /// Accepts `thread`, `task`, and `fiber` as an alias for `task`
    fn from_str(s: &str) -> TesseraResult<Self> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("thread") {
            Ok(IsolationMode::ThreadScoped)
        } else if name.eq_ignore_ascii_case("task") || name.eq_ignore_ascii_case("fiber") {
            Ok(IsolationMode::TaskScoped)
        } else {
            Err(TesseraError::InvalidArgument(format!(
                "isolation mode must be `thread` or `task`, got: `{}`",
                s
            )))
        }
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
