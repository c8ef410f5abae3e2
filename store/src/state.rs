//! Adapter lifecycle state.

use std::fmt;

use crate::StoreError;

/// Where a block store is in its lifecycle.
///
/// ```text
/// Uninitialized --setup--> Ready --dispose--> Disposed
///                            |                   ^  |
///                     dispose blocked            |  +--setup--> Ready
///                            v                   |
///                        Disposing ---dispose----+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdapterState {
    /// Constructed, database not opened yet.
    Uninitialized,
    /// Database open; block operations are valid.
    Ready,
    /// A dispose was attempted but another handle kept the database alive.
    Disposing,
    /// Database destroyed.
    Disposed,
}

impl AdapterState {
    pub fn is_ready(self) -> bool {
        self == AdapterState::Ready
    }

    /// Fail fast unless block operations are currently valid.
    pub fn ensure_ready(self, operation: &'static str) -> Result<(), StoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StoreError::InvalidState {
                operation,
                state: self,
            })
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterState::Uninitialized => "uninitialized",
            AdapterState::Ready => "ready",
            AdapterState::Disposing => "disposing",
            AdapterState::Disposed => "disposed",
        };
        f.write_str(s)
    }
}
