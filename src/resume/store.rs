//! Key-value state store abstraction
//!
//! The export driver only ever needs two single-value slots, so the store is a
//! tiny `load`/`save`/`clear` contract over [`StateKey`]. Swapping files for a
//! database or object store means implementing this trait.

use super::state::ResumeError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Slots kept by a state store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Cursor of the pass in progress
    Cursor,
    /// Start time of the last completed pass
    Watermark,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateKey::Cursor => "cursor",
            StateKey::Watermark => "watermark",
        };
        write!(f, "{s}")
    }
}

/// Persistent single-value slots
pub trait StateStore: Send + Sync {
    /// Read a slot. `Ok(None)` when nothing is stored.
    fn load(&self, key: StateKey) -> Result<Option<String>, ResumeError>;

    /// Replace a slot's value
    fn save(&self, key: StateKey, value: &str) -> Result<(), ResumeError>;

    /// Remove a slot. Clearing an empty slot is not an error.
    fn clear(&self, key: StateKey) -> Result<(), ResumeError>;
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn load(&self, key: StateKey) -> Result<Option<String>, ResumeError> {
        (**self).load(key)
    }

    fn save(&self, key: StateKey, value: &str) -> Result<(), ResumeError> {
        (**self).save(key, value)
    }

    fn clear(&self, key: StateKey) -> Result<(), ResumeError> {
        (**self).clear(key)
    }
}

/// In-memory store, useful for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<StateKey, String>>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<StateKey, String>>, ResumeError> {
        self.values
            .lock()
            .map_err(|e| ResumeError::IoError(format!("state store lock poisoned: {e}")))
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: StateKey) -> Result<Option<String>, ResumeError> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn save(&self, key: StateKey, value: &str) -> Result<(), ResumeError> {
        self.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self, key: StateKey) -> Result<(), ResumeError> {
        self.lock()?.remove(&key);
        Ok(())
    }
}
