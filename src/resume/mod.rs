//! Resume capability for export runs
//!
//! Cursor and watermark persistence behind a small key-value [`StateStore`],
//! with an atomic file-backed implementation.

pub mod checkpoint;
pub mod file_store;
pub mod state;
pub mod store;

pub use checkpoint::{Cursor, Watermark};
pub use file_store::FileStateStore;
pub use state::{ResumeError, RunMode, RunState};
pub use store::{MemoryStateStore, StateKey, StateStore};
