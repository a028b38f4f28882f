//! File-backed state store
//!
//! Each slot is a single-value text file. Writes go through a temp file in the
//! same directory followed by fsync and rename, so a crash leaves either the old
//! or the new value on disk, never a torn one.
//!
//! No locking is performed: two exporters pointed at the same files will
//! corrupt each other's checkpoints.

use super::state::ResumeError;
use super::store::{StateKey, StateStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// State files larger than this are certainly not ours (1 MB)
pub const MAX_STATE_FILE_SIZE: u64 = 1024 * 1024;

/// Cursor and watermark kept as two text files
#[derive(Debug, Clone)]
pub struct FileStateStore {
    cursor_path: PathBuf,
    watermark_path: PathBuf,
}

impl FileStateStore {
    /// Create a store over the given file paths
    pub fn new(cursor_path: impl Into<PathBuf>, watermark_path: impl Into<PathBuf>) -> Self {
        Self {
            cursor_path: cursor_path.into(),
            watermark_path: watermark_path.into(),
        }
    }

    /// Path backing a slot
    pub fn path_for(&self, key: StateKey) -> &Path {
        match key {
            StateKey::Cursor => &self.cursor_path,
            StateKey::Watermark => &self.watermark_path,
        }
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: StateKey) -> Result<Option<String>, ResumeError> {
        let path = self.path_for(key);

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %key, path = %path.display(), "No state file");
                return Ok(None);
            }
            Err(e) => {
                return Err(ResumeError::IoError(format!(
                    "Failed to stat {}: {e}",
                    path.display()
                )))
            }
        };

        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(ResumeError::StateTooLarge {
                size: metadata.len(),
                max: MAX_STATE_FILE_SIZE,
            });
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ResumeError::IoError(format!("Failed to read {}: {e}", path.display())))?;

        debug!(key = %key, path = %path.display(), "Loaded state file");
        Ok(Some(contents))
    }

    fn save(&self, key: StateKey, value: &str) -> Result<(), ResumeError> {
        let path = self.path_for(key);

        let parent_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent_dir).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(value.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Make the rename itself durable
        if let Ok(dir) = std::fs::File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        debug!(key = %key, path = %path.display(), "Saved state file");
        Ok(())
    }

    fn clear(&self, key: StateKey) -> Result<(), ResumeError> {
        let path = self.path_for(key);
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(key = %key, path = %path.display(), "Removed state file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResumeError::IoError(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
