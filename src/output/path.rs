//! Output path helpers

use std::path::{Path, PathBuf};

/// Insert a millisecond timestamp before the extension:
/// `users.csv` becomes `users_1700000000000.csv`.
pub fn unique_output_path(base: &Path, timestamp_ms: i64) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "users".to_string());

    let file_name = match base.extension() {
        Some(ext) => format!("{stem}_{timestamp_ms}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{timestamp_ms}"),
    };

    base.with_file_name(file_name)
}
