//! CLI error types and conversions

use crate::downloader::ExportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export run failed
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl CliError {
    /// Guidance for the operator, if any
    pub fn resume_hint(&self) -> Option<&'static str> {
        match self {
            CliError::ExportError(e) => Some(e.resume_hint()),
            _ => None,
        }
    }
}
