//! Output sink for exported users

use crate::UserRecord;

pub mod csv;
pub mod path;

pub use self::csv::{read_existing_ids, CsvUsersWriter, USERS_CSV_HEADER};
pub use path::unique_output_path;

/// Output sink errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write or read error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush or sync error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer
pub trait OutputWriter {
    /// Flush buffered rows and make them durable
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush and close the sink
    fn close(self) -> OutputResult<()>;
}

/// Sink accepting user records
pub trait UsersWriter: OutputWriter {
    /// Append one user
    fn write_user(&mut self, user: &UserRecord) -> OutputResult<()>;

    /// Append several users in order
    fn write_users(&mut self, users: &[UserRecord]) -> OutputResult<()> {
        for user in users {
            self.write_user(user)?;
        }
        Ok(())
    }
}
