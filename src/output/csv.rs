//! Append-only CSV sink and the reader used to rebuild the dedup index

use crate::UserRecord;
use csv::{QuoteStyle, ReaderBuilder, Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{OutputError, OutputResult, OutputWriter, UsersWriter};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Column names, written once when the file is created
pub const USERS_CSV_HEADER: [&str; 6] = [
    "id",
    "created_at",
    "has_accepted_terms",
    "email",
    "wallet_address",
    "linked_accounts_count",
];

/// CSV row for one user
#[derive(Debug, Serialize, PartialEq)]
struct UserRow<'a> {
    id: &'a str,
    created_at: i64,
    has_accepted_terms: bool,
    email: Option<&'a str>,
    wallet_address: Option<&'a str>,
    linked_accounts_count: usize,
}

impl<'a> From<&'a UserRecord> for UserRow<'a> {
    fn from(user: &'a UserRecord) -> Self {
        Self {
            id: &user.id,
            created_at: user.created_at,
            has_accepted_terms: user.has_accepted_terms(),
            email: user.linked_account_field("email", "address"),
            wallet_address: user.linked_account_field("wallet", "address"),
            linked_accounts_count: user.linked_accounts().len(),
        }
    }
}

/// Appending CSV writer. Every field is quoted.
pub struct CsvUsersWriter {
    writer: Writer<BufWriter<File>>,
    users_written: u64,
}

impl CsvUsersWriter {
    /// Open `path` for appending, creating it (and its parent directory) when
    /// missing. The header is written only when the file is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| OutputError::IoError(format!("Failed to open {}: {e}", path.display())))?;

        let len = file
            .metadata()
            .map_err(|e| OutputError::IoError(format!("Failed to stat output: {e}")))?
            .len();
        let len = drop_partial_last_line(&mut file, len, path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        if len == 0 {
            writer
                .write_record(USERS_CSV_HEADER)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
            info!(path = %path.display(), "Created output file");
        } else {
            debug!(path = %path.display(), bytes = len, "Appending to existing output");
        }

        Ok(Self {
            writer,
            users_written: 0,
        })
    }

    /// Rows appended by this writer
    pub fn users_written(&self) -> u64 {
        self.users_written
    }
}

/// A crash mid-row can leave a partial last line. Cut it off so the row is
/// neither mistaken for an exported user nor glued to the next append.
/// Returns the new file length.
fn drop_partial_last_line(file: &mut File, len: u64, path: &Path) -> OutputResult<u64> {
    const CHUNK: u64 = 8 * 1024;
    let io_err = |e: std::io::Error| OutputError::IoError(format!("Failed to repair output: {e}"));

    let mut buf = vec![0u8; CHUNK as usize];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start)).map_err(io_err)?;
        file.read_exact(chunk).map_err(io_err)?;

        if let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') {
            let keep = start + pos as u64 + 1;
            if keep < len {
                warn!(path = %path.display(), dropped_bytes = len - keep, "Dropping partial last row");
                file.set_len(keep).map_err(io_err)?;
            }
            return Ok(keep);
        }
        end = start;
    }

    if len > 0 {
        warn!(path = %path.display(), "Output holds no complete row, starting over");
        file.set_len(0).map_err(io_err)?;
    }
    Ok(0)
}

impl UsersWriter for CsvUsersWriter {
    fn write_user(&mut self, user: &UserRecord) -> OutputResult<()> {
        self.writer
            .serialize(UserRow::from(user))
            .map_err(|e| OutputError::CsvError(format!("Failed to write user {}: {e}", user.id)))?;
        self.users_written += 1;
        Ok(())
    }
}

impl OutputWriter for CsvUsersWriter {
    /// Flush the CSV and file buffers, then sync file data to disk.
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
        self.writer
            .get_ref()
            .get_ref()
            .sync_data()
            .map_err(|e| OutputError::FlushError(format!("Failed to sync: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;
        debug!(users_written = self.users_written, "Closed output file");
        Ok(())
    }
}

/// Read the identifier column of an existing sink.
///
/// The first line is the header and is skipped. Unreadable or empty rows are
/// skipped; a missing file yields no identifiers.
pub fn read_existing_ids<P: AsRef<Path>>(path: P) -> OutputResult<Vec<String>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(OutputError::IoError(format!(
                "Failed to open {}: {e}",
                path.display()
            )))
        }
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut ids = Vec::new();
    let mut skipped = 0u64;
    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "Skipping unreadable output row");
                continue;
            }
        };
        let id = record
            .get(0)
            .map(|field| String::from_utf8_lossy(field).trim().replace('"', ""))
            .filter(|id| !id.is_empty());
        match id {
            Some(id) => ids.push(id),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "Skipped corrupt rows while reading output");
    }
    Ok(ids)
}
