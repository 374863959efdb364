//! Evidence trail: one CSV row per turn, independent of the turn database.
//!
//! Each record is encoded in memory and written with a single `write_all` to a
//! file opened in append mode, so a crash can at worst lose the tail record,
//! never interleave two. The header row is written only when the file is
//! empty. File I/O runs on the blocking pool, off the request workers.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tracing::trace;

use crate::store::{format_timestamp, Turn};

/// Column names, in order. Matches [`EvidenceRecord`]'s serialized shape.
pub const EVIDENCE_HEADER: [&str; 6] = [
    "timestamp",
    "scammer_id",
    "scam_type",
    "risk_score",
    "persona",
    "message",
];

/// Flattened audit projection of a [`Turn`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceRecord {
    /// RFC 3339 UTC timestamp of the turn.
    pub timestamp: String,
    /// Conversation id.
    #[serde(rename = "scammer_id")]
    pub conversation_id: String,
    /// Category label.
    #[serde(rename = "scam_type")]
    pub scam_category: String,
    /// Risk tier.
    #[serde(rename = "risk_score")]
    pub risk_level: String,
    /// Persona label.
    pub persona: String,
    /// Inbound scammer message.
    #[serde(rename = "message")]
    pub scammer_message: String,
}

impl From<&Turn> for EvidenceRecord {
    fn from(turn: &Turn) -> Self {
        Self {
            timestamp: format_timestamp(&turn.timestamp),
            conversation_id: turn.conversation_id.clone(),
            scam_category: turn.scam_category.as_str().to_owned(),
            risk_level: turn.risk_level.as_str().to_owned(),
            persona: turn.persona.label().to_owned(),
            scammer_message: turn.scammer_message.clone(),
        }
    }
}

/// Errors from evidence operations.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    /// Filesystem failure.
    #[error("evidence io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded as CSV.
    #[error("evidence encoding error: {0}")]
    Encode(#[from] csv::Error),

    /// The blocking writer task panicked or was cancelled.
    #[error("evidence writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Nothing has been recorded yet.
    #[error("no evidence found")]
    NotFound,

    /// Writer state was poisoned by a panic in another thread.
    #[error("evidence writer lock poisoned")]
    Poisoned,
}

/// Encode one record, optionally preceded by the header row.
///
/// # Errors
///
/// Returns [`EvidenceError::Encode`] if serialization fails.
pub fn encode_record(record: &EvidenceRecord, with_header: bool) -> Result<Vec<u8>, EvidenceError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    wtr.serialize(record)?;
    wtr.into_inner()
        .map_err(|e| EvidenceError::Io(e.into_error()))
}

/// Encode the header row alone.
fn encode_header() -> Result<Vec<u8>, EvidenceError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(EVIDENCE_HEADER)?;
    wtr.into_inner()
        .map_err(|e| EvidenceError::Io(e.into_error()))
}

/// Append-only audit sink for [`EvidenceRecord`]s.
#[async_trait]
pub trait EvidenceRecorder: Send + Sync {
    /// Append one record as a single atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError`] if the record could not be written.
    async fn append(&self, record: &EvidenceRecord) -> Result<(), EvidenceError>;

    /// Full contents of the trail, header included.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::NotFound`] if nothing was recorded.
    async fn export(&self) -> Result<Vec<u8>, EvidenceError>;
}

// ---------------------------------------------------------------------------
// CSV file
// ---------------------------------------------------------------------------

/// Evidence trail in a CSV file on disk.
#[derive(Debug)]
pub struct CsvEvidenceRecorder {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl CsvEvidenceRecorder {
    /// Open (or create) the CSV file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EvidenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `body`, preceded by `header` if the file is still empty, then sync.
fn append_sync(file: &Mutex<File>, header: &[u8], body: &[u8]) -> Result<(), EvidenceError> {
    let mut file = file.lock().map_err(|_| EvidenceError::Poisoned)?;
    if file.metadata()?.len() == 0 {
        let mut bytes = Vec::with_capacity(header.len().saturating_add(body.len()));
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(body);
        file.write_all(&bytes)?;
    } else {
        file.write_all(body)?;
    }
    file.flush()?;
    file.sync_data()?;
    Ok(())
}

fn read_all_sync(file: &Mutex<File>) -> Result<Vec<u8>, EvidenceError> {
    let mut file = file.lock().map_err(|_| EvidenceError::Poisoned)?;
    if file.metadata()?.len() == 0 {
        return Err(EvidenceError::NotFound);
    }
    let mut contents = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

#[async_trait]
impl EvidenceRecorder for CsvEvidenceRecorder {
    async fn append(&self, record: &EvidenceRecord) -> Result<(), EvidenceError> {
        let header = encode_header()?;
        let body = encode_record(record, false)?;
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || append_sync(&file, &header, &body)).await??;
        trace!(conversation_id = %record.conversation_id, "evidence record appended");
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, EvidenceError> {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || read_all_sync(&file)).await?
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Evidence trail held in memory; same encoding as the CSV file.
#[derive(Debug, Default)]
pub struct MemoryEvidenceRecorder {
    buf: Mutex<Vec<u8>>,
}

impl MemoryEvidenceRecorder {
    /// Create an empty trail.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvidenceRecorder for MemoryEvidenceRecorder {
    async fn append(&self, record: &EvidenceRecord) -> Result<(), EvidenceError> {
        let mut buf = self.buf.lock().map_err(|_| EvidenceError::Poisoned)?;
        let bytes = encode_record(record, buf.is_empty())?;
        buf.extend_from_slice(&bytes);
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, EvidenceError> {
        let buf = self.buf.lock().map_err(|_| EvidenceError::Poisoned)?;
        if buf.is_empty() {
            return Err(EvidenceError::NotFound);
        }
        Ok(buf.clone())
    }
}
