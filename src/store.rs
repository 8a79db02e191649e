//! Durable score state: the persisted record and its file-backed store.
//!
//! Every mutating operator action writes the full record synchronously, so a
//! power cut immediately after a keypress never loses the keypress before
//! it. Reads are tolerant: a missing or malformed file means compiled-in
//! defaults, never a startup failure.

use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::session::SEATS;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by state stores regardless of the backing medium.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("state store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The record on disk does not parse.
    #[error("state record is malformed: {0}")]
    Malformed(#[source] Box<dyn Error + Send + Sync>),
}

/// The durable subset of session state: names, scores, and the display
/// orientation flag. Deliberately small and unversioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Player display names in seat order.
    pub player_names: [String; SEATS],
    /// Scores in seat order; negative values are legal.
    pub scores: [i64; SEATS],
    /// Whether the display is drawn inverted.
    pub invert_display: bool,
}

/// Abstraction over the persistence medium for the score record.
pub trait StateStore {
    /// Synchronously write the record.
    fn save(&mut self, record: &PersistedState) -> StoreResult<()>;
    /// Read the record. `Ok(None)` when no record exists yet.
    fn restore(&mut self) -> StoreResult<Option<PersistedState>>;
}

/// JSON file store, the production backend.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store the record at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn save(&mut self, record: &PersistedState) -> StoreResult<()> {
        let body = serde_json::to_string_pretty(record)
            .map_err(|err| StoreError::Malformed(Box::new(err)))?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    fn restore(&mut self) -> StoreResult<Option<PersistedState>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record = serde_json::from_str(&contents)
            .map_err(|err| StoreError::Malformed(Box::new(err)))?;
        Ok(Some(record))
    }
}
