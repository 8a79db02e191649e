//! Startup error taxonomy.
//!
//! Only startup preconditions are allowed to abort the process; once the
//! control loop is running, every per-frame failure (garbled serial lines,
//! transport write errors, store write errors) is logged and degraded
//! around. Those recoverable classes live with their modules
//! ([`crate::transport::TransportError`], [`crate::store::StoreError`]).

use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions detected before the control loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A required audio cue file is absent from the sound set. The show
    /// cannot present itself without its core cues.
    #[error("required sound cue {cue} missing from {dir}")]
    MissingSoundAsset {
        /// File stem of the missing cue.
        cue: String,
        /// Directory that was scanned.
        dir: PathBuf,
    },
}
