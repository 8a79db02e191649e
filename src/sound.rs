//! Audio cues: names, required-asset checking, and the playback seam.
//!
//! Decoding and mixing belong to the audio backend; the game core only names
//! cues and verifies at startup that every required cue file exists, since
//! the show cannot run credibly without its buzz and time's-up sounds.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StartupError;
use crate::state::session::Seat;

/// An audio cue the state machine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Short confirmation/warning beep.
    Beep,
    /// The shared buzzer sound.
    Buzz,
    /// Countdown reached zero.
    TimesUp,
    /// Per-seat buzz-in sound, used when unique player sounds are enabled.
    Player(Seat),
}

impl Cue {
    /// File stem for this cue inside the sound set directory.
    pub fn stem(self) -> String {
        match self {
            Cue::Beep => "BEEP".into(),
            Cue::Buzz => "BUZZ".into(),
            Cue::TimesUp => "TIMESUP".into(),
            Cue::Player(seat) => format!("PLAYER{}", seat.wire()),
        }
    }

    /// Every cue the sound set must provide for startup to succeed.
    pub fn required() -> Vec<Cue> {
        let mut cues = vec![Cue::Beep, Cue::Buzz, Cue::TimesUp];
        cues.extend(Seat::all().map(Cue::Player));
        cues
    }
}

/// Resolved cue-to-file mapping, built once at startup.
#[derive(Debug)]
pub struct SoundBank {
    paths: HashMap<Cue, PathBuf>,
}

impl SoundBank {
    /// Scan `dir` for files with `extension` and resolve every required cue.
    ///
    /// A missing required cue is a startup precondition failure, not a
    /// runtime concern; the process should refuse to start.
    pub fn load(dir: &Path, extension: &str) -> Result<Self, StartupError> {
        let mut stems = HashMap::new();
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let matches_ext = path
                    .extension()
                    .is_some_and(|ext| format!(".{}", ext.to_string_lossy()) == extension);
                if !matches_ext {
                    continue;
                }
                if let Some(stem) = path.file_stem() {
                    stems.insert(stem.to_string_lossy().into_owned(), path.clone());
                    debug!(path = %path.display(), "found sound file");
                }
            }
        }

        let mut paths = HashMap::new();
        for cue in Cue::required() {
            match stems.get(&cue.stem()) {
                Some(path) => {
                    paths.insert(cue, path.clone());
                }
                None => {
                    return Err(StartupError::MissingSoundAsset {
                        cue: cue.stem(),
                        dir: dir.to_path_buf(),
                    });
                }
            }
        }

        info!(dir = %dir.display(), cues = paths.len(), "sound cues resolved");
        Ok(Self { paths })
    }

    /// File backing a cue. Required cues always resolve after a successful
    /// [`SoundBank::load`].
    pub fn path_for(&self, cue: Cue) -> Option<&Path> {
        self.paths.get(&cue).map(PathBuf::as_path)
    }
}

/// Playback seam consumed by the control loop. The real mixer lives outside
/// the game core; tests substitute a recording double.
pub trait SoundPlayer {
    /// Start playing a cue. Fire-and-forget; overlapping cues are allowed.
    fn play(&mut self, cue: Cue);
}

/// Default player: resolves the cue against the bank and logs the playback
/// request for the external audio collaborator.
pub struct CuePlayer {
    bank: SoundBank,
}

impl CuePlayer {
    /// Wrap a verified sound bank.
    pub fn new(bank: SoundBank) -> Self {
        Self { bank }
    }
}

impl SoundPlayer for CuePlayer {
    fn play(&mut self, cue: Cue) {
        match self.bank.path_for(cue) {
            Some(path) => debug!(cue = %cue.stem(), path = %path.display(), "play cue"),
            None => debug!(cue = %cue.stem(), "play cue (no file resolved)"),
        }
    }
}
