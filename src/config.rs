//! Application configuration: clock rules, transport selection, pin maps,
//! sound set, and file locations.
//!
//! Loaded once at startup from a JSON file. A missing or malformed file is
//! never fatal; the compiled-in defaults describe a complete working setup
//! and every field in the file is optional.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::session::{SEATS, SessionRules};

/// Default location on disk where the game looks for its JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/buzzdeck.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BUZZDECK_CONFIG_PATH";

/// Which transport backend to bind at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Raspberry Pi GPIO pins (requires the `gpio` build feature).
    Gpio,
    /// Serial-connected button/LED board (requires the `serial` feature).
    Serial,
    /// Pure simulation; buzz-ins come from the keyboard.
    Sim,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Show title used for logging and presentation.
    pub title: String,
    /// Selected transport backend. Startup may still demote `Serial` to
    /// `Sim` when the device is absent.
    pub platform: Platform,
    /// Serial device path for the `Serial` platform.
    pub serial_device: String,
    /// BCM input pins wired to the four buttons, in seat order.
    pub button_pins: [u8; SEATS],
    /// BCM output pins wired to the four LEDs, in seat order.
    pub led_pins: [u8; SEATS],
    /// Countdown starting value in milliseconds.
    pub max_clock_ms: u64,
    /// Clock tick size in milliseconds.
    pub clock_step_ms: u64,
    /// Whether the countdown runs at all.
    pub clock_enabled: bool,
    /// Control loop frame rate in hertz.
    pub frame_rate: u32,
    /// Play per-seat buzz cues instead of the shared one.
    pub unique_player_sounds: bool,
    /// Directory scanned for cue files.
    pub sound_dir: PathBuf,
    /// Extension (with dot) of cue files.
    pub sound_ext: String,
    /// Location of the persisted score record.
    pub state_file: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// The subset of configuration the session aggregate carries.
    pub fn session_rules(&self) -> SessionRules {
        SessionRules {
            max_clock_ms: self.max_clock_ms,
            clock_step_ms: self.clock_step_ms,
            clock_enabled: self.clock_enabled,
            unique_player_sounds: self.unique_player_sounds,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Buzzdeck".into(),
            platform: Platform::Serial,
            serial_device: "/dev/ttyUSB0".into(),
            button_pins: [16, 17, 18, 19],
            led_pins: [20, 21, 22, 23],
            max_clock_ms: 60_000,
            clock_step_ms: 1_000,
            clock_enabled: true,
            frame_rate: 60,
            unique_player_sounds: false,
            sound_dir: PathBuf::from("sounds"),
            sound_ext: ".wav".into(),
            state_file: PathBuf::from("buzzdeck-state.json"),
        }
    }
}

/// JSON representation of the configuration file. Every field is optional
/// and defaults to the built-in value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    title: Option<String>,
    platform: Option<Platform>,
    serial_device: Option<String>,
    button_pins: Option<[u8; SEATS]>,
    led_pins: Option<[u8; SEATS]>,
    max_clock_ms: Option<u64>,
    clock_step_ms: Option<u64>,
    clock_enabled: Option<bool>,
    frame_rate: Option<u32>,
    unique_player_sounds: Option<bool>,
    sound_dir: Option<PathBuf>,
    sound_ext: Option<String>,
    state_file: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let base = AppConfig::default();
        Self {
            title: raw.title.unwrap_or(base.title),
            platform: raw.platform.unwrap_or(base.platform),
            serial_device: raw.serial_device.unwrap_or(base.serial_device),
            button_pins: raw.button_pins.unwrap_or(base.button_pins),
            led_pins: raw.led_pins.unwrap_or(base.led_pins),
            max_clock_ms: raw.max_clock_ms.unwrap_or(base.max_clock_ms),
            clock_step_ms: raw.clock_step_ms.unwrap_or(base.clock_step_ms).max(1),
            clock_enabled: raw.clock_enabled.unwrap_or(base.clock_enabled),
            frame_rate: raw.frame_rate.unwrap_or(base.frame_rate).max(1),
            unique_player_sounds: raw.unique_player_sounds.unwrap_or(base.unique_player_sounds),
            sound_dir: raw.sound_dir.unwrap_or(base.sound_dir),
            sound_ext: raw.sound_ext.unwrap_or(base.sound_ext),
            state_file: raw.state_file.unwrap_or(base.state_file),
        }
    }
}

/// Resolve the configuration path taking the environment override into
/// account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overlays_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"platform": "sim", "max_clock_ms": 30000}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.platform, Platform::Sim);
        assert_eq!(config.max_clock_ms, 30_000);
        assert_eq!(config.clock_step_ms, 1_000);
        assert_eq!(config.button_pins, [16, 17, 18, 19]);
    }

    #[test]
    fn zero_step_and_frame_rate_are_clamped() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"clock_step_ms": 0, "frame_rate": 0}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.clock_step_ms, 1);
        assert_eq!(config.frame_rate, 1);
    }

    #[test]
    fn session_rules_mirror_clock_fields() {
        let config = AppConfig::default();
        let rules = config.session_rules();
        assert_eq!(rules.max_clock_ms, config.max_clock_ms);
        assert_eq!(rules.clock_step_ms, config.clock_step_ms);
        assert_eq!(rules.clock_enabled, config.clock_enabled);
    }
}
