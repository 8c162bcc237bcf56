use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::AudioError;
use super::session_models::{CategoryOptions, SessionCategory, SessionMode};

/// Period of the status poller. Fixed; not part of the configuration.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Largest tap block the input node will assemble, in frames.
pub const MAX_TAP_BUFFER_SIZE: u32 = 192_000;

/// Configuration for a [`HeadsetController`](crate::session::controller::HeadsetController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadsetConfig {
    /// Directory holding the bundled sound resources.
    pub bundle_dir: PathBuf,

    /// Resource played by `play_sound` when no name is given (default: "sound").
    pub sound_name: String,

    /// Input bus the recorder taps (default: 0).
    pub tap_bus: u32,

    /// Frames per tapped block (default: 8000).
    pub tap_buffer_size: u32,

    /// Session category applied by `configure_session` (default: play and record).
    pub category: SessionCategory,

    /// Session mode set together with the category (default: `SessionMode::Default`).
    pub mode: SessionMode,

    /// Category options (default: Bluetooth hands-free allowed).
    pub category_options: CategoryOptions,

    /// Upper bound on the frame capacity of a converted buffer.
    pub max_converted_frames: u32,
}

impl HeadsetConfig {
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sound_name.is_empty() {
            return Err(AudioError::InvalidConfiguration("sound name must not be empty".into()));
        }
        if self.tap_buffer_size == 0 || self.tap_buffer_size > MAX_TAP_BUFFER_SIZE {
            return Err(AudioError::InvalidConfiguration(format!(
                "tap buffer size must be in 1..={}, got {}",
                MAX_TAP_BUFFER_SIZE, self.tap_buffer_size
            )));
        }
        if self.max_converted_frames == 0 {
            return Err(AudioError::InvalidConfiguration(
                "max converted frames must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, AudioError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AudioError::InvalidConfiguration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            AudioError::InvalidConfiguration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("."),
            sound_name: "sound".into(),
            tap_bus: 0,
            tap_buffer_size: 8000,
            category: SessionCategory::PlayAndRecord,
            mode: SessionMode::Default,
            category_options: CategoryOptions {
                allow_bluetooth: true,
                ..CategoryOptions::default()
            },
            max_converted_frames: 48_000 * 600,
        }
    }
}
