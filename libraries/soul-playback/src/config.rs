//! Player configuration
//!
//! Defaults cover every field, so an empty file or no file at all yields a
//! working player. Values are layered from an optional TOML file and then
//! `SOUL_PLAYBACK_*` environment variables.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use soul_timeline::RepeatMode;
use std::path::Path;
use std::time::Duration;

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Budget for detaching a replaced video output (default: 2000)
    pub detach_output_timeout_ms: u64,

    /// Budget for releasing the engine (default: 500)
    pub release_timeout_ms: u64,

    /// Budget for switching foreground mode, 0 waits forever (default: 0)
    pub foreground_mode_timeout_ms: u64,

    /// Step used by `seek_back` (default: 5000)
    pub seek_back_increment_ms: u64,

    /// Step used by `seek_forward` (default: 15000)
    pub seek_forward_increment_ms: u64,

    /// Furthest into an item `seek_to_previous` still goes to the previous
    /// item instead of restarting (default: 3000)
    pub max_seek_to_previous_position_ms: u64,

    /// Fail commands issued off the caller thread instead of warning once
    /// (default: true)
    pub fail_on_wrong_thread: bool,

    /// Pause at the end of each media item (default: false)
    pub pause_at_end_of_media_items: bool,

    /// Initial repeat mode (default: Off)
    pub repeat_mode: RepeatMode,

    /// Initial shuffle mode (default: false)
    pub shuffle_mode_enabled: bool,

    /// Seed of the initial shuffle order, random when unset
    pub shuffle_seed: Option<u64>,

    /// Initial audio volume, 0.0 to 1.0 (default: 1.0)
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            detach_output_timeout_ms: 2000,
            release_timeout_ms: 500,
            foreground_mode_timeout_ms: 0,
            seek_back_increment_ms: 5000,
            seek_forward_increment_ms: 15000,
            max_seek_to_previous_position_ms: 3000,
            fail_on_wrong_thread: true,
            pause_at_end_of_media_items: false,
            repeat_mode: RepeatMode::Off,
            shuffle_mode_enabled: false,
            shuffle_seed: None,
            volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            }
        }

        // SOUL_PLAYBACK_RELEASE_TIMEOUT_MS -> release_timeout_ms
        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_PLAYBACK").try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::Config(format!(
                "volume must be within 0.0..=1.0, got {}",
                self.volume
            )));
        }
        if self.detach_output_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "detach_output_timeout_ms must be positive".to_string(),
            ));
        }
        if self.release_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "release_timeout_ms must be positive".to_string(),
            ));
        }
        if self.seek_back_increment_ms == 0 || self.seek_forward_increment_ms == 0 {
            return Err(PlaybackError::Config(
                "seek increments must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn detach_output_timeout(&self) -> Duration {
        Duration::from_millis(self.detach_output_timeout_ms)
    }

    pub fn release_timeout(&self) -> Duration {
        Duration::from_millis(self.release_timeout_ms)
    }

    /// `None` when foreground mode switches may block indefinitely
    pub fn foreground_mode_timeout(&self) -> Option<Duration> {
        (self.foreground_mode_timeout_ms > 0)
            .then(|| Duration::from_millis(self.foreground_mode_timeout_ms))
    }
}
