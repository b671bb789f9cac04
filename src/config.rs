//! Configuration management for castforge
//!
//! A single TOML file (all fields optional) plus built-in defaults. Settings
//! cannot change during an export; each exported asset is produced under one
//! immutable `ExportConfig`.
//!
//! Settings sources priority:
//! 1. Command-line arguments
//! 2. TOML configuration file
//! 3. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// CBR bitrate steps the MP3 encoder accepts, in kbps.
pub const LOSSY_BITRATE_STEPS: [u32; 16] = [
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Export configuration
///
/// Covers the merged-audio target format, timing of the rendered timeline,
/// the video frame geometry, and encoder settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Sample rate of merged audio in Hz
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Channel count of merged audio (1 = mono, 2 = stereo)
    #[serde(default = "default_target_channels")]
    pub target_channels: u16,

    /// Silence generated for cues without audio, in milliseconds
    #[serde(default = "default_silence_ms")]
    pub default_silence_ms: u64,

    /// Pause between consecutive cues during video rendering, in milliseconds
    ///
    /// Not inserted after the final cue.
    #[serde(default = "default_inter_cue_pause_ms")]
    pub inter_cue_pause_ms: u64,

    /// Margin added to a cue's nominal duration when waiting for the
    /// capture sink's completion signal, in milliseconds
    #[serde(default = "default_completion_timeout_margin_ms")]
    pub completion_timeout_margin_ms: u64,

    /// Video frame width in pixels
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    /// Video frame height in pixels
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    /// Video frame rate in frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// JPEG quality for video frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// CBR bitrate for the lossy audio encoder in kbps
    ///
    /// Must be one of [`LOSSY_BITRATE_STEPS`].
    #[serde(default = "default_lossy_bitrate_kbps")]
    pub lossy_bitrate_kbps: u32,

    /// Pace the capture sink on the wall clock
    ///
    /// When false, rendering runs as fast as the sink can consume while
    /// keeping the identical submission/completion protocol.
    #[serde(default = "default_realtime_pacing")]
    pub realtime_pacing: bool,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_target_sample_rate() -> u32 {
    44100
}

fn default_target_channels() -> u16 {
    2
}

fn default_silence_ms() -> u64 {
    2000
}

fn default_inter_cue_pause_ms() -> u64 {
    200
}

fn default_completion_timeout_margin_ms() -> u64 {
    100
}

fn default_frame_width() -> u32 {
    1280
}

fn default_frame_height() -> u32 {
    720
}

fn default_frame_rate() -> u32 {
    15
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_lossy_bitrate_kbps() -> u32 {
    128
}

fn default_realtime_pacing() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: default_target_sample_rate(),
            target_channels: default_target_channels(),
            default_silence_ms: default_silence_ms(),
            inter_cue_pause_ms: default_inter_cue_pause_ms(),
            completion_timeout_margin_ms: default_completion_timeout_margin_ms(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            frame_rate: default_frame_rate(),
            jpeg_quality: default_jpeg_quality(),
            lossy_bitrate_kbps: default_lossy_bitrate_kbps(),
            realtime_pacing: default_realtime_pacing(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;

        let config: ExportConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;

        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.target_sample_rate == 0 {
            return Err(Error::Config("target_sample_rate must be non-zero".into()));
        }
        if self.target_channels == 0 || self.target_channels > 2 {
            return Err(Error::Config(format!(
                "target_channels must be 1 or 2, got {}",
                self.target_channels
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(Error::Config(format!(
                "frame geometry must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if self.frame_rate == 0 || self.frame_rate > 60 {
            return Err(Error::Config(format!(
                "frame_rate must be 1-60, got {}",
                self.frame_rate
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(Error::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if !LOSSY_BITRATE_STEPS.contains(&self.lossy_bitrate_kbps) {
            return Err(Error::Config(format!(
                "lossy_bitrate_kbps must be one of {:?}, got {}",
                LOSSY_BITRATE_STEPS, self.lossy_bitrate_kbps
            )));
        }
        Ok(())
    }

    /// Silence length used for cues carrying no audio
    pub fn default_silence(&self) -> Duration {
        Duration::from_millis(self.default_silence_ms)
    }

    /// Pause inserted between consecutive cues
    pub fn inter_cue_pause(&self) -> Duration {
        Duration::from_millis(self.inter_cue_pause_ms)
    }

    /// Completion wait margin on top of a cue's nominal duration
    pub fn completion_timeout_margin(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_margin_ms)
    }

    /// Duration of one video frame at the configured frame rate
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate as f64)
    }
}
