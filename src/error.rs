//! Error types for castforge
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for castforge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structurally invalid audio attached to a cue
    ///
    /// Carries the zero-based cue index so callers can point at the
    /// offending cue. The merge is atomic: one bad cue fails the whole
    /// operation and nothing partial is returned.
    #[error("Malformed audio in cue {index}: {reason}")]
    MalformedAudioCue { index: usize, reason: String },

    /// Sample rate conversion errors
    #[error("Resample error: {0}")]
    Resample(String),

    /// Lossy encoder initialization or encode failure
    ///
    /// Callers treat this as a signal to fall back to the lossless path.
    #[error("Lossy encoding unavailable: {0}")]
    EncodingUnavailable(String),

    /// Still image could not be decoded or prepared for display
    #[error("Frame load error: {0}")]
    FrameLoad(String),

    /// Capture sink failed or went away mid-render
    ///
    /// Fatal for the render session: no partial video is ever returned.
    #[error("Capture sink failure: {0}")]
    CaptureSink(String),

    /// Render session was cancelled between cues
    #[error("Render cancelled")]
    Cancelled,

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Export manifest loading errors
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// WAV file read/write errors
    #[error("Audio file error: {0}")]
    AudioFile(#[from] hound::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using castforge Error
pub type Result<T> = std::result::Result<T, Error>;
