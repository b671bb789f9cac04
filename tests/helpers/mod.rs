//! Test helper modules for castforge integration tests
//!
//! Provides reusable test infrastructure components:
//! - media: timeline, sample buffer, and image builders
//! - avi_inspect: RIFF walker for checking exported containers

pub mod avi_inspect;
pub mod media;

// Re-export commonly used helpers
pub use avi_inspect::{audio_payload_bytes, movi_chunks, video_payloads, MoviChunk};
pub use media::{audio_cue, constant_mono, image_cue, png_image, sine_mono};
