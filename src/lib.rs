//! # Castforge Episode Exporter (castforge)
//!
//! Audio and video export for AI-drama episodes.
//!
//! **Purpose:** Merge per-cue speech into one normalized track, encode it
//! losslessly (WAV) or lossily (MP3) with automatic fallback, and render a
//! cue timeline to a synchronized MJPEG/PCM video container.
//!
//! **Architecture:** Offline pipeline: rubato resampling into a single
//! sample buffer, block-based LAME encoding, and a channel-driven capture
//! sink task that paces video ticks off accumulated audio.

pub mod audio;
pub mod config;
pub mod encode;
pub mod error;
pub mod events;
pub mod manifest;
pub mod timeline;
pub mod video;

pub use audio::{merge, SampleBuffer};
pub use config::ExportConfig;
pub use encode::{encode_with_fallback, AudioAssetKind, EncodedAudioAsset};
pub use error::{Error, Result};
pub use events::RenderEvent;
pub use timeline::{CharacterRegistry, Cue, ImageSource, SceneRegistry, Timeline};
pub use video::{render_video, CancelHandle, RenderSession, RenderState, VideoAsset};
