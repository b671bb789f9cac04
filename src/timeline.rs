//! Drama timeline model
//!
//! A timeline is an ordered list of cues produced by script generation.
//! Each cue may carry synthesized audio, a still image, a speaking
//! character, and a scene location. Export operations never reorder or
//! drop cues.

use crate::audio::SampleBuffer;
use crate::config::ExportConfig;
use image::DynamicImage;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Image attached to a cue, a character, or a scene.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already-decoded pixel data
    Decoded(DynamicImage),
    /// Encoded bytes (PNG, JPEG, ...) decoded lazily at render time
    Encoded(Vec<u8>),
}

/// One cue of the drama: a line of dialogue, a sound effect, or a
/// scene-setting beat.
#[derive(Debug, Clone)]
pub struct Cue {
    /// Stable cue identity
    pub id: Uuid,

    /// Synthesized audio for this cue, if any
    pub audio: Option<SampleBuffer>,

    /// Image shown while this cue plays, if any
    pub image: Option<ImageSource>,

    /// Speaking character name, used for portrait lookup
    pub speaker: Option<String>,

    /// Scene location name, used for backdrop lookup
    pub location: Option<String>,
}

impl Cue {
    /// Create an empty cue with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            audio: None,
            image: None,
            speaker: None,
            location: None,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Logical duration of this cue on the rendered timeline.
    ///
    /// Audio-bearing cues last as long as their audio; cues without audio
    /// occupy the configured default silence length.
    pub fn duration(&self, config: &ExportConfig) -> Duration {
        match &self.audio {
            Some(buffer) => buffer.duration(),
            None => config.default_silence(),
        }
    }
}

impl Default for Cue {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered cue list for one drama episode.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    cues: Vec<Cue>,
}

impl Timeline {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn push(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Total duration of audio attached to cues (merged-audio length,
    /// no default silences or pauses)
    pub fn audio_duration(&self) -> Duration {
        self.cues
            .iter()
            .filter_map(|cue| cue.audio.as_ref())
            .map(|buffer| buffer.duration())
            .sum()
    }

    /// Total rendered duration: cue durations plus the inter-cue pause
    /// between consecutive cues (none after the last)
    pub fn rendered_duration(&self, config: &ExportConfig) -> Duration {
        let cue_time: Duration = self.cues.iter().map(|cue| cue.duration(config)).sum();
        let pauses = self.cues.len().saturating_sub(1) as u32;
        cue_time + config.inter_cue_pause() * pauses
    }
}

/// Character name to portrait image map.
#[derive(Debug, Clone, Default)]
pub struct CharacterRegistry {
    portraits: HashMap<String, ImageSource>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, portrait: ImageSource) {
        self.portraits.insert(name.into(), portrait);
    }

    pub fn portrait(&self, name: &str) -> Option<&ImageSource> {
        self.portraits.get(name)
    }
}

/// Scene location to backdrop image map.
#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    backdrops: HashMap<String, ImageSource>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, backdrop: ImageSource) {
        self.backdrops.insert(location.into(), backdrop);
    }

    pub fn backdrop(&self, location: &str) -> Option<&ImageSource> {
        self.backdrops.get(location)
    }
}
