//! Visual frame selection
//!
//! Decides which image represents a cue on screen. Selection never fails:
//! a cue with no resolvable visual yields `None` and the caller holds the
//! previously shown frame.

use crate::error::{Error, Result};
use crate::timeline::{CharacterRegistry, Cue, ImageSource, SceneRegistry};
use image::DynamicImage;

/// Pick the image for a cue, first match wins:
/// 1. the cue's own image
/// 2. the speaking character's portrait
/// 3. the scene location's backdrop
/// 4. none (hold the previous frame)
pub fn select_frame<'a>(
    cue: &'a Cue,
    cast: &'a CharacterRegistry,
    scenes: &'a SceneRegistry,
) -> Option<&'a ImageSource> {
    if let Some(image) = &cue.image {
        return Some(image);
    }
    if let Some(speaker) = &cue.speaker {
        if let Some(portrait) = cast.portrait(speaker) {
            return Some(portrait);
        }
    }
    if let Some(location) = &cue.location {
        if let Some(backdrop) = scenes.backdrop(location) {
            return Some(backdrop);
        }
    }
    None
}

/// Decode an image source into pixels.
pub fn decode(source: &ImageSource) -> Result<DynamicImage> {
    match source {
        ImageSource::Decoded(image) => Ok(image.clone()),
        ImageSource::Encoded(bytes) => image::load_from_memory(bytes)
            .map_err(|e| Error::FrameLoad(format!("image decode failed: {}", e))),
    }
}
