//! Project manifest
//!
//! A JSON file describing one episode: the cue list plus the character
//! portrait and scene backdrop maps. Relative paths inside the manifest
//! resolve against the manifest's own directory, so a project folder can
//! be moved or checked out anywhere.
//!
//! Cue audio is WAV (any rate, mono or stereo, integer or float
//! samples); the merge stage normalizes it later. Images stay as raw
//! encoded bytes here and are decoded when first shown.

use crate::audio::SampleBuffer;
use crate::error::{Error, Result};
use crate::timeline::{CharacterRegistry, Cue, ImageSource, SceneRegistry, Timeline};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk manifest layout.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub cues: Vec<ManifestCue>,

    /// Character name to portrait image path
    #[serde(default)]
    pub characters: HashMap<String, PathBuf>,

    /// Scene location to backdrop image path
    #[serde(default)]
    pub scenes: HashMap<String, PathBuf>,
}

/// One cue entry. Every field is optional: a cue with no audio renders
/// as default silence, a cue with no visual holds the previous frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestCue {
    #[serde(default)]
    pub audio: Option<PathBuf>,

    #[serde(default)]
    pub image: Option<PathBuf>,

    #[serde(default)]
    pub speaker: Option<String>,

    #[serde(default)]
    pub location: Option<String>,
}

/// Load a manifest and every asset it references.
pub fn load_project(path: &Path) -> Result<(Timeline, CharacterRegistry, SceneRegistry)> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut timeline = Timeline::default();
    for (index, entry) in manifest.cues.iter().enumerate() {
        let mut cue = Cue::new();
        if let Some(audio_path) = &entry.audio {
            let buffer = load_wav(&resolve(base, audio_path))?;
            debug!(
                "Cue {}: {} frames at {}Hz from {}",
                index,
                buffer.frames(),
                buffer.sample_rate(),
                audio_path.display()
            );
            cue.audio = Some(buffer);
        }
        if let Some(image_path) = &entry.image {
            cue.image = Some(load_image(&resolve(base, image_path))?);
        }
        cue.speaker = entry.speaker.clone();
        cue.location = entry.location.clone();
        timeline.push(cue);
    }

    let mut cast = CharacterRegistry::new();
    for (name, portrait_path) in &manifest.characters {
        cast.insert(name, load_image(&resolve(base, portrait_path))?);
    }

    let mut scenes = SceneRegistry::new();
    for (location, backdrop_path) in &manifest.scenes {
        scenes.insert(location, load_image(&resolve(base, backdrop_path))?);
    }

    info!(
        "Loaded project {}: {} cues, {} portraits, {} backdrops",
        path.display(),
        timeline.len(),
        manifest.characters.len(),
        manifest.scenes.len()
    );
    Ok((timeline, cast, scenes))
}

fn resolve(base: &Path, relative: &Path) -> PathBuf {
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        base.join(relative)
    }
}

fn load_image(path: &Path) -> Result<ImageSource> {
    let bytes =
        fs::read(path).map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;
    Ok(ImageSource::Encoded(bytes))
}

/// Read a WAV file into a planar sample buffer.
///
/// Integer samples scale by 2^(bits-1) so full negative scale maps to
/// exactly -1.0. Anything beyond stereo is rejected here rather than
/// guessed at downstream.
fn load_wav(path: &Path) -> Result<SampleBuffer> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > 2 {
        return Err(Error::Manifest(format!(
            "{}: unsupported channel count {}",
            path.display(),
            spec.channels
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channel_count = spec.channels as usize;
    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    Ok(SampleBuffer::from_planar(spec.sample_rate, channels))
}
