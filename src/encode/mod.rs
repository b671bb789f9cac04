//! Audio asset encoders
//!
//! Two output paths share one quantizer: a lossless RIFF/WAVE encoder that
//! always succeeds for structurally valid input, and a lossy MP3 encoder
//! that may be unavailable. [`encode_with_fallback`] ties them together so
//! the export path always yields a playable asset.

pub mod mp3;
pub mod pcm;
pub mod wav;

use crate::audio::SampleBuffer;
use crate::config::ExportConfig;
use std::time::Duration;
use tracing::warn;

/// Which encoder produced an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAssetKind {
    /// RIFF/WAVE with 16-bit PCM
    Lossless,
    /// Mono CBR MP3
    Lossy,
}

impl AudioAssetKind {
    pub fn mime(&self) -> &'static str {
        match self {
            AudioAssetKind::Lossless => "audio/wav",
            AudioAssetKind::Lossy => "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioAssetKind::Lossless => "wav",
            AudioAssetKind::Lossy => "mp3",
        }
    }
}

/// Finished audio export: encoded bytes plus enough metadata for feeds
/// and file naming.
#[derive(Debug, Clone)]
pub struct EncodedAudioAsset {
    pub bytes: Vec<u8>,
    pub kind: AudioAssetKind,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
}

impl EncodedAudioAsset {
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}

/// Encode for distribution, preferring lossy.
///
/// Any lossy failure recovers locally to the lossless path; it never
/// propagates. Callers learn which format they got from `asset.kind`.
pub fn encode_with_fallback(buffer: &SampleBuffer, config: &ExportConfig) -> EncodedAudioAsset {
    match mp3::encode(buffer, config) {
        Ok(asset) => asset,
        Err(e) => {
            warn!("Lossy encoding unavailable ({}), falling back to lossless WAV", e);
            wav::encode(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_metadata() {
        assert_eq!(AudioAssetKind::Lossless.mime(), "audio/wav");
        assert_eq!(AudioAssetKind::Lossy.mime(), "audio/mpeg");
        assert_eq!(AudioAssetKind::Lossless.extension(), "wav");
        assert_eq!(AudioAssetKind::Lossy.extension(), "mp3");
    }

    #[test]
    fn test_fallback_on_empty_input_yields_lossless() {
        // Zero samples make the lossy encoder unavailable; the fallback
        // must still produce a valid (header-only) lossless asset.
        let buffer = SampleBuffer::stereo(44100, vec![], vec![]);
        let asset = encode_with_fallback(&buffer, &ExportConfig::default());
        assert_eq!(asset.kind, AudioAssetKind::Lossless);
        assert_eq!(asset.bytes.len(), wav::WAV_HEADER_LEN);
    }

    #[test]
    fn test_prefers_lossy_when_available() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 0.05).sin() * 0.4)
            .collect();
        let buffer = SampleBuffer::mono(44100, samples);
        let asset = encode_with_fallback(&buffer, &ExportConfig::default());
        assert_eq!(asset.kind, AudioAssetKind::Lossy);
        assert_eq!(asset.channels, 1);
    }
}
