//! Lossy MP3 encoder
//!
//! Block-based mono CBR encoding through LAME. Every failure path maps to
//! `Error::EncodingUnavailable` so callers can fall back to the lossless
//! encoder; nothing in here panics on bad input.

use crate::audio::resample::downmix_to_mono;
use crate::audio::SampleBuffer;
use crate::config::ExportConfig;
use crate::encode::pcm;
use crate::encode::{AudioAssetKind, EncodedAudioAsset};
use crate::error::{Error, Result};
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

/// Samples fed to LAME per call, a multiple of the 1152-sample MP3 frame.
const ENCODE_BLOCK_FRAMES: usize = 1152 * 8;

/// Encode a buffer as mono CBR MP3 at the configured bitrate.
///
/// Multi-channel input is downmixed to mono first. Empty input is
/// reported as unavailable rather than producing a zero-frame file.
pub fn encode(buffer: &SampleBuffer, config: &ExportConfig) -> Result<EncodedAudioAsset> {
    if buffer.frames() == 0 {
        return Err(Error::EncodingUnavailable("no samples to encode".into()));
    }

    let bitrate = bitrate_step(config.lossy_bitrate_kbps).ok_or_else(|| {
        Error::EncodingUnavailable(format!(
            "no CBR step for {} kbps",
            config.lossy_bitrate_kbps
        ))
    })?;

    let mono = downmix_to_mono(buffer.channels());
    let samples = pcm::quantize_channel(&mono);

    let mut builder =
        Builder::new().ok_or_else(|| Error::EncodingUnavailable("LAME init failed".into()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| setup_error("channels", e))?;
    builder
        .set_sample_rate(buffer.sample_rate())
        .map_err(|e| setup_error("sample rate", e))?;
    builder
        .set_brate(bitrate)
        .map_err(|e| setup_error("bitrate", e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| setup_error("quality", e))?;
    let mut encoder = builder
        .build()
        .map_err(|e| Error::EncodingUnavailable(format!("LAME build failed: {:?}", e)))?;

    let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(samples.len()));
    for block in samples.chunks(ENCODE_BLOCK_FRAMES) {
        out.reserve(mp3lame_encoder::max_required_buffer_size(block.len()));
        let written = encoder
            .encode(MonoPcm(block), out.spare_capacity_mut())
            .map_err(|e| Error::EncodingUnavailable(format!("LAME encode failed: {:?}", e)))?;
        // Encoder wrote `written` initialized bytes into the spare capacity
        unsafe {
            out.set_len(out.len() + written);
        }
    }

    out.reserve(mp3lame_encoder::max_required_buffer_size(0));
    let written = encoder
        .flush::<FlushNoGap>(out.spare_capacity_mut())
        .map_err(|e| Error::EncodingUnavailable(format!("LAME flush failed: {:?}", e)))?;
    unsafe {
        out.set_len(out.len() + written);
    }

    debug!(
        "Encoded {} frames to {} MP3 bytes ({} kbps mono)",
        buffer.frames(),
        out.len(),
        config.lossy_bitrate_kbps
    );

    Ok(EncodedAudioAsset {
        bytes: out,
        kind: AudioAssetKind::Lossy,
        sample_rate: buffer.sample_rate(),
        channels: 1,
        duration: buffer.duration(),
    })
}

fn setup_error(what: &str, e: impl std::fmt::Debug) -> Error {
    Error::EncodingUnavailable(format!("LAME rejected {}: {:?}", what, e))
}

fn bitrate_step(kbps: u32) -> Option<Bitrate> {
    let step = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        _ => return None,
    };
    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(rate: u32, frames: usize) -> SampleBuffer {
        let samples: Vec<f32> = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        SampleBuffer::mono(rate, samples)
    }

    #[test]
    fn test_empty_input_is_unavailable() {
        let buffer = SampleBuffer::mono(44100, vec![]);
        let result = encode(&buffer, &ExportConfig::default());
        assert!(matches!(result, Err(Error::EncodingUnavailable(_))));
    }

    #[test]
    fn test_encode_produces_mp3_sync_word() {
        let asset = encode(&sine_buffer(44100, 22050), &ExportConfig::default()).unwrap();
        assert_eq!(asset.kind, AudioAssetKind::Lossy);
        assert_eq!(asset.channels, 1);
        assert!(asset.bytes.len() > 1000);
        // Every MP3 stream starts on a frame sync (11 set bits)
        assert_eq!(asset.bytes[0], 0xFF);
        assert_eq!(asset.bytes[1] & 0xE0, 0xE0);
    }

    #[test]
    fn test_encode_downmixes_stereo() {
        let buffer = SampleBuffer::stereo(44100, vec![0.5; 11025], vec![-0.5; 11025]);
        let asset = encode(&buffer, &ExportConfig::default()).unwrap();
        assert_eq!(asset.channels, 1);
    }

    #[test]
    fn test_encode_size_tracks_bitrate() {
        // Half a second at 128 kbps is about 8 KB
        let asset = encode(&sine_buffer(44100, 22050), &ExportConfig::default()).unwrap();
        assert!(
            asset.bytes.len() > 4_000 && asset.bytes.len() < 20_000,
            "unexpected size {}",
            asset.bytes.len()
        );
    }

    #[test]
    fn test_bitrate_step_mapping() {
        assert!(bitrate_step(128).is_some());
        assert!(bitrate_step(320).is_some());
        assert!(bitrate_step(100).is_none());
        assert!(bitrate_step(0).is_none());
    }
}
