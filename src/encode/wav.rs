//! Lossless RIFF/WAVE encoder
//!
//! Produces a canonical 44-byte header followed by interleaved 16-bit
//! little-endian PCM. Deterministic: the same input always yields the
//! same bytes. This is the guaranteed fallback output when the lossy
//! encoder is unavailable.

use crate::audio::SampleBuffer;
use crate::encode::pcm;
use crate::encode::{AudioAssetKind, EncodedAudioAsset};
use tracing::debug;

/// Canonical PCM WAV header length in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Encode a buffer as 16-bit PCM WAV.
///
/// Infallible for structurally valid buffers; an empty buffer yields a
/// header-only file.
pub fn encode(buffer: &SampleBuffer) -> EncodedAudioAsset {
    let samples = pcm::quantize_interleaved(buffer);
    let data_len = samples.len() * 2;

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    write_header(
        &mut bytes,
        buffer.sample_rate(),
        buffer.channel_count(),
        data_len as u32,
    );
    pcm::extend_le_bytes(&mut bytes, &samples);

    debug!(
        "Encoded {} frames to {} WAV bytes ({}Hz/{}ch)",
        buffer.frames(),
        bytes.len(),
        buffer.sample_rate(),
        buffer.channel_count()
    );

    EncodedAudioAsset {
        bytes,
        kind: AudioAssetKind::Lossless,
        sample_rate: buffer.sample_rate(),
        channels: buffer.channel_count(),
        duration: buffer.duration(),
    }
}

/// Write the canonical 44-byte PCM header.
///
/// Layout: RIFF chunk wrapping a 16-byte "fmt " chunk (PCM tag, layout,
/// rates) and the "data" chunk whose payload follows.
fn write_header(out: &mut Vec<u8>, sample_rate: u32, channels: u16, data_len: u32) {
    let block_align = channels * 2;
    let byte_rate = sample_rate * block_align as u32;

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
}
