//! Float to 16-bit PCM quantization
//!
//! One quantizer shared by every encoder and the video capture sink, so
//! all audio outputs agree bit-for-bit.

use crate::audio::SampleBuffer;

/// Quantize one float sample to i16.
///
/// Scaling is asymmetric on purpose: positive values scale by 32767,
/// negative by 32768, so the full i16 range including -32768 is reachable.
/// Out-of-range input is clamped before scaling. Rounds half away from
/// zero.
#[inline]
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s >= 0.0 {
        (s * 32767.0).round() as i16
    } else {
        (s * 32768.0).round() as i16
    }
}

/// Quantize a single channel.
pub fn quantize_channel(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(quantize_sample).collect()
}

/// Quantize a buffer into interleaved i16 PCM.
pub fn quantize_interleaved(buffer: &SampleBuffer) -> Vec<i16> {
    quantize_channel(&buffer.interleaved())
}

/// Append interleaved i16 samples as little-endian bytes.
pub fn extend_le_bytes(out: &mut Vec<u8>, samples: &[i16]) {
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}
