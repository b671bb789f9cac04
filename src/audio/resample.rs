//! Sample rate and channel layout normalization using rubato
//!
//! Converts heterogeneous cue audio to the export target format. Output
//! lengths are pinned by integer arithmetic so per-cue sample counts are
//! deterministic and merge offsets accumulate exactly.

use crate::audio::buffer::{clamp_channels, SampleBuffer};
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Zero frames appended to the resampler input so the polynomial
/// interpolator never runs short at the tail. The output is truncated
/// back to the exact target length.
const TAIL_PAD_FRAMES: usize = 32;

/// Exact number of output frames when converting `frames` from
/// `input_rate` to `output_rate`: ceil(frames * output_rate / input_rate).
pub fn converted_frame_count(frames: usize, input_rate: u32, output_rate: u32) -> usize {
    if frames == 0 {
        return 0;
    }
    let numerator = frames as u64 * output_rate as u64;
    ((numerator + input_rate as u64 - 1) / input_rate as u64) as usize
}

/// Convert a buffer to the target sample rate and channel count.
///
/// Channel adaptation: stereo collapses to mono by averaging, mono expands
/// to stereo by duplication. Downmixing happens before resampling (half the
/// work), upmixing after. The result is clamped to [-1.0, 1.0].
pub fn convert_to_target(
    buffer: &SampleBuffer,
    target_rate: u32,
    target_channels: u16,
) -> Result<SampleBuffer> {
    let source_channels = buffer.channel_count();

    let mut channels: Vec<Vec<f32>> = if target_channels < source_channels {
        vec![downmix_to_mono(buffer.channels())]
    } else {
        buffer.channels().to_vec()
    };

    channels = resample_planar(&channels, buffer.sample_rate(), target_rate)?;

    if target_channels == 2 && channels.len() == 1 {
        let mono = channels[0].clone();
        channels.push(mono);
    }

    clamp_channels(&mut channels);
    Ok(SampleBuffer::from_planar(target_rate, channels))
}

/// Average stereo channels into a single mono channel.
pub fn downmix_to_mono(channels: &[Vec<f32>]) -> Vec<f32> {
    if channels.len() == 1 {
        return channels[0].clone();
    }
    channels[0]
        .iter()
        .zip(channels[1].iter())
        .map(|(l, r)| (l + r) * 0.5)
        .collect()
}

/// Resample planar audio to the output rate.
///
/// If the input is already at the output rate, returns a copy without
/// resampling. Otherwise uses rubato's `FastFixedIn` with a septic
/// polynomial, processing the whole buffer as one chunk, and fits the
/// result to [`converted_frame_count`] frames.
pub fn resample_planar(
    channels: &[Vec<f32>],
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<Vec<f32>>> {
    if input_rate == output_rate {
        debug!("Sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(channels.to_vec());
    }

    let input_frames = channels.first().map(|c| c.len()).unwrap_or(0);
    if input_frames == 0 {
        return Ok(channels.iter().map(|_| Vec::new()).collect());
    }

    let target_frames = converted_frame_count(input_frames, input_rate, output_rate);

    debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels, {} frames out)",
        input_frames,
        input_rate,
        output_rate,
        channels.len(),
        target_frames
    );

    // Pad the tail so the interpolator has enough frames to emit the full
    // target length, then truncate back.
    let padded: Vec<Vec<f32>> = channels
        .iter()
        .map(|c| {
            let mut padded = Vec::with_capacity(c.len() + TAIL_PAD_FRAMES);
            padded.extend_from_slice(c);
            padded.resize(c.len() + TAIL_PAD_FRAMES, 0.0);
            padded
        })
        .collect();

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0, // max_relative_ratio (no runtime changes)
        PolynomialDegree::Septic,
        input_frames + TAIL_PAD_FRAMES,
        channels.len(),
    )
    .map_err(|e| Error::Resample(format!("Failed to create resampler: {}", e)))?;

    let mut output = resampler
        .process(&padded, None)
        .map_err(|e| Error::Resample(format!("Resampling failed: {}", e)))?;

    for channel in output.iter_mut() {
        if channel.len() < target_frames {
            channel.resize(target_frames, 0.0);
        } else {
            channel.truncate(target_frames);
        }
    }

    Ok(output)
}
