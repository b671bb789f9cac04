//! Core audio data types
//!
//! Defines the sample buffer structure used throughout the export pipeline.

use std::time::Duration;

/// SampleBuffer holds PCM audio for one cue or one merged timeline.
///
/// **Format:**
/// - Samples are f32 (floating point, nominal range -1.0 to 1.0)
/// - Planar: one `Vec<f32>` per channel, all channels the same length
/// - 1 channel (mono) or 2 channels (stereo)
///
/// Buffers are immutable after construction; every transformation
/// (channel adaptation, resampling, merging) produces a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Create a mono buffer
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// Create a stereo buffer from left and right channel data
    pub fn stereo(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![left, right],
        }
    }

    /// Create a buffer from planar channel data
    pub fn from_planar(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Create a buffer of silence with the given frame count
    pub fn silence(sample_rate: u32, channel_count: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channel_count as usize],
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Planar channel data
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Duration as a std Duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds())
    }

    /// Interleave channel data for PCM encoding.
    ///
    /// Output pattern for stereo: [L, R, L, R, ...]; mono passes through.
    pub fn interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels.len();
        if num_channels == 1 {
            return self.channels[0].clone();
        }

        let num_frames = self.frames();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);
        for frame_idx in 0..num_frames {
            for channel in &self.channels {
                interleaved.push(channel[frame_idx]);
            }
        }
        interleaved
    }

    /// Check structural soundness, returning the first defect found.
    ///
    /// A buffer is malformed when it has zero or more than two channels,
    /// when channel lengths disagree, or when any sample is NaN/infinite.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.channels.is_empty() {
            return Err("no channels".to_string());
        }
        if self.channels.len() > 2 {
            return Err(format!("{} channels, at most 2 supported", self.channels.len()));
        }

        let first_len = self.channels[0].len();
        for (idx, channel) in self.channels.iter().enumerate() {
            if channel.len() != first_len {
                return Err(format!(
                    "channel {} has {} samples, channel 0 has {}",
                    idx,
                    channel.len(),
                    first_len
                ));
            }
            if let Some(pos) = channel.iter().position(|s| !s.is_finite()) {
                return Err(format!("non-finite sample at channel {} frame {}", idx, pos));
            }
        }
        Ok(())
    }
}

/// Clamp every sample to [-1.0, 1.0] to prevent clipping downstream.
pub fn clamp_channels(channels: &mut [Vec<f32>]) {
    for channel in channels {
        for sample in channel.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}
