//! Timeline audio merging
//!
//! Collapses every audio-bearing cue into one continuous buffer at the
//! export target format. Cues are converted one at a time and written
//! back-to-back at running sample offsets computed from converted frame
//! counts, never from wall-clock estimates.

use crate::audio::buffer::SampleBuffer;
use crate::audio::resample::convert_to_target;
use crate::error::{Error, Result};
use crate::timeline::Timeline;
use tracing::{debug, info};

/// Merge all cue audio into one buffer at `target_rate` / `target_channels`.
///
/// Cues without audio contribute zero samples and do not shift later
/// offsets. Validation runs over the whole timeline before any conversion
/// starts: one malformed cue fails the merge atomically with that cue's
/// index, and nothing partial is returned.
pub fn merge(timeline: &Timeline, target_rate: u32, target_channels: u16) -> Result<SampleBuffer> {
    if target_rate == 0 {
        return Err(Error::Config("merge target_rate must be non-zero".into()));
    }
    if target_channels == 0 || target_channels > 2 {
        return Err(Error::Config(format!(
            "merge target_channels must be 1 or 2, got {}",
            target_channels
        )));
    }

    // Validate everything up front so a late defect cannot waste the
    // conversion work already done, and the failure is atomic.
    for (index, cue) in timeline.cues().iter().enumerate() {
        if let Some(buffer) = &cue.audio {
            buffer
                .validate()
                .map_err(|reason| Error::MalformedAudioCue { index, reason })?;
        }
    }

    let mut converted: Vec<(usize, SampleBuffer)> = Vec::new();
    let mut total_frames = 0usize;

    for (index, cue) in timeline.cues().iter().enumerate() {
        let Some(buffer) = &cue.audio else {
            continue;
        };
        let cue_buffer = convert_to_target(buffer, target_rate, target_channels)?;
        total_frames += cue_buffer.frames();
        converted.push((index, cue_buffer));
    }

    let mut channels: Vec<Vec<f32>> =
        vec![Vec::with_capacity(total_frames); target_channels as usize];
    let mut offset = 0usize;

    for (index, cue_buffer) in &converted {
        debug!(
            "Cue {} occupies frames {}..{}",
            index,
            offset,
            offset + cue_buffer.frames()
        );
        for (channel, cue_channel) in channels.iter_mut().zip(cue_buffer.channels()) {
            channel.extend_from_slice(cue_channel);
        }
        offset += cue_buffer.frames();
    }

    info!(
        "Merged {} audio cues ({} total) into {} frames at {}Hz/{}ch",
        converted.len(),
        timeline.len(),
        total_frames,
        target_rate,
        target_channels
    );

    Ok(SampleBuffer::from_planar(target_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Cue;

    fn cue_with_audio(buffer: SampleBuffer) -> Cue {
        let mut cue = Cue::new();
        cue.audio = Some(buffer);
        cue
    }

    #[test]
    fn test_merge_empty_timeline() {
        let merged = merge(&Timeline::default(), 44100, 2).unwrap();
        assert_eq!(merged.frames(), 0);
        assert_eq!(merged.sample_rate(), 44100);
        assert_eq!(merged.channel_count(), 2);
    }

    #[test]
    fn test_merge_rejects_bad_target() {
        let timeline = Timeline::default();
        assert!(matches!(merge(&timeline, 0, 2), Err(Error::Config(_))));
        assert!(matches!(merge(&timeline, 44100, 0), Err(Error::Config(_))));
        assert!(matches!(merge(&timeline, 44100, 5), Err(Error::Config(_))));
    }

    #[test]
    fn test_merge_concatenates_in_order_at_exact_offsets() {
        let mut timeline = Timeline::default();
        timeline.push(cue_with_audio(SampleBuffer::mono(44100, vec![0.25; 1000])));
        timeline.push(cue_with_audio(SampleBuffer::mono(44100, vec![-0.5; 500])));

        let merged = merge(&timeline, 44100, 1).unwrap();
        assert_eq!(merged.frames(), 1500);

        let data = &merged.channels()[0];
        assert!(data[..1000].iter().all(|&s| s == 0.25));
        assert!(data[1000..].iter().all(|&s| s == -0.5));
    }

    #[test]
    fn test_merge_resamples_heterogeneous_rates() {
        // 1.0s at 24kHz + image-only cue + 0.5s at 24kHz -> 1.5s at 44.1kHz
        let mut timeline = Timeline::default();
        timeline.push(cue_with_audio(SampleBuffer::mono(24000, vec![0.1; 24000])));
        timeline.push(Cue::new());
        timeline.push(cue_with_audio(SampleBuffer::mono(24000, vec![0.1; 12000])));

        let merged = merge(&timeline, 44100, 2).unwrap();
        assert_eq!(merged.frames(), 66150);
        assert_eq!(merged.sample_rate(), 44100);
        assert_eq!(merged.channel_count(), 2);
    }

    #[test]
    fn test_merge_audio_less_cues_shift_nothing() {
        let mut with_silence = Timeline::default();
        with_silence.push(Cue::new());
        with_silence.push(cue_with_audio(SampleBuffer::mono(44100, vec![0.3; 100])));
        with_silence.push(Cue::new());

        let merged = merge(&with_silence, 44100, 1).unwrap();
        assert_eq!(merged.frames(), 100);
        assert!(merged.channels()[0].iter().all(|&s| s == 0.3));
    }

    #[test]
    fn test_merge_malformed_cue_reports_index() {
        let mut timeline = Timeline::default();
        timeline.push(cue_with_audio(SampleBuffer::mono(44100, vec![0.1; 10])));
        timeline.push(Cue::new());
        timeline.push(cue_with_audio(SampleBuffer::mono(
            44100,
            vec![0.1, f32::NAN, 0.1],
        )));

        match merge(&timeline, 44100, 2) {
            Err(Error::MalformedAudioCue { index, reason }) => {
                assert_eq!(index, 2);
                assert!(reason.contains("non-finite"));
            }
            other => panic!("expected MalformedAudioCue, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_merge_mixed_layouts() {
        let mut timeline = Timeline::default();
        timeline.push(cue_with_audio(SampleBuffer::stereo(
            44100,
            vec![0.4; 200],
            vec![0.2; 200],
        )));
        timeline.push(cue_with_audio(SampleBuffer::mono(44100, vec![0.6; 100])));

        let merged = merge(&timeline, 44100, 1).unwrap();
        assert_eq!(merged.frames(), 300);

        let data = &merged.channels()[0];
        // Stereo cue averaged to mono, mono cue passed through
        assert!(data[..200].iter().all(|&s| (s - 0.3).abs() < 1e-6));
        assert!(data[200..].iter().all(|&s| (s - 0.6).abs() < 1e-6));
    }
}
