//! Builders for cues, sample buffers, and images used across
//! integration tests.

use castforge::{Cue, ImageSource, SampleBuffer};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Mono buffer holding one constant sample value.
///
/// Constants survive resampling almost exactly away from the edges,
/// which makes cue boundaries easy to locate in merged output.
pub fn constant_mono(sample_rate: u32, frames: usize, value: f32) -> SampleBuffer {
    SampleBuffer::mono(sample_rate, vec![value; frames])
}

/// Mono sine tone at moderate level.
pub fn sine_mono(sample_rate: u32, frames: usize, freq: f32) -> SampleBuffer {
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * freq * t).sin() * 0.6
        })
        .collect();
    SampleBuffer::mono(sample_rate, samples)
}

/// Solid-color PNG as an attachable image source.
pub fn png_image(r: u8, g: u8, b: u8) -> ImageSource {
    let canvas = RgbImage::from_pixel(16, 16, Rgb([r, g, b]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding of a solid canvas cannot fail");
    ImageSource::Encoded(bytes)
}

/// Cue carrying only audio.
pub fn audio_cue(buffer: SampleBuffer) -> Cue {
    let mut cue = Cue::new();
    cue.audio = Some(buffer);
    cue
}

/// Cue carrying only an image.
pub fn image_cue(image: ImageSource) -> Cue {
    let mut cue = Cue::new();
    cue.image = Some(image);
    cue
}
