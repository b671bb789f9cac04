//! Render surface
//!
//! A fixed-geometry RGB canvas that shows one still at a time. Images are
//! scaled to fit with aspect ratio preserved, centered, and letterboxed
//! on black. Each successful draw replaces the current frame; failures
//! leave it untouched, which is how frame holding works.

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::timeline::ImageSource;
use crate::video::frame;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{imageops, ExtendedColorType, ImageEncoder, RgbImage};
use std::sync::Arc;
use tracing::debug;

pub struct RenderSurface {
    width: u32,
    height: u32,
    jpeg_quality: u8,
    current: Arc<[u8]>,
}

impl RenderSurface {
    /// Create a surface showing a black frame.
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let canvas = RgbImage::new(config.frame_width, config.frame_height);
        let current = encode_jpeg(&canvas, config.jpeg_quality)?;
        Ok(Self {
            width: config.frame_width,
            height: config.frame_height,
            jpeg_quality: config.jpeg_quality,
            current: current.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// JPEG bytes of the frame currently on the surface.
    pub fn current_frame(&self) -> Arc<[u8]> {
        Arc::clone(&self.current)
    }

    /// Draw an image source onto the surface and return the encoded frame.
    ///
    /// On any decode or encode failure the previous frame stays current.
    pub fn show(&mut self, source: &ImageSource) -> Result<Arc<[u8]>> {
        let decoded = frame::decode(source)?;
        let scaled = decoded.resize(self.width, self.height, FilterType::Triangle);

        let mut canvas = RgbImage::new(self.width, self.height);
        let x = (self.width - scaled.width()) / 2;
        let y = (self.height - scaled.height()) / 2;
        imageops::overlay(&mut canvas, &scaled.to_rgb8(), x as i64, y as i64);

        let jpeg: Arc<[u8]> = encode_jpeg(&canvas, self.jpeg_quality)?.into();
        debug!(
            "Surface shows {}x{} image as {} JPEG bytes at ({}, {})",
            scaled.width(),
            scaled.height(),
            jpeg.len(),
            x,
            y
        );
        self.current = Arc::clone(&jpeg);
        Ok(jpeg)
    }
}

fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::FrameLoad(format!("JPEG encode failed: {}", e)))?;
    Ok(bytes)
}
