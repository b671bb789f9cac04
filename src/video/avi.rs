//! RIFF/AVI muxer
//!
//! Packs MJPEG video chunks and 16-bit PCM audio chunks into a classic
//! AVI file: one `hdrl` header list, an interleaved `movi` list, and an
//! `idx1` index. Assembly is deferred to `finish()` so every size field
//! is written exactly once and the output is deterministic for a given
//! chunk sequence.
//!
//! Held frames are pushed as shared byte slices, so a minute of a single
//! still costs one JPEG plus pointers.

use crate::config::ExportConfig;
use std::sync::Arc;
use tracing::debug;

const AVIF_HASINDEX: u32 = 0x0000_0010;
const AVIF_ISINTERLEAVED: u32 = 0x0000_0100;
const AVIIF_KEYFRAME: u32 = 0x0000_0010;

/// Stream parameters the container is built around.
#[derive(Debug, Clone)]
pub struct AviConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl From<&ExportConfig> for AviConfig {
    fn from(config: &ExportConfig) -> Self {
        Self {
            width: config.frame_width,
            height: config.frame_height,
            frame_rate: config.frame_rate,
            sample_rate: config.target_sample_rate,
            channels: config.target_channels,
        }
    }
}

enum MoviChunk {
    Video(Arc<[u8]>),
    Audio(Vec<u8>),
}

pub struct AviMuxer {
    config: AviConfig,
    chunks: Vec<MoviChunk>,
    video_frames: u32,
    audio_frames: u64,
    max_video_chunk: u32,
    max_audio_chunk: u32,
}

impl AviMuxer {
    pub fn new(config: AviConfig) -> Self {
        Self {
            config,
            chunks: Vec::new(),
            video_frames: 0,
            audio_frames: 0,
            max_video_chunk: 0,
            max_audio_chunk: 0,
        }
    }

    /// Append one MJPEG frame.
    pub fn push_video_frame(&mut self, jpeg: Arc<[u8]>) {
        self.max_video_chunk = self.max_video_chunk.max(jpeg.len() as u32);
        self.video_frames += 1;
        self.chunks.push(MoviChunk::Video(jpeg));
    }

    /// Append interleaved PCM samples as one audio chunk.
    pub fn push_audio_samples(&mut self, samples: &[i16]) {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        self.max_audio_chunk = self.max_audio_chunk.max(bytes.len() as u32);
        self.audio_frames += (samples.len() / self.config.channels as usize) as u64;
        self.chunks.push(MoviChunk::Audio(bytes));
    }

    pub fn video_frame_count(&self) -> u32 {
        self.video_frames
    }

    pub fn audio_frame_count(&self) -> u64 {
        self.audio_frames
    }

    /// Assemble the complete AVI byte sequence.
    pub fn finish(self) -> Vec<u8> {
        let (movi_data, idx_data) = self.build_movi_and_index();
        let hdrl = self.build_hdrl();

        // RIFF payload: "AVI " + hdrl list + movi list + idx1 chunk
        let riff_size =
            4 + (8 + 4 + hdrl.len()) + (8 + 4 + movi_data.len()) + (8 + idx_data.len());

        let mut out = Vec::with_capacity(8 + riff_size);
        push_fourcc(&mut out, b"RIFF");
        push_u32(&mut out, riff_size as u32);
        push_fourcc(&mut out, b"AVI ");

        push_list_header(&mut out, b"hdrl", hdrl.len());
        out.extend_from_slice(&hdrl);

        push_list_header(&mut out, b"movi", movi_data.len());
        out.extend_from_slice(&movi_data);

        push_fourcc(&mut out, b"idx1");
        push_u32(&mut out, idx_data.len() as u32);
        out.extend_from_slice(&idx_data);

        debug!(
            "Finalized AVI: {} video frames, {} audio frames, {} bytes",
            self.video_frames,
            self.audio_frames,
            out.len()
        );
        out
    }

    /// Serialize movi chunk data (without the list header) and the
    /// matching idx1 entries. Index offsets are relative to the position
    /// of the `movi` fourcc, so the first chunk sits at offset 4.
    fn build_movi_and_index(&self) -> (Vec<u8>, Vec<u8>) {
        let mut movi = Vec::new();
        let mut idx = Vec::new();

        for chunk in &self.chunks {
            let (tag, data): (&[u8; 4], &[u8]) = match chunk {
                MoviChunk::Video(jpeg) => (b"00dc", jpeg),
                MoviChunk::Audio(pcm) => (b"01wb", pcm),
            };

            push_fourcc(&mut idx, tag);
            push_u32(&mut idx, AVIIF_KEYFRAME);
            push_u32(&mut idx, 4 + movi.len() as u32);
            push_u32(&mut idx, data.len() as u32);

            push_fourcc(&mut movi, tag);
            push_u32(&mut movi, data.len() as u32);
            movi.extend_from_slice(data);
            if data.len() % 2 == 1 {
                movi.push(0); // chunks are WORD aligned; pad not counted in size
            }
        }

        (movi, idx)
    }

    fn build_hdrl(&self) -> Vec<u8> {
        let mut hdrl = Vec::with_capacity(294);
        push_chunk(&mut hdrl, b"avih", &self.build_avih());

        let mut video_strl = Vec::with_capacity(116);
        push_chunk(&mut video_strl, b"strh", &self.build_video_strh());
        push_chunk(&mut video_strl, b"strf", &self.build_video_format());
        push_list_header(&mut hdrl, b"strl", video_strl.len());
        hdrl.extend_from_slice(&video_strl);

        let mut audio_strl = Vec::with_capacity(94);
        push_chunk(&mut audio_strl, b"strh", &self.build_audio_strh());
        push_chunk(&mut audio_strl, b"strf", &self.build_audio_format());
        push_list_header(&mut hdrl, b"strl", audio_strl.len());
        hdrl.extend_from_slice(&audio_strl);

        hdrl
    }

    fn byte_rate(&self) -> u32 {
        self.config.sample_rate * self.block_align() as u32
    }

    fn block_align(&self) -> u16 {
        self.config.channels * 2
    }

    fn build_avih(&self) -> Vec<u8> {
        let max_bytes_per_sec = self.byte_rate() as u64
            + self.max_video_chunk as u64 * self.config.frame_rate as u64;

        let mut avih = Vec::with_capacity(56);
        push_u32(&mut avih, 1_000_000 / self.config.frame_rate); // microseconds per frame
        push_u32(&mut avih, max_bytes_per_sec.min(u32::MAX as u64) as u32);
        push_u32(&mut avih, 0); // padding granularity
        push_u32(&mut avih, AVIF_HASINDEX | AVIF_ISINTERLEAVED);
        push_u32(&mut avih, self.video_frames);
        push_u32(&mut avih, 0); // initial frames
        push_u32(&mut avih, 2); // streams
        push_u32(&mut avih, self.max_video_chunk.max(self.max_audio_chunk));
        push_u32(&mut avih, self.config.width);
        push_u32(&mut avih, self.config.height);
        avih.extend_from_slice(&[0u8; 16]); // reserved
        avih
    }

    fn build_video_strh(&self) -> Vec<u8> {
        let mut strh = Vec::with_capacity(56);
        push_fourcc(&mut strh, b"vids");
        push_fourcc(&mut strh, b"MJPG");
        push_u32(&mut strh, 0); // flags
        push_u16(&mut strh, 0); // priority
        push_u16(&mut strh, 0); // language
        push_u32(&mut strh, 0); // initial frames
        push_u32(&mut strh, 1); // scale
        push_u32(&mut strh, self.config.frame_rate); // rate: rate/scale = fps
        push_u32(&mut strh, 0); // start
        push_u32(&mut strh, self.video_frames); // length in frames
        push_u32(&mut strh, self.max_video_chunk);
        push_u32(&mut strh, u32::MAX); // quality: driver default
        push_u32(&mut strh, 0); // sample size: varies per chunk
        push_u16(&mut strh, 0); // rcFrame left
        push_u16(&mut strh, 0); // rcFrame top
        push_u16(&mut strh, self.config.width as u16); // rcFrame right
        push_u16(&mut strh, self.config.height as u16); // rcFrame bottom
        strh
    }

    /// BITMAPINFOHEADER for the MJPEG stream.
    fn build_video_format(&self) -> Vec<u8> {
        let mut strf = Vec::with_capacity(40);
        push_u32(&mut strf, 40); // header size
        push_i32(&mut strf, self.config.width as i32);
        push_i32(&mut strf, self.config.height as i32);
        push_u16(&mut strf, 1); // planes
        push_u16(&mut strf, 24); // bits per pixel
        push_fourcc(&mut strf, b"MJPG"); // compression
        push_u32(&mut strf, self.config.width * self.config.height * 3);
        push_i32(&mut strf, 0); // x pixels per meter
        push_i32(&mut strf, 0); // y pixels per meter
        push_u32(&mut strf, 0); // colors used
        push_u32(&mut strf, 0); // colors important
        strf
    }

    fn build_audio_strh(&self) -> Vec<u8> {
        let block_align = self.block_align();

        let mut strh = Vec::with_capacity(56);
        push_fourcc(&mut strh, b"auds");
        push_u32(&mut strh, 0); // handler
        push_u32(&mut strh, 0); // flags
        push_u16(&mut strh, 0); // priority
        push_u16(&mut strh, 0); // language
        push_u32(&mut strh, 0); // initial frames
        push_u32(&mut strh, block_align as u32); // scale
        push_u32(&mut strh, self.byte_rate()); // rate: rate/scale = frames per second
        push_u32(&mut strh, 0); // start
        push_u32(&mut strh, self.audio_frames as u32); // length in sample frames
        push_u32(&mut strh, self.max_audio_chunk);
        push_u32(&mut strh, u32::MAX); // quality
        push_u32(&mut strh, block_align as u32); // sample size
        strh.extend_from_slice(&[0u8; 8]); // rcFrame unused for audio
        strh
    }

    /// WAVEFORMATEX for the PCM stream.
    fn build_audio_format(&self) -> Vec<u8> {
        let mut strf = Vec::with_capacity(18);
        push_u16(&mut strf, 1); // PCM format tag
        push_u16(&mut strf, self.config.channels);
        push_u32(&mut strf, self.config.sample_rate);
        push_u32(&mut strf, self.byte_rate());
        push_u16(&mut strf, self.block_align());
        push_u16(&mut strf, 16); // bits per sample
        push_u16(&mut strf, 0); // no extension bytes
        strf
    }
}

fn push_fourcc(out: &mut Vec<u8>, tag: &[u8; 4]) {
    out.extend_from_slice(tag);
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_chunk(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    push_fourcc(out, tag);
    push_u32(out, payload.len() as u32);
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// Write "LIST" + size + kind; the caller appends `payload_len` bytes.
fn push_list_header(out: &mut Vec<u8>, kind: &[u8; 4], payload_len: usize) {
    push_fourcc(out, b"LIST");
    push_u32(out, 4 + payload_len as u32);
    push_fourcc(out, kind);
}
