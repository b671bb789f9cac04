//! Capture sink
//!
//! A dedicated task that owns the muxer and consumes the render session's
//! output on the runtime clock. The session never touches container state
//! directly; it sends commands over a channel and learns about progress
//! through per-submission completion signals.
//!
//! Audio drives the clock: every accumulated frame interval of samples
//! produces one video tick (current frame + PCM chunk). Tick boundaries
//! use integer arithmetic on sample counts, so rates that do not divide
//! the frame rate evenly cannot drift.

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::video::avi::{AviConfig, AviMuxer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Commands from the render session to the sink task.
pub(crate) enum SinkCommand {
    /// Replace the frame used for subsequent video ticks
    UpdateFrame { jpeg: Arc<[u8]> },

    /// Consume interleaved PCM at the sink's configured layout;
    /// `done` fires once every sample is consumed
    SubmitAudio {
        samples: Vec<i16>,
        done: oneshot::Sender<()>,
    },

    /// Consume generated silence of the given length
    SubmitSilence {
        duration: Duration,
        done: oneshot::Sender<()>,
    },

    /// Finalize the container and reply with the finished asset
    Finish {
        reply: oneshot::Sender<Result<VideoAsset>>,
    },
}

/// Finished video export.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub bytes: Vec<u8>,
    pub frame_count: u32,
    pub frame_rate: u32,
}

impl VideoAsset {
    pub fn mime(&self) -> &'static str {
        "video/x-msvideo"
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count as f64 / self.frame_rate as f64)
    }
}

/// Cheap-to-clone sender half of the sink protocol.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<SinkCommand>,
}

impl CaptureHandle {
    pub(crate) fn from_sender(tx: mpsc::Sender<SinkCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: SinkCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::CaptureSink("capture sink is gone".into()))
    }

    /// Switch the frame shown from the next video tick on.
    pub async fn update_frame(&self, jpeg: Arc<[u8]>) -> Result<()> {
        self.send(SinkCommand::UpdateFrame { jpeg }).await
    }

    /// Submit interleaved PCM; the returned receiver fires on full
    /// consumption.
    pub async fn submit_audio(&self, samples: Vec<i16>) -> Result<oneshot::Receiver<()>> {
        let (done, done_rx) = oneshot::channel();
        self.send(SinkCommand::SubmitAudio { samples, done }).await?;
        Ok(done_rx)
    }

    /// Submit silence of the given length.
    pub async fn submit_silence(&self, duration: Duration) -> Result<oneshot::Receiver<()>> {
        let (done, done_rx) = oneshot::channel();
        self.send(SinkCommand::SubmitSilence { duration, done })
            .await?;
        Ok(done_rx)
    }

    /// Finalize and collect the asset. Consumes the handle: no chunk can
    /// sneak in after the container is closed.
    pub async fn finish(self) -> Result<VideoAsset> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(SinkCommand::Finish { reply }).await?;
        reply_rx
            .await
            .map_err(|_| Error::CaptureSink("capture sink dropped before finalize".into()))?
    }
}

/// Spawn a sink task for one render session.
///
/// `initial_frame` is shown until the first `update_frame`. The task ends
/// on `Finish` or when every handle is dropped; in the latter case the
/// container is discarded, which is exactly what a cancelled session
/// needs.
pub fn spawn(config: &ExportConfig, initial_frame: Arc<[u8]>) -> CaptureHandle {
    let (tx, rx) = mpsc::channel(16);
    let task = SinkTask {
        muxer: AviMuxer::new(AviConfig::from(config)),
        current_frame: initial_frame,
        sample_rate: config.target_sample_rate,
        channels: config.target_channels,
        frame_rate: config.frame_rate,
        frame_interval: config.frame_interval(),
        realtime: config.realtime_pacing,
        carry: Vec::new(),
        ticks: 0,
    };
    tokio::spawn(task.run(rx));
    CaptureHandle::from_sender(tx)
}

struct SinkTask {
    muxer: AviMuxer,
    current_frame: Arc<[u8]>,
    sample_rate: u32,
    channels: u16,
    frame_rate: u32,
    frame_interval: Duration,
    realtime: bool,
    /// Interleaved samples waiting for the next tick boundary
    carry: Vec<i16>,
    /// Video ticks emitted so far
    ticks: u64,
}

impl SinkTask {
    async fn run(mut self, mut rx: mpsc::Receiver<SinkCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                SinkCommand::UpdateFrame { jpeg } => {
                    debug!("Sink frame updated ({} JPEG bytes)", jpeg.len());
                    self.current_frame = jpeg;
                }
                SinkCommand::SubmitAudio { samples, done } => {
                    self.consume(samples).await;
                    let _ = done.send(());
                }
                SinkCommand::SubmitSilence { duration, done } => {
                    let frames = self.silence_frames(duration);
                    self.consume(vec![0i16; frames * self.channels as usize])
                        .await;
                    let _ = done.send(());
                }
                SinkCommand::Finish { reply } => {
                    let asset = self.finalize();
                    let _ = reply.send(Ok(asset));
                    return;
                }
            }
        }
        debug!("Capture sink closed without finalize; output discarded");
    }

    fn silence_frames(&self, duration: Duration) -> usize {
        (duration.as_micros() as u64 * self.sample_rate as u64 / 1_000_000) as usize
    }

    /// Samples-per-channel making up tick `n`, via cumulative integer
    /// boundaries: ((n+1)*rate/fps) - (n*rate/fps).
    fn tick_frames(&self, tick: u64) -> usize {
        let rate = self.sample_rate as u64;
        let fps = self.frame_rate as u64;
        (((tick + 1) * rate / fps) - (tick * rate / fps)) as usize
    }

    /// Move samples through tick boundaries, emitting one video chunk and
    /// one audio chunk per completed tick.
    async fn consume(&mut self, samples: Vec<i16>) {
        let channels = self.channels as usize;
        self.carry.extend_from_slice(&samples);

        loop {
            let need = self.tick_frames(self.ticks) * channels;
            if self.carry.len() < need {
                break;
            }
            let rest = self.carry.split_off(need);
            let tick_samples = std::mem::replace(&mut self.carry, rest);
            self.emit_tick(&tick_samples);

            if self.realtime {
                tokio::time::sleep(self.frame_interval).await;
            }
        }
    }

    fn emit_tick(&mut self, tick_samples: &[i16]) {
        self.muxer.push_video_frame(Arc::clone(&self.current_frame));
        self.muxer.push_audio_samples(tick_samples);
        self.ticks += 1;
    }

    /// Pad the trailing partial tick with silence and assemble the file.
    fn finalize(mut self) -> VideoAsset {
        if !self.carry.is_empty() {
            let need = self.tick_frames(self.ticks) * self.channels as usize;
            let mut tail = std::mem::take(&mut self.carry);
            tail.resize(need, 0);
            self.emit_tick(&tail);
        }

        let frame_count = self.muxer.video_frame_count();
        let frame_rate = self.frame_rate;
        let bytes = self.muxer.finish();
        info!(
            "Capture finalized: {} frames at {} fps, {} bytes",
            frame_count,
            frame_rate,
            bytes.len()
        );
        VideoAsset {
            bytes,
            frame_count,
            frame_rate,
        }
    }
}
