//! Render session
//!
//! Walks a timeline cue by cue, pairing visuals with audio against the
//! capture sink. One session renders one video; sessions share nothing,
//! so two exports can run side by side.
//!
//! Per cue the session resolves a frame, submits audio (or generated
//! silence), then waits for the sink's completion signal bounded by the
//! cue's nominal duration plus a configured margin. A missed signal is
//! a soft degradation: logged, reported as an event, and rendering moves
//! on. Cancellation takes effect between cues, never mid-cue.

use crate::audio::resample::convert_to_target;
use crate::config::ExportConfig;
use crate::encode::pcm;
use crate::error::{Error, Result};
use crate::events::{RenderEvent, RenderEvents};
use crate::timeline::{CharacterRegistry, SceneRegistry, Timeline};
use crate::video::capture::{self, CaptureHandle, VideoAsset};
use crate::video::frame::select_frame;
use crate::video::surface::RenderSurface;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle of a render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Created, not yet rendering
    Idle,
    /// Rendering the cue at this index
    Rendering(usize),
    /// All cues done, finalizing the container
    Flushing,
    /// Finished with a complete asset
    Done,
    /// Failed or cancelled; no asset
    Failed,
}

/// Cancellation flag shared with whoever needs to stop a render.
///
/// Requests are honored between cues: the current cue finishes, queued
/// sink output is discarded, and the session ends with
/// [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One video export in progress.
pub struct RenderSession {
    config: ExportConfig,
    state: RenderState,
    events: RenderEvents,
    cancel: CancelHandle,
}

impl RenderSession {
    pub fn new(config: ExportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: RenderState::Idle,
            events: RenderEvents::default(),
            cancel: CancelHandle::new(),
        })
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Handle for cancelling this session from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Subscribe to this session's progress events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RenderEvent> {
        self.events.subscribe()
    }

    /// Render the timeline to a video asset.
    ///
    /// Single-shot: a session that has run, in any outcome, rejects
    /// further calls with `InvalidState`.
    pub async fn render(
        &mut self,
        timeline: &Timeline,
        cast: &CharacterRegistry,
        scenes: &SceneRegistry,
    ) -> Result<VideoAsset> {
        let surface = RenderSurface::new(&self.config)?;
        let handle = capture::spawn(&self.config, surface.current_frame());
        self.render_with_sink(timeline, cast, scenes, surface, handle)
            .await
    }

    /// Render against a caller-supplied sink handle. Lets tests drive the
    /// sink side of the protocol.
    pub(crate) async fn render_with_sink(
        &mut self,
        timeline: &Timeline,
        cast: &CharacterRegistry,
        scenes: &SceneRegistry,
        mut surface: RenderSurface,
        handle: CaptureHandle,
    ) -> Result<VideoAsset> {
        if self.state != RenderState::Idle {
            return Err(Error::InvalidState(format!(
                "render already ran (state {:?})",
                self.state
            )));
        }

        info!(
            "Render started: {} cues at {}x{} {}fps",
            timeline.len(),
            self.config.frame_width,
            self.config.frame_height,
            self.config.frame_rate
        );
        self.events.emit(RenderEvent::RenderStarted {
            cues: timeline.len(),
            timestamp: Utc::now(),
        });

        match self
            .run_cues(timeline, cast, scenes, &mut surface, &handle)
            .await
        {
            Ok(()) => {
                self.state = RenderState::Flushing;
                self.events.emit(RenderEvent::Flushing {
                    timestamp: Utc::now(),
                });
                match handle.finish().await {
                    Ok(asset) => {
                        self.state = RenderState::Done;
                        info!(
                            "Render done: {} frames, {:.1}s",
                            asset.frame_count,
                            asset.duration().as_secs_f64()
                        );
                        self.events.emit(RenderEvent::RenderCompleted {
                            frames: asset.frame_count,
                            timestamp: Utc::now(),
                        });
                        Ok(asset)
                    }
                    Err(e) => Err(self.fail(e)),
                }
            }
            Err(Error::Cancelled) => {
                // Dropping the handle tears the sink down and discards
                // everything it captured.
                drop(handle);
                self.state = RenderState::Failed;
                warn!("Render cancelled; sink output discarded");
                self.events.emit(RenderEvent::RenderCancelled {
                    timestamp: Utc::now(),
                });
                Err(Error::Cancelled)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        self.state = RenderState::Failed;
        error!("Render failed: {}", e);
        self.events.emit(RenderEvent::RenderFailed {
            reason: e.to_string(),
            timestamp: Utc::now(),
        });
        e
    }

    async fn run_cues(
        &mut self,
        timeline: &Timeline,
        cast: &CharacterRegistry,
        scenes: &SceneRegistry,
        surface: &mut RenderSurface,
        handle: &CaptureHandle,
    ) -> Result<()> {
        // Reject structurally bad audio before any capture happens
        for (index, cue) in timeline.cues().iter().enumerate() {
            if let Some(buffer) = &cue.audio {
                buffer
                    .validate()
                    .map_err(|reason| Error::MalformedAudioCue { index, reason })?;
            }
        }

        let pause = self.config.inter_cue_pause();

        for (index, cue) in timeline.cues().iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if index > 0 && !pause.is_zero() {
                let done_rx = handle.submit_silence(pause).await?;
                self.await_completion(index, pause, done_rx).await?;
            }

            self.state = RenderState::Rendering(index);
            self.events.emit(RenderEvent::CueStarted {
                index,
                cue_id: cue.id,
                has_audio: cue.has_audio(),
                timestamp: Utc::now(),
            });

            match select_frame(cue, cast, scenes) {
                Some(source) => match surface.show(source) {
                    Ok(jpeg) => handle.update_frame(jpeg).await?,
                    Err(e) => {
                        // The previous frame stays on screen for this cue
                        warn!("Cue {} visual failed ({}), holding frame", index, e);
                    }
                },
                None => debug!("Cue {} has no visual, holding frame", index),
            }

            let nominal = cue.duration(&self.config);
            let done_rx = match &cue.audio {
                Some(buffer) => {
                    let converted = convert_to_target(
                        buffer,
                        self.config.target_sample_rate,
                        self.config.target_channels,
                    )?;
                    handle
                        .submit_audio(pcm::quantize_interleaved(&converted))
                        .await?
                }
                None => handle.submit_silence(self.config.default_silence()).await?,
            };

            self.await_completion(index, nominal, done_rx).await?;
            self.events.emit(RenderEvent::CueFinished {
                index,
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    /// Wait for the sink to finish a submission, bounded by the nominal
    /// duration plus the configured margin. Overruns are soft: log, emit,
    /// move on. A closed completion channel means the sink died, which is
    /// fatal.
    async fn await_completion(
        &self,
        index: usize,
        nominal: Duration,
        done_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        let budget = nominal + self.config.completion_timeout_margin();
        let started = Instant::now();

        match tokio::time::timeout(budget, done_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::CaptureSink(
                "completion channel closed mid-cue".into(),
            )),
            Err(_) => {
                let waited = started.elapsed();
                warn!(
                    "Cue {} completion overran its {}ms budget, continuing",
                    index,
                    budget.as_millis()
                );
                self.events.emit(RenderEvent::PlaybackTimedOut {
                    index,
                    waited_ms: waited.as_millis() as u64,
                    timestamp: Utc::now(),
                });
                Ok(())
            }
        }
    }
}

/// Render a timeline to video with a fresh single-use session.
pub async fn render_video(
    timeline: &Timeline,
    cast: &CharacterRegistry,
    scenes: &SceneRegistry,
    config: &ExportConfig,
) -> Result<VideoAsset> {
    let mut session = RenderSession::new(config.clone())?;
    session.render(timeline, cast, scenes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::timeline::Cue;
    use crate::video::capture::SinkCommand;
    use tokio::sync::mpsc;

    fn test_config() -> ExportConfig {
        ExportConfig {
            frame_width: 32,
            frame_height: 32,
            frame_rate: 10,
            inter_cue_pause_ms: 0,
            realtime_pacing: false,
            ..Default::default()
        }
    }

    fn audio_cue(frames: usize) -> Cue {
        let mut cue = Cue::new();
        cue.audio = Some(SampleBuffer::mono(44100, vec![0.1; frames]));
        cue
    }

    fn empty_registries() -> (CharacterRegistry, SceneRegistry) {
        (CharacterRegistry::new(), SceneRegistry::new())
    }

    /// Sink stub that acknowledges everything immediately and replies to
    /// Finish with a minimal asset. Optionally cancels a session after
    /// the first audio submission.
    fn spawn_stub_sink(cancel_after_first: Option<CancelHandle>) -> CaptureHandle {
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut submissions = 0usize;
            while let Some(command) = rx.recv().await {
                match command {
                    SinkCommand::UpdateFrame { .. } => {}
                    SinkCommand::SubmitAudio { done, .. }
                    | SinkCommand::SubmitSilence { done, .. } => {
                        submissions += 1;
                        if submissions == 1 {
                            if let Some(cancel) = &cancel_after_first {
                                cancel.cancel();
                            }
                        }
                        let _ = done.send(());
                    }
                    SinkCommand::Finish { reply } => {
                        let _ = reply.send(Ok(VideoAsset {
                            bytes: vec![0; 8],
                            frame_count: 0,
                            frame_rate: 10,
                        }));
                        return;
                    }
                }
            }
        });
        CaptureHandle::from_sender(tx)
    }

    /// Sink stub that never acknowledges submissions but still finalizes.
    fn spawn_mute_sink() -> CaptureHandle {
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Some(command) = rx.recv().await {
                match command {
                    SinkCommand::UpdateFrame { .. } => {}
                    SinkCommand::SubmitAudio { done, .. }
                    | SinkCommand::SubmitSilence { done, .. } => {
                        held.push(done); // kept alive, never fired
                    }
                    SinkCommand::Finish { reply } => {
                        let _ = reply.send(Ok(VideoAsset {
                            bytes: vec![0; 8],
                            frame_count: 0,
                            frame_rate: 10,
                        }));
                        return;
                    }
                }
            }
        });
        CaptureHandle::from_sender(tx)
    }

    #[tokio::test]
    async fn test_render_completes_through_states() {
        let config = test_config();
        let mut session = RenderSession::new(config.clone()).unwrap();
        assert_eq!(session.state(), RenderState::Idle);

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(4410));
        let (cast, scenes) = empty_registries();

        let asset = session.render(&timeline, &cast, &scenes).await.unwrap();
        assert_eq!(session.state(), RenderState::Done);
        assert_eq!(asset.frame_count, 1);
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let config = test_config();
        let mut session = RenderSession::new(config).unwrap();
        let timeline = Timeline::default();
        let (cast, scenes) = empty_registries();

        session.render(&timeline, &cast, &scenes).await.unwrap();
        let again = session.render(&timeline, &cast, &scenes).await;
        assert!(matches!(again, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let config = test_config();
        let mut session = RenderSession::new(config.clone()).unwrap();
        session.cancel_handle().cancel();

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(4410));
        let (cast, scenes) = empty_registries();

        let result = session.render(&timeline, &cast, &scenes).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(session.state(), RenderState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_between_cues_discards_output() {
        let config = test_config();
        let mut session = RenderSession::new(config.clone()).unwrap();
        let cancel = session.cancel_handle();
        let mut events = session.subscribe();

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(441));
        timeline.push(audio_cue(441));

        let (cast, scenes) = empty_registries();
        let surface = RenderSurface::new(&config).unwrap();
        let handle = spawn_stub_sink(Some(cancel));

        let result = session
            .render_with_sink(&timeline, &cast, &scenes, surface, handle)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(session.state(), RenderState::Failed);

        let mut saw_cancel_event = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, RenderEvent::RenderCancelled { .. }) {
                saw_cancel_event = true;
            }
        }
        assert!(saw_cancel_event);
    }

    #[tokio::test]
    async fn test_sink_loss_is_fatal() {
        let config = test_config();
        let mut session = RenderSession::new(config.clone()).unwrap();

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(441));
        let (cast, scenes) = empty_registries();

        let surface = RenderSurface::new(&config).unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = CaptureHandle::from_sender(tx);

        let result = session
            .render_with_sink(&timeline, &cast, &scenes, surface, handle)
            .await;
        assert!(matches!(result, Err(Error::CaptureSink(_))));
        assert_eq!(session.state(), RenderState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_completion_is_soft() {
        let config = ExportConfig {
            completion_timeout_margin_ms: 100,
            ..test_config()
        };
        let mut session = RenderSession::new(config.clone()).unwrap();
        let mut events = session.subscribe();

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(4410)); // 100ms nominal
        let (cast, scenes) = empty_registries();

        let surface = RenderSurface::new(&config).unwrap();
        let handle = spawn_mute_sink();

        // The sink never acknowledges, so the wait runs out its 200ms
        // budget; the session must still complete.
        let asset = session
            .render_with_sink(&timeline, &cast, &scenes, surface, handle)
            .await
            .unwrap();
        assert_eq!(session.state(), RenderState::Done);
        assert_eq!(asset.frame_rate, 10);

        let mut saw_timeout = false;
        while let Ok(event) = events.try_recv() {
            if let RenderEvent::PlaybackTimedOut { index, .. } = event {
                assert_eq!(index, 0);
                saw_timeout = true;
            }
        }
        assert!(saw_timeout);
    }

    #[tokio::test]
    async fn test_malformed_cue_fails_before_capture() {
        let config = test_config();
        let mut session = RenderSession::new(config).unwrap();

        let mut timeline = Timeline::default();
        timeline.push(audio_cue(441));
        let mut bad = Cue::new();
        bad.audio = Some(SampleBuffer::mono(44100, vec![f32::INFINITY; 3]));
        timeline.push(bad);

        let (cast, scenes) = empty_registries();
        let result = session.render(&timeline, &cast, &scenes).await;
        match result {
            Err(Error::MalformedAudioCue { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedAudioCue, got {:?}", other.map(|_| ())),
        }
        assert_eq!(session.state(), RenderState::Failed);
    }

    #[tokio::test]
    async fn test_empty_timeline_renders_empty_asset() {
        let config = test_config();
        let mut session = RenderSession::new(config).unwrap();
        let (cast, scenes) = empty_registries();

        let asset = session
            .render(&Timeline::default(), &cast, &scenes)
            .await
            .unwrap();
        assert_eq!(asset.frame_count, 0);
        assert_eq!(session.state(), RenderState::Done);
    }
}
