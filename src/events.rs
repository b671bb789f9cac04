//! Render progress events
//!
//! The render session publishes its lifecycle on a broadcast channel so
//! observers (CLI progress output, tests) can follow along without being
//! wired into the session. Sends are lossy: a slow or absent subscriber
//! never stalls rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Events emitted by a render session, in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    /// Session left Idle and began rendering
    RenderStarted {
        cues: usize,
        timestamp: DateTime<Utc>,
    },

    /// A cue began rendering
    CueStarted {
        index: usize,
        cue_id: Uuid,
        has_audio: bool,
        timestamp: DateTime<Utc>,
    },

    /// A cue's audio (or silence) was fully consumed by the capture sink
    CueFinished {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// The completion wait for a cue ran past its budget; rendering
    /// proceeded anyway
    PlaybackTimedOut {
        index: usize,
        waited_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// All cues rendered; container finalization started
    Flushing { timestamp: DateTime<Utc> },

    /// Finalization produced a complete video asset
    RenderCompleted {
        frames: u32,
        timestamp: DateTime<Utc>,
    },

    /// The session failed; no asset was produced
    RenderFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The session was cancelled between cues; sink output was discarded
    RenderCancelled { timestamp: DateTime<Utc> },
}

/// Broadcast channel for render events.
#[derive(Debug, Clone)]
pub struct RenderEvents {
    tx: broadcast::Sender<RenderEvent>,
}

impl RenderEvents {
    /// Create a new event channel
    ///
    /// `capacity` bounds how many events a lagging subscriber can fall
    /// behind before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event, ignoring whether anyone is listening
    pub fn emit(&self, event: RenderEvent) {
        debug!("Render event: {:?}", event);
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.tx.subscribe()
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RenderEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let events = RenderEvents::new(8);
        let mut rx = events.subscribe();

        events.emit(RenderEvent::Flushing {
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            RenderEvent::Flushing { .. } => {}
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let events = RenderEvents::new(8);
        events.emit(RenderEvent::RenderCancelled {
            timestamp: Utc::now(),
        });
        assert_eq!(events.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_events_serialize_for_progress_output() {
        let event = RenderEvent::CueStarted {
            index: 3,
            cue_id: Uuid::new_v4(),
            has_audio: true,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"cue_started\""));
        assert!(json.contains("\"index\":3"));
    }
}
