//! Player message bus.
//!
//! [`PlayerEventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring buffer of recent events so that a client opening the event stream
//! late can still pick up the last position.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use aniweave_common::{Error, ProviderId, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 50;

// ---------------------------------------------------------------------------
// PlayerMessage
// ---------------------------------------------------------------------------

/// The fixed set of messages an embedded player may post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerMessageType {
    VideoEnded,
    Progress,
    Resume,
}

/// A message posted by an embedded player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMessage {
    #[serde(rename = "type")]
    pub kind: PlayerMessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    /// Canonical ordinal of the episode playing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl PlayerMessage {
    pub fn new(kind: PlayerMessageType) -> Self {
        Self {
            kind,
            provider: None,
            episode: None,
            position_secs: None,
            duration_secs: None,
        }
    }

    /// Positions must be finite and non-negative; progress and resume need one.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("positionSecs", self.position_secs),
            ("durationSecs", self.duration_secs),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::validation(format!("{name} must be a non-negative number")));
                }
            }
        }
        match self.kind {
            PlayerMessageType::Progress | PlayerMessageType::Resume
                if self.position_secs.is_none() =>
            {
                Err(Error::validation("positionSecs is required"))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerEvent
// ---------------------------------------------------------------------------

/// A sequenced, timestamped message ready for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub message: PlayerMessage,
}

// ---------------------------------------------------------------------------
// PlayerEventBus
// ---------------------------------------------------------------------------

/// Broadcast channel for player messages. Created once at startup.
///
/// Dropping a receiver returned by [`subscribe`](Self::subscribe) is the
/// unsubscribe.
pub struct PlayerEventBus {
    tx: broadcast::Sender<PlayerEvent>,
    seq: AtomicU64,
    recent: RwLock<VecDeque<PlayerEvent>>,
}

impl PlayerEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: AtomicU64::new(0),
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Broadcast a message to all current subscribers.
    pub fn publish(&self, message: PlayerMessage) -> PlayerEvent {
        let event = PlayerEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            message,
        };

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event.clone());
        event
    }

    /// The `n` most recent events, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<PlayerEvent> {
        self.recent.read().iter().take(n).cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PlayerEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
