//! Event bus for cycle progress
//!
//! Services emit events while cycles run; the daemon and tests subscribe to
//! observe them. Emission uses a `tokio::sync::broadcast` channel and never
//! blocks: without subscribers events are dropped, and lagging subscribers
//! lose the oldest events first.
//!
//! ```
//! use libautocast::service::events::{CycleKind, Event, EventBus};
//!
//! # async fn example() {
//! let bus = EventBus::new(16);
//! let mut receiver = bus.subscribe();
//! bus.emit(Event::CycleStarted { cycle: CycleKind::Publish });
//! assert!(matches!(receiver.recv().await, Ok(Event::CycleStarted { .. })));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::platforms::Platform;

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send to all current subscribers
    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    Generation,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CycleStarted {
        cycle: CycleKind,
    },

    /// A firing found the same cycle already running
    CycleSkipped {
        cycle: CycleKind,
    },

    CycleCompleted {
        cycle: CycleKind,
        /// Topics generated or posts published
        succeeded: usize,
        failed: usize,
    },

    TopicGenerated {
        topic_id: i64,
        platforms: Vec<Platform>,
        /// Platforms that received fallback content
        degraded: Vec<Platform>,
    },

    /// Generation for a topic failed and it was rolled back
    TopicGenerationFailed {
        topic_id: i64,
        error: String,
    },

    PostPublished {
        post_id: i64,
        platform: Platform,
        remote_id: String,
    },

    PostPublishFailed {
        post_id: i64,
        platform: Platform,
        error: String,
    },

    /// Every post of the topic is published
    TopicCompleted {
        topic_id: i64,
    },
}
