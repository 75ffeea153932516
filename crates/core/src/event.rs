//! Domain event system: decoupled observation of the engine's decisions.
//!
//! Events are published when a cycle selects a focus, mutates mood, or is
//! skipped or dropped. Reporters subscribe without coupling to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::focus::FocusMode;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A focus decision was made for a cycle.
    FocusSelected {
        version: u64,
        mode: FocusMode,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The mood vector was replaced by a committed cycle.
    MoodUpdated {
        valence: f64,
        arousal: f64,
        clarity: f64,
        descriptor: String,
        timestamp: DateTime<Utc>,
    },

    /// A response was flagged as repetitive and regenerated once.
    RepetitionDetected {
        version: u64,
        similarity_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// A reflection pass completed.
    ReflectionCompleted {
        delta: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// A cycle produced no response and committed nothing.
    CycleSkipped {
        version: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A cycle's result arrived after a newer cycle started and was discarded.
    CycleDropped {
        version: u64,
        current_version: u64,
        timestamp: DateTime<Utc>,
    },

    /// The session state was written to disk.
    StateSaved {
        path: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::FocusSelected {
            version: 3,
            mode: FocusMode::Memory,
            reason: "pattern_recognition".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::FocusSelected { version, mode, .. } => {
                assert_eq!(*version, 3);
                assert_eq!(*mode, FocusMode::Memory);
            }
            _ => panic!("Expected FocusSelected event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::CycleSkipped {
            version: 1,
            reason: "timeout".into(),
            timestamp: Utc::now(),
        });
    }
}
