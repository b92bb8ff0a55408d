// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
// Event Bus - Pub/Sub for agent bus events
//
// In-memory fan-out over a tokio broadcast channel. Feeds `revos serve`
// observers and tests; events are not persisted and are lost on restart.

use crate::domain::agent::AgentKey;
use crate::domain::events::AgentBusEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to agent bus events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AgentBusEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Slow receivers lose the oldest events once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (256)
    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    pub fn publish(&self, event: AgentBusEvent) {
        debug!(agent = %event.key(), "Publishing event: {:?}", event);

        // send() errors only when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all agent bus events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            key: None,
        }
    }

    /// Subscribe to the events of a single agent
    pub fn subscribe_agent(&self, key: AgentKey) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            key: Some(key),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for agent bus events, optionally filtered to one agent key
pub struct EventReceiver {
    receiver: broadcast::Receiver<AgentBusEvent>,
    key: Option<AgentKey>,
}

impl EventReceiver {
    /// Receive the next matching event (waits until one is available)
    pub async fn recv(&mut self) -> Result<AgentBusEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            match &self.key {
                Some(key) if event.key() != key => continue,
                _ => return Ok(event),
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(AgentBusEvent::AgentToggled {
            key: AgentKey::new("media-agent"),
            enabled: false,
            toggled_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            AgentBusEvent::AgentToggled { key, enabled, .. } => {
                assert_eq!(key.as_str(), "media-agent");
                assert!(!enabled);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_agent_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_agent(AgentKey::new("collections"));

        event_bus.publish(AgentBusEvent::AgentRunFailed {
            key: AgentKey::new("commercials"),
            reason: "boom".to_string(),
            failed_at: Utc::now(),
        });
        event_bus.publish(AgentBusEvent::AgentRunCompleted {
            key: AgentKey::new("collections"),
            summary: "Dunning step 2 sent; $1.8k likely.".to_string(),
            impact: 1800.0,
            completed_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.key().as_str(), "collections");
        assert!(matches!(received, AgentBusEvent::AgentRunCompleted { .. }));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(AgentBusEvent::AgentRegistered {
            key: AgentKey::new("brief-agent"),
            registered_at: Utc::now(),
        });

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }
}
