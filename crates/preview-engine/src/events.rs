//! Event types for preview progress
//!
//! Events are sent from the preview runtime to the UI (or any consumer)
//! to report rebuilds, settled outcomes and discarded stale loads.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::outcome::RenderOutcome;

/// Trait for sending preview events
///
/// This abstracts over the transport mechanism (webview channel, mpsc, etc.)
/// so the runtime can be driven from different front ends.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: PreviewEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted while previewing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PreviewEvent {
    /// A new sandbox was created and its program is loading
    #[serde(rename_all = "camelCase")]
    RebuildStarted {
        generation: u64,
        component_name: String,
    },

    /// The live sandbox settled
    #[serde(rename_all = "camelCase")]
    Settled { outcome: RenderOutcome },

    /// A load finished after a newer rebuild replaced it
    #[serde(rename_all = "camelCase")]
    StaleDiscarded {
        generation: u64,
        current_generation: u64,
    },

    /// Preview paused; a placeholder is shown instead of a sandbox
    #[serde(rename_all = "camelCase")]
    Paused { generation: u64 },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: PreviewEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<PreviewEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<PreviewEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: PreviewEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Forwards events into a tokio channel
pub struct ChannelEventSink {
    sender: tokio::sync::mpsc::UnboundedSender<PreviewEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<PreviewEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: PreviewEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}
