//! Message bus: decoupled communication between channel adapters and the
//! agent core.
//!
//! An in-process, asynchronous, FIFO channel pair: channel adapters publish
//! inbound messages and consume outbound ones; the agent runtime does the
//! reverse. One consumer per direction, at-most-once delivery, and no
//! persistence; messages published before a consumer attaches, or after
//! the process ends, are lost by design. This is intra-process glue, not a
//! durable log.
//!
//! Ordering is guaranteed within a single chat_id stream (publish is a
//! plain enqueue and the runtime processes one chat sequentially); nothing
//! is guaranteed across distinct chats.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::BusError;

/// Channel name used for synthetic messages injected by the runtime itself
/// (e.g., subagent completion announcements).
pub const SYSTEM_CHANNEL: &str = "system";

/// A message arriving from a channel adapter (or injected synthetically).
/// Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Which channel produced this ("telegram", "cli", "system", ...)
    pub channel: String,

    /// Platform-specific sender identifier
    pub sender_id: String,

    /// The chat/group/DM identifier within the channel
    pub chat_id: String,

    /// The text content
    pub content: String,
}

/// A response heading back to a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Which channel should deliver this
    pub channel: String,

    /// The chat to deliver to
    pub chat_id: String,

    /// The text content
    pub content: String,
}

/// The in-process message bus.
///
/// Built on two unbounded mpsc queues. Each direction's receiver can be
/// taken exactly once; the bus itself stays cheaply cloneable behind an
/// `Arc` on the caller's side.
pub struct MessageBus {
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundMessage>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            outbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    /// Publish a message toward the agent core.
    pub fn publish_inbound(&self, msg: InboundMessage) -> Result<(), BusError> {
        self.inbound_tx.send(msg).map_err(|_| {
            warn!("Inbound bus consumer is gone; message dropped");
            BusError::Closed("inbound".into())
        })
    }

    /// Publish a message toward the channel adapters.
    pub fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), BusError> {
        self.outbound_tx.send(msg).map_err(|_| {
            warn!("Outbound bus consumer is gone; message dropped");
            BusError::Closed("outbound".into())
        })
    }

    /// Take the inbound receiver. Returns an error on the second call;
    /// the bus is single-consumer per direction.
    pub fn take_inbound_receiver(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<InboundMessage>, BusError> {
        self.inbound_rx
            .lock()
            .expect("inbound receiver lock poisoned")
            .take()
            .ok_or_else(|| BusError::ReceiverTaken("inbound".into()))
    }

    /// Take the outbound receiver. Returns an error on the second call.
    pub fn take_outbound_receiver(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<OutboundMessage>, BusError> {
        self.outbound_rx
            .lock()
            .expect("outbound receiver lock poisoned")
            .take()
            .ok_or_else(|| BusError::ReceiverTaken("outbound".into()))
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
