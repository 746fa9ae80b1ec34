//! Host transport seam.
//!
//! Any duplex request/response + fire-and-forget-event transport can sit
//! behind `HostTransport`. Listeners registered here receive the transport's
//! own `TransportEvent` metadata; the bridge strips it before user callbacks
//! run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChannelError;

/// Identifier of a listener registered directly on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Transport-level metadata attached to each delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub channel: String,
    /// Per-transport delivery sequence, starting at 1.
    pub sequence: u64,
    pub sender_id: u32,
}

/// Listener callback as seen by the transport.
pub type TransportHandler = Arc<dyn Fn(&TransportEvent, &[Value]) + Send + Sync>;

#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Request/response call. Resolves exactly once.
    async fn invoke(&self, channel: &str, args: Vec<Value>) -> Result<Value, ChannelError>;

    /// Fire-and-forget message. Delivery is not reported back.
    fn send(&self, channel: &str, args: Vec<Value>);

    fn add_listener(&self, channel: &str, handler: TransportHandler) -> ListenerId;

    fn remove_listener(&self, channel: &str, id: ListenerId);

    fn remove_all_listeners(&self, channel: &str);
}
