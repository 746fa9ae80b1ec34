//! cheddar-bridge: the sanctioned channel between the display surface and the host.
//!
//! The bridge exposes a capability-scoped surface over any `HostTransport`:
//! - request/response calls (`ChannelBridge::invoke`)
//! - fire-and-forget sends (`ChannelBridge::send`)
//! - named event subscriptions multiplexed per callback (`ChannelBridge::subscribe`)
//!
//! Callbacks only ever see event payloads; transport metadata stays on the
//! transport side of the seam. A panicking callback is contained at the
//! multiplexer boundary and recorded through a `FaultSink`.

pub mod bridge;
pub mod error;
pub mod fault;
pub mod loopback;
pub mod multiplexer;
pub mod redact;
pub mod transport;

pub use bridge::{ChannelBridge, Platform, Subscription};
pub use error::ChannelError;
pub use multiplexer::EventCallback;
pub use transport::{HostTransport, ListenerId, TransportEvent, TransportHandler};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cheddar-bridge"
}
