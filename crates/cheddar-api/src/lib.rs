//! cheddar-api: the operations the display surface calls on the host.
//!
//! - `ApiCall`: one plain-data record per operation
//! - `CheddarApi`: the implementation seam, with `BridgeApi` over a `ChannelBridge`
//! - `CapabilityAdapter`: queues calls until an implementation is bound, then
//!   replays them in order
//! - `MockCheddarApi`: a recording implementation for tests

pub mod adapter;
pub mod api;
pub mod call;
pub mod error;
pub mod host;
pub mod mock;
pub mod reply;

pub use adapter::{CallOutcome, CapabilityAdapter, ReplayReport};
pub use api::{dispatch, CheddarApi};
pub use call::{ApiCall, QueuedCall};
pub use error::ApiError;
pub use host::{BridgeApi, MemorySettings, SettingsStore, StatusSink};
pub use reply::{ActionResult, ApiReply, ConversationSession};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cheddar-api"
}
