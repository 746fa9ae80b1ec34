//! cheddar-session: the overlay's application state on top of the bridge,
//! the capability adapter and the response stream.
//!
//! - `session::AssistantSession` wires host events to turns, reveal and status
//! - `config` loads YAML settings over defaults
//! - `logging` installs the tracing subscriber
//! - `replay` backs the `cheddar-replay` binary

pub mod config;
pub mod logging;
pub mod profile;
pub mod replay;
pub mod saved;
pub mod session;

pub use config::{load_config, Config, ConfigError};
pub use saved::{MemorySavedResponses, SavedResponse, SavedResponseStore};
pub use session::{AssistantSession, NullSessionObserver, ScrollDirection, SessionObserver};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cheddar-session"
}
