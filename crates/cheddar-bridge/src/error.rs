//! Normalized error type for channel operations.
//!
//! Transport-agnostic: callers see whether the host was reachable and whether
//! it rejected the call, never how the message travelled.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// No host transport is installed (display surface running outside its host).
    #[error("bridge unavailable for channel {channel:?}")]
    Unavailable { channel: String },

    /// The host answered the call with an error payload.
    #[error("host rejected {channel:?}: {message}")]
    InvokeRejected { channel: String, message: String },

    /// The transport failed to carry the call (no handler, connection dropped).
    #[error("transport failure on {channel:?}: {message}")]
    Transport { channel: String, message: String },
}

impl ChannelError {
    pub fn channel(&self) -> &str {
        match self {
            Self::Unavailable { channel }
            | Self::InvokeRejected { channel, .. }
            | Self::Transport { channel, .. } => channel,
        }
    }

    /// Whether the failure means the host could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_channel_and_message() {
        let err = ChannelError::InvokeRejected {
            channel: "send-text-message".into(),
            message: "session closed".into(),
        };
        assert_eq!(
            err.to_string(),
            "host rejected \"send-text-message\": session closed"
        );
        assert_eq!(err.channel(), "send-text-message");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn unavailable_is_flagged() {
        let err = ChannelError::Unavailable {
            channel: "open-external".into(),
        };
        assert!(err.is_unavailable());
    }
}
