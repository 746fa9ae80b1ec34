//! Errors surfaced by API operations.

use cheddar_bridge::ChannelError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The operation ran but reported failure.
    #[error("{operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    /// The host answered with a payload of the wrong shape.
    #[error("{operation} returned an unexpected reply: {message}")]
    Decode { operation: String, message: String },

    /// The implementation panicked while handling the operation.
    #[error("{operation} panicked: {detail}")]
    Panicked { operation: String, detail: String },
}

impl ApiError {
    /// Text for a transient status line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Channel(ChannelError::InvokeRejected { message, .. })
            | Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
