use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "success": bool, "error"?: string }`, the shape host actions answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A stored conversation, as returned by the host. Only `id` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Ack,
    Initialized(ActionResult),
    Action(ActionResult),
    ContentProtection(bool),
    Sessions(Vec<ConversationSession>),
    Session(Option<ConversationSession>),
    /// The bound implementation does not cover this operation.
    Unsupported,
}

impl ApiReply {
    /// The action result carried by this reply, if any.
    pub fn action(&self) -> Option<&ActionResult> {
        match self {
            Self::Initialized(result) | Self::Action(result) => Some(result),
            _ => None,
        }
    }
}
