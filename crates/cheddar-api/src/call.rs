//! Operation records.
//!
//! Queued calls are plain data so a replay is deterministic: nothing a
//! record carries can change between the moment it is queued and the moment
//! it runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "args", rename_all = "camelCase")]
pub enum ApiCall {
    InitializeSession { profile: String, language: String },
    StartCapture { interval: String, quality: String },
    StopCapture,
    SendTextMessage { text: String },
    OpenExternal { url: String },
    GetContentProtection,
    GetAllConversationSessions,
    GetConversationSession { id: String },
    InitConversationStorage,
    SetStatus { text: String },
    HandleShortcut { key: String },
}

impl ApiCall {
    /// Caller-facing operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeSession { .. } => "initializeSession",
            Self::StartCapture { .. } => "startCapture",
            Self::StopCapture => "stopCapture",
            Self::SendTextMessage { .. } => "sendTextMessage",
            Self::OpenExternal { .. } => "openExternal",
            Self::GetContentProtection => "getContentProtection",
            Self::GetAllConversationSessions => "getAllConversationSessions",
            Self::GetConversationSession { .. } => "getConversationSession",
            Self::InitConversationStorage => "initConversationStorage",
            Self::SetStatus { .. } => "setStatus",
            Self::HandleShortcut { .. } => "handleShortcut",
        }
    }

    /// Build a call from a caller-facing name and positional arguments.
    /// Unknown names yield `None`; missing or non-text arguments read as
    /// empty strings (numbers are rendered as text).
    pub fn from_name(name: &str, args: &[Value]) -> Option<Self> {
        let text = |i: usize| arg_text(args.get(i));
        let call = match name {
            "initializeSession" | "initializeGemini" => Self::InitializeSession {
                profile: text(0),
                language: text(1),
            },
            "startCapture" => Self::StartCapture {
                interval: text(0),
                quality: text(1),
            },
            "stopCapture" => Self::StopCapture,
            "sendTextMessage" => Self::SendTextMessage { text: text(0) },
            "openExternal" => Self::OpenExternal { url: text(0) },
            "getContentProtection" => Self::GetContentProtection,
            "getAllConversationSessions" => Self::GetAllConversationSessions,
            "getConversationSession" => Self::GetConversationSession { id: text(0) },
            "initConversationStorage" => Self::InitConversationStorage,
            "setStatus" => Self::SetStatus { text: text(0) },
            "handleShortcut" => Self::HandleShortcut { key: text(0) },
            _ => return None,
        };
        Some(call)
    }
}

fn arg_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// A call waiting for an implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCall {
    pub call: ApiCall,
    pub order_index: u64,
}
