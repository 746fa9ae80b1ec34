//! `CheddarApi` over a `ChannelBridge`.
//!
//! Caller-facing operations map onto host channel names here; nothing else
//! in the workspace knows those names for outgoing calls.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use cheddar_bridge::{ChannelBridge, ChannelError};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::CheddarApi;
use crate::error::ApiError;
use crate::reply::{ActionResult, ApiReply};

pub const NOT_IN_HOST: &str = "Not running inside the overlay host";

/// Read side of persisted user settings.
pub trait SettingsStore: Send + Sync {
    fn api_key(&self) -> Option<String>;
    fn custom_prompt(&self) -> Option<String>;
    /// `None` when never set.
    fn content_protection(&self) -> Option<bool>;
}

#[derive(Debug, Clone, Default)]
struct SettingsValues {
    api_key: Option<String>,
    custom_prompt: Option<String>,
    content_protection: Option<bool>,
}

/// In-memory settings.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<SettingsValues>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, SettingsValues> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_api_key(self, key: impl Into<String>) -> Self {
        self.set_api_key(Some(key.into()));
        self
    }

    pub fn with_custom_prompt(self, prompt: impl Into<String>) -> Self {
        self.values().custom_prompt = Some(prompt.into());
        self
    }

    pub fn set_api_key(&self, key: Option<String>) {
        self.values().api_key = key;
    }

    pub fn set_content_protection(&self, enabled: bool) {
        self.values().content_protection = Some(enabled);
    }
}

impl SettingsStore for MemorySettings {
    fn api_key(&self) -> Option<String> {
        self.values().api_key.clone()
    }

    fn custom_prompt(&self) -> Option<String> {
        self.values().custom_prompt.clone()
    }

    fn content_protection(&self) -> Option<bool> {
        self.values().content_protection
    }
}

/// Receives status text pushed through `setStatus`.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, text: &str);
}

pub struct BridgeApi {
    bridge: ChannelBridge,
    settings: Arc<dyn SettingsStore>,
    status: Option<Arc<dyn StatusSink>>,
}

impl BridgeApi {
    pub fn new(bridge: ChannelBridge, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            bridge,
            settings,
            status: None,
        }
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    fn api_key(&self) -> Option<String> {
        self.settings
            .api_key()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Host replies are loosely typed; this is how "did it work" is read.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
impl CheddarApi for BridgeApi {
    async fn initialize_session(&self, profile: &str, language: &str) -> Result<ApiReply, ApiError> {
        if !self.bridge.is_available() {
            debug!("initialize without host bridge; treating as success");
            return Ok(ApiReply::Initialized(ActionResult::ok()));
        }
        let Some(api_key) = self.api_key() else {
            warn!("initialize skipped: no API key");
            return Ok(ApiReply::Initialized(ActionResult::failure("No API key")));
        };
        let custom_prompt = self.settings.custom_prompt().unwrap_or_default();
        let args = vec![
            json!(api_key),
            json!(custom_prompt),
            json!(profile),
            json!(language),
        ];
        let result = match self.bridge.invoke("initialize-gemini", args).await {
            Ok(reply) if is_truthy(&reply) => ActionResult::ok(),
            Ok(_) => ActionResult {
                success: false,
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "initialize failed");
                ActionResult::failure(err.to_string())
            }
        };
        info!(profile, language, success = result.success, "session initialized");
        Ok(ApiReply::Initialized(result))
    }

    async fn start_capture(&self, interval: &str, quality: &str) -> Result<ApiReply, ApiError> {
        self.bridge.send(
            "start-capture",
            vec![json!({ "interval": interval, "quality": quality })],
        );
        Ok(ApiReply::Ack)
    }

    async fn stop_capture(&self) -> Result<ApiReply, ApiError> {
        self.bridge.send("stop-capture", Vec::new());
        Ok(ApiReply::Ack)
    }

    async fn send_text_message(&self, text: &str) -> Result<ApiReply, ApiError> {
        if !self.bridge.is_available() {
            return Ok(ApiReply::Action(ActionResult::failure(NOT_IN_HOST)));
        }
        let result = match self.bridge.invoke("send-text-message", vec![json!(text)]).await {
            Ok(Value::Null) => ActionResult::failure("no response"),
            Ok(reply) => serde_json::from_value(reply).map_err(|e| ApiError::Decode {
                operation: "sendTextMessage".to_string(),
                message: e.to_string(),
            })?,
            Err(err) => ActionResult::failure(err.to_string()),
        };
        Ok(ApiReply::Action(result))
    }

    async fn open_external(&self, url: &str) -> Result<ApiReply, ApiError> {
        self.bridge.invoke("open-external", vec![json!(url)]).await?;
        Ok(ApiReply::Ack)
    }

    async fn get_content_protection(&self) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::ContentProtection(
            self.settings.content_protection().unwrap_or(true),
        ))
    }

    async fn get_all_conversation_sessions(&self) -> Result<ApiReply, ApiError> {
        match self
            .bridge
            .invoke("get-all-conversation-sessions", Vec::new())
            .await
        {
            Ok(Value::Null) => Ok(ApiReply::Sessions(Vec::new())),
            Ok(reply) => serde_json::from_value(reply)
                .map(ApiReply::Sessions)
                .map_err(|e| ApiError::Decode {
                    operation: "getAllConversationSessions".to_string(),
                    message: e.to_string(),
                }),
            Err(ChannelError::Unavailable { .. }) => Ok(ApiReply::Sessions(Vec::new())),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_conversation_session(&self, id: &str) -> Result<ApiReply, ApiError> {
        match self
            .bridge
            .invoke("get-conversation-session", vec![json!(id)])
            .await
        {
            Ok(Value::Null) => Ok(ApiReply::Session(None)),
            Ok(reply) => serde_json::from_value(reply)
                .map(|s| ApiReply::Session(Some(s)))
                .map_err(|e| ApiError::Decode {
                    operation: "getConversationSession".to_string(),
                    message: e.to_string(),
                }),
            Err(ChannelError::Unavailable { .. }) => Ok(ApiReply::Session(None)),
            Err(err) => Err(err.into()),
        }
    }

    async fn init_conversation_storage(&self) -> Result<ApiReply, ApiError> {
        match self
            .bridge
            .invoke("init-conversation-storage", Vec::new())
            .await
        {
            Ok(_) | Err(ChannelError::Unavailable { .. }) => Ok(ApiReply::Ack),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_status(&self, text: &str) -> Result<ApiReply, ApiError> {
        match &self.status {
            Some(sink) => sink.set_status(text),
            None => debug!(status = text, "status update with no sink"),
        }
        Ok(ApiReply::Ack)
    }

    async fn handle_shortcut(&self, key: &str) -> Result<ApiReply, ApiError> {
        debug!(key, "shortcut");
        Ok(ApiReply::Ack)
    }
}
