//! Mock API implementation for unit testing.
//!
//! Records every call it receives and answers with canned replies, or with
//! a configured error or panic per operation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::CheddarApi;
use crate::call::ApiCall;
use crate::error::ApiError;
use crate::reply::{ActionResult, ApiReply};

pub struct MockCheddarApi {
    calls: Mutex<Vec<ApiCall>>,
    errors: Mutex<HashMap<&'static str, ApiError>>,
    panics: Mutex<Vec<&'static str>>,
    content_protection: bool,
}

impl Default for MockCheddarApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCheddarApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            errors: Mutex::new(HashMap::new()),
            panics: Mutex::new(Vec::new()),
            content_protection: true,
        }
    }

    /// Make every call to `operation` fail with `err`.
    pub fn with_error(self, operation: &'static str, err: ApiError) -> Self {
        match self.errors.lock() {
            Ok(mut errors) => {
                errors.insert(operation, err);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(operation, err);
            }
        }
        self
    }

    /// Make every call to `operation` panic.
    pub fn with_panic(self, operation: &'static str) -> Self {
        match self.panics.lock() {
            Ok(mut panics) => panics.push(operation),
            Err(poisoned) => poisoned.into_inner().push(operation),
        }
        self
    }

    pub fn with_content_protection(mut self, enabled: bool) -> Self {
        self.content_protection = enabled;
        self
    }

    /// Return all recorded calls.
    pub fn calls(&self) -> Vec<ApiCall> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Operation names of recorded calls, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(ApiCall::name).collect()
    }

    pub fn call_count(&self) -> usize {
        match self.calls.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn respond(&self, call: ApiCall) -> Result<ApiReply, ApiError> {
        let operation = call.name();
        match self.calls.lock() {
            Ok(mut guard) => guard.push(call.clone()),
            Err(poisoned) => poisoned.into_inner().push(call.clone()),
        }

        let panics = match self.panics.lock() {
            Ok(guard) => guard.contains(&operation),
            Err(poisoned) => poisoned.into_inner().contains(&operation),
        };
        if panics {
            panic!("mock panic in {operation}");
        }
        let error = match self.errors.lock() {
            Ok(guard) => guard.get(operation).cloned(),
            Err(poisoned) => poisoned.into_inner().get(operation).cloned(),
        };
        if let Some(err) = error {
            return Err(err);
        }

        Ok(match call {
            ApiCall::InitializeSession { .. } => ApiReply::Initialized(ActionResult::ok()),
            ApiCall::SendTextMessage { .. } => ApiReply::Action(ActionResult::ok()),
            ApiCall::GetContentProtection => ApiReply::ContentProtection(self.content_protection),
            ApiCall::GetAllConversationSessions => ApiReply::Sessions(Vec::new()),
            ApiCall::GetConversationSession { .. } => ApiReply::Session(None),
            _ => ApiReply::Ack,
        })
    }
}

#[async_trait]
impl CheddarApi for MockCheddarApi {
    async fn initialize_session(&self, profile: &str, language: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::InitializeSession {
            profile: profile.to_string(),
            language: language.to_string(),
        })
    }

    async fn start_capture(&self, interval: &str, quality: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::StartCapture {
            interval: interval.to_string(),
            quality: quality.to_string(),
        })
    }

    async fn stop_capture(&self) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::StopCapture)
    }

    async fn send_text_message(&self, text: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::SendTextMessage {
            text: text.to_string(),
        })
    }

    async fn open_external(&self, url: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::OpenExternal {
            url: url.to_string(),
        })
    }

    async fn get_content_protection(&self) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::GetContentProtection)
    }

    async fn get_all_conversation_sessions(&self) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::GetAllConversationSessions)
    }

    async fn get_conversation_session(&self, id: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::GetConversationSession { id: id.to_string() })
    }

    async fn init_conversation_storage(&self) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::InitConversationStorage)
    }

    async fn set_status(&self, text: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::SetStatus {
            text: text.to_string(),
        })
    }

    async fn handle_shortcut(&self, key: &str) -> Result<ApiReply, ApiError> {
        self.respond(ApiCall::HandleShortcut {
            key: key.to_string(),
        })
    }
}
