//! The implementation seam behind the capability adapter.

use async_trait::async_trait;

use crate::call::ApiCall;
use crate::error::ApiError;
use crate::reply::ApiReply;

/// Host operations available to the display surface.
///
/// Every method defaults to `ApiReply::Unsupported`, so an implementation
/// only overrides what it actually covers.
#[async_trait]
pub trait CheddarApi: Send + Sync {
    async fn initialize_session(&self, _profile: &str, _language: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn start_capture(&self, _interval: &str, _quality: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn stop_capture(&self) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn send_text_message(&self, _text: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn open_external(&self, _url: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn get_content_protection(&self) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn get_all_conversation_sessions(&self) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn get_conversation_session(&self, _id: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn init_conversation_storage(&self) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn set_status(&self, _text: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }

    async fn handle_shortcut(&self, _key: &str) -> Result<ApiReply, ApiError> {
        Ok(ApiReply::Unsupported)
    }
}

/// Route a call record to its method on `api`.
pub async fn dispatch(api: &dyn CheddarApi, call: &ApiCall) -> Result<ApiReply, ApiError> {
    match call {
        ApiCall::InitializeSession { profile, language } => {
            api.initialize_session(profile, language).await
        }
        ApiCall::StartCapture { interval, quality } => api.start_capture(interval, quality).await,
        ApiCall::StopCapture => api.stop_capture().await,
        ApiCall::SendTextMessage { text } => api.send_text_message(text).await,
        ApiCall::OpenExternal { url } => api.open_external(url).await,
        ApiCall::GetContentProtection => api.get_content_protection().await,
        ApiCall::GetAllConversationSessions => api.get_all_conversation_sessions().await,
        ApiCall::GetConversationSession { id } => api.get_conversation_session(id).await,
        ApiCall::InitConversationStorage => api.init_conversation_storage().await,
        ApiCall::SetStatus { text } => api.set_status(text).await,
        ApiCall::HandleShortcut { key } => api.handle_shortcut(key).await,
    }
}
