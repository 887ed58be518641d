//! Model traits

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// A chat-completion client for one hosted model endpoint
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider identifier, used in errors and logs
    fn id(&self) -> &str;

    /// Send a chat request
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
