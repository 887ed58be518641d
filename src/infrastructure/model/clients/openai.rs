//! OpenAI-compatible chat client. Groq serves this wire format, as do
//! OpenAI, Mistral and most other hosted providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelProviderConfig;
use crate::infrastructure::model::traits::ModelClient;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse};
use crate::types::ChatMessage;

const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiClient {
    id: String,
    endpoint: String,
    api_path: String,
    api_key: Option<String>,
    http: Client,
}

impl OpenAiClient {
    /// Build a client from provider config and an already-resolved API key.
    /// The key is injected rather than read from the environment here so the
    /// caller stays in charge of credential handling.
    pub fn from_config(config: &ModelProviderConfig, api_key: Option<String>) -> Self {
        Self {
            id: config.id.clone(),
            endpoint: config.endpoint.clone(),
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_PATH.to_string()),
            api_key,
            http: Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.api_path.trim_start_matches('/')
        )
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let api_key = self.require_api_key()?;
        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
        };

        info!(
            provider = self.id.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let response: ChatCompletionResponse = self
            .http
            .post(self.chat_url())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(&self.id, e))?
            .error_for_status()
            .map_err(|e| ModelError::network(&self.id, e))?
            .json()
            .await
            .map_err(|e| ModelError::network(&self.id, e))?;
        debug!("Received response from OpenAI-compatible provider");

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| ModelError::invalid_response(&self.id, "missing content"))?;

        Ok(ModelResponse::new(content))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: String,
}
