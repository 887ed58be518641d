use super::defaults::{
    DEFAULT_API_PATH, DEFAULT_CREDENTIAL_VAR, DEFAULT_GROQ_ENDPOINT, DEFAULT_MODEL,
    DEFAULT_PROVIDER_ID,
};
use super::error::ConfigError;
use super::provider::{ModelInfo, ModelProviderConfig};
use super::server::ListingServerConfig;
use super::web::WebConfig;
use std::path::Path;

/// Application configuration loaded from listings.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub listing_server: ListingServerConfig,
    pub providers: Vec<ModelProviderConfig>,
    pub web: WebConfig,
}

impl AppConfig {
    /// Load configuration from a file path. With `None`, the default path is
    /// used when present and the built-in defaults otherwise; an explicitly
    /// given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Built-in configuration matching the original deployment: Groq-hosted
    /// model, Airbnb listing server launched through npx.
    pub fn builtin() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER_ID.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            listing_server: ListingServerConfig::default(),
            providers: vec![ModelProviderConfig {
                id: DEFAULT_PROVIDER_ID.to_string(),
                provider_type: "openai".to_string(),
                endpoint: DEFAULT_GROQ_ENDPOINT.to_string(),
                api_key: Some(DEFAULT_CREDENTIAL_VAR.to_string()),
                api_path: Some(DEFAULT_API_PATH.to_string()),
                models: vec![ModelInfo {
                    name: DEFAULT_MODEL.to_string(),
                    display_name: None,
                }],
            }],
            web: WebConfig::default(),
        }
    }

    /// The provider entry selected by `default_provider`.
    pub fn default_provider_config(&self) -> Option<&ModelProviderConfig> {
        self.providers
            .iter()
            .find(|provider| provider.id == self.default_provider)
    }
}
