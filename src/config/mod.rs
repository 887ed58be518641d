mod app;
mod defaults;
mod error;
mod loader;
mod provider;
mod server;
mod web;

pub use app::AppConfig;
pub use defaults::{
    DEFAULT_BIND, DEFAULT_CONFIG_PATH, DEFAULT_CREDENTIAL_VAR, DEFAULT_MODEL, DEFAULT_QUERY,
    ROBOTS_BYPASS_FLAG,
};
pub use error::ConfigError;
pub use provider::{ModelInfo, ModelProviderConfig};
pub use server::ListingServerConfig;
pub use web::WebConfig;
