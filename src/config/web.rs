use super::defaults::{DEFAULT_BIND, DEFAULT_QUERY};
use serde::Deserialize;

/// Settings for the HTTP surface.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebConfig {
    /// Bind address, e.g. "127.0.0.1:8080"
    pub bind: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Query pre-filled in the search form
    pub default_query: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors_origins: Vec::new(),
            default_query: DEFAULT_QUERY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub(super) struct RawWebConfig {
    pub(super) bind: Option<String>,
    #[serde(default)]
    pub(super) cors_origins: Vec<String>,
    pub(super) default_query: Option<String>,
}

impl From<RawWebConfig> for WebConfig {
    fn from(raw: RawWebConfig) -> Self {
        let defaults = WebConfig::default();
        Self {
            bind: raw.bind.unwrap_or(defaults.bind),
            cors_origins: raw.cors_origins,
            default_query: raw.default_query.unwrap_or(defaults.default_query),
        }
    }
}
