//! Credential resolution and client construction from provider config

use super::clients::OpenAiClient;
use crate::config::ModelProviderConfig;
use std::env;
use tracing::warn;

/// Resolve the API key from the environment variable named in the provider
/// config. Returns `None` when no variable is named or the variable is unset.
pub fn resolve_api_key(provider: &str, spec: Option<&str>) -> Option<String> {
    let raw = spec.map(str::trim).filter(|s| !s.is_empty())?;
    match env::var(raw) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        Ok(_) => {
            warn!(provider, env_var = raw, "API key environment variable is empty");
            None
        }
        Err(err) => {
            warn!(
                provider,
                env_var = raw,
                %err,
                "API key environment variable is not set"
            );
            None
        }
    }
}

/// Build the chat client for a provider entry. Every supported provider type
/// speaks the OpenAI wire format.
pub fn build_client(config: &ModelProviderConfig, api_key: Option<String>) -> OpenAiClient {
    OpenAiClient::from_config(config, api_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn resolves_key_from_named_variable() {
        unsafe {
            env::set_var("STAYSCOUT_TEST_KEY", "sk-test");
        }
        assert_eq!(
            resolve_api_key("groq", Some("STAYSCOUT_TEST_KEY")),
            Some("sk-test".to_string())
        );
        unsafe {
            env::remove_var("STAYSCOUT_TEST_KEY");
        }
    }

    #[test]
    #[serial]
    fn missing_variable_resolves_to_none() {
        unsafe {
            env::remove_var("STAYSCOUT_ABSENT_KEY");
        }
        assert_eq!(resolve_api_key("groq", Some("STAYSCOUT_ABSENT_KEY")), None);
        assert_eq!(resolve_api_key("groq", None), None);
        assert_eq!(resolve_api_key("groq", Some("   ")), None);
    }
}
