// Config loading tests - AppConfig::load error handling and defaults

use stayscout::config::{AppConfig, ConfigError, ROBOTS_BYPASS_FLAG};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("listings.toml");
    fs::write(&path, content).expect("Failed to write listings.toml");
    path
}

fn minimal_config() -> &'static str {
    r#"
model = "openai/gpt-oss-120b"
default_provider = "groq"

[[providers]]
id = "groq"
type = "openai"
endpoint = "https://api.groq.com"
models = ["openai/gpt-oss-120b"]
"#
}

#[test]
fn returns_error_when_explicit_file_not_found() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/listings.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn returns_error_on_invalid_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "model = [unclosed");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn returns_error_when_model_missing() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
default_provider = "groq"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::MissingModel)));
}

#[test]
fn returns_error_when_default_provider_missing() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::MissingDefaultProvider)));
}

#[test]
fn returns_error_when_no_providers_configured() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"
default_provider = "groq"
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::NoProvidersConfigured)));
}

#[test]
fn returns_error_when_provider_has_no_endpoint() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"
default_provider = "groq"

[[providers]]
id = "groq"
type = "openai"
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(
        matches!(result, Err(ConfigError::MissingEndpoint { provider }) if provider == "groq")
    );
}

#[test]
fn returns_error_when_default_provider_unknown() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"
default_provider = "other"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(
        matches!(result, Err(ConfigError::ProviderNotFound { provider }) if provider == "other")
    );
}

#[test]
fn returns_error_when_listing_server_command_empty() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"
default_provider = "groq"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"

[listing_server]
command = "  "
"#,
    );

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::EmptyServerCommand)));
}

#[test]
fn minimal_config_falls_back_to_defaults_for_optional_sections() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), minimal_config());

    let config = AppConfig::load(Some(&path)).expect("config loads");

    assert_eq!(config.model, "openai/gpt-oss-120b");
    assert_eq!(config.default_provider, "groq");
    // listing server defaults to the npx-launched Airbnb server with the
    // robots bypass enabled
    assert_eq!(config.listing_server.command.to_str(), Some("npx"));
    assert!(config.listing_server.ignore_robots);
    assert!(
        config
            .listing_server
            .launch_args()
            .contains(&ROBOTS_BYPASS_FLAG.to_string())
    );
    assert_eq!(config.web.bind, "127.0.0.1:8080");
    assert_eq!(
        config.web.default_query,
        "Show me listings in Barcelona, for 2 people."
    );
}

#[test]
fn config_can_disable_robots_bypass() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "openai/gpt-oss-120b"
default_provider = "groq"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"

[listing_server]
command = "npx"
args = ["-y", "@openbnb/mcp-server-airbnb"]
ignore_robots = false
"#,
    );

    let config = AppConfig::load(Some(&path)).expect("config loads");
    assert!(
        !config
            .listing_server
            .launch_args()
            .contains(&ROBOTS_BYPASS_FLAG.to_string())
    );
}

#[test]
fn model_is_ensured_on_the_default_provider() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "some-new-model"
default_provider = "groq"

[[providers]]
id = "groq"
endpoint = "https://api.groq.com"
models = ["openai/gpt-oss-120b"]
"#,
    );

    let config = AppConfig::load(Some(&path)).expect("config loads");
    let provider = config.default_provider_config().expect("provider exists");
    assert!(provider.models.iter().any(|m| m.name == "some-new-model"));
}

#[test]
fn builtin_configuration_matches_the_original_deployment() {
    let config = AppConfig::builtin();

    assert_eq!(config.model, "openai/gpt-oss-120b");
    let provider = config.default_provider_config().expect("provider exists");
    assert_eq!(provider.id, "groq");
    assert_eq!(provider.endpoint, "https://api.groq.com");
    assert_eq!(provider.api_key.as_deref(), Some("GROQ_API_KEY"));
    assert_eq!(config.listing_server.name, "airbnb");
    assert_eq!(
        config.listing_server.launch_args(),
        vec!["-y", "@openbnb/mcp-server-airbnb", "--ignore-robots-txt"]
    );
}
