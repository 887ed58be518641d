pub const DEFAULT_CONFIG_PATH: &str = "config/listings.toml";

pub const DEFAULT_PROVIDER_ID: &str = "groq";
pub const DEFAULT_GROQ_ENDPOINT: &str = "https://api.groq.com";
/// Groq exposes the OpenAI-compatible surface under /openai.
pub const DEFAULT_API_PATH: &str = "/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_CREDENTIAL_VAR: &str = "GROQ_API_KEY";

pub const DEFAULT_LISTING_SERVER_NAME: &str = "airbnb";
pub const DEFAULT_LISTING_COMMAND: &str = "npx";
pub const DEFAULT_LISTING_ARGS: &[&str] = &["-y", "@openbnb/mcp-server-airbnb"];
/// The listing server refuses most searches unless robots.txt checks are off.
pub const ROBOTS_BYPASS_FLAG: &str = "--ignore-robots-txt";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_QUERY: &str = "Show me listings in Barcelona, for 2 people.";
