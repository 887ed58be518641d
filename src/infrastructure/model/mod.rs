mod clients;
mod factory;
mod traits;
mod types;

pub use clients::OpenAiClient;
pub use factory::{build_client, resolve_api_key};
pub use traits::ModelClient;
pub use types::{ModelError, ModelRequest, ModelResponse};
