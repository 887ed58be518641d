use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("failed to spawn listing server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("listing server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("listing server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("listing server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("listing server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("listing server '{server}' request cancelled")]
    Cancelled { server: String },
}

impl ToolInvokeError {
    pub fn user_message(&self) -> String {
        match self {
            ToolInvokeError::Spawn { server, .. } => {
                format!("Could not start the '{server}' search tool. Is its command installed?")
            }
            ToolInvokeError::Transport { server, .. }
            | ToolInvokeError::InvalidJson { server, .. } => {
                format!("Lost contact with the '{server}' search tool.")
            }
            ToolInvokeError::Rpc { server, message, .. } => {
                format!("The '{server}' search tool rejected the request: {message}")
            }
            ToolInvokeError::Terminated { server } => {
                format!("The '{server}' search tool exited before answering.")
            }
            ToolInvokeError::Cancelled { server } => {
                format!("The request to the '{server}' search tool was cancelled.")
            }
        }
    }
}
