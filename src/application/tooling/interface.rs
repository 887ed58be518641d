use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolInvokeError;

/// A tool advertised by the listing server's `tools/list` catalogue.
#[derive(Debug, Clone)]
pub struct ServerToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// A live link to a tool server, scoped to a single query. Open, used, closed.
#[async_trait]
pub trait ListingConnection: Send + Sync {
    /// Catalogue captured during the handshake.
    async fn tools(&self) -> Vec<ServerToolInfo>;

    /// Usage guidance the server announced in its `initialize` result, if any.
    async fn instructions(&self) -> Option<String>;

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError>;

    /// Release the connection. Must be safe to call more than once.
    async fn close(&self);
}

/// Opens a fresh [`ListingConnection`] per query; connections are never
/// shared between invocations.
#[async_trait]
pub trait ListingConnector: Send + Sync {
    type Connection: ListingConnection;

    async fn connect(&self) -> Result<Self::Connection, ToolInvokeError>;
}
