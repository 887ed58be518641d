mod error;
mod interface;
mod process;

pub use error::ToolInvokeError;
pub use interface::{ListingConnection, ListingConnector, ServerToolInfo};
pub use process::{McpConnection, StdioConnector};
