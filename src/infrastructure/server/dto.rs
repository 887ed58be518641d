use crate::agent::AgentStep;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub query_id: String,
    /// Markdown answer, passed through from the agent unmodified
    pub content: String,
    pub tool_steps: Vec<AgentStep>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
