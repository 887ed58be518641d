use super::super::dto::{ErrorResponse, SearchRequest, SearchResponse};
use super::super::state::ServerState;
use crate::application::handler::QueryError;
use crate::application::tooling::ListingConnector;
use crate::infrastructure::model::ModelClient;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};

#[utoipa::path(
    post,
    path = "/query",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search completed", body = SearchResponse),
        (status = 400, description = "Empty query", body = ErrorResponse),
        (status = 502, description = "Tool server or model failure", body = ErrorResponse),
        (status = 503, description = "Model credential not configured", body = ErrorResponse)
    )
)]
pub async fn query_handler<M, C>(
    State(state): State<Arc<ServerState<M, C>>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)>
where
    M: ModelClient,
    C: ListingConnector,
{
    info!("Received /query request");

    if payload.query.trim().is_empty() {
        error!("Rejecting /query request due to empty query");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query cannot be empty".to_string(),
            }),
        ));
    }

    match state.handler().handle(payload.query.trim()).await {
        Ok(outcome) => {
            info!(query_id = %outcome.query_id, "Query completed successfully");
            Ok(Json(SearchResponse {
                query_id: outcome.query_id.to_string(),
                content: outcome.response,
                tool_steps: outcome.steps,
            }))
        }
        Err(err) => {
            error!(%err, "Query failed");
            Err((
                status_for(&err),
                Json(ErrorResponse {
                    error: err.user_message(),
                }),
            ))
        }
    }
}

fn status_for(error: &QueryError) -> StatusCode {
    match error {
        QueryError::MissingCredential { .. } => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::Connection(_) | QueryError::Agent(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent::AgentError;
    use crate::application::tooling::ToolInvokeError;

    #[test]
    fn missing_credential_maps_to_service_unavailable() {
        let error = QueryError::MissingCredential {
            var: "GROQ_API_KEY".into(),
        };
        assert_eq!(status_for(&error), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        let connection = QueryError::Connection(ToolInvokeError::Terminated {
            server: "airbnb".into(),
        });
        assert_eq!(status_for(&connection), StatusCode::BAD_GATEWAY);

        let agent = QueryError::Agent(AgentError::InvalidResponse("garbled".into()));
        assert_eq!(status_for(&agent), StatusCode::BAD_GATEWAY);
    }
}
