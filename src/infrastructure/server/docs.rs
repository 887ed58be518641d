use super::dto::{ErrorResponse, SearchRequest, SearchResponse};
use super::routes;
use crate::agent::AgentStep;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(routes::query::query_handler, routes::health::health_handler),
    components(schemas(SearchRequest, SearchResponse, ErrorResponse, AgentStep)),
    tags(
        (name = "search", description = "Run one listings query through the agent"),
        (name = "health", description = "Liveness probe")
    )
)]
pub(super) struct ApiDoc;
