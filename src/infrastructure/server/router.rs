use super::docs::ApiDoc;
use super::error::ServerError;
use super::routes;
use super::state::ServerState;
use crate::application::handler::QueryHandler;
use crate::application::tooling::ListingConnector;
use crate::config::WebConfig;
use crate::infrastructure::model::ModelClient;
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(super) async fn serve<M, C>(
    handler: Arc<QueryHandler<M, C>>,
    addr: SocketAddr,
    web: &WebConfig,
) -> Result<(), ServerError>
where
    M: ModelClient + 'static,
    C: ListingConnector + 'static,
{
    let api = ApiDoc::openapi();
    info!(%addr, "Binding web server");

    let state = Arc::new(ServerState::new(handler, web.default_query.clone()));
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", api))
        .route("/", get(routes::page::page_handler::<M, C>))
        .route("/query", post(routes::query::query_handler::<M, C>))
        .route("/healthz", get(routes::health::health_handler))
        .layer(cors_layer(&web.cors_origins))
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Web server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        layer.allow_origin(parsed)
    }
}
