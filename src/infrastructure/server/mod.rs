mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use error::ServerError;
pub(crate) use state::ServerState;

use crate::application::handler::QueryHandler;
use crate::application::tooling::ListingConnector;
use crate::config::WebConfig;
use crate::infrastructure::model::ModelClient;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve<M, C>(
    handler: Arc<QueryHandler<M, C>>,
    addr: SocketAddr,
    web: &WebConfig,
) -> Result<(), ServerError>
where
    M: ModelClient + 'static,
    C: ListingConnector + 'static,
{
    router::serve(handler, addr, web).await
}
