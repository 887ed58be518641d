use crate::application::handler::QueryHandler;
use crate::application::tooling::ListingConnector;
use crate::infrastructure::model::ModelClient;
use std::sync::Arc;

pub(crate) struct ServerState<M: ModelClient, C: ListingConnector> {
    handler: Arc<QueryHandler<M, C>>,
    default_query: String,
}

impl<M: ModelClient, C: ListingConnector> ServerState<M, C> {
    pub(crate) fn new(handler: Arc<QueryHandler<M, C>>, default_query: String) -> Self {
        Self {
            handler,
            default_query,
        }
    }

    pub(crate) fn handler(&self) -> Arc<QueryHandler<M, C>> {
        Arc::clone(&self.handler)
    }

    pub(crate) fn default_query(&self) -> &str {
        &self.default_query
    }
}
