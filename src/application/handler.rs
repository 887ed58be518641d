use crate::application::agent::{Agent, AgentError, AgentOptions, AgentStep};
use crate::application::tooling::{ListingConnection, ListingConnector, ToolInvokeError};
use crate::infrastructure::model::ModelClient;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Per-handler configuration. The credential is resolved once at startup and
/// injected here explicitly; the handler never reads ambient process state.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub model: String,
    pub system_prompt: Option<String>,
    /// Resolved API key for the model provider, if the environment had one.
    pub credential: Option<String>,
    /// Name of the environment variable the credential comes from. Only used
    /// to tell the user what to set.
    pub credential_var: String,
}

impl HandlerSettings {
    pub fn new(model: impl Into<String>, credential_var: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            credential: None,
            credential_var: credential_var.into(),
        }
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("credential environment variable '{var}' is not set")]
    MissingCredential { var: String },
    #[error("failed to reach the listings tool server: {0}")]
    Connection(#[source] ToolInvokeError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl QueryError {
    pub fn user_message(&self) -> String {
        match self {
            QueryError::MissingCredential { var } => {
                format!("{var} not found in the environment.")
            }
            QueryError::Connection(err) => err.user_message(),
            QueryError::Agent(err) => err.user_message(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query_id: Uuid,
    pub response: String,
    pub steps: Vec<AgentStep>,
}

/// Runs one listings query end to end: credential gate, scoped tool
/// connection, agent run, guaranteed release.
///
/// Each invocation opens its own connection and closes it before returning,
/// on the success path and on every failure path past establishment. Nothing
/// is shared between invocations.
pub struct QueryHandler<M: ModelClient, C: ListingConnector> {
    model: M,
    connector: C,
    settings: HandlerSettings,
}

impl<M: ModelClient, C: ListingConnector> QueryHandler<M, C> {
    pub fn new(model: M, connector: C, settings: HandlerSettings) -> Self {
        Self {
            model,
            connector,
            settings,
        }
    }

    pub async fn handle(&self, query: &str) -> Result<QueryOutcome, QueryError> {
        if self
            .settings
            .credential
            .as_deref()
            .is_none_or(|c| c.trim().is_empty())
        {
            return Err(QueryError::MissingCredential {
                var: self.settings.credential_var.clone(),
            });
        }

        let query_id = Uuid::new_v4();
        info!(%query_id, "Handling listings query");

        let connection = self.connector.connect().await.map_err(|err| {
            error!(%query_id, %err, "Failed to establish tool connection");
            QueryError::Connection(err)
        })?;

        let options = AgentOptions::new(self.settings.model.clone())
            .with_system_prompt(self.settings.system_prompt.clone());
        let agent = Agent::new(&self.model, &connection, options);
        let result = agent.run(query.to_string()).await;

        // Release before the result is propagated, whichever way it went.
        connection.close().await;

        match result {
            Ok(outcome) => {
                info!(%query_id, steps = outcome.steps.len(), "Query completed");
                Ok(QueryOutcome {
                    query_id,
                    response: outcome.response,
                    steps: outcome.steps,
                })
            }
            Err(err) => {
                error!(%query_id, %err, "Agent run failed");
                Err(QueryError::Agent(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tooling::ServerToolInfo;
    use crate::infrastructure::model::{ModelError, ModelRequest, ModelResponse};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingConnector {
        connects: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        fail_connect: bool,
    }

    struct CountingConnection {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ListingConnector for CountingConnector {
        type Connection = CountingConnection;

        async fn connect(&self) -> Result<CountingConnection, ToolInvokeError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                return Err(ToolInvokeError::Spawn {
                    server: "fake".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such command"),
                });
            }
            Ok(CountingConnection {
                closes: self.closes.clone(),
            })
        }
    }

    #[async_trait]
    impl ListingConnection for CountingConnection {
        async fn tools(&self) -> Vec<ServerToolInfo> {
            vec![ServerToolInfo {
                name: "airbnb_search".into(),
                description: None,
                input_schema: None,
            }]
        }

        async fn instructions(&self) -> Option<String> {
            None
        }

        async fn call_tool(&self, _tool: &str, _arguments: Value) -> Result<Value, ToolInvokeError> {
            Ok(json!({"content": []}))
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct CountingModel {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ModelClient for CountingModel {
        fn id(&self) -> &str {
            "counting"
        }

        async fn chat(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelError::invalid_response("counting", "scripted failure"));
            }
            Ok(ModelResponse::new(
                r#"{"action":"final","response":"**listings**"}"#.to_string(),
            ))
        }
    }

    fn settings_with_credential(credential: Option<&str>) -> HandlerSettings {
        HandlerSettings::new("test-model", "GROQ_API_KEY")
            .with_credential(credential.map(String::from))
    }

    #[tokio::test]
    async fn missing_credential_attempts_no_connection() {
        let connector = CountingConnector::default();
        let handler = QueryHandler::new(
            CountingModel::default(),
            connector.clone(),
            settings_with_credential(None),
        );

        let error = handler.handle("find a room").await.expect_err("must fail");
        assert!(matches!(error, QueryError::MissingCredential { var } if var == "GROQ_API_KEY"));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let connector = CountingConnector::default();
        let handler = QueryHandler::new(
            CountingModel::default(),
            connector.clone(),
            settings_with_credential(Some("   ")),
        );

        let error = handler.handle("find a room").await.expect_err("must fail");
        assert!(matches!(error, QueryError::MissingCredential { .. }));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn opens_and_closes_exactly_once_on_success() {
        let connector = CountingConnector::default();
        let handler = QueryHandler::new(
            CountingModel::default(),
            connector.clone(),
            settings_with_credential(Some("sk-test")),
        );

        let outcome = handler.handle("find a room").await.expect("succeeds");
        assert_eq!(outcome.response, "**listings**");
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closes_connection_when_agent_fails() {
        let connector = CountingConnector::default();
        let model = CountingModel {
            fail: true,
            ..CountingModel::default()
        };
        let handler = QueryHandler::new(
            model,
            connector.clone(),
            settings_with_credential(Some("sk-test")),
        );

        let error = handler.handle("find a room").await.expect_err("must fail");
        assert!(matches!(error, QueryError::Agent(_)));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connection_failure_skips_model_invocation() {
        let connector = CountingConnector {
            fail_connect: true,
            ..CountingConnector::default()
        };
        let model = CountingModel::default();
        let handler = QueryHandler::new(
            model.clone(),
            connector.clone(),
            settings_with_credential(Some("sk-test")),
        );

        let error = handler.handle("find a room").await.expect_err("must fail");
        assert!(matches!(error, QueryError::Connection(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_invocations_use_fresh_connections() {
        let connector = CountingConnector::default();
        let handler = QueryHandler::new(
            CountingModel::default(),
            connector.clone(),
            settings_with_credential(Some("sk-test")),
        );

        handler.handle("first").await.expect("first succeeds");
        handler.handle("second").await.expect("second succeeds");

        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 2);
    }
}
