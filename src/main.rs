use clap::{Parser, ValueEnum};
use serde_json::json;
use stayscout::application::handler::{HandlerSettings, QueryHandler};
use stayscout::application::tooling::StdioConnector;
use stayscout::config::{AppConfig, DEFAULT_CREDENTIAL_VAR};
use stayscout::infrastructure::model::{build_client, resolve_api_key};
use stayscout::infrastructure::server;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "stayscout",
    version,
    about = "Search lodging listings through an LLM agent and an MCP tool server"
)]
struct Cli {
    /// Configuration file path
    #[arg(long)]
    config: Option<String>,
    /// Bind address for web mode (overrides config)
    #[arg(long)]
    addr: Option<SocketAddr>,
    #[arg(long, value_enum, default_value_t = RunMode::Web)]
    mode: RunMode,
    /// Read the query from a file instead of the arguments
    #[arg(long)]
    query_file: Option<String>,
    query: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RunMode {
    /// Serve the search page
    Web,
    /// Run a single query and print the result as JSON
    Query,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting stayscout");
    let cli = Cli::parse();
    debug!(?cli.mode, config = ?cli.config, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let file_config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or built-in defaults");
    }

    let provider = file_config
        .default_provider_config()
        .ok_or("default provider missing from configuration")?;
    let credential_var = provider
        .api_key
        .clone()
        .unwrap_or_else(|| DEFAULT_CREDENTIAL_VAR.to_string());
    let credential = resolve_api_key(&provider.id, Some(credential_var.as_str()));
    if credential.is_none() {
        warn!(
            env_var = credential_var.as_str(),
            "No model credential found; queries will be rejected until it is set"
        );
    }

    debug!(provider = %provider.id, model = %file_config.model, "Building model client");
    let model = build_client(provider, credential.clone());
    let connector = StdioConnector::new(file_config.listing_server.clone());
    let settings = HandlerSettings::new(file_config.model.clone(), credential_var)
        .with_credential(credential)
        .with_system_prompt(file_config.system_prompt.clone());
    let handler = Arc::new(QueryHandler::new(model, connector, settings));

    match cli.mode {
        RunMode::Web => {
            let addr: SocketAddr = match cli.addr {
                Some(addr) => addr,
                None => file_config.web.bind.parse()?,
            };
            info!(%addr, "Starting web server");
            server::serve(handler, addr, &file_config.web).await?;
        }
        RunMode::Query => {
            let query = load_query(&cli, &file_config)?;
            info!("Dispatching single query from CLI mode");
            let outcome = handler.handle(&query).await?;
            let output = json!({
                "query_id": outcome.query_id.to_string(),
                "content": outcome.response,
                "tool_steps": outcome.steps,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    info!("stayscout finished");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

fn load_query(cli: &Cli, config: &AppConfig) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.query_file {
        info!(path = %path, "Loading query from file");
        let content = fs::read_to_string(path)?;
        return Ok(content.trim().to_string());
    }

    if !cli.query.is_empty() {
        info!("Using query provided through CLI arguments");
        return Ok(cli.query.join(" ").trim().to_string());
    }

    if atty::isnt(atty::Stream::Stdin) {
        info!("Reading query from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer.trim().to_string());
    }

    warn!("No query given; falling back to the configured default");
    Ok(config.web.default_query.clone())
}
