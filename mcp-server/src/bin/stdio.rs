//! Countries MCP server over stdio.
//!
//! Stdout carries the protocol, so logs go to stderr.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use countries_mcp::{
    config::{self, Config},
    mcp::StdioTransport,
    state::AppState,
};

#[tokio::main]
async fn main() {
    config::load_dotenv();
    let config = Config::from_figment(None, None, None);

    // Config log level wins over RUST_LOG
    let filter = match config.as_ref().ok().and_then(|c| c.log_level.as_deref()) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("Fatal error in main(): {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let server = state.factory().create();
    server.connect(Arc::new(StdioTransport::new())).await?;

    info!("MCP Server running on stdio");
    server.wait().await?;
    Ok(())
}
