//! Countries MCP server over SSE.

use clap::Parser;
use countries_mcp_types::{MCP_MESSAGE_PATH, MCP_STREAM_PATH};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use countries_mcp::{
    config::{self, Config},
    create_app,
    state::AppState,
};

/// Countries MCP - country data for MCP clients over SSE
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the REST Countries API
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = config::load_dotenv();
    let args = Args::parse();

    let config = Config::from_figment(args.config.as_deref(), args.port, args.api_url)?;

    // Config log level wins over RUST_LOG
    let filter = match config.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }
    info!("Configuration loaded");

    let state = AppState::from_config(&config)?;
    let app = create_app(state.clone());

    // Bind to 0.0.0.0 to be accessible from all interfaces
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("MCP SSE Server listening on port {}", config.port);
    info!(
        "SSE stream endpoint: http://localhost:{}{}",
        config.port, MCP_STREAM_PATH
    );
    info!(
        "Message post endpoint: http://localhost:{}{}",
        config.port, MCP_MESSAGE_PATH
    );

    let sessions = state.sessions().clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down gracefully...");

        // Ends every open SSE stream so the server can drain; opens arriving
        // from here on are refused
        let closed = sessions.close_all().await;
        info!("Closed {} MCP session(s)", closed);
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down");
    Ok(())
}
