//! Configuration management.

use countries_mcp_types::DEFAULT_PORT;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".countries-mcp.toml";

/// Default base URL of the REST Countries API.
pub const DEFAULT_API_URL: &str = "https://restcountries.com/v3.1";

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Variables that are already set keep their values.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: UpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpstreamConfig {
    #[serde(default = "default_api_url")]
    base_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Base URL of the REST Countries API
    pub api_url: String,
    /// Timeout for a single upstream request
    pub request_timeout: Duration,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with full priority chain:
    /// CLI args > `port`/`PORT` env > `COUNTRIES_MCP_*` env > config file > defaults.
    ///
    /// The config file is `config_path` if given, otherwise `.countries-mcp.toml`
    /// in the current directory when it exists.
    pub fn from_figment(
        config_path: Option<&Path>,
        port: Option<u16>,
        api_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let local_config = env::current_dir().ok().map(|d| d.join(LOCAL_CONFIG_FILE));

        // 1. Start with defaults
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        // 2. Merge config file
        match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = local_config.filter(|p| p.exists()) {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        // 3. Merge environment variables (COUNTRIES_MCP_SECTION__KEY)
        figment = figment.merge(
            Env::prefixed("COUNTRIES_MCP_").map(|key| key.as_str().replace("__", ".").into()),
        );

        // 4. Bare port variable; non-numeric values are ignored
        if let Some(p) = port_from_env() {
            figment = figment.merge(Serialized::default("server.port", p));
        }

        // 5. Merge CLI arguments (highest priority)
        if let Some(p) = port {
            figment = figment.merge(Serialized::default("server.port", p));
        }
        if let Some(ref url) = api_url {
            figment = figment.merge(Serialized::default("upstream.base_url", url));
        }

        let config_file: ConfigFile = figment.extract()?;

        Ok(Self {
            port: config_file.server.port,
            api_url: config_file.upstream.base_url,
            request_timeout: Duration::from_secs(config_file.upstream.timeout_secs),
            log_level: config_file.logging.log_level,
        })
    }
}

/// Port from `port` (or `PORT`), if set to a valid number.
fn port_from_env() -> Option<u16> {
    env::var("port")
        .or_else(|_| env::var("PORT"))
        .ok()
        .and_then(|p| p.trim().parse().ok())
}
