//! CLI Configuration
//!
//! Connection and logging settings stored in ~/.iservice/config.toml, with
//! command line flags and environment variables layered on top.

use anyhow::{bail, Context, Result};
use clap::Args;
use iservice_sdk::connection::options::DEFAULT_MAX_MESSAGE_SIZE;
use iservice_sdk::ClientOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Destination of the WebSocket session
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Destination settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// WebSocket URI used for the upgrade request
    pub uri: Option<String>,

    /// Host to dial; defaults to the URI host
    pub host: Option<String>,

    /// Port to dial; defaults to the URI port
    pub port: Option<u16>,

    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Connection flags shared by the commands that open a session
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// WebSocket URI (ws:// or wss://)
    #[arg(short, long, env = "ISERVICE_URI")]
    pub uri: Option<String>,

    /// Host to dial instead of the URI host
    #[arg(long, env = "ISERVICE_HOST")]
    pub host: Option<String>,

    /// Port to dial instead of the URI port
    #[arg(short, long, env = "ISERVICE_PORT")]
    pub port: Option<u16>,
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: None,
            port: None,
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Get the default config file path (~/.iservice/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".iservice").join("config.toml"))
    }

    /// Load config from `path`, or from the default location.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::default_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

impl ConnectionConfig {
    /// Apply command line and environment overrides
    pub fn merge(mut self, args: &ConnectionArgs) -> Self {
        if let Some(uri) = &args.uri {
            self.uri = Some(uri.clone());
        }
        if let Some(host) = &args.host {
            self.host = Some(host.clone());
        }
        if let Some(port) = args.port {
            self.port = Some(port);
        }
        self
    }

    /// Build client options, checking the destination is usable
    pub fn to_options(&self) -> Result<ClientOptions> {
        let uri = self.uri.as_deref().map(str::trim).unwrap_or_default();
        if uri.is_empty() {
            bail!("No destination URI configured. Pass --uri or set connection.uri in the config file");
        }

        let options = ClientOptions::new(
            uri,
            self.host.clone().unwrap_or_default(),
            self.port.unwrap_or(0),
        )
        .with_max_message_size(self.max_message_size);

        options
            .socket_addr()
            .with_context(|| format!("Invalid destination {}", uri))?;

        Ok(options)
    }
}
