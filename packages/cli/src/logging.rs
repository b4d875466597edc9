//! Logging setup
//!
//! Logs go to stderr so stdout only carries the frames the user asked for.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Pick the filter directive: `--verbose` beats `RUST_LOG`, which beats the config file
fn filter_directive(config: &LoggingConfig, verbose: bool, env: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    env.filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global tracing subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let directive = filter_directive(config, verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log level: {}", directive))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    }
    .map_err(|e| anyhow!(e))
    .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_forces_debug() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config, true, Some("warn".to_string())), "debug");
    }

    #[test]
    fn test_env_overrides_config() {
        let config = LoggingConfig::default();
        assert_eq!(
            filter_directive(&config, false, Some("iservice_sdk=trace".to_string())),
            "iservice_sdk=trace"
        );
    }

    #[test]
    fn test_config_level_is_fallback() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directive(&config, false, None), "warn");
        assert_eq!(filter_directive(&config, false, Some(" ".to_string())), "warn");
    }
}
