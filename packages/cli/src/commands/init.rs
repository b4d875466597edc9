use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::Config;

/// Write a default configuration file
pub fn run(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut config = Config::default();
    config.connection.uri = Some("ws://localhost:8080/ws".to_string());
    config.save(&path)?;

    println!(
        "{} Wrote default config to {}",
        "✓".green().bold(),
        path.display().to_string().dimmed()
    );
    Ok(())
}
