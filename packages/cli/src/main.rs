use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use config::{Config, ConnectionArgs};

#[derive(Parser)]
#[command(name = "iservice", about = "iservice CLI - Talk to an iservice WebSocket endpoint")]
#[command(version, propagate_version = true)]
struct Cli {
    /// Path to configuration file (default: ~/.iservice/config.toml)
    #[arg(short, long, global = true, env = "ISERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session, print inbound frames and send each stdin line
    Connect {
        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Send a single payload and close
    Send {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Payload to send (JSON, or sent as a plain string)
        payload: String,

        /// Seconds to keep printing replies before closing
        #[arg(short, long, default_value = "0")]
        wait: u64,
    },

    /// Print the envelope for a payload without connecting
    Wrap {
        /// Payload to wrap (JSON, or wrapped as a plain string)
        payload: String,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init { .. } => Config::default(),
        _ => Config::load(cli.config.as_deref())?,
    };
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Connect { connection } => {
            let options = config.connection.merge(&connection).to_options()?;
            commands::connect::run(options).await
        }
        Commands::Send {
            connection,
            payload,
            wait,
        } => {
            let options = config.connection.merge(&connection).to_options()?;
            commands::send::run(options, &payload, wait).await
        }
        Commands::Wrap { payload, pretty } => commands::wrap::run(&payload, pretty),
        Commands::Init { force } => commands::init::run(cli.config.as_deref(), force),
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

fn show_version() {
    println!("iservice {}", env!("CARGO_PKG_VERSION"));
    println!("Command line client for iservice WebSocket endpoints");
    println!();
    println!("Features:");
    println!("  - Single WebSocket session per invocation");
    println!("  - JSON message envelopes");
    println!("  - Interactive mode reading payloads from stdin");
}
