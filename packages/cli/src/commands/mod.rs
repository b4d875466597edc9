pub mod connect;
pub mod init;
pub mod send;
pub mod wrap;

use anyhow::{bail, Result};
use iservice_sdk::StartOutcome;
use serde_json::Value;

/// Interpret a command line payload: JSON when it parses, a plain string otherwise
pub fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Turn the way a session ended into the command's result
pub fn outcome_result(outcome: StartOutcome) -> Result<()> {
    match outcome {
        StartOutcome::Closed | StartOutcome::AlreadyStarted => Ok(()),
        StartOutcome::MissingDestination => bail!("No destination URI configured"),
        StartOutcome::ConnectFailed(e) => Err(anyhow::Error::new(e).context("Failed to connect")),
    }
}
