use anyhow::{Context, Result};
use iservice_sdk::WrappedMessage;

use super::parse_payload;

/// Print the envelope a payload would be sent in
pub fn run(payload: &str, pretty: bool) -> Result<()> {
    let message = WrappedMessage::new(parse_payload(payload));
    let json = if pretty {
        serde_json::to_string_pretty(&message)
    } else {
        message.to_json()
    }
    .context("Failed to encode message")?;

    println!("{}", json);
    Ok(())
}
