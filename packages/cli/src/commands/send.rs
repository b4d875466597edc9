use anyhow::{bail, Context, Result};
use colored::Colorize;
use iservice_sdk::{ChannelObserver, ClientEvent, ClientOptions, WebSocketClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, Instant};

use super::{outcome_result, parse_payload};

/// Open a session, send one payload and close
pub async fn run(options: ClientOptions, payload: &str, wait_secs: u64) -> Result<()> {
    let (observer, mut events) = ChannelObserver::new();
    let client = Arc::new(WebSocketClient::new(options, observer));

    let runner = client.clone();
    let mut session = tokio::spawn(async move { runner.start().await });

    tokio::select! {
        opened = wait_for_open(&mut events) => opened?,
        outcome = &mut session => {
            outcome_result(outcome.context("Session task failed")?)?;
            bail!("Connection closed before it was ready");
        }
    }

    client
        .send(parse_payload(payload))
        .context("Failed to send message")?;
    println!("{} {}", ">".yellow().bold(), payload);

    if wait_secs > 0 {
        print_replies(&mut events, Duration::from_secs(wait_secs)).await;
    }

    client.close();
    let outcome = session.await.context("Session task failed")?;
    outcome_result(outcome)
}

async fn wait_for_open(events: &mut UnboundedReceiver<ClientEvent>) -> Result<()> {
    while let Some(event) = events.recv().await {
        if let ClientEvent::Opened(_) = event {
            return Ok(());
        }
    }
    bail!("Client dropped before the session opened")
}

/// Print inbound messages until `window` elapses or the session ends
async fn print_replies(events: &mut UnboundedReceiver<ClientEvent>, window: Duration) {
    let deadline = sleep(window);
    tokio::pin!(deadline);
    let started = Instant::now();

    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = events.recv() => match event {
                Some(ClientEvent::Message(text)) => {
                    let elapsed = started.elapsed().as_millis();
                    println!("{} {} {}", format!("+{}ms", elapsed).dimmed(), "<".cyan().bold(), text);
                }
                Some(ClientEvent::Closed(_)) | None => break,
                Some(ClientEvent::Opened(_)) => {}
            }
        }
    }
}
