use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use iservice_sdk::{ClientOptions, MessageObserver, Uuid, WebSocketClient};
use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use super::{outcome_result, parse_payload};

/// Prints every inbound frame to stdout
pub struct PrintObserver {
    opened: Arc<Notify>,
}

impl PrintObserver {
    pub fn new(opened: Arc<Notify>) -> Self {
        Self { opened }
    }
}

#[async_trait]
impl MessageObserver for PrintObserver {
    async fn on_open(&self, session_id: Uuid) {
        println!(
            "{} Connected {}",
            "✓".green().bold(),
            format!("(session {})", session_id).dimmed()
        );
        self.opened.notify_one();
    }

    async fn on_message(&self, text: &str) {
        let ts = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        println!("{} {} {}", ts.dimmed(), "<".cyan().bold(), text);
    }

    async fn on_close(&self, _session_id: Uuid) {
        println!("{} Disconnected", "✗".red().bold());
    }
}

/// Open a session, print inbound frames and send each stdin line
pub async fn run(options: ClientOptions) -> Result<()> {
    let lines = spawn_stdin_reader()?;
    run_with_input(options, lines, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Drive a session fed by `lines` until it ends, `lines` is exhausted or
/// `shutdown` resolves
pub async fn run_with_input<F>(
    options: ClientOptions,
    lines: mpsc::Receiver<String>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    println!("Connecting to {}", options.uri().bold());

    let opened = Arc::new(Notify::new());
    let client = Arc::new(WebSocketClient::new(options, PrintObserver::new(opened.clone())));
    let _guard = client.close_guard();

    let input = tokio::spawn(forward_lines(client.clone(), opened, lines));

    let outcome = client.run_until(shutdown).await;

    input.abort();
    outcome_result(outcome)
}

/// Read stdin on a dedicated thread. A blocked read there never holds up
/// runtime shutdown; the thread dies with the process.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(64);

    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    Ok(rx)
}

/// Send input lines once the session is open; end of input closes the client
async fn forward_lines(
    client: Arc<WebSocketClient>,
    opened: Arc<Notify>,
    mut lines: mpsc::Receiver<String>,
) {
    opened.notified().await;

    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match client.send(parse_payload(line)) {
            Ok(()) => println!("{} {}", ">".yellow().bold(), line),
            Err(e) => eprintln!("{} {}", "!".red().bold(), e),
        }
    }

    debug!("Input closed, closing client");
    client.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// Server that closes each session after `hold`; text frames are echoed until then
    async fn server(hold: Duration) -> ClientOptions {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let deadline = tokio::time::sleep(hold);
                    tokio::pin!(deadline);
                    loop {
                        tokio::select! {
                            () = &mut deadline => {
                                let _ = ws.close(None).await;
                                break;
                            }
                            msg = ws.next() => match msg {
                                Some(Ok(msg)) if msg.is_text() => {
                                    if ws.send(msg).await.is_err() {
                                        break;
                                    }
                                }
                                Some(Ok(msg)) if msg.is_close() => break,
                                Some(Ok(_)) => {}
                                _ => break,
                            }
                        }
                    }
                });
            }
        });

        ClientOptions::from_uri(format!("ws://{}/ws", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_returns_when_remote_closes_with_input_open() {
        let options = server(Duration::from_millis(200)).await;
        let (tx, rx) = mpsc::channel(8);

        let result = timeout(WAIT, run_with_input(options, rx, std::future::pending()))
            .await
            .expect("connect kept running after the session ended");

        assert!(result.is_ok());
        // Input stayed open for the whole run
        drop(tx);
    }

    #[tokio::test]
    async fn test_end_of_input_closes_session() {
        let options = server(Duration::from_secs(60)).await;
        let (tx, rx) = mpsc::channel(8);
        tx.send(r#"{"op":"ping"}"#.to_string()).await.unwrap();
        drop(tx);

        let result = timeout(WAIT, run_with_input(options, rx, std::future::pending()))
            .await
            .expect("end of input did not close the session");

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_session() {
        let options = server(Duration::from_secs(60)).await;
        let (_tx, rx) = mpsc::channel::<String>(8);

        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        let result = timeout(WAIT, run_with_input(options, rx, shutdown))
            .await
            .expect("shutdown did not close the session");

        assert!(result.is_ok());
    }
}
