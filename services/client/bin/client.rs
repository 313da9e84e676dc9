//! Main entrypoint for the chatwire terminal client.
//!
//! Loads configuration, sets up logging on stderr so it never interleaves with
//! the conversation on stdout, then hands stdin lines to the client loop.

use anyhow::Context;
use chatwire_client::{
    config::{Config, parse_http_url},
    input::{USAGE, parse_line},
    snapshot::HttpSnapshotSource,
    terminal::TerminalView,
    ws::run_client,
};
use chatwire_core::locator::with_session_id;
use clap::Parser;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

/// Terminal client for a realtime streaming chat server.
#[derive(Parser, Debug)]
#[command(name = "chatwire", version, about)]
struct Args {
    /// Server origin, e.g. https://chat.example.com (overrides CHATWIRE_SERVER_URL)
    #[arg(long)]
    server: Option<String>,

    /// Page address the session id is kept in (overrides CHATWIRE_PAGE_URL)
    #[arg(long)]
    page: Option<String>,

    /// Resume this session instead of the one in the page address
    #[arg(long)]
    session_id: Option<String>,

    /// Connect as soon as the client starts
    #[arg(long)]
    connect: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(server) = &args.server {
        config.server_url = parse_http_url("--server", server)?;
        if args.page.is_none() && std::env::var("CHATWIRE_PAGE_URL").is_err() {
            config.page_url = config
                .server_url
                .join("frontend")
                .context("Failed to derive page address")?;
        }
    }
    if let Some(page) = &args.page {
        config.page_url = parse_http_url("--page", page)?;
    }
    if let Some(session_id) = args.session_id.as_deref().filter(|s| !s.trim().is_empty()) {
        config.page_url = with_session_id(&config.page_url, session_id.trim());
    }
    config.auto_connect |= args.connect;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        server = %config.server_url,
        page = %config.page_url,
        auto_connect = config.auto_connect,
        "Configuration loaded"
    );

    // --- 3. Read commands from stdin ---
    let (commands_tx, commands_rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(command) = parse_line(&line) else {
                        continue;
                    };
                    if commands_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            }
        }
    });

    // --- 4. Run ---
    let mut view = TerminalView::stdout();
    view.print(USAGE);
    run_client(
        config,
        view,
        commands_rx,
        Arc::new(HttpSnapshotSource::default()),
    )
    .await?;

    info!("Goodbye.");
    Ok(())
}
