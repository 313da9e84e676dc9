//! Drives one interactive client: user commands, socket callbacks and
//! snapshot fetches all funnel through a single `select!` loop so the
//! controller only ever sees one handler call at a time.

use super::transport::WsTransport;
use crate::{
    config::Config,
    input::{USAGE, UserCommand},
    snapshot::SnapshotSource,
};
use anyhow::{Context, Result};
use chatwire_core::{
    ConnectionController, ViewEvent, ViewPort,
    endpoint::ServerEndpoint,
    controller::{SendError, TOOL_PROBE_PROMPTS},
    locator::{HistoryLocator, Locator},
    protocol::SessionSnapshot,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// How long to wait for the socket to confirm closure when quitting.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

type Controller<V> = ConnectionController<WsTransport, V, HistoryLocator>;

/// A finished snapshot fetch, tagged with the session it was requested for.
type SnapshotOutcome = (String, Result<SessionSnapshot, String>);

enum Flow {
    Continue,
    Quit,
}

/// Runs the client until the user quits or the command channel closes.
#[instrument(name = "chat_client", skip_all, fields(server = %config.server_url))]
pub async fn run_client<V: ViewPort>(
    config: Config,
    view: V,
    mut commands: mpsc::Receiver<UserCommand>,
    snapshots: Arc<dyn SnapshotSource>,
) -> Result<()> {
    let endpoint =
        ServerEndpoint::new(config.server_url.clone()).context("Invalid server address")?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel();

    let mut controller = ConnectionController::new(
        endpoint,
        WsTransport::new(events_tx),
        view,
        HistoryLocator::new(config.page_url.clone()),
    );
    info!(
        session_id = controller.identity().session_id(),
        page = %controller.locator().current(),
        "Client ready"
    );

    if config.auto_connect {
        controller.connect();
    }

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    info!("Input closed");
                    break;
                };
                if let Flow::Quit = handle_command(&mut controller, command, &snapshots, &snapshot_tx) {
                    break;
                }
            }
            Some(event) = events_rx.recv() => {
                controller.on_transport_event(event);
            }
            Some((session_id, result)) = snapshot_rx.recv() => {
                controller.on_snapshot(&session_id, result);
            }
        }
    }

    if controller.state().is_active() {
        controller.disconnect();
        let drain = async {
            while let Some(event) = events_rx.recv().await {
                controller.on_transport_event(event);
                if !controller.state().is_active() {
                    break;
                }
            }
        };
        if tokio::time::timeout(CLOSE_GRACE, drain).await.is_err() {
            warn!("Socket did not confirm closure before exit");
        }
    }
    info!("Client finished");
    Ok(())
}

fn handle_command<V: ViewPort>(
    controller: &mut Controller<V>,
    command: UserCommand,
    snapshots: &Arc<dyn SnapshotSource>,
    snapshot_tx: &mpsc::UnboundedSender<SnapshotOutcome>,
) -> Flow {
    match command {
        UserCommand::Connect => controller.connect(),
        UserCommand::Disconnect => controller.disconnect(),
        UserCommand::Message(text) => {
            if let Err(e) = controller.send_user_message(&text) {
                notice(controller, e);
            }
        }
        UserCommand::EndSession => {
            if let Err(e) = controller.end_session() {
                notice(controller, e);
            }
        }
        UserCommand::ToolProbe => {
            if let Ok(prompt) = controller.test_tool_call() {
                info!(prompt, "Sent tool probe");
            }
        }
        UserCommand::Prompt(None) => {
            let listing = TOOL_PROBE_PROMPTS
                .iter()
                .enumerate()
                .map(|(i, prompt)| format!("{}. {prompt}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            notice(controller, format!("Example prompts:\n{listing}"));
        }
        UserCommand::Prompt(Some(number)) => match controller.send_example_prompt(number) {
            Ok(prompt) => info!(prompt, "Sent example prompt"),
            // The controller already asked the user to connect.
            Err(SendError::NotConnected) => {}
            Err(e) => notice(controller, e),
        },
        UserCommand::NewSession => controller.new_session(),
        UserCommand::ClearChat => controller.clear_chat(),
        UserCommand::Back => controller.navigate_back(),
        UserCommand::FetchSnapshot => {
            let session_id = controller.identity().session_id().to_string();
            match controller.snapshot_url() {
                Ok(url) => {
                    let source = Arc::clone(snapshots);
                    let tx = snapshot_tx.clone();
                    tokio::spawn(async move {
                        let result = source.fetch(url).await.map_err(|e| e.to_string());
                        let _ = tx.send((session_id, result));
                    });
                }
                Err(e) => controller.on_snapshot(&session_id, Err(e.to_string())),
            }
        }
        UserCommand::Status => {
            let counters = controller.counters();
            let connected_at = controller
                .connected_at()
                .map(|at| format!(", connected since {}", at.format("%H:%M:%S UTC")))
                .unwrap_or_default();
            let status = format!(
                "State: {}, session {}, {} messages, {} tool calls{connected_at}",
                controller.state(),
                controller.identity().session_id(),
                counters.messages,
                counters.tool_calls,
            );
            notice(controller, status);
        }
        UserCommand::Unknown(raw) => notice(controller, format!("Unknown command '{raw}'. {USAGE}")),
        UserCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn notice<V: ViewPort>(controller: &mut Controller<V>, text: impl std::fmt::Display) {
    controller
        .view_mut()
        .notify(ViewEvent::Notice(text.to_string()));
}
