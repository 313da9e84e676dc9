//! The websocket transport: one spawned task per connection, reporting back
//! through a channel as `TransportEvent`s.

use chatwire_core::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind};
use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{Instrument, debug, error, info, warn};

/// Requests from the controller to the connection task.
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

struct Link {
    connection: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    _task: JoinHandle<()>,
}

/// A [`Transport`] backed by `tokio-tungstenite`. Must be used inside a tokio runtime.
pub struct WsTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    link: Option<Link>,
}

impl WsTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events, link: None }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, connection: ConnectionId, url: &str) -> Result<(), TransportError> {
        if let Some(link) = &self.link {
            error!(current = %link.connection, requested = %connection, "Transport already held");
            return Err(TransportError::AlreadyOpen);
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let span = tracing::info_span!("ws_link", %connection);
        let task = tokio::spawn(
            run_link(connection, url.to_string(), outbound_rx, self.events.clone())
                .instrument(span),
        );
        self.link = Some(Link {
            connection,
            outbound: outbound_tx,
            _task: task,
        });
        Ok(())
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotOpen)?;
        link.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::NotOpen)
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            debug!(connection = %link.connection, "Releasing transport");
            let _ = link.outbound.send(Outbound::Close);
        }
    }
}

/// Owns one websocket from handshake to teardown.
///
/// Always finishes with exactly one `Closed` event, whatever happened before.
async fn run_link(
    connection: ConnectionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent::new(connection, kind));
    };

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            error!(%url, error = %e, "Failed to connect websocket");
            emit(TransportEventKind::Error(e.to_string()));
            emit(TransportEventKind::Closed);
            return;
        }
    };
    info!(%url, "Websocket connected");
    emit(TransportEventKind::Opened);

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    loop {
        tokio::select! {
            // Requests from the controller.
            request = outbound.recv() => match request {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                        error!(error = %e, "Failed to write frame");
                        emit(TransportEventKind::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    info!("Closing websocket");
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            // Frames from the server.
            incoming = ws_rx.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => emit(TransportEventKind::Frame(text.to_string())),
                Some(Ok(WsMessage::Binary(data))) => {
                    warn!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(WsMessage::Close(close_frame))) => {
                    info!(?close_frame, "Websocket closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "Error reading from websocket");
                    emit(TransportEventKind::Error(e.to_string()));
                    break;
                }
                None => {
                    info!("Websocket stream ended");
                    break;
                }
            },
        }
    }
    emit(TransportEventKind::Closed);
}
