//! The connection lifecycle state machine.
//!
//! `ConnectionController` owns the transport, the session identity, the stream
//! aggregator, and the counters. Every public method and every call to
//! [`ConnectionController::on_transport_event`] is one serialized handler
//! invocation: the host must never run two of them concurrently.

use crate::{
    dispatch::{self, Conversation, Dispatch},
    endpoint::{EndpointError, ServerEndpoint},
    locator::Locator,
    protocol::{ClientCommand, SessionSnapshot},
    session::SessionIdentity,
    stream::StreamAggregator,
    transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind},
    view::{Counters, TranscriptEntry, ViewEvent, ViewPort},
};
use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use std::fmt;
use tracing::{debug, error, info, warn};
use url::Url;

/// Prompts used by [`ConnectionController::test_tool_call`] to exercise server-side tools.
pub const TOOL_PROBE_PROMPTS: [&str; 4] = [
    "Calculate the square root of 144",
    "Fetch weather data for 3 random cities",
    "Analyze sentiment of: 'I'm really happy with the service but the price could be better'",
    "Generate Python code to reverse a string",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    /// The transport reported closure. Behaves like `Idle` for a new `connect()`.
    Closed,
}

impl ConnectionState {
    /// Whether a transport is currently held.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "disconnected"),
        }
    }
}

/// Which user actions make sense in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect: bool,
    pub disconnect: bool,
    pub send: bool,
    pub end_session: bool,
    pub tool_probe: bool,
    pub new_session: bool,
}

impl Controls {
    pub fn for_state(state: ConnectionState) -> Self {
        let open = state == ConnectionState::Open;
        Self {
            connect: !state.is_active(),
            disconnect: state.is_active(),
            send: open,
            end_session: open,
            tool_probe: open,
            new_session: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Not connected to server")]
    NotConnected,
    #[error("No example prompt #{0}")]
    UnknownPrompt(usize),
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct ConnectionController<T, V, L> {
    endpoint: ServerEndpoint,
    transport: T,
    view: V,
    locator: L,
    identity: SessionIdentity,
    state: ConnectionState,
    connection: Option<ConnectionId>,
    last_connection: u64,
    stream: StreamAggregator,
    counters: Counters,
    transcript: Vec<TranscriptEntry>,
    connected_at: Option<DateTime<Utc>>,
}

impl<T: Transport, V: ViewPort, L: Locator> ConnectionController<T, V, L> {
    /// Resolves the session from the locator and announces the initial state.
    pub fn new(endpoint: ServerEndpoint, transport: T, view: V, mut locator: L) -> Self {
        let identity = SessionIdentity::resolve(&mut locator);
        let mut controller = Self {
            endpoint,
            transport,
            view,
            locator,
            identity,
            state: ConnectionState::Idle,
            connection: None,
            last_connection: 0,
            stream: StreamAggregator::new(),
            counters: Counters::default(),
            transcript: Vec::new(),
            connected_at: None,
        };
        controller.announce_session();
        controller
            .view
            .notify(ViewEvent::StatusChanged(controller.state));
        controller
    }

    /// Starts a connection for the current session.
    pub fn connect(&mut self) {
        if self.state.is_active() {
            info!(state = %self.state, "Connect requested while a connection is active");
            self.notice("Already connected");
            return;
        }

        let url = match self.endpoint.socket_url(self.identity.session_id()) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Could not build socket address");
                self.notice(format!("Failed to connect: {e}"));
                return;
            }
        };

        self.last_connection += 1;
        let connection = ConnectionId(self.last_connection);
        self.connection = Some(connection);
        self.set_state(ConnectionState::Connecting);
        self.notice("Connecting to server...");
        info!(%connection, %url, session_id = self.identity.session_id(), "Opening transport");

        if let Err(e) = self.transport.open(connection, url.as_str()) {
            error!(%connection, error = %e, "Transport failed to open");
            self.connection = None;
            self.set_state(ConnectionState::Closed);
            self.notice(format!("Failed to connect: {e}"));
        }
    }

    /// Asks the transport to close. The state changes when the close callback arrives.
    pub fn disconnect(&mut self) {
        if !self.state.is_active() {
            debug!(state = %self.state, "Disconnect requested with no active connection");
            return;
        }
        info!(connection = ?self.connection, "Closing transport");
        self.transport.close();
    }

    /// Feeds one transport callback into the state machine.
    pub fn on_transport_event(&mut self, event: TransportEvent) {
        if self.connection != Some(event.connection) {
            debug!(
                connection = %event.connection,
                current = ?self.connection,
                kind = ?event.kind,
                "Ignoring event from a released transport"
            );
            return;
        }

        match event.kind {
            TransportEventKind::Opened => {
                if self.state != ConnectionState::Connecting {
                    warn!(state = %self.state, "Open callback outside of connecting state");
                    return;
                }
                let now = Utc::now();
                self.connected_at = Some(now);
                self.set_state(ConnectionState::Open);
                self.view.notify(ViewEvent::ConnectedAt(now));
                self.notice("Connected successfully!");
            }
            TransportEventKind::Frame(raw) => {
                self.dispatch(&raw);
            }
            TransportEventKind::Error(reason) => {
                warn!(connection = %event.connection, %reason, "Transport error");
                self.notice("Connection error occurred");
            }
            TransportEventKind::Closed => {
                info!(connection = %event.connection, "Transport closed");
                self.release(ConnectionState::Closed);
                self.notice("Disconnected from server");
            }
        }
    }

    /// Routes one raw inbound frame.
    pub fn dispatch(&mut self, raw: &str) -> Dispatch {
        dispatch::dispatch(
            raw,
            Conversation {
                identity: &mut self.identity,
                stream: &mut self.stream,
                counters: &mut self.counters,
                transcript: &mut self.transcript,
                view: &mut self.view,
            },
        )
    }

    /// Writes a command to the transport. Only legal while open.
    ///
    /// A user message is echoed locally and counted as soon as it is written;
    /// the server never acknowledges it.
    pub fn send(&mut self, command: ClientCommand) -> Result<(), SendError> {
        let result = self.write(command);
        if let Err(e) = &result {
            warn!(state = %self.state, error = %e, "Send failed");
        }
        result
    }

    fn write(&mut self, command: ClientCommand) -> Result<(), SendError> {
        if self.state != ConnectionState::Open {
            return Err(SendError::NotConnected);
        }
        let frame = command.encode()?;
        self.transport.send(frame)?;

        if let ClientCommand::UserMessage { message } = command {
            self.counters.messages += 1;
            self.transcript.push(TranscriptEntry::User(message.clone()));
            self.view.notify(ViewEvent::UserMessage(message));
            self.view.notify(ViewEvent::CountersChanged(self.counters));
        }
        Ok(())
    }

    /// Sends trimmed user text. Blank text is silently ignored.
    pub fn send_user_message(&mut self, text: &str) -> Result<(), SendError> {
        let message = text.trim();
        if message.is_empty() {
            debug!("Ignoring blank user message");
            return Ok(());
        }
        self.send(ClientCommand::UserMessage {
            message: message.to_string(),
        })
    }

    pub fn end_session(&mut self) -> Result<(), SendError> {
        self.send(ClientCommand::EndSession)?;
        self.notice("Ending session...");
        Ok(())
    }

    /// Sends one of [`TOOL_PROBE_PROMPTS`] at random. Returns the prompt that was sent.
    pub fn test_tool_call(&mut self) -> Result<&'static str, SendError> {
        if self.state != ConnectionState::Open {
            self.notice("Not connected to server");
            return Err(SendError::NotConnected);
        }
        let prompt = TOOL_PROBE_PROMPTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(TOOL_PROBE_PROMPTS[0]);
        self.send_user_message(prompt)?;
        Ok(prompt)
    }

    /// Sends example prompt `number`, counting from 1 in [`TOOL_PROBE_PROMPTS`].
    pub fn send_example_prompt(&mut self, number: usize) -> Result<&'static str, SendError> {
        if self.state != ConnectionState::Open {
            self.notice("Please connect first");
            return Err(SendError::NotConnected);
        }
        let prompt = number
            .checked_sub(1)
            .and_then(|i| TOOL_PROBE_PROMPTS.get(i))
            .copied()
            .ok_or(SendError::UnknownPrompt(number))?;
        self.send_user_message(prompt)?;
        Ok(prompt)
    }

    /// Abandons the current session for a brand new one. Always legal.
    pub fn new_session(&mut self) {
        if self.state.is_active() {
            self.disconnect();
            self.release(ConnectionState::Idle);
        }
        self.identity.rotate(&mut self.locator);
        self.clear_chat();
        self.announce_session();
        self.notice("New session created. Connect to start.");
    }

    /// Drops the transcript and zeroes the counters without touching the session.
    pub fn clear_chat(&mut self) {
        self.transcript.clear();
        self.counters = Counters::default();
        self.view.notify(ViewEvent::ChatCleared);
        self.view.notify(ViewEvent::CountersChanged(self.counters));
    }

    /// Steps the locator back one entry. The live session is not changed.
    pub fn navigate_back(&mut self) {
        match self.locator.back() {
            Some(url) => {
                let url = url.clone();
                self.view.notify(ViewEvent::LocatorChanged(url));
            }
            None => self.notice("No earlier session in history"),
        }
    }

    /// Address of the read-only snapshot for the current session.
    pub fn snapshot_url(&self) -> Result<Url, EndpointError> {
        self.endpoint.snapshot_url(self.identity.session_id())
    }

    /// Hands the outcome of a snapshot fetch for `session_id` to the view.
    /// Outcomes for a session that has since been rotated away are dropped.
    /// Connection state is untouched.
    pub fn on_snapshot(&mut self, session_id: &str, result: Result<SessionSnapshot, String>) {
        if session_id != self.identity.session_id() {
            debug!(
                requested = session_id,
                current = self.identity.session_id(),
                "Dropping snapshot for a previous session"
            );
            return;
        }
        match result {
            Ok(snapshot) => {
                debug!(events = snapshot.events.len(), "Session snapshot received");
                self.view.notify(ViewEvent::Snapshot(snapshot));
            }
            Err(e) => {
                warn!(error = %e, "Session snapshot failed");
                self.view
                    .notify(ViewEvent::Alert(format!("Error fetching session data: {e}")));
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn controls(&self) -> Controls {
        Controls::for_state(self.state)
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn stream(&self) -> &StreamAggregator {
        &self.stream
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Lets go of the current connection and lands in `next`.
    fn release(&mut self, next: ConnectionState) {
        self.connection = None;
        self.connected_at = None;
        self.transport.close();
        self.stream.on_connection_lost(&mut self.view);
        self.set_state(next);
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(
                session_id = self.identity.session_id(),
                from = %self.state,
                to = %next,
                "Connection state changed"
            );
        }
        self.state = next;
        self.view.notify(ViewEvent::StatusChanged(next));
    }

    fn announce_session(&mut self) {
        self.view.notify(ViewEvent::SessionChanged {
            session_id: self.identity.session_id().to_string(),
            user_id: self.identity.user_id().map(str::to_string),
        });
        self.view
            .notify(ViewEvent::LocatorChanged(self.locator.current().clone()));
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.view.notify(ViewEvent::Notice(text.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        locator::{HistoryLocator, SESSION_PARAM, query_param},
        transport::MockTransport,
    };
    use mockall::predicate::eq;

    type TestController = ConnectionController<MockTransport, Vec<ViewEvent>, HistoryLocator>;

    fn controller_at(page: &str, transport: MockTransport) -> TestController {
        ConnectionController::new(
            ServerEndpoint::new(Url::parse("http://localhost:8000").unwrap()).unwrap(),
            transport,
            Vec::new(),
            HistoryLocator::new(Url::parse(page).unwrap()),
        )
    }

    fn controller(transport: MockTransport) -> TestController {
        controller_at("http://localhost:8000/frontend?session_id=abc123", transport)
    }

    fn permissive_transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport.expect_send().returning(|_| Ok(()));
        transport.expect_close().returning(|| ());
        transport
    }

    fn event(ctl: &TestController, kind: TransportEventKind) -> TransportEvent {
        TransportEvent::new(ctl.connection().expect("no current connection"), kind)
    }

    fn open(ctl: &mut TestController) {
        ctl.connect();
        let opened = event(ctl, TransportEventKind::Opened);
        ctl.on_transport_event(opened);
        assert_eq!(ctl.state(), ConnectionState::Open);
    }

    fn notices(ctl: &TestController) -> Vec<&str> {
        ctl.view()
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_opens_socket_for_session() {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .with(eq(ConnectionId(1)), eq("ws://localhost:8000/ws/session/abc123"))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut ctl = controller(transport);

        ctl.connect();

        assert_eq!(ctl.state(), ConnectionState::Connecting);
        assert!(
            ctl.view()
                .contains(&ViewEvent::StatusChanged(ConnectionState::Connecting))
        );
        assert!(notices(&ctl).contains(&"Connecting to server..."));
    }

    #[test]
    fn test_open_callback_records_timestamp() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);

        assert!(ctl.connected_at().is_some());
        assert!(notices(&ctl).contains(&"Connected successfully!"));
        assert!(
            ctl.view()
                .iter()
                .any(|e| matches!(e, ViewEvent::ConnectedAt(_)))
        );
        assert_eq!(ctl.controls(), Controls::for_state(ConnectionState::Open));
    }

    #[test]
    fn test_connect_while_active_never_opens_second_transport() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(1).returning(|_, _| Ok(()));
        let mut ctl = controller(transport);

        ctl.connect();
        ctl.connect();
        assert_eq!(ctl.connection(), Some(ConnectionId(1)));

        let opened = event(&ctl, TransportEventKind::Opened);
        ctl.on_transport_event(opened);
        ctl.connect();

        assert_eq!(ctl.state(), ConnectionState::Open);
        assert_eq!(
            notices(&ctl)
                .iter()
                .filter(|n| **n == "Already connected")
                .count(),
            2
        );
    }

    #[test]
    fn test_open_failure_lands_in_closed() {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .times(1)
            .returning(|_, _| Err(TransportError::Open("refused".into())));
        let mut ctl = controller(transport);

        ctl.connect();

        assert_eq!(ctl.state(), ConnectionState::Closed);
        assert_eq!(ctl.connection(), None);
        assert!(
            notices(&ctl)
                .iter()
                .any(|n| n.starts_with("Failed to connect"))
        );
    }

    #[test]
    fn test_send_is_gated_on_open() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport.expect_send().times(0);
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.send_user_message("hello"),
            Err(SendError::NotConnected)
        ));
        ctl.connect();
        assert!(matches!(
            ctl.send(ClientCommand::EndSession),
            Err(SendError::NotConnected)
        ));

        assert_eq!(ctl.counters().messages, 0);
        assert!(ctl.transcript().is_empty());
    }

    #[test]
    fn test_send_writes_frame_and_echoes_locally() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport
            .expect_send()
            .withf(|frame: &String| frame == r#"{"type":"user_message","message":"hello"}"#)
            .times(1)
            .returning(|_| Ok(()));
        let mut ctl = controller(transport);
        open(&mut ctl);

        ctl.send_user_message("  hello \n").unwrap();

        assert_eq!(ctl.counters().messages, 1);
        assert_eq!(ctl.transcript(), &[TranscriptEntry::User("hello".into())]);
        assert!(ctl.view().contains(&ViewEvent::UserMessage("hello".into())));
    }

    #[test]
    fn test_blank_message_sends_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport.expect_send().times(0);
        let mut ctl = controller(transport);
        open(&mut ctl);

        ctl.send_user_message("   ").unwrap();
        assert_eq!(ctl.counters().messages, 0);
    }

    #[test]
    fn test_transport_send_failure_does_not_echo() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport
            .expect_send()
            .returning(|_| Err(TransportError::NotOpen));
        let mut ctl = controller(transport);
        open(&mut ctl);

        assert!(matches!(
            ctl.send_user_message("hello"),
            Err(SendError::Transport(TransportError::NotOpen))
        ));
        assert_eq!(ctl.counters().messages, 0);
    }

    #[test]
    fn test_end_session_frame_and_notice() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport
            .expect_send()
            .withf(|frame: &String| frame == r#"{"type":"end_session"}"#)
            .times(1)
            .returning(|_| Ok(()));
        let mut ctl = controller(transport);
        open(&mut ctl);

        ctl.end_session().unwrap();

        assert!(notices(&ctl).contains(&"Ending session..."));
        assert_eq!(ctl.counters().messages, 0);
    }

    #[test]
    fn test_tool_probe_sends_a_canned_prompt() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport
            .expect_send()
            .withf(|frame: &String| {
                TOOL_PROBE_PROMPTS.iter().any(|p| {
                    frame
                        == &ClientCommand::UserMessage {
                            message: p.to_string(),
                        }
                        .encode()
                        .unwrap()
                })
            })
            .times(1)
            .returning(|_| Ok(()));
        let mut ctl = controller(transport);

        assert!(ctl.test_tool_call().is_err());
        assert!(notices(&ctl).contains(&"Not connected to server"));

        open(&mut ctl);
        let prompt = ctl.test_tool_call().unwrap();
        assert!(TOOL_PROBE_PROMPTS.contains(&prompt));
        assert_eq!(ctl.counters().messages, 1);
    }

    #[test]
    fn test_disconnect_waits_for_close_callback() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport.expect_close().times(2).returning(|| ());
        let mut ctl = controller(transport);
        open(&mut ctl);

        ctl.disconnect();
        assert_eq!(ctl.state(), ConnectionState::Open);

        let closed = event(&ctl, TransportEventKind::Closed);
        ctl.on_transport_event(closed);
        assert_eq!(ctl.state(), ConnectionState::Closed);
        assert_eq!(ctl.connection(), None);
        assert_eq!(ctl.connected_at(), None);
        assert!(notices(&ctl).contains(&"Disconnected from server"));
    }

    #[test]
    fn test_disconnect_when_idle_is_a_no_op() {
        let mut transport = MockTransport::new();
        transport.expect_close().times(0);
        let mut ctl = controller(transport);
        let before = ctl.view().len();

        ctl.disconnect();

        assert_eq!(ctl.state(), ConnectionState::Idle);
        assert_eq!(ctl.view().len(), before);
    }

    #[test]
    fn test_reconnect_after_close_is_legal() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(2).returning(|_, _| Ok(()));
        transport.expect_close().returning(|| ());
        let mut ctl = controller(transport);
        open(&mut ctl);
        let closed = event(&ctl, TransportEventKind::Closed);
        ctl.on_transport_event(closed);

        ctl.connect();
        assert_eq!(ctl.state(), ConnectionState::Connecting);
        assert_eq!(ctl.connection(), Some(ConnectionId(2)));
    }

    #[test]
    fn test_peer_close_discards_partial_stream() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);
        let token = event(
            &ctl,
            TransportEventKind::Frame(r#"{"type":"ai_stream","token":"half"}"#.into()),
        );
        ctl.on_transport_event(token);
        assert!(ctl.stream().is_active());

        let closed = event(&ctl, TransportEventKind::Closed);
        ctl.on_transport_event(closed);

        assert!(!ctl.stream().is_active());
        assert_eq!(ctl.counters().messages, 0);
        assert!(
            !ctl.view()
                .iter()
                .any(|e| matches!(e, ViewEvent::AssistantMessage(_)))
        );
    }

    #[test]
    fn test_transport_error_only_adds_notice() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);

        let error = event(&ctl, TransportEventKind::Error("reset by peer".into()));
        ctl.on_transport_event(error);

        assert_eq!(ctl.state(), ConnectionState::Open);
        assert!(notices(&ctl).contains(&"Connection error occurred"));
    }

    #[test]
    fn test_malformed_frame_keeps_connection_open() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);
        let counters = ctl.counters();

        let garbage = event(&ctl, TransportEventKind::Frame("<html>".into()));
        ctl.on_transport_event(garbage);

        assert_eq!(ctl.state(), ConnectionState::Open);
        assert_eq!(ctl.counters(), counters);
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);
        let before = ctl.view().len();

        ctl.on_transport_event(TransportEvent::new(
            ConnectionId(99),
            TransportEventKind::Closed,
        ));

        assert_eq!(ctl.state(), ConnectionState::Open);
        assert_eq!(ctl.view().len(), before);
    }

    #[test]
    fn test_new_session_rotates_and_forces_idle() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);
        ctl.dispatch(r#"{"type":"session_info","session_id":"abc123","user_id":"u1"}"#);
        ctl.send_user_message("hello").unwrap();
        ctl.dispatch(r#"{"type":"tool_result","tool_name":"calc","result":12}"#);
        let old_connection = ctl.connection().unwrap();

        ctl.new_session();

        assert_eq!(ctl.state(), ConnectionState::Idle);
        assert_ne!(ctl.identity().session_id(), "abc123");
        assert_eq!(ctl.identity().user_id(), None);
        assert_eq!(ctl.counters(), Counters::default());
        assert!(ctl.transcript().is_empty());
        assert_eq!(ctl.locator().len(), 2);
        assert_eq!(
            query_param(ctl.locator().current(), SESSION_PARAM).as_deref(),
            Some(ctl.identity().session_id())
        );
        assert!(notices(&ctl).contains(&"New session created. Connect to start."));

        // The old transport's close callback arrives late and must not disturb anything.
        let before = ctl.view().len();
        ctl.on_transport_event(TransportEvent::new(
            old_connection,
            TransportEventKind::Closed,
        ));
        assert_eq!(ctl.state(), ConnectionState::Idle);
        assert_eq!(ctl.view().len(), before);
    }

    #[test]
    fn test_new_session_while_idle_does_not_touch_transport() {
        let mut transport = MockTransport::new();
        transport.expect_close().times(0);
        transport.expect_open().times(0);
        let mut ctl = controller(transport);

        ctl.new_session();

        assert_eq!(ctl.state(), ConnectionState::Idle);
        assert_ne!(ctl.identity().session_id(), "abc123");
    }

    #[test]
    fn test_counters_survive_reconnect_but_not_clear_chat() {
        let mut ctl = controller(permissive_transport());
        open(&mut ctl);
        ctl.send_user_message("one").unwrap();
        let closed = event(&ctl, TransportEventKind::Closed);
        ctl.on_transport_event(closed);
        open(&mut ctl);

        assert_eq!(ctl.counters().messages, 1);

        ctl.clear_chat();
        assert_eq!(ctl.counters(), Counters::default());
        assert!(ctl.view().contains(&ViewEvent::ChatCleared));
    }

    #[test]
    fn test_page_without_session_gets_one_in_place() {
        let ctl = controller_at("http://localhost:8000/frontend", MockTransport::new());
        assert!(ctl.identity().session_id().starts_with("session_"));
        assert_eq!(ctl.locator().len(), 1);
        assert_eq!(
            query_param(ctl.locator().current(), SESSION_PARAM).as_deref(),
            Some(ctl.identity().session_id())
        );
    }

    #[test]
    fn test_navigate_back_after_rotation() {
        let mut ctl = controller(MockTransport::new());
        ctl.new_session();

        ctl.navigate_back();
        let last = ctl.view().last().cloned();
        match last {
            Some(ViewEvent::LocatorChanged(url)) => {
                assert_eq!(query_param(&url, SESSION_PARAM).as_deref(), Some("abc123"));
            }
            other => panic!("expected LocatorChanged, got {other:?}"),
        }

        ctl.navigate_back();
        assert!(notices(&ctl).contains(&"No earlier session in history"));
    }

    #[test]
    fn test_snapshot_outcomes() {
        let mut ctl = controller(MockTransport::new());
        assert_eq!(
            ctl.snapshot_url().unwrap().as_str(),
            "http://localhost:8000/api/session/abc123"
        );

        ctl.on_snapshot("abc123", Err("Failed to fetch session data".into()));
        assert!(ctl.view().contains(&ViewEvent::Alert(
            "Error fetching session data: Failed to fetch session data".into()
        )));
        assert_eq!(ctl.state(), ConnectionState::Idle);

        let snapshot = SessionSnapshot {
            session: serde_json::json!({"session_id": "abc123"}),
            events: vec![],
        };
        ctl.on_snapshot("abc123", Ok(snapshot.clone()));
        assert!(ctl.view().contains(&ViewEvent::Snapshot(snapshot)));
    }

    #[test]
    fn test_snapshot_for_rotated_session_is_dropped() {
        let mut ctl = controller(MockTransport::new());
        ctl.new_session();
        let before = ctl.view().len();

        ctl.on_snapshot(
            "abc123",
            Ok(SessionSnapshot {
                session: serde_json::json!({"session_id": "abc123"}),
                events: vec![],
            }),
        );
        ctl.on_snapshot("abc123", Err("Failed to fetch session data".into()));

        assert_eq!(ctl.view().len(), before);
    }

    #[test]
    fn test_example_prompt_requires_connection() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|_, _| Ok(()));
        transport
            .expect_send()
            .withf(|frame: &String| frame.contains(TOOL_PROBE_PROMPTS[1]))
            .times(1)
            .returning(|_| Ok(()));
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.send_example_prompt(2),
            Err(SendError::NotConnected)
        ));
        assert!(notices(&ctl).contains(&"Please connect first"));

        open(&mut ctl);
        assert!(matches!(
            ctl.send_example_prompt(0),
            Err(SendError::UnknownPrompt(0))
        ));
        assert!(matches!(
            ctl.send_example_prompt(5),
            Err(SendError::UnknownPrompt(5))
        ));
        assert_eq!(ctl.send_example_prompt(2).unwrap(), TOOL_PROBE_PROMPTS[1]);
        assert_eq!(
            ctl.transcript(),
            &[TranscriptEntry::User(TOOL_PROBE_PROMPTS[1].into())]
        );
    }

    #[test]
    fn test_controls_per_state() {
        let idle = Controls::for_state(ConnectionState::Idle);
        assert!(idle.connect && !idle.disconnect && !idle.send && idle.new_session);

        let connecting = Controls::for_state(ConnectionState::Connecting);
        assert!(!connecting.connect && connecting.disconnect && !connecting.send);

        let open = Controls::for_state(ConnectionState::Open);
        assert!(open.send && open.end_session && open.tool_probe && !open.connect);

        assert_eq!(Controls::for_state(ConnectionState::Closed), idle);
    }
}
