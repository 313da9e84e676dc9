use crate::{controller::ConnectionState, protocol::SessionSnapshot};
use chrono::{DateTime, Utc};
use url::Url;

/// Committed, non-transient counts shown alongside the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub messages: u64,
    pub tool_calls: u64,
}

/// One committed entry of the current session's conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    User(String),
    Assistant(String),
    Tool {
        tool_name: String,
        result: serde_json::Value,
    },
}

/// Abstract render events the core emits towards whatever paints the conversation.
///
/// The core never renders anything itself; a `ViewPort` decides how each of
/// these looks (terminal lines, DOM nodes, nothing at all in tests).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The connection lifecycle moved to a new state.
    StatusChanged(ConnectionState),
    /// A system line in the conversation (connection notices, server notices, errors).
    Notice(String),
    /// A user message was committed locally.
    UserMessage(String),
    /// The first token of a streamed response arrived.
    TypingStarted(String),
    /// The in-progress response grew. Carries the whole buffer, not the delta.
    TypingUpdated(String),
    /// The in-progress indicator should disappear.
    TypingStopped,
    /// A streamed response was committed as a complete assistant message.
    AssistantMessage(String),
    /// A tool ran on the server side.
    ToolResult {
        tool_name: String,
        result: serde_json::Value,
    },
    CountersChanged(Counters),
    /// The session identity changed (new id, or a user id was assigned).
    SessionChanged {
        session_id: String,
        user_id: Option<String>,
    },
    /// The canonical locator now points at this address.
    LocatorChanged(Url),
    ConnectedAt(DateTime<Utc>),
    /// All rendered conversation content should be dropped.
    ChatCleared,
    Snapshot(SessionSnapshot),
    /// A blocking, user-facing error.
    Alert(String),
}

/// The external collaborator that receives render events.
pub trait ViewPort {
    fn notify(&mut self, event: ViewEvent);
}

/// Collects events in order. Handy for headless runs and tests.
impl ViewPort for Vec<ViewEvent> {
    fn notify(&mut self, event: ViewEvent) {
        self.push(event);
    }
}

impl<V: ViewPort + ?Sized> ViewPort for &mut V {
    fn notify(&mut self, event: ViewEvent) {
        (**self).notify(event);
    }
}
