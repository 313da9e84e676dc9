//! Defines the websocket message protocol between this client and the chat server.

use serde::{Deserialize, Serialize};

/// A frame that could not be turned into a [`ServerFrame`].
#[derive(Debug, thiserror::Error)]
#[error("Malformed frame: {0}")]
pub struct ProtocolError(#[from] serde_json::Error);

/// Messages sent from the server to the client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A system notice to show in the conversation.
    System { message: String },
    /// The server's authoritative view of the session, including the assigned user id.
    SessionInfo { session_id: String, user_id: String },
    /// One incremental token of the assistant's response.
    #[serde(rename = "ai_stream")]
    StreamToken { token: String },
    /// Terminates the current streamed response.
    #[serde(rename = "ai_stream_end")]
    StreamEnd,
    /// The outcome of a server-side tool invocation.
    ToolResult {
        tool_name: String,
        result: serde_json::Value,
    },
    /// An application-level error. The connection stays open.
    Error { message: String },
    /// Any tag this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Parses one raw text frame.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Messages sent from the client to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// A text message from the user.
    UserMessage { message: String },
    /// Asks the server to wrap up the session.
    EndSession,
}

impl ClientCommand {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Read-only view of a stored session, as served by `/api/session/{id}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session: serde_json::Value,
    pub events: Vec<serde_json::Value>,
}
