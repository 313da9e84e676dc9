//! The seam between the controller and whatever carries frames.

use std::fmt;

/// Identifies one connection attempt. Every `connect()` allocates a new one,
/// so callbacks from a released transport can be told apart from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("A transport is already open")]
    AlreadyOpen,
    #[error("Transport is not open")]
    NotOpen,
    #[error("Failed to open transport: {0}")]
    Open(String),
}

/// A persistent bidirectional frame carrier.
///
/// `open` only starts the attempt; its outcome and everything after it arrives
/// later as [`TransportEvent`]s tagged with the same [`ConnectionId`].
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn open(&mut self, connection: ConnectionId, url: &str) -> Result<(), TransportError>;
    fn send(&mut self, frame: String) -> Result<(), TransportError>;
    /// Requests closure and releases the transport. Calling it again is harmless.
    fn close(&mut self);
}

/// A callback from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    /// A transport-level failure. A `Closed` always follows.
    Error(String),
    /// The connection is gone, whether we or the peer closed it.
    Closed,
}

impl TransportEvent {
    pub fn new(connection: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection, kind }
    }
}
