//! Client-side session driver for a realtime, streaming chat service.
//!
//! The crate is transport-agnostic and synchronous: a host feeds transport
//! callbacks and user commands into [`controller::ConnectionController`] one
//! at a time, and paints the [`view::ViewEvent`]s it emits.

pub mod controller;
pub mod dispatch;
pub mod endpoint;
pub mod locator;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod transport;
pub mod view;

pub use controller::{ConnectionController, ConnectionState, Controls, SendError};
pub use transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind};
pub use view::{Counters, TranscriptEntry, ViewEvent, ViewPort};
