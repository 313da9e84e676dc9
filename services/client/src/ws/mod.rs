//! The websocket host: a tokio-tungstenite transport and the event loop that
//! feeds it into the core controller.

pub mod session;
pub mod transport;

pub use session::run_client;
pub use transport::WsTransport;
