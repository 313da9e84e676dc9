//! Chatwire Client Library Crate
//!
//! Hosts the `chatwire-core` controller on tokio: a tokio-tungstenite socket,
//! a reqwest snapshot fetcher, terminal rendering and environment
//! configuration. The `chatwire` binary is a thin wrapper around this library.

pub mod config;
pub mod input;
pub mod snapshot;
pub mod terminal;
pub mod ws;
