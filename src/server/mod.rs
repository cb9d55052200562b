//! Relay server
//!
//! TCP accept loops for the event source and subscriber listeners, plus the
//! per-connection handlers they spawn.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{EventSourceConnection, SubscriberConnection};
pub use listener::{RelayListeners, RelayServer};
