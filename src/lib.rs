//! relay-rs: resequencing event relay with follower fan-out
//!
//! A single event source streams pipe-delimited, sequence-numbered events
//! over TCP, possibly out of order. Subscribers connect on a second port and
//! announce an ID. The relay restores sequence order and delivers each event,
//! byte for byte, to the subscribers its kind targets: everyone, one
//! recipient, or the followers of a subscriber.
//!
//! ```text
//! event source ─► LineReader ─► Resequencer ─► dispatch ─► SubscriberRegistry ─► subscribers
//!                               (pending map)              (follow graph)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use relay_rs::{RelayServer, ServerConfig};
//!
//! # async fn run() -> relay_rs::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod sequencer;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{EventKind, EventRecord, SubscriberId};
pub use registry::{Fanout, Subscriber, SubscriberRegistry};
pub use sequencer::Resequencer;
pub use server::{RelayServer, ServerConfig};
