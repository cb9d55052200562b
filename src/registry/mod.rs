//! Subscriber registry and fan-out
//!
//! The registry owns every identified subscriber connection together with
//! the follow graph, and is the only component that writes to subscribers.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ Mutex<                       │
//!                  │   subscribers: id -> writer, │
//!                  │   graph: followee -> {ids},  │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │
//!        ┌────────────────────────┼────────────────────────┐
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//!  send_to_one()            send_to_all()         send_to_followers()
//!        │                        │                        │
//!        └───────────────► write_all() ──► TCP ◄───────────┘
//! ```
//!
//! Records are shared as `bytes::Bytes`, so a broadcast to many subscribers
//! writes the same allocation to each socket.

pub mod entry;
pub mod fanout;
pub mod graph;
pub mod store;

pub use entry::{Subscriber, SubscriberWriter};
pub use fanout::Fanout;
pub use graph::FollowGraph;
pub use store::SubscriberRegistry;
