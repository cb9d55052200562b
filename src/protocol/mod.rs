//! Line-oriented wire protocol
//!
//! Both listeners speak newline-terminated text. The event source sends
//! pipe-delimited event records; subscribers send a single identity line.
//!
//! ```text
//! event source ──► LineReader ──► EventRecord::parse ──► Resequencer
//! subscriber   ──► LineReader ──► identity ──► SubscriberRegistry::identify
//! ```

pub mod constants;
pub mod event;
pub mod framing;
pub mod id;

pub use event::{EventKind, EventRecord};
pub use framing::LineReader;
pub use id::SubscriberId;
