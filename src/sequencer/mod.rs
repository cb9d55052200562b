//! Event resequencing
//!
//! Restores sequence order on the event stream and hands each event to the
//! registry exactly once.
//!
//! ```text
//!   submit(7) ──► pending {7}
//!   submit(5) ──► dispatch(5)
//!   submit(6) ──► dispatch(6) ──► dispatch(7)   (drained from pending)
//! ```

pub mod dispatch;
pub mod resequencer;

pub use dispatch::dispatch;
pub use resequencer::Resequencer;
