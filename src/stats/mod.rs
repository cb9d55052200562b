//! Statistics for the relay

pub mod metrics;

pub use metrics::{RegistryStats, SequencerStats, ServerStats, SessionStats};
