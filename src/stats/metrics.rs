//! Statistics snapshots for the relay

use std::time::{Duration, Instant};

/// Per-connection statistics, logged when a session ends
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// When the connection was accepted
    pub started_at: Instant,
    /// Total bytes read from the peer
    pub bytes_received: u64,
    /// Complete lines read from the peer
    pub lines_received: u64,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            bytes_received: 0,
            lines_received: 0,
        }
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Resequencer counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencerStats {
    /// Sequence number that will be delivered next
    pub next_sequence: u64,
    /// Records waiting for a missing predecessor
    pub pending: usize,
    /// Records dispatched to the registry
    pub delivered: u64,
    /// Records dropped because the sequence field did not parse
    pub malformed: u64,
    /// Records ignored because their sequence was already delivered
    pub duplicates: u64,
}

impl SequencerStats {
    /// Whether delivery is blocked on a missing sequence number
    pub fn is_stalled(&self) -> bool {
        self.pending > 0
    }
}

/// Registry counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Connected subscribers
    pub subscriber_count: usize,
    /// Subscribers with at least one follower
    pub followee_count: usize,
    /// Total follow edges
    pub follow_edges: usize,
    /// Successful writes to subscribers
    pub deliveries: u64,
    /// Failed writes to subscribers
    pub failed_deliveries: u64,
}

/// Server-wide statistics
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Event source connections accepted
    pub event_source_connections: u64,
    /// Subscriber connections accepted
    pub subscriber_connections: u64,
    /// Subscriber connections refused by the connection limit
    pub rejected_connections: u64,
    /// Uptime
    pub uptime: Duration,
    /// Resequencer snapshot
    pub sequencer: SequencerStats,
    /// Registry snapshot
    pub registry: RegistryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.bytes_received, 0);
        assert_eq!(stats.lines_received, 0);
        assert!(stats.duration() < Duration::from_secs(60));
    }

    #[test]
    fn test_sequencer_stalled() {
        let mut stats = SequencerStats {
            next_sequence: 3,
            ..Default::default()
        };
        assert!(!stats.is_stalled());

        stats.pending = 2;
        assert!(stats.is_stalled());
    }

    #[test]
    fn test_server_stats_default() {
        let stats = ServerStats::default();
        assert_eq!(stats.event_source_connections, 0);
        assert_eq!(stats.subscriber_connections, 0);
        assert_eq!(stats.rejected_connections, 0);
        assert_eq!(stats.registry, RegistryStats::default());
    }
}
