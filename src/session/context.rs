//! Session context
//!
//! Identity and bookkeeping for one accepted connection, shared by the
//! event source and subscriber handlers.

use std::net::SocketAddr;

use crate::protocol::SubscriberId;
use crate::stats::SessionStats;

/// Which listener accepted the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Upstream producer of sequenced events
    EventSource,
    /// Downstream receiver of fanned-out events
    Subscriber,
}

impl std::fmt::Display for SessionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionRole::EventSource => write!(f, "event_source"),
            SessionRole::Subscriber => write!(f, "subscriber"),
        }
    }
}

/// Context carried by a connection handler
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique connection ID
    pub connection_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Listener the connection arrived on
    pub role: SessionRole,

    /// Subscriber ID, once identified
    pub subscriber_id: Option<SubscriberId>,

    /// Current session statistics
    pub stats: SessionStats,
}

impl SessionContext {
    /// Create a new context
    pub fn new(connection_id: u64, peer_addr: SocketAddr, role: SessionRole) -> Self {
        Self {
            connection_id,
            peer_addr,
            role,
            subscriber_id: None,
            stats: SessionStats::new(),
        }
    }

    /// Record the subscriber ID announced on connect
    pub fn identify(&mut self, id: impl Into<SubscriberId>) {
        self.subscriber_id = Some(id.into());
    }

    /// Record a line read from the peer
    pub fn record_line(&mut self, len: usize) {
        self.stats.lines_received += 1;
        self.stats.bytes_received += len as u64;
    }
}
