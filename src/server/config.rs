//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::protocol::constants::*;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the event source connects to
    pub event_source_addr: SocketAddr,

    /// Address subscribers connect to
    pub subscriber_addr: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Longest line accepted from either listener, terminator included
    pub max_line_length: usize,

    /// Application-level read buffer size
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self {
            event_source_addr: SocketAddr::new(any, DEFAULT_EVENT_SOURCE_PORT),
            subscriber_addr: SocketAddr::new(any, DEFAULT_SUBSCRIBER_PORT),
            max_subscribers: 0, // Unlimited
            tcp_nodelay: true,  // Records are small and latency-sensitive
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            read_buffer_size: 8 * 1024, // 8KB
        }
    }
}

impl ServerConfig {
    /// Create a config listening on the given host with the default ports
    pub fn with_host(host: IpAddr) -> Self {
        Self {
            event_source_addr: SocketAddr::new(host, DEFAULT_EVENT_SOURCE_PORT),
            subscriber_addr: SocketAddr::new(host, DEFAULT_SUBSCRIBER_PORT),
            ..Default::default()
        }
    }

    /// Set the event source address
    pub fn event_source_addr(mut self, addr: SocketAddr) -> Self {
        self.event_source_addr = addr;
        self
    }

    /// Set the subscriber address
    pub fn subscriber_addr(mut self, addr: SocketAddr) -> Self {
        self.subscriber_addr = addr;
        self
    }

    /// Set maximum concurrent subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the maximum line length (at least 1 byte)
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len.max(1);
        self
    }

    /// Set the read buffer size (at least 1 byte)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}
