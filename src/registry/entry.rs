//! Subscriber entry
//!
//! The per-connection state held by the registry for one identified
//! subscriber.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;

/// Write half of a subscriber's transport
///
/// Boxed so the registry can hold TCP write halves in production and
/// in-memory pipes in tests.
pub type SubscriberWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A live subscriber connection
pub struct Subscriber {
    /// Server-assigned connection ID (unique per accepted socket)
    pub connection_id: u64,

    /// Remote peer address, if known
    pub peer_addr: Option<SocketAddr>,

    /// When the subscriber identified itself
    pub connected_at: Instant,

    /// Bytes successfully written to this subscriber
    pub bytes_sent: u64,

    writer: SubscriberWriter,

    /// Where the writer goes if this entry is replaced
    owner: Option<oneshot::Sender<SubscriberWriter>>,
}

impl Subscriber {
    /// Create a subscriber entry owning the given writer
    pub fn new(connection_id: u64, writer: SubscriberWriter) -> Self {
        Self {
            connection_id,
            peer_addr: None,
            connected_at: Instant::now(),
            bytes_sent: 0,
            writer,
            owner: None,
        }
    }

    /// Attach the remote peer address
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Return the writer through `owner` when the entry is replaced
    ///
    /// The connection task keeps the receiving end, so a replaced socket
    /// stays open until its own peer disconnects. Without an owner the
    /// writer is dropped on replacement.
    pub fn with_owner(mut self, owner: oneshot::Sender<SubscriberWriter>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Hand the writer back to the owning connection task
    pub(super) fn release(self) {
        let Subscriber { writer, owner, .. } = self;
        if let Some(owner) = owner {
            // Receiver gone means the connection task already finished
            let _ = owner.send(writer);
        }
    }

    /// Write a record to this subscriber
    pub(super) async fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.bytes_sent += data.len() as u64;
        Ok(())
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("connection_id", &self.connection_id)
            .field("peer_addr", &self.peer_addr)
            .field("bytes_sent", &self.bytes_sent)
            .finish_non_exhaustive()
    }
}
