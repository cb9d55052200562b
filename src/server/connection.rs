//! Connection handlers
//!
//! One handler per accepted socket. The event source handler feeds complete
//! lines into the resequencer; the subscriber handler reads the identity
//! line, hands the write half to the registry, then waits for the peer to
//! go away so the registry entry can be removed.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::sync::oneshot;

use crate::error::{FrameError, Result};
use crate::protocol::event::trim_terminator;
use crate::protocol::{LineReader, SubscriberId};
use crate::registry::{Fanout, Subscriber, SubscriberRegistry, SubscriberWriter};
use crate::sequencer::Resequencer;
use crate::server::config::ServerConfig;
use crate::session::SessionContext;

/// Handler for the upstream event source
pub struct EventSourceConnection<R, F> {
    ctx: SessionContext,
    reader: LineReader<R>,
    resequencer: Arc<Resequencer<F>>,
}

impl<R, F> EventSourceConnection<R, F>
where
    R: AsyncRead + Unpin,
    F: Fanout,
{
    /// Create a handler reading events from `reader`
    pub fn new(
        ctx: SessionContext,
        reader: R,
        config: &ServerConfig,
        resequencer: Arc<Resequencer<F>>,
    ) -> Self {
        Self {
            ctx,
            reader: LineReader::new(reader, config.read_buffer_size, config.max_line_length),
            resequencer,
        }
    }

    /// Submit every line until the source disconnects
    pub async fn run(mut self) -> Result<SessionContext> {
        tracing::info!(
            connection_id = self.ctx.connection_id,
            peer = %self.ctx.peer_addr,
            "Event source connected"
        );

        while let Some(line) = self.reader.next_line().await? {
            self.ctx.record_line(line.len());
            let dispatched = self.resequencer.submit(line).await;

            tracing::trace!(
                connection_id = self.ctx.connection_id,
                dispatched = dispatched,
                "Event submitted"
            );
        }

        tracing::info!(
            connection_id = self.ctx.connection_id,
            lines = self.ctx.stats.lines_received,
            bytes = self.reader.bytes_read(),
            duration_ms = self.ctx.stats.duration().as_millis() as u64,
            "Event source disconnected"
        );

        Ok(self.ctx)
    }
}

/// Handler for one downstream subscriber
pub struct SubscriberConnection<R> {
    ctx: SessionContext,
    reader: LineReader<R>,
    writer: SubscriberWriter,
    registry: Arc<SubscriberRegistry>,
}

impl<R: AsyncRead + Unpin> SubscriberConnection<R> {
    /// Create a handler for a subscriber split into read and write halves
    pub fn new(
        ctx: SessionContext,
        reader: R,
        writer: SubscriberWriter,
        config: &ServerConfig,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            ctx,
            reader: LineReader::new(reader, config.read_buffer_size, config.max_line_length),
            writer,
            registry,
        }
    }

    /// Identify the subscriber and keep it registered until it disconnects
    pub async fn run(mut self) -> Result<SessionContext> {
        let Some(line) = self.reader.next_line().await? else {
            tracing::debug!(
                connection_id = self.ctx.connection_id,
                "Subscriber closed before identifying"
            );
            return Ok(self.ctx);
        };
        self.ctx.record_line(line.len());

        // IDs are matched byte for byte against event fields
        let id = SubscriberId::new(line.slice_ref(trim_terminator(&line)));
        if id.is_empty() {
            return Err(FrameError::EmptyIdentity.into());
        }
        self.ctx.identify(id.clone());

        let connection_id = self.ctx.connection_id;
        let (owner, mut released) = oneshot::channel();
        let subscriber = Subscriber::new(connection_id, self.writer)
            .with_peer_addr(self.ctx.peer_addr)
            .with_owner(owner);
        self.registry.identify(id.clone(), subscriber).await;

        // Subscribers never send anything after their ID; keep reading only
        // to notice the disconnect.
        let result = loop {
            match self.reader.next_line().await {
                Ok(Some(line)) => self.ctx.record_line(line.len()),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.registry.remove(&id, connection_id).await;

        // Replaced by a newer connection under the same ID; close our own
        // socket now that our peer is gone.
        if let Ok(mut writer) = released.try_recv() {
            tracing::debug!(
                connection_id,
                subscriber = %id,
                "Closing connection replaced by a newer one"
            );
            let _ = writer.shutdown().await;
        }

        result.map(|()| self.ctx)
    }
}
