//! Relay server listener
//!
//! Runs the two accept loops (event source and subscribers) and spawns a
//! handler task per connection. Both loops share one registry and one
//! resequencer owned by the server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::sequencer::Resequencer;
use crate::server::config::ServerConfig;
use crate::server::connection::{EventSourceConnection, SubscriberConnection};
use crate::session::{SessionContext, SessionRole};
use crate::stats::ServerStats;

/// Bound listening sockets, ready to be served
pub struct RelayListeners {
    event_source: TcpListener,
    subscriber: TcpListener,
}

impl RelayListeners {
    /// Actual event source address (useful when binding port 0)
    pub fn event_source_addr(&self) -> Result<SocketAddr> {
        Ok(self.event_source.local_addr()?)
    }

    /// Actual subscriber address (useful when binding port 0)
    pub fn subscriber_addr(&self) -> Result<SocketAddr> {
        Ok(self.subscriber.local_addr()?)
    }
}

#[derive(Default)]
struct Counters {
    event_source_connections: AtomicU64,
    subscriber_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

/// Event relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    resequencer: Arc<Resequencer<SubscriberRegistry>>,
    next_connection_id: AtomicU64,
    /// Single permit: one event source at a time
    event_source_slot: Arc<Semaphore>,
    subscriber_semaphore: Option<Arc<Semaphore>>,
    counters: Counters,
    started_at: Instant,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let resequencer = Arc::new(Resequencer::new(Arc::clone(&registry)));

        let subscriber_semaphore = if config.max_subscribers > 0 {
            Some(Arc::new(Semaphore::new(config.max_subscribers)))
        } else {
            None
        };

        Self {
            config,
            registry,
            resequencer,
            next_connection_id: AtomicU64::new(1),
            event_source_slot: Arc::new(Semaphore::new(1)),
            subscriber_semaphore,
            counters: Counters::default(),
            started_at: Instant::now(),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get a reference to the resequencer
    pub fn resequencer(&self) -> &Arc<Resequencer<SubscriberRegistry>> {
        &self.resequencer
    }

    /// Bind both listeners without serving them yet
    pub async fn bind(&self) -> Result<RelayListeners> {
        let event_source = TcpListener::bind(self.config.event_source_addr).await?;
        let subscriber = TcpListener::bind(self.config.subscriber_addr).await?;

        tracing::info!(
            event_source = %event_source.local_addr()?,
            subscribers = %subscriber.local_addr()?,
            "Relay server listening"
        );

        Ok(RelayListeners {
            event_source,
            subscriber,
        })
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listeners = self.bind().await?;
        self.serve(listeners).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listeners = self.bind().await?;
        self.serve_until(listeners, shutdown).await
    }

    /// Serve already-bound listeners
    pub async fn serve(&self, listeners: RelayListeners) -> Result<()> {
        tokio::select! {
            result = self.event_source_loop(&listeners.event_source) => result,
            result = self.subscriber_loop(&listeners.subscriber) => result,
        }
    }

    /// Serve already-bound listeners until `shutdown` resolves
    ///
    /// Stops accepting new connections; tasks for connections already
    /// accepted keep running.
    pub async fn serve_until<F>(&self, listeners: RelayListeners, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listeners) => result,
        }
    }

    /// Current server statistics
    pub async fn stats(&self) -> ServerStats {
        let counters = &self.counters;
        ServerStats {
            event_source_connections: counters.event_source_connections.load(Ordering::Relaxed),
            subscriber_connections: counters.subscriber_connections.load(Ordering::Relaxed),
            rejected_connections: counters.rejected_connections.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            sequencer: self.resequencer.stats().await,
            registry: self.registry.stats().await,
        }
    }

    async fn event_source_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            // Later sources wait in the backlog until the current one leaves
            let permit = match Arc::clone(&self.event_source_slot).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let role = SessionRole::EventSource;
                    let Some(ctx) = self.prepare(&socket, peer_addr, role) else {
                        continue;
                    };
                    self.counters
                        .event_source_connections
                        .fetch_add(1, Ordering::Relaxed);

                    let config = self.config.clone();
                    let resequencer = Arc::clone(&self.resequencer);

                    tokio::spawn(async move {
                        let _permit = permit;
                        let connection_id = ctx.connection_id;
                        let connection =
                            EventSourceConnection::new(ctx, socket, &config, resequencer);

                        if let Err(e) = connection.run().await {
                            tracing::debug!(
                                connection_id = connection_id,
                                error = %e,
                                "Connection error"
                            );
                        }

                        tracing::debug!(connection_id = connection_id, "Connection closed");
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn subscriber_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => self.handle_subscriber(socket, peer_addr),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_subscriber(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.subscriber_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters
                        .rejected_connections
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let Some(ctx) = self.prepare(&socket, peer_addr, SessionRole::Subscriber) else {
            return;
        };
        self.counters
            .subscriber_connections
            .fetch_add(1, Ordering::Relaxed);

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let _permit = permit;
            let connection_id = ctx.connection_id;
            let (reader, writer) = socket.into_split();
            let connection =
                SubscriberConnection::new(ctx, reader, Box::new(writer), &config, registry);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    connection_id = connection_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(connection_id = connection_id, "Connection closed");
        });
    }

    /// Assign a connection ID and configure the socket
    fn prepare(
        &self,
        socket: &TcpStream,
        peer_addr: SocketAddr,
        role: SessionRole,
    ) -> Option<SessionContext> {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            connection_id = connection_id,
            peer = %peer_addr,
            role = %role,
            "New connection"
        );

        if let Err(e) = self.configure_socket(socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return None;
        }

        Some(SessionContext::new(connection_id, peer_addr, role))
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
