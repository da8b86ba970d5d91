//! TCP server: bind, accept loop, and graceful shutdown.
//!
//! The listener owns the bound socket and is the only task that accepts.
//! Each accepted connection runs in its own task, tracked in a `JoinSet`
//! and capped by a semaphore. Shutdown stops the accept loop, closes the
//! listening socket, and waits a bounded grace period for in-flight
//! handlers before abandoning them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection;
use crate::message::{Transform, Uppercase};
use crate::shutdown::{Shutdown, ShutdownHandle};

/// Maximum number of concurrent connections
const MAX_CONNECTIONS: usize = 1024;

/// Listen backlog for the bound socket
const LISTEN_BACKLOG: i32 = 128;

/// Bounded wait for in-flight handlers during shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server instance
pub struct Server {
    config: ServerConfig,
    transform: Arc<dyn Transform>,
    listener: Option<TcpListener>,
    shutdown: Shutdown,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a server with the reference uppercase transform.
    ///
    /// No socket is opened until [`bind`](Self::bind) or
    /// [`run`](Self::run).
    pub fn new(config: ServerConfig) -> Self {
        Self::with_transform(config, Arc::new(Uppercase))
    }

    /// Create a server with a custom message transform.
    pub fn with_transform(config: ServerConfig, transform: Arc<dyn Transform>) -> Self {
        Server {
            config,
            transform,
            listener: None,
            shutdown: Shutdown::new(),
            connection_limit: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
        }
    }

    /// Handle for requesting shutdown; cloneable, idempotent.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.handle()
    }

    /// Open the listening socket.
    ///
    /// The socket is created with `SO_REUSEADDR` so a restarted server can
    /// re-bind the same address without a stale-address error. Resolution
    /// and bind failures are fatal and reported here, before any accept
    /// loop starts.
    pub async fn bind(&mut self) -> Result<SocketAddr, ServerError> {
        let addr_str = self.config.listen_addr();

        let addr = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| ServerError::Resolve {
                addr: addr_str.clone(),
                source: e,
            })?
            .next()
            .ok_or_else(|| ServerError::AddrNotFound(addr_str.clone()))?;

        let listener = Self::build_listener(addr).map_err(|e| ServerError::Bind {
            addr: addr_str,
            source: e,
        })?;

        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        info!(address = %local_addr, "Server listening");

        self.listener = Some(listener);
        Ok(local_addr)
    }

    fn build_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;
        socket.set_nonblocking(true)?;
        TcpListener::from_std(socket.into())
    }

    /// Accept connections until shutdown is requested, then drain.
    ///
    /// Binds first if [`bind`](Self::bind) was not called. Accept errors
    /// during normal operation are logged and the loop continues; once
    /// shutdown is requested the loop exits cleanly, the listening socket
    /// closes, and in-flight handlers get [`SHUTDOWN_GRACE`] to finish
    /// before being abandoned (detached, not aborted).
    pub async fn run(&mut self) -> Result<(), ServerError> {
        if self.listener.is_none() {
            self.bind().await?;
        }
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        let mut token = self.shutdown.token();
        let mut handlers: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = token.triggered() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }

                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        let permit = match Arc::clone(&self.connection_limit).try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => {
                                warn!(peer = %peer, "Connection limit reached, dropping connection");
                                continue;
                            }
                        };

                        debug!(peer = %peer, "New connection");
                        let transform = Arc::clone(&self.transform);

                        handlers.spawn(async move {
                            if let Err(e) = connection::handle_connection(stream, peer, transform).await {
                                debug!(peer = %peer, error = %e, "Connection error");
                            }
                            debug!(peer = %peer, "Connection closed");
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        if token.is_triggered() {
                            break;
                        }
                        error!(error = %e, "Failed to accept connection");
                    }
                },

                // Reap finished handlers so the set stays small.
                Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
            }
        }

        // Closes the listening socket; the address frees up for re-binding.
        drop(listener);

        let active = handlers.len();
        if active > 0 {
            info!(active, "Waiting for active connections to finish");
            let drain = async {
                while handlers.join_next().await.is_some() {}
            };
            if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
                warn!(
                    remaining = handlers.len(),
                    "Grace period elapsed, abandoning remaining connections"
                );
                handlers.detach_all();
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Server startup errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to resolve address '{addr}': {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable address for '{0}'")]
    AddrNotFound(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
