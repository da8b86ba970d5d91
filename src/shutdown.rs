//! Cooperative shutdown signaling.
//!
//! A watch channel carries a single false→true transition. The server owns
//! the [`Shutdown`] primitive; [`ShutdownHandle`]s trigger it (idempotent)
//! and [`ShutdownToken`]s await it. OS signal wiring lives in
//! [`spawn_signal_listener`] so the core stays free of any host-signal
//! mechanism.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

/// Owner side of the shutdown flag. Created once per server lifetime.
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Shutdown {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// A cloneable handle that can trigger shutdown.
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.tx),
        }
    }

    /// A token that can await or poll the flag.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.rx.clone(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Triggers shutdown. Cloneable so signal tasks and callers can share it.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Flip the flag. Returns true on the first call, false on repeats;
    /// the transition happens at most once per server lifetime.
    pub fn shutdown(&self) -> bool {
        self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }
}

/// Awaitable view of the shutdown flag.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Resolves once shutdown has been requested.
    pub async fn triggered(&mut self) {
        // A closed channel means the owner is gone; treat it as triggered.
        self.rx.wait_for(|requested| *requested).await.ok();
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Map termination signals (SIGINT, SIGTERM) to `handle.shutdown()`.
///
/// Runs as a background task; the first signal triggers shutdown and the
/// task exits.
pub fn spawn_signal_listener(handle: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_termination_signal().await;
        info!("termination signal received, shutting down");
        handle.shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            // Fall back to ctrl-c only.
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for ctrl-c");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for ctrl-c");
            }
            debug!("interrupt signal");
        }
        _ = terminate.recv() => {
            debug!("terminate signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        let handle = shutdown.handle();

        assert!(!shutdown.token().is_triggered());
        assert!(handle.shutdown());
        assert!(!handle.shutdown());
        assert!(shutdown.token().is_triggered());
    }

    #[tokio::test]
    async fn test_token_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let handle = shutdown.handle();
        let mut token = shutdown.token();

        let waiter = tokio::spawn(async move {
            token.triggered().await;
        });

        handle.shutdown();
        waiter.await.expect("waiter task panicked");
    }

    #[tokio::test]
    async fn test_clones_observe_same_flag() {
        let shutdown = Shutdown::new();
        let h1 = shutdown.handle();
        let h2 = shutdown.handle();

        assert!(h1.shutdown());
        // The second handle sees the transition already taken.
        assert!(!h2.shutdown());
        assert!(shutdown.token().is_triggered());
    }
}
