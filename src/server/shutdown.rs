//! Graceful shutdown coordination.
//!
//! Signal handlers only record the request; the accept loop notices it,
//! stops accepting, and drains the workers from its own task.

use crate::server::registry::WorkerRegistry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Signal number recorded for SIGINT.
pub const SIGINT: i32 = 2;

/// Signal number recorded for SIGTERM.
pub const SIGTERM: i32 = 15;

/// Owner of the shutdown request.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<Option<i32>>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    /// Create a coordinator with no shutdown requested.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown on behalf of `signum`. Only the first request counts.
    pub fn trigger(&self, signum: i32) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(signum);
                true
            } else {
                false
            }
        });
    }

    /// Signal number that requested shutdown, if any.
    pub fn signal_number(&self) -> Option<i32> {
        *self.tx.borrow()
    }

    /// Handle to await the request.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Spawn a task that triggers shutdown on Ctrl-C (and SIGTERM on unix).
    pub fn listen_for_signals(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let signum = wait_for_signal().await;
            log::info!("Interrupt signal ({}) received", signum);
            coordinator.trigger(signum);
        })
    }

    /// Close every registered connection and wait for all workers to finish.
    pub async fn drain(&self, registry: &WorkerRegistry, workers: &mut JoinSet<()>) {
        match registry.snapshot() {
            Ok(active) => {
                for info in active {
                    log::debug!(
                        "Closing worker {} for {} (open {}s)",
                        info.id,
                        info.peer,
                        info.age_secs
                    );
                }
            }
            Err(e) => log::warn!("{}", e),
        }

        let signalled = registry.close_all();
        log::info!(
            "Shutting down: closing {} connection(s), waiting for {} worker(s)",
            signalled,
            workers.len()
        );

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                log::error!("Worker task failed: {}", e);
            }
        }

        log::info!("Cleanup completed");
    }
}

/// Receiver side of a shutdown request.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<i32>>,
}

impl ShutdownSignal {
    /// Resolves once shutdown is requested, yielding the signal number.
    pub async fn recv(&mut self) -> i32 {
        // A dropped coordinator also reads as a request to stop.
        let signum = self.rx.wait_for(Option::is_some).await.map(|value| *value);
        signum.ok().flatten().unwrap_or(0)
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        signum = ctrl_c() => signum,
        _ = term.recv() => SIGTERM,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> i32 {
    ctrl_c().await
}

async fn ctrl_c() -> i32 {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    SIGINT
}
