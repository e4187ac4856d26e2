//! TCP accept loop with admission control.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::server::codec::Dispatcher;
use crate::server::registry::WorkerRegistry;
use crate::server::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::server::worker::{ConnectionWorker, WorkerSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

/// Why the accept loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested by the given signal number
    Signal(i32),
    /// `accept` failed outside of shutdown
    AcceptFailed,
}

impl StopReason {
    /// Process exit status for this stop reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Signal(signum) => *signum,
            StopReason::AcceptFailed => 1,
        }
    }
}

/// Command-dispatch server.
pub struct Server {
    config: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<WorkerRegistry>,
    settings: WorkerSettings,
    shutdown: ShutdownCoordinator,
}

impl Server {
    /// Create a server from configuration.
    pub fn new(config: Arc<Config>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(&config));
        let registry = WorkerRegistry::new(config.server.max_workers);
        let settings = WorkerSettings::from_config(&config.server);

        Self {
            config,
            dispatcher,
            registry,
            settings,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// The shutdown coordinator driving this server.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// The live worker registry.
    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Bind the configured IPv4 address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.server.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        log::info!("Listening address {}", self.config.server.address);
        log::info!("Listening port {}", self.config.server.port);
        Ok(listener)
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<StopReason> {
        let listener = self.bind().await?;
        Ok(self.serve(listener).await)
    }

    /// Serve connections on an already-bound listener until shutdown is
    /// requested or `accept` fails, then drain all workers.
    pub async fn serve(&self, listener: TcpListener) -> StopReason {
        let mut shutdown = self.shutdown.subscribe();
        let mut workers = JoinSet::new();

        log::info!(
            "Accepting connections (max_workers={}, buffer_len={})",
            self.registry.max_workers(),
            self.settings.buffer_len
        );

        let reason = self.accept_loop(&listener, &mut shutdown, &mut workers).await;

        drop(listener);
        self.shutdown.drain(&self.registry, &mut workers).await;
        reason
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        shutdown: &mut ShutdownSignal,
        workers: &mut JoinSet<()>,
    ) -> StopReason {
        loop {
            // Reap finished workers so the set does not grow unbounded.
            while let Some(result) = workers.try_join_next() {
                if let Err(e) = result {
                    log::error!("Worker task failed: {}", e);
                }
            }

            tokio::select! {
                biased;

                signum = shutdown.recv() => return StopReason::Signal(signum),

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.admit(stream, peer, workers),
                    Err(e) => {
                        if let Some(signum) = self.shutdown.signal_number() {
                            return StopReason::Signal(signum);
                        }
                        log::error!("{}; stopping accept loop", Error::Accept(e));
                        return StopReason::AcceptFailed;
                    }
                },
            }
        }
    }

    /// Start a worker for `stream`, or close it at once when at capacity.
    fn admit(&self, stream: TcpStream, peer: SocketAddr, workers: &mut JoinSet<()>) {
        let guard = match self.registry.try_register(peer) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                log::warn!(
                    "Rejecting {}: {} worker(s) already active",
                    peer,
                    self.registry.max_workers()
                );
                drop(stream);
                return;
            }
            Err(e) => {
                log::error!("Rejecting {}: {}", peer, e);
                drop(stream);
                return;
            }
        };

        log::info!(
            "Accepted {} as worker {} (active_workers={})",
            peer,
            guard.id(),
            self.registry.active()
        );

        let worker = ConnectionWorker::new(
            stream,
            guard,
            Arc::clone(&self.dispatcher),
            self.settings.clone(),
        );
        workers.spawn(worker.run());
    }
}
