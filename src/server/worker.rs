//! Per-connection worker.
//!
//! A worker owns one accepted connection end to end:
//! `Reading -> Dispatching -> Writing -> Closed`, with any failure going
//! straight to `Closed`. There is no framing; the request is everything the
//! peer sends before it half-closes.
//!
//! A close request from the registry only interrupts `Reading`. Once a
//! request has been dispatched, the file action and the reply run to
//! completion, bounded by the write deadline.

use crate::core::config::ServerConfig;
use crate::core::error::{Error, Result};
use crate::server::codec::Dispatcher;
use crate::server::registry::WorkerGuard;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Connection-level tunables taken from the server configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Read chunk size
    pub buffer_len: usize,
    /// Deadline for receiving the whole request
    pub read_timeout: Option<Duration>,
    /// Deadline for sending the whole response
    pub write_timeout: Option<Duration>,
}

impl WorkerSettings {
    /// Build settings from the server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            buffer_len: config.buffer_len,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Reading,
    Dispatching,
    Writing,
    Closed,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Reading => write!(f, "reading"),
            WorkerState::Dispatching => write!(f, "dispatching"),
            WorkerState::Writing => write!(f, "writing"),
            WorkerState::Closed => write!(f, "closed"),
        }
    }
}

/// Handles a single request on a single connection.
pub struct ConnectionWorker {
    stream: TcpStream,
    peer: SocketAddr,
    guard: WorkerGuard,
    dispatcher: Arc<Dispatcher>,
    settings: WorkerSettings,
}

impl ConnectionWorker {
    /// Create a worker for an admitted connection.
    pub fn new(
        stream: TcpStream,
        guard: WorkerGuard,
        dispatcher: Arc<Dispatcher>,
        settings: WorkerSettings,
    ) -> Self {
        let peer = guard.peer();
        Self {
            stream,
            peer,
            guard,
            dispatcher,
            settings,
        }
    }

    /// Run the exchange to completion, then close the connection and
    /// deregister. Never fails; problems are logged.
    pub async fn run(self) {
        let ConnectionWorker {
            mut stream,
            peer,
            guard,
            dispatcher,
            settings,
        } = self;

        let mut state = WorkerState::Reading;
        let outcome = match receive(&mut stream, peer, &guard, &settings).await {
            Ok(request) => {
                respond(&mut stream, peer, &dispatcher, &settings, request, &mut state).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(sent) => log::info!("Bytes sent to {}: {}", peer, sent),
            Err(e) if e.is_connection_scoped() => {
                log::warn!("Connection {} aborted while {}: {}", peer, state, e)
            }
            Err(e) => log::error!(
                "[{}] Connection {} failed while {}: {}",
                e.category(),
                peer,
                state,
                e
            ),
        }

        if let Err(e) = stream.shutdown().await {
            log::debug!("Shutdown of {} failed: {}", peer, e);
        }
        drop(stream);
        log::debug!("Connection {} {}", peer, WorkerState::Closed);
        drop(guard);
    }
}

/// Wait for the whole request, unless the registry asks this worker to close.
async fn receive(
    stream: &mut TcpStream,
    peer: SocketAddr,
    guard: &WorkerGuard,
    settings: &WorkerSettings,
) -> Result<Vec<u8>> {
    let read = with_deadline(
        settings.read_timeout,
        read_request(stream, peer, settings.buffer_len),
        |secs| Error::ReadTimeout {
            peer: peer.to_string(),
            timeout_secs: secs,
        },
    );

    let request = tokio::select! {
        request = read => request?,
        _ = guard.closed() => return Err(Error::connection(peer, "closed by server shutdown")),
    };
    log::debug!("Request from {} complete ({} bytes)", peer, request.len());
    Ok(request)
}

/// Dispatch and reply. Returns the number of response bytes written.
async fn respond(
    stream: &mut TcpStream,
    peer: SocketAddr,
    dispatcher: &Arc<Dispatcher>,
    settings: &WorkerSettings,
    request: Vec<u8>,
    state: &mut WorkerState,
) -> Result<usize> {
    *state = WorkerState::Dispatching;
    let dispatcher = Arc::clone(dispatcher);
    let response = tokio::task::spawn_blocking(move || dispatcher.handle(&request))
        .await
        .map_err(|e| Error::Internal(format!("dispatch task failed: {}", e)))??;

    *state = WorkerState::Writing;
    with_deadline(
        settings.write_timeout,
        write_response(stream, peer, &response),
        |secs| Error::WriteTimeout {
            peer: peer.to_string(),
            timeout_secs: secs,
        },
    )
    .await?;

    Ok(response.len())
}

/// Accumulate chunks until the peer half-closes.
async fn read_request(stream: &mut TcpStream, peer: SocketAddr, buffer_len: usize) -> Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = vec![0u8; buffer_len];

    loop {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::connection(peer, format!("recv failed: {}", e)))?;
        if read == 0 {
            return Ok(request);
        }
        log::debug!("Bytes received from {}: {}", peer, read);
        request.extend_from_slice(&chunk[..read]);
    }
}

async fn write_response(stream: &mut TcpStream, peer: SocketAddr, response: &[u8]) -> Result<()> {
    stream
        .write_all(response)
        .await
        .map_err(|e| Error::connection(peer, format!("send failed: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::connection(peer, format!("send failed: {}", e)))
}

/// Run `fut` under an optional deadline.
async fn with_deadline<T, F, E>(deadline: Option<Duration>, fut: F, on_elapsed: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce(u64) -> Error,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_elapsed(limit.as_secs())),
        },
        None => fut.await,
    }
}
