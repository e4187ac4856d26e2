//! Registry of active connection workers.
//!
//! Admission and registration happen under one lock, so the number of live
//! workers can never exceed the configured maximum. Each admitted worker holds
//! a [`WorkerGuard`]; dropping the guard is the only way an entry leaves the
//! registry.

use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Notify;

/// Identifier assigned to each admitted connection.
pub type ConnectionId = u64;

/// Bookkeeping for one live worker.
#[derive(Debug)]
struct WorkerEntry {
    peer: SocketAddr,
    admitted_at: Instant,
    close: Arc<Notify>,
}

/// Snapshot of a registered worker.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// Connection identifier
    pub id: ConnectionId,
    /// Remote address
    pub peer: SocketAddr,
    /// Seconds since admission
    pub age_secs: u64,
}

/// Thread-safe set of active workers with a hard size cap.
#[derive(Debug)]
pub struct WorkerRegistry {
    max_workers: usize,
    next_id: AtomicU64,
    workers: Mutex<HashMap<ConnectionId, WorkerEntry>>,
}

impl WorkerRegistry {
    /// Create a registry admitting at most `max_workers` concurrent workers.
    pub fn new(max_workers: usize) -> Arc<Self> {
        Arc::new(Self {
            max_workers,
            next_id: AtomicU64::new(1),
            workers: Mutex::new(HashMap::new()),
        })
    }

    /// Configured capacity.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Try to admit a new connection.
    ///
    /// Returns `Ok(None)` when the registry is full.
    pub fn try_register(self: &Arc<Self>, peer: SocketAddr) -> Result<Option<WorkerGuard>> {
        let mut workers = self
            .workers
            .lock()
            .map_err(|_| Error::lock_poisoned("worker registry (register)"))?;

        if workers.len() >= self.max_workers {
            return Ok(None);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let close = Arc::new(Notify::new());
        workers.insert(
            id,
            WorkerEntry {
                peer,
                admitted_at: Instant::now(),
                close: Arc::clone(&close),
            },
        );

        Ok(Some(WorkerGuard {
            id,
            peer,
            close,
            registry: Arc::clone(self),
        }))
    }

    /// Number of live workers.
    pub fn active(&self) -> usize {
        match self.workers.lock() {
            Ok(workers) => workers.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Snapshot of live workers, ordered by id.
    pub fn snapshot(&self) -> Result<Vec<WorkerInfo>> {
        let workers = self
            .workers
            .lock()
            .map_err(|_| Error::lock_poisoned("worker registry (snapshot)"))?;

        let mut infos: Vec<WorkerInfo> = workers
            .iter()
            .map(|(id, entry)| WorkerInfo {
                id: *id,
                peer: entry.peer,
                age_secs: entry.admitted_at.elapsed().as_secs(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        Ok(infos)
    }

    /// Ask every registered worker to close its connection.
    ///
    /// Returns the number of workers signalled.
    pub fn close_all(&self) -> usize {
        let workers = match self.workers.lock() {
            Ok(workers) => workers,
            Err(poisoned) => {
                log::warn!("Worker registry lock poisoned, closing connections anyway");
                poisoned.into_inner()
            }
        };

        for entry in workers.values() {
            entry.close.notify_one();
        }
        workers.len()
    }

    fn deregister(&self, id: ConnectionId) {
        let mut workers = match self.workers.lock() {
            Ok(workers) => workers,
            Err(poisoned) => poisoned.into_inner(),
        };

        if workers.remove(&id).is_none() {
            log::error!("Worker {} was not registered", id);
        }
    }
}

/// Proof of admission held by a running worker.
#[derive(Debug)]
pub struct WorkerGuard {
    id: ConnectionId,
    peer: SocketAddr,
    close: Arc<Notify>,
    registry: Arc<WorkerRegistry>,
}

impl WorkerGuard {
    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Resolves once the registry asks this worker to close.
    pub async fn closed(&self) {
        self.close.notified().await
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
        log::debug!(
            "Worker {} for {} deregistered (active_workers={})",
            self.id,
            self.peer,
            self.registry.active()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_capacity_is_enforced() {
        let registry = WorkerRegistry::new(2);

        let first = registry.try_register(peer(1)).unwrap().unwrap();
        let second = registry.try_register(peer(2)).unwrap().unwrap();
        assert!(registry.try_register(peer(3)).unwrap().is_none());
        assert_eq!(registry.active(), 2);
        assert_ne!(first.id(), second.id());

        drop(first);
        assert_eq!(registry.active(), 1);
        assert!(registry.try_register(peer(4)).unwrap().is_some());
    }

    #[test]
    fn test_guard_drop_deregisters_once() {
        let registry = WorkerRegistry::new(1);
        let guard = registry.try_register(peer(1)).unwrap().unwrap();
        assert_eq!(registry.snapshot().unwrap().len(), 1);

        drop(guard);
        assert_eq!(registry.active(), 0);
        assert!(registry.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_registration_never_overshoots() {
        let registry = WorkerRegistry::new(4);
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.try_register(peer(i)).unwrap())
            })
            .collect();

        let guards: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(guards.len(), 4);
        assert_eq!(registry.active(), 4);
    }

    #[tokio::test]
    async fn test_close_all_wakes_workers() {
        let registry = WorkerRegistry::new(2);
        let guard = registry.try_register(peer(1)).unwrap().unwrap();

        assert_eq!(registry.close_all(), 1);
        tokio::time::timeout(Duration::from_secs(1), guard.closed())
            .await
            .expect("close signal should be delivered");
    }
}
