//! Command-dispatch TCP server.
//!
//! This module provides:
//! - The accept loop with a hard cap on concurrent workers
//! - One worker task per admitted connection
//! - The request codec and command dispatcher
//! - Signal-driven graceful shutdown

pub mod acceptor;
pub mod codec;
pub mod registry;
pub mod shutdown;
pub mod worker;

pub use acceptor::{Server, StopReason};
pub use codec::Dispatcher;
pub use registry::{WorkerGuard, WorkerRegistry};
pub use shutdown::ShutdownCoordinator;
pub use worker::ConnectionWorker;
