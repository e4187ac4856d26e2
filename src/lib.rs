//! localguard: a local command-dispatch service.
//!
//! A client sends one named command with string parameters over TCP; the
//! server runs a file inspection (hex signature search) or a file quarantine
//! and answers with a single JSON document before closing the connection.

pub mod client;
pub mod core;
pub mod detection;
pub mod quarantine;
pub mod scanner;
pub mod server;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
pub use crate::server::{Server, StopReason};
