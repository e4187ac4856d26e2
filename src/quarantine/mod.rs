//! Quarantine management.
//!
//! Moves flagged files into the configured quarantine directory.

pub mod operations;

pub use operations::{QuarantineOperations, MSG_QUARANTINED};
