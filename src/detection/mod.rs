//! Signature detection.
//!
//! This module provides:
//! - Hex signature decoding
//! - Overlapping byte pattern search

pub mod matcher;
pub mod signature;

pub use matcher::{find_all_offsets, PatternMatcher};
pub use signature::ByteSignature;
