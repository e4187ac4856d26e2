//! Local file inspection.
//!
//! This module provides:
//! - Target path validation shared by every file action
//! - Signature search over a single file

pub mod file;
pub mod target;

pub use file::FileInspector;
pub use target::{validate_target, TargetError};
