//! Validation shared by every file action.

use std::path::{Path, PathBuf};

pub const MSG_EMPTY_PATH: &str = "file path is empty";
pub const MSG_IS_DIRECTORY: &str = "file is a directory";
pub const MSG_NOT_FOUND: &str = "file not found";

/// Why a target path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    /// No path was supplied
    EmptyPath,
    /// The path names a directory
    IsDirectory,
    /// Nothing exists at the path
    NotFound,
}

impl TargetError {
    /// The message sent back to the client.
    pub fn message(&self) -> &'static str {
        match self {
            TargetError::EmptyPath => MSG_EMPTY_PATH,
            TargetError::IsDirectory => MSG_IS_DIRECTORY,
            TargetError::NotFound => MSG_NOT_FOUND,
        }
    }
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Check a client-supplied path, in order: non-empty, not a directory, exists.
pub fn validate_target(file_path: &str) -> Result<PathBuf, TargetError> {
    if file_path.is_empty() {
        return Err(TargetError::EmptyPath);
    }

    let path = Path::new(file_path);
    if path.is_dir() {
        return Err(TargetError::IsDirectory);
    }
    if !path.exists() {
        return Err(TargetError::NotFound);
    }

    Ok(path.to_path_buf())
}
