//! Core type definitions used throughout localguard.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter key naming the target file.
pub const PARAM_FILE_PATH: &str = "file_path";

/// Parameter key carrying the hex signature.
pub const PARAM_SIGNATURE: &str = "signature";

/// Wire name of the inspect command.
pub const CMD_CHECK_LOCAL_FILE: &str = "CheckLocalFile";

/// Wire name of the quarantine command.
pub const CMD_QUARANTINE_LOCAL_FILE: &str = "QuarantineLocalFile";

/// A command envelope as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Selects the action to run
    pub command: String,
    /// Action-specific string parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl CommandRequest {
    /// Create a request with no parameters.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter, replacing any previous value for the key.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a parameter; a missing key reads as the empty string.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    /// Resolve the command name into a typed command.
    pub fn to_command(&self) -> Command {
        match self.command.as_str() {
            CMD_CHECK_LOCAL_FILE => Command::CheckLocalFile {
                file_path: self.param(PARAM_FILE_PATH).to_string(),
                signature: self.param(PARAM_SIGNATURE).to_string(),
            },
            CMD_QUARANTINE_LOCAL_FILE => Command::QuarantineLocalFile {
                file_path: self.param(PARAM_FILE_PATH).to_string(),
            },
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// A decoded command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search a file for a hex signature
    CheckLocalFile { file_path: String, signature: String },
    /// Move a file into the quarantine directory
    QuarantineLocalFile { file_path: String },
    /// Any command name the server does not recognise
    Unknown(String),
}

impl Command {
    /// Get the wire name of the command.
    pub fn name(&self) -> &str {
        match self {
            Command::CheckLocalFile { .. } => CMD_CHECK_LOCAL_FILE,
            Command::QuarantineLocalFile { .. } => CMD_QUARANTINE_LOCAL_FILE,
            Command::Unknown(name) => name,
        }
    }
}

/// Result of a command, serialized as exactly one of
/// `{"offsets": [...]}`, `{"success": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandResponse {
    /// Signature search result, ascending zero-based offsets
    Offsets(Vec<u64>),
    /// Action completed
    Success(String),
    /// Validation, action or protocol failure
    Error(String),
}

impl CommandResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Create a success response.
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success(message.into())
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, CommandResponse::Error(_))
    }
}

impl std::fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandResponse::Offsets(offsets) => write!(f, "{} offset(s)", offsets.len()),
            CommandResponse::Success(msg) => write!(f, "success: {}", msg),
            CommandResponse::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}
