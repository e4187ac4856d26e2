//! Error types and result handling for localguard.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for localguard operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ===== Transport Errors =====
    #[error("Failed to bind listener to {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Connection error with {peer}: {reason}")]
    Connection { peer: String, reason: String },

    #[error("Read from {peer} timed out after {timeout_secs}s")]
    ReadTimeout { peer: String, timeout_secs: u64 },

    #[error("Write to {peer} timed out after {timeout_secs}s")]
    WriteTimeout { peer: String, timeout_secs: u64 },

    // ===== Protocol Errors =====
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    // ===== Quarantine Errors =====
    #[error("Failed to quarantine file: {path}")]
    QuarantineFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Concurrency Errors =====
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a connection error.
    pub fn connection(peer: impl ToString, reason: impl Into<String>) -> Self {
        Self::Connection {
            peer: peer.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a lock poisoned error.
    pub fn lock_poisoned(context: impl Into<String>) -> Self {
        Self::LockPoisoned {
            context: context.into(),
        }
    }

    /// Check if this error should abort the process during startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Error::ConfigLoad(_)
                | Error::ConfigInvalid { .. }
                | Error::InvalidArgument(_)
                | Error::Bind { .. }
        )
    }

    /// Check if this error only affects a single connection.
    pub fn is_connection_scoped(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. }
                | Error::ReadTimeout { .. }
                | Error::WriteTimeout { .. }
                | Error::MalformedRequest(_)
        )
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check server.cfg for missing or malformed KEY=VALUE lines")
            }
            Error::Bind { .. } => {
                Some("The port may be in use; change DEFAULT_PORT or stop the other process")
            }
            Error::ReadTimeout { .. } => {
                Some("Clients must half-close their socket after sending the request")
            }
            Error::InvalidArgument(_) => Some("Parameters are given as key=value"),
            Error::LockPoisoned { .. } => Some("Internal error: restart the server"),
            _ => None,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. } | Error::DirectoryAccess { .. } => ErrorCategory::Io,

            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } | Error::InvalidArgument(_) => {
                ErrorCategory::Configuration
            }

            Error::Bind { .. }
            | Error::Accept(_)
            | Error::Connection { .. }
            | Error::ReadTimeout { .. }
            | Error::WriteTimeout { .. } => ErrorCategory::Transport,

            Error::MalformedRequest(_) | Error::InvalidSignature(_) => ErrorCategory::Protocol,

            Error::QuarantineFailed { .. } => ErrorCategory::Quarantine,

            Error::LockPoisoned { .. } => ErrorCategory::Concurrency,

            Error::JsonSerialize(_) => ErrorCategory::Serialization,

            Error::Internal(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Transport,
    Protocol,
    Quarantine,
    Concurrency,
    Serialization,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Transport => write!(f, "Transport"),
            Self::Protocol => write!(f, "Protocol"),
            Self::Quarantine => write!(f, "Quarantine"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Serialization => write!(f, "Serialization"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("expected key=value, got \"x\"".to_string());
        assert_eq!(err.to_string(), "Invalid argument: expected key=value, got \"x\"");
        assert!(err.is_fatal_at_startup());
    }

    #[test]
    fn test_startup_errors() {
        let err = Error::ConfigLoad("missing".to_string());
        assert!(err.is_fatal_at_startup());
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = Error::MalformedRequest("bad json".to_string());
        assert!(!err.is_fatal_at_startup());
        assert!(err.is_connection_scoped());
    }

    #[test]
    fn test_category_display() {
        let err = Error::ReadTimeout {
            peer: "127.0.0.1:4000".to_string(),
            timeout_secs: 5,
        };
        assert_eq!(err.category().to_string(), "Transport");
        assert!(err.suggestion().is_some());
    }
}
