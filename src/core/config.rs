//! Configuration management for localguard.
//!
//! The server reads a flat `KEY=VALUE` file (`server.cfg` by default) once at
//! startup into an immutable [`Config`] that is shared by reference.

use crate::core::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default configuration file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "server.cfg";

pub const KEY_ADDRESS: &str = "DEFAULT_ADDRESS";
pub const KEY_PORT: &str = "DEFAULT_PORT";
pub const KEY_BUFFLEN: &str = "DEFAULT_BUFFLEN";
pub const KEY_THREADS: &str = "DEFAULT_THREADS";
pub const KEY_QUARANTINE_DIR: &str = "DEFAULT_QUARANTINE_DIR";
pub const KEY_READ_TIMEOUT: &str = "READ_TIMEOUT_SECS";
pub const KEY_WRITE_TIMEOUT: &str = "WRITE_TIMEOUT_SECS";
pub const KEY_LOG_LEVEL: &str = "LOG_LEVEL";
pub const KEY_LOG_FILE: &str = "LOG_FILE";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Network settings
    pub server: ServerConfig,
    /// Quarantine settings
    pub quarantine: QuarantineConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Raw key/value pairs as read from the file
    #[serde(skip)]
    raw: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            quarantine: QuarantineConfig::default(),
            logging: LoggingConfig::default(),
            raw: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a `KEY=VALUE` file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigLoad(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration text.
    ///
    /// Lines without `=` and lines starting with `#` are ignored. The key is
    /// everything before the first `=`; a repeated key keeps its last value.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut raw = HashMap::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                raw.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Self::from_map(raw)
    }

    /// Build a typed configuration from raw key/value pairs.
    pub fn from_map(raw: HashMap<String, String>) -> Result<Self> {
        let defaults = Config::default();

        let server = ServerConfig {
            address: raw
                .get(KEY_ADDRESS)
                .cloned()
                .unwrap_or(defaults.server.address),
            port: typed(&raw, KEY_PORT, defaults.server.port)?,
            buffer_len: typed(&raw, KEY_BUFFLEN, defaults.server.buffer_len)?,
            max_workers: typed(&raw, KEY_THREADS, defaults.server.max_workers)?,
            read_timeout_secs: typed(&raw, KEY_READ_TIMEOUT, defaults.server.read_timeout_secs)?,
            write_timeout_secs: typed(
                &raw,
                KEY_WRITE_TIMEOUT,
                defaults.server.write_timeout_secs,
            )?,
        };

        let quarantine = QuarantineConfig {
            directory: raw
                .get(KEY_QUARANTINE_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.quarantine.directory),
        };

        let logging = LoggingConfig {
            log_level: raw
                .get(KEY_LOG_LEVEL)
                .cloned()
                .unwrap_or(defaults.logging.log_level),
            log_file: raw
                .get(KEY_LOG_FILE)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        let config = Self {
            server,
            quarantine,
            logging,
            raw,
        };
        config.validate()?;
        Ok(config)
    }

    /// Look up a raw configuration value, falling back to `default`.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.raw
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.server.buffer_len == 0 {
            return Err(Error::config_invalid(KEY_BUFFLEN, "Must be greater than 0"));
        }

        if self.server.max_workers == 0 {
            return Err(Error::config_invalid(KEY_THREADS, "Must be greater than 0"));
        }

        if self.quarantine.directory.as_os_str().is_empty() {
            return Err(Error::config_invalid(
                KEY_QUARANTINE_DIR,
                "Must not be empty",
            ));
        }

        self.server.socket_addr()?;
        Ok(())
    }
}

/// Parse an optional typed value, keeping the default when the key is absent.
fn typed<T>(raw: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.get(key) {
        Some(value) => value
            .parse()
            .map_err(|e| Error::config_invalid(key, format!("{:?}: {}", value, e))),
        None => Ok(default),
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// IPv4 address to listen on
    pub address: String,
    /// TCP port
    pub port: u16,
    /// Read chunk size in bytes
    pub buffer_len: usize,
    /// Maximum number of concurrent connection workers
    pub max_workers: usize,
    /// Per-connection read deadline (0 = none)
    pub read_timeout_secs: u64,
    /// Per-connection write deadline (0 = none)
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 56789,
            buffer_len: 2048,
            max_workers: 5,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Resolve the listening address. Only IPv4 is supported.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: Ipv4Addr = self
            .address
            .parse()
            .map_err(|e| Error::config_invalid(KEY_ADDRESS, format!("{:?}: {}", self.address, e)))?;
        Ok(SocketAddr::V4(SocketAddrV4::new(ip, self.port)))
    }

    /// Read deadline, if enabled.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    /// Write deadline, if enabled.
    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_secs > 0).then(|| Duration::from_secs(self.write_timeout_secs))
    }
}

/// Quarantine configuration.
#[derive(Debug, Clone, Serialize)]
pub struct QuarantineConfig {
    /// Directory quarantined files are moved into
    pub directory: PathBuf,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("quarantine"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Append log records to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:56789".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_parse_key_values() {
        let config = Config::parse(
            "# local overrides\n\
             DEFAULT_PORT=4000\n\
             DEFAULT_THREADS = 2\n\
             not a setting\n\
             DEFAULT_QUARANTINE_DIR=/var/q=1\n\
             DEFAULT_PORT=4001\n",
        )
        .unwrap();

        assert_eq!(config.server.port, 4001);
        assert_eq!(config.server.max_workers, 2);
        assert_eq!(config.server.buffer_len, 2048);
        assert_eq!(config.quarantine.directory, PathBuf::from("/var/q=1"));
        assert_eq!(config.get("DEFAULT_PORT", "0"), "4001");
        assert_eq!(config.get("MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.cfg");
        std::fs::write(&path, "DEFAULT_BUFFLEN=16\nLOG_LEVEL=debug\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.buffer_len, 16);
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.cfg")).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::parse("DEFAULT_PORT=http").unwrap_err(),
            Error::ConfigInvalid { .. }
        ));
        assert!(Config::parse("DEFAULT_THREADS=0").is_err());
        assert!(Config::parse("DEFAULT_BUFFLEN=0").is_err());
        assert!(Config::parse("DEFAULT_ADDRESS=::1").is_err());
    }

    #[test]
    fn test_timeouts() {
        let config = Config::parse("READ_TIMEOUT_SECS=0\nWRITE_TIMEOUT_SECS=7").unwrap();
        assert_eq!(config.server.read_timeout(), None);
        assert_eq!(config.server.write_timeout(), Some(Duration::from_secs(7)));
    }
}
