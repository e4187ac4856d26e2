//! Logging infrastructure for localguard.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: LevelFilter,
    /// Append records to this file instead of stderr
    pub file_path: Option<PathBuf>,
    /// Show timestamps
    pub timestamps: bool,
    /// Show module path
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            timestamps: true,
            module_path: false,
        }
    }
}

impl LogConfig {
    /// Create a log config from application config.
    pub fn from_config(config: &Config) -> Self {
        let level = parse_level(&config.logging.log_level);

        Self {
            level,
            file_path: config.logging.log_file.clone(),
            timestamps: true,
            module_path: level == LevelFilter::Debug || level == LevelFilter::Trace,
        }
    }

    /// Create a verbose log config for CLI.
    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Debug,
            file_path: None,
            timestamps: true,
            module_path: true,
        }
    }

    /// Create a quiet log config (errors only).
    pub fn quiet() -> Self {
        Self {
            level: LevelFilter::Error,
            file_path: None,
            timestamps: false,
            module_path: false,
        }
    }
}

/// Map a `LOG_LEVEL` value to a filter. Unknown names fall back to info.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialize the logging system.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(config.level);

    // ANSI colours only make sense on a terminal.
    let colour = config.file_path.is_none();
    let timestamps = config.timestamps;
    let module_path = config.module_path;

    builder.format(move |buf, record| {
        let mut output = String::new();

        if timestamps {
            output.push_str(&format!("{} ", Local::now().format("%Y-%m-%d %H:%M:%S")));
        }

        output.push_str(&format!("[{}] ", level_tag(record.level(), colour)));

        if module_path {
            if let Some(path) = record.module_path() {
                output.push_str(&format!("{}: ", path));
            }
        }

        output.push_str(&format!("{}", record.args()));
        writeln!(buf, "{}", output)
    });

    if let Some(path) = &config.file_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::DirectoryAccess {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::file_read(path, e))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logger: {}", e)))?;

    log::debug!("Logging initialized with level: {:?}", config.level);
    Ok(())
}

fn level_tag(level: log::Level, colour: bool) -> &'static str {
    match (level, colour) {
        (log::Level::Error, true) => "\x1b[31mERROR\x1b[0m",
        (log::Level::Warn, true) => "\x1b[33mWARN\x1b[0m ",
        (log::Level::Info, true) => "\x1b[32mINFO\x1b[0m ",
        (log::Level::Debug, true) => "\x1b[34mDEBUG\x1b[0m",
        (log::Level::Trace, true) => "\x1b[35mTRACE\x1b[0m",
        (log::Level::Error, false) => "ERROR",
        (log::Level::Warn, false) => "WARN ",
        (log::Level::Info, false) => "INFO ",
        (log::Level::Debug, false) => "DEBUG",
        (log::Level::Trace, false) => "TRACE",
    }
}
