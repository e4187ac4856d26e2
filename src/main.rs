//! localguard: local file inspection and quarantine service.
//!
//! This is the main entry point for the CLI application.

use localguard::client;
use localguard::core::config::Config;
use localguard::core::error::Result;
use localguard::core::types::CommandRequest;
use localguard::server::Server;
use localguard::ui::cli::{Cli, Commands};
use localguard::utils::logging::{init_logging, LogConfig};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            if e.is_fatal_at_startup() {
                eprintln!("Startup failed: {}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Returns the process exit status.
async fn run() -> Result<i32> {
    let cli = Cli::parse_args();

    let config = Arc::new(Config::load(&cli.config)?);

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::from_config(&config)
    };
    init_logging(log_config)?;

    log::info!("localguard v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Configuration loaded from {}", cli.config.display());

    match cli.command {
        Commands::Serve => run_serve(config, &cli.config).await,
        Commands::Send { command, params } => run_send(&config, command, params).await,
        Commands::Config => run_config(&config),
    }
}

/// Run the server until a signal arrives.
async fn run_serve(config: Arc<Config>, config_path: &Path) -> Result<i32> {
    log::info!("Configuration file {}", config_path.display());
    log::info!(
        "Buffer length {}, max workers {}, quarantine dir {}",
        config.server.buffer_len,
        config.server.max_workers,
        config.quarantine.directory.display()
    );

    let server = Server::new(config);
    let signals = server.shutdown_handle().listen_for_signals();

    let reason = server.run().await;
    signals.abort();
    let reason = reason?;

    log::info!("Server stopped ({:?})", reason);
    Ok(reason.exit_code())
}

/// Send one command and print the raw reply.
async fn run_send(config: &Config, command: String, params: Vec<String>) -> Result<i32> {
    let mut request = CommandRequest::new(command);
    request.params = client::parse_params(&params)?;

    let addr = config.server.socket_addr()?;
    log::info!("Sending {} to {}", request.command, addr);

    let reply = client::send_request(
        addr,
        &request,
        config.server.buffer_len,
        config.server.read_timeout(),
    )
    .await?;

    if reply.is_empty() {
        eprintln!("Server closed the connection without a response");
        return Ok(1);
    }

    println!("{}", String::from_utf8_lossy(&reply));
    Ok(0)
}

/// Print the effective configuration.
fn run_config(config: &Config) -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(0)
}
