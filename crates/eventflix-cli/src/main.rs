//! EventFlix CLI - browse events, buy tickets and manage your session
//! from the terminal.

mod cli;
mod commands;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use eventflix_core::{AppContext, Config};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Command, USAGE};

/// Log file prefix inside `<data_dir>/logs`
const LOG_FILE_PREFIX: &str = "eventflix";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when `log_dir` is usable, to a daily rolling file.
/// The returned guard must be held until exit so the file writer flushes.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(dir)
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let loaded = Config::load();
    let config = loaded
        .as_ref()
        .cloned()
        .unwrap_or_default()
        .with_env_overrides();

    let log_dir = config.data_dir().ok().map(|dir| dir.join("logs"));
    let _guard = init_tracing(log_dir.as_deref());
    if let Err(ref e) = loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(?command, "EventFlix CLI starting");

    let mut ctx = match AppContext::start(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = commands::run(&mut ctx, command).await;
    ctx.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Command failed");
            eprintln!("{}", commands::describe_failure(&e));
            ExitCode::FAILURE
        }
    }
}
