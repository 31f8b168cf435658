//! Logging configuration and initialization
//!
//! Output goes either to the console or to daily rotating files:
//! - `LOG_DESTINATION`: "console" (default) or "file"
//! - `LOG_DIR`: directory for log files (default: "./logs")
//! - `LOG_FILE_PREFIX`: prefix for log file names (default: "tansu-events")
//! - `RUST_LOG`: filter directives (default: the level passed to [`init_logging`])

use anyhow::{Result, anyhow};
use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum length for a logged payload (999 characters)
pub const MAX_LOG_MESSAGE_LENGTH: usize = 999;

/// Truncate a message to the maximum allowed length
pub fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_LOG_MESSAGE_LENGTH {
        return message.to_string();
    }

    let mut cut = MAX_LOG_MESSAGE_LENGTH - 14;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...[truncated]", &message[..cut])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Console,
    File { dir: String, prefix: String },
}

impl LogDestination {
    /// Read `LOG_DESTINATION`, `LOG_DIR` and `LOG_FILE_PREFIX`
    pub fn from_env() -> Self {
        let destination = env::var("LOG_DESTINATION").unwrap_or_else(|_| "console".to_string());
        match destination.to_lowercase().as_str() {
            "file" => LogDestination::File {
                dir: env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
                prefix: env::var("LOG_FILE_PREFIX").unwrap_or_else(|_| "tansu-events".to_string()),
            },
            _ => LogDestination::Console,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `default_filter` is used when `RUST_LOG` is not set. When logging to files
/// the returned guard must be kept alive for the lifetime of the process, or
/// buffered lines are lost.
pub fn init_logging(default_filter: &str, destination: LogDestination) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match destination {
        LogDestination::Console => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stdout)
                        .with_ansi(true)
                        .with_target(true),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize console tracing subscriber: {}", e))?;

            info!("Logging to console (stdout)");
            Ok(None)
        }
        LogDestination::File { dir, prefix } => {
            std::fs::create_dir_all(&dir)
                .map_err(|e| anyhow!("Failed to create log directory '{}': {}", dir, e))?;

            let file_appender = rolling::daily(&dir, &prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize file tracing subscriber: {}", e))?;

            info!("Logging to daily rotating files: {}/{}.<YYYY-MM-DD>", dir, prefix);
            Ok(Some(guard))
        }
    }
}
