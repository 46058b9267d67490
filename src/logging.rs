//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to the console and to a
//! JSON log file, for following concurrent coordination attempts after the fact.

use crate::coordinator::Outcome;
use crate::models::ContentKey;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once and safe to call when another global subscriber
/// is already installed; `RUST_LOG` overrides the environment's default level.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
        };

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        let file_layer = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let log_filename = format!(
                    "{}.{}.{}.log",
                    environment,
                    process::id(),
                    Utc::now().format("%Y%m%d_%H%M%S")
                );
                let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                // The writer must outlive every log call in the process
                std::mem::forget(guard);

                Some(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(filter()),
                )
            }
            Err(_) => None,
        };

        let file_enabled = file_layer.is_some();
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            file_output = file_enabled,
            "Structured logging initialized"
        );
    });
}

/// Current environment from `CONTENT_ENV`, then `APP_ENV`, defaulting to development
fn get_environment() -> String {
    std::env::var("CONTENT_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log the terminal state of one `get_or_generate` call
pub fn log_coordination_event(
    key: &ContentKey,
    requester: &str,
    outcome: Option<Outcome>,
    record_id: Option<i64>,
    duration_ms: u64,
    error: Option<&str>,
) {
    match error {
        None => tracing::info!(
            category = %key.category,
            date = %key.effective_date,
            requester = %requester,
            outcome = outcome.map(|o| o.as_str()),
            record_id = record_id,
            duration_ms = duration_ms,
            "COORDINATION_COMPLETE"
        ),
        Some(error) => tracing::error!(
            category = %key.category,
            date = %key.effective_date,
            requester = %requester,
            duration_ms = duration_ms,
            error = %error,
            "COORDINATION_FAILED"
        ),
    }
}
