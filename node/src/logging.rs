//! # Structured Logging
//!
//! Initializes the `tracing` subscriber in pretty or JSON format, filtered by
//! `RUST_LOG` when set.
//!
//! All log output goes to stderr so stdout stays clean for `keygen` and
//! `status` output.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output for local development.
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "blocker_node=info,blocker_protocol=info,tower_http=info";

/// Install the global tracing subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` overrides `default_level`, using `EnvFilter` directive
/// syntax:
///
/// ```text
/// RUST_LOG=blocker_node=debug,blocker_protocol=debug,tower_http=debug
/// ```
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::debug!(?format, "logging initialized");
}
