//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Keep diagnostics off stdout
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Stdout carries the report lines harnesses synchronize on, so every log
//!   event goes to stderr
//! - Log level configurable via `RUST_LOG`, quiet by default

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "handshake_listener=warn";

/// Install the global subscriber. Later calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
