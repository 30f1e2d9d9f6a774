//! Bolt handshake listener.
//!
//! # Architecture Overview
//!
//! ```text
//!   flags / TOML ──▶ ListenerConfig
//!                         │
//!                         ▼
//!                ┌─────────────────┐     "Listening on ..."
//!                │  net::listener  │ ──────────────────────▶ stdout
//!                │   (+ net::tls)  │
//!                └────────┬────────┘
//!                         │ accept one
//!                         ▼
//!                ┌─────────────────┐
//!                │    handshake    │  20-byte frame, 1s deadline
//!                └────────┬────────┘
//!                         ▼
//!                  outcome line + exit status
//! ```
//!
//! Do not print anything on stdout until the listener is bound; test
//! harnesses treat the first line as the ready signal.

use clap::Parser;

use handshake_listener::config::CliArgs;
use handshake_listener::lifecycle::{self, SessionError};
use handshake_listener::observability::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let args = CliArgs::parse();
    let mut stdout = std::io::stdout();

    let outcome = match args.into_config() {
        Ok(config) => {
            tracing::debug!(config = ?config, "Configuration loaded");
            lifecycle::run(&config, &mut stdout).await
        }
        Err(e) => Err(SessionError::from(e)),
    };

    let code = lifecycle::report(&mut stdout, &outcome);
    std::process::exit(code);
}
