//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command-line flags (args.rs)
//!     → optional TOML file (loader.rs)
//!     → flags override file values
//!     → ListenerConfig (immutable, built once before any socket work)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults matching the reference fixture
//! - No semantic validation: bad addresses and inverted version bounds are
//!   left for the socket and TLS layers to reject

pub mod args;
pub mod loader;
pub mod schema;

pub use args::CliArgs;
pub use loader::ConfigError;
pub use schema::ListenerConfig;
pub use schema::TlsConfig;
