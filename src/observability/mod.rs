//! Observability subsystem.
//!
//! All subsystems emit `tracing` events; `logging.rs` routes them to stderr.

pub mod logging;
