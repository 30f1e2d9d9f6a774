//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → Session::bind (transport built, socket listening)
//!     → ready line on stdout
//!     → Session::serve (accept one, validate, release listener)
//!     → report (outcome line, exit status)
//! ```
//!
//! # Design Decisions
//! - Fail fast: every error is terminal
//! - Nothing reaches stdout before the socket is listening
//! - Only `main` turns the exit status into a process exit

pub mod session;

pub use session::{report, run, Session, SessionError, SUCCESS_LINE};
