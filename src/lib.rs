//! Single-use Bolt handshake listener.
//!
//! Binds one socket (cleartext or TLS, TCP or Unix-domain), accepts exactly
//! one connection, checks that its first bytes carry the Bolt magic, and
//! reports the outcome.

pub mod config;
pub mod handshake;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ListenerConfig;
pub use handshake::{HandshakeValidator, BOLT_SIGNATURE};
pub use lifecycle::{Session, SessionError};
pub use net::Listener;
