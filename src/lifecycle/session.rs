//! Single-connection session orchestration.
//!
//! # States
//! ```text
//! Idle → TransportReady → ConnectionAccepted → HandshakeChecked → Terminated
//! ```
//! Any failure jumps straight to `Terminated`. There are no retries and no
//! way back to `Idle`: one process serves exactly one connection.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::{ConfigError, ListenerConfig};
use crate::handshake::{HandshakeError, HandshakeFrame, HandshakeValidator};
use crate::net::listener::{BuildError, Listener, TransportError};
use crate::net::tls::CredentialError;

/// Line reported when the handshake checks out.
pub const SUCCESS_LINE: &str = "Client connected with correct Bolt handshake";

/// Terminal failure of a session. Every variant ends the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl From<BuildError> for SessionError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Credential(e) => SessionError::Credential(e),
            BuildError::Transport(e) => SessionError::Transport(e),
        }
    }
}

impl SessionError {
    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::Credential(_) => 2,
            SessionError::Config(_) | SessionError::Transport(_) => 3,
            SessionError::Handshake(HandshakeError::Read(_)) => 4,
            SessionError::Handshake(HandshakeError::SignatureMismatch { .. }) => 5,
        }
    }
}

/// A bound listener waiting for its one connection.
#[derive(Debug)]
pub struct Session {
    listener: Listener,
    validator: HandshakeValidator,
    read_timeout: Duration,
}

impl Session {
    /// Build the transport. On success the socket is already listening.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, SessionError> {
        let listener = Listener::build(config).await?;
        Ok(Self {
            listener,
            validator: HandshakeValidator::default(),
            read_timeout: config.read_timeout(),
        })
    }

    pub fn with_validator(mut self, validator: HandshakeValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn status_line(&self) -> String {
        self.listener.status_line()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one connection and validate its handshake.
    ///
    /// The listener is released when this returns, on every path.
    pub async fn serve<W: Write>(self, out: &mut W) -> Result<HandshakeFrame, SessionError> {
        let incoming = self.listener.accept().await?;
        let deadline = Instant::now() + self.read_timeout;

        let line = if incoming.is_tls() {
            format!(
                "TLS, client connected from {}, waiting for Bolt handshake",
                incoming.peer()
            )
        } else {
            format!(
                "Client connected from {}, waiting for Bolt handshake",
                incoming.peer()
            )
        };
        emit(out, &line);

        let frame = self
            .validator
            .validate(incoming.establish(), deadline)
            .await?;
        Ok(frame)
    }
}

/// Bind, announce readiness, then serve the single connection.
pub async fn run<W: Write>(
    config: &ListenerConfig,
    out: &mut W,
) -> Result<HandshakeFrame, SessionError> {
    let session = Session::bind(config).await?;
    emit(out, &session.status_line());
    session.serve(out).await
}

/// Write the outcome line and return the exit status.
pub fn report<W: Write>(out: &mut W, outcome: &Result<HandshakeFrame, SessionError>) -> i32 {
    match outcome {
        Ok(_) => {
            emit(out, SUCCESS_LINE);
            0
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Session failed");
            emit(out, &err.to_string());
            err.exit_code()
        }
    }
}

fn emit<W: Write>(out: &mut W, line: &str) {
    // Harnesses wait on these lines, so flush each one.
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}
