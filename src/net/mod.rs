//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (family, address, stale socket cleanup, bind)
//!     → tls.rs (credentials, version window, server config)
//!     → accept one connection
//!     → connection.rs (unified stream, peer address, lazy TLS handshake)
//!     → Hand off to handshake validation
//! ```
//!
//! # Design Decisions
//! - TLS is optional and negotiated after accept, inside the read deadline
//! - TCP and Unix-domain streams share one `Stream` type

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{Connection, Incoming, PeerAddr, Stream};
pub use listener::{BuildError, Listener, Network, TransportError};
pub use tls::{CredentialError, TlsTransport, TlsVersionWindow};
