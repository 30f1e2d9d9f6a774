//! Handshake validation subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming connection
//!     → (TLS negotiation, if any) ┐
//!     → read 20-byte frame        ┘ both under one absolute deadline
//!     → drop connection
//!     → compare bytes 0..4 with the Bolt magic
//! ```
//!
//! # Design Decisions
//! - Nothing is ever written back to the peer
//! - Bytes past the magic are read so the client's full frame is consumed,
//!   but never interpreted

pub mod frame;
pub mod validator;

pub use frame::{HandshakeFrame, BOLT_SIGNATURE, HANDSHAKE_LEN};
pub use validator::{HandshakeError, HandshakeValidator};
