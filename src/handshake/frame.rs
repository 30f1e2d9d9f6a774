//! Bolt handshake frame layout.
//!
//! ```text
//! | magic (4) | version proposal 1 (4) | ... | version proposal 4 (4) |
//! ```
//! Only the magic is checked; the version proposals are carried as opaque
//! bytes.

use std::fmt;

/// Magic marker every Bolt client sends first.
pub const BOLT_SIGNATURE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Magic plus four 4-byte version proposals.
pub const HANDSHAKE_LEN: usize = 20;

/// The complete handshake frame as received.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HandshakeFrame([u8; HANDSHAKE_LEN]);

impl HandshakeFrame {
    pub fn new(bytes: [u8; HANDSHAKE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn signature(&self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }

    /// The 16 bytes after the magic.
    pub fn version_fields(&self) -> &[u8] {
        &self.0[4..]
    }

    pub fn as_bytes(&self) -> &[u8; HANDSHAKE_LEN] {
        &self.0
    }

    /// Index of the first byte that differs from `expected`, if any.
    pub fn signature_mismatch(&self, expected: &[u8; 4]) -> Option<usize> {
        expected
            .iter()
            .zip(self.0.iter())
            .position(|(want, got)| want != got)
    }
}

impl fmt::Debug for HandshakeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandshakeFrame(")?;
        for (i, chunk) in self.0.chunks(4).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            for b in chunk {
                write!(f, "{:02x}", b)?;
            }
        }
        write!(f, ")")
    }
}
