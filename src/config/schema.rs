//! Configuration schema definitions.
//!
//! All types derive Serde traits so the same shape can be read from a TOML
//! file or assembled from command-line flags.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a single listener run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Network family: "tcp", "tcp4", "tcp6" or "unix".
    pub network: String,

    /// Bind address (e.g., "0.0.0.0:6666") or socket path for "unix".
    pub bind_address: String,

    /// Serve cleartext instead of TLS.
    pub disable_tls: bool,

    /// TLS settings, ignored when `disable_tls` is set.
    pub tls: TlsConfig,

    /// Deadline for receiving the handshake, measured from accept.
    pub read_timeout_ms: u64,
}

impl ListenerConfig {
    /// TLS settings if TLS is enabled.
    pub fn tls(&self) -> Option<&TlsConfig> {
        if self.disable_tls {
            None
        } else {
            Some(&self.tls)
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            network: "tcp".to_string(),
            bind_address: "0.0.0.0:6666".to_string(),
            disable_tls: false,
            tls: TlsConfig::default(),
            read_timeout_ms: 1000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Lowest accepted TLS minor version (0 = TLS 1.0).
    pub min_minor_version: u8,

    /// Highest accepted TLS minor version (2 = TLS 1.2).
    pub max_minor_version: u8,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: String::new(),
            key_path: String::new(),
            min_minor_version: 0,
            max_minor_version: 2,
        }
    }
}
