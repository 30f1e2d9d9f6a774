//! Command-line flags.
//!
//! Flags are layered over the optional config file: anything given on the
//! command line wins, anything omitted falls back to the file, then to the
//! defaults in [`ListenerConfig`].

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ListenerConfig;

#[derive(Debug, Parser)]
#[command(name = "handshake-listener")]
#[command(about = "Accept one connection and check its Bolt handshake signature", long_about = None)]
pub struct CliArgs {
    /// TOML file with listener settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    pub bind: Option<String>,

    /// Network type to bind to (tcp, tcp4, tcp6, unix)
    #[arg(long)]
    pub network: Option<String>,

    /// Path to server certificate
    #[arg(long)]
    pub cert: Option<String>,

    /// Path to server private key
    #[arg(long)]
    pub key: Option<String>,

    /// Minimum TLS version, minor part
    #[arg(long, alias = "minTls")]
    pub min_tls: Option<u8>,

    /// Maximum TLS version, minor part
    #[arg(long, alias = "maxTls")]
    pub max_tls: Option<u8>,

    /// Disable TLS
    #[arg(long, alias = "disableTls")]
    pub disable_tls: bool,

    /// Handshake read deadline in milliseconds
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,
}

impl CliArgs {
    /// Resolve the final configuration.
    pub fn into_config(self) -> Result<ListenerConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => ListenerConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(self, mut config: ListenerConfig) -> ListenerConfig {
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(cert) = self.cert {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.key {
            config.tls.key_path = key;
        }
        if let Some(min) = self.min_tls {
            config.tls.min_minor_version = min;
        }
        if let Some(max) = self.max_tls {
            config.tls.max_minor_version = max;
        }
        if self.disable_tls {
            config.disable_tls = true;
        }
        if let Some(ms) = self.read_timeout_ms {
            config.read_timeout_ms = ms;
        }
        config
    }
}
