//! Listener construction and single-connection accept.
//!
//! # Responsibilities
//! - Parse the network family and resolve the bind address
//! - Clear a stale Unix socket path before binding
//! - Load TLS credentials when TLS is enabled
//! - Accept connections and attach the TLS transport to them
//!
//! # Design Decisions
//! - Nothing is printed here; the caller emits the ready line once `build`
//!   returns, so readiness output can never precede a listening socket
//! - Dropping a Unix listener unlinks its socket path

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tokio::net::{TcpListener, UnixListener};

use crate::config::ListenerConfig;
use crate::net::connection::{Incoming, PeerAddr, Stream};
use crate::net::tls::{CredentialError, TlsTransport};

/// Error type for socket operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unsupported network {0:?}")]
    UnsupportedNetwork(String),

    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {network}:{address}: {source}")]
    Bind {
        network: Network,
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Error type for [`Listener::build`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Socket family to listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Unix,
}

impl FromStr for Network {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            "unix" => Ok(Network::Unix),
            other => Err(TransportError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
            Network::Unix => "unix",
        })
    }
}

impl Network {
    fn admits(&self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
            _ => true,
        }
    }

    /// Expand a bare ":port" into the family's wildcard address.
    fn expand<'a>(&self, address: &'a str) -> std::borrow::Cow<'a, str> {
        match address.strip_prefix(':') {
            Some(port) if *self == Network::Tcp6 => format!("[::]:{}", port).into(),
            Some(port) => format!("0.0.0.0:{}", port).into(),
            None => address.into(),
        }
    }
}

/// Unix listener that removes its socket file when dropped.
#[derive(Debug)]
struct UnixSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl Drop for UnixSocket {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "Socket file not removed");
        }
    }
}

#[derive(Debug)]
enum Inner {
    Tcp(TcpListener),
    Unix(UnixSocket),
}

/// A bound, listening socket with an optional TLS layer.
#[derive(Debug)]
pub struct Listener {
    inner: Inner,
    network: Network,
    address: String,
    tls: Option<TlsTransport>,
}

impl Listener {
    /// Build the transport described by `config`.
    ///
    /// When this returns `Ok`, the socket is already accepting.
    pub async fn build(config: &ListenerConfig) -> Result<Self, BuildError> {
        let network: Network = config.network.parse()?;

        if network == Network::Unix {
            // A leftover socket makes bind fail; anything else wrong with the
            // path will surface from bind too.
            if let Err(e) = std::fs::remove_file(&config.bind_address) {
                tracing::debug!(
                    path = %config.bind_address,
                    error = %e,
                    "Stale socket not removed"
                );
            }
        }

        let tls = config.tls().map(TlsTransport::from_config).transpose()?;
        let inner = bind(network, &config.bind_address).await?;

        tracing::info!(
            network = %network,
            address = %config.bind_address,
            tls = tls.is_some(),
            "Listener bound"
        );

        Ok(Self {
            inner,
            network,
            address: config.bind_address.clone(),
            tls,
        })
    }

    /// Accept one connection. Blocks until a peer connects.
    pub async fn accept(&self) -> Result<Incoming, TransportError> {
        let (stream, peer) = match &self.inner {
            Inner::Tcp(listener) => {
                let (stream, addr) = listener.accept().await.map_err(TransportError::Accept)?;
                (Stream::Tcp(stream), PeerAddr::Tcp(addr))
            }
            Inner::Unix(socket) => {
                let (stream, addr) = socket
                    .listener
                    .accept()
                    .await
                    .map_err(TransportError::Accept)?;
                let path = addr
                    .as_pathname()
                    .map(|p| p.display().to_string());
                (Stream::Unix(stream), PeerAddr::Unix(path))
            }
        };

        tracing::debug!(peer = %peer, "Connection accepted");
        Ok(Incoming::new(stream, peer, self.tls.clone()))
    }

    /// Human-readable line announcing that the listener is ready.
    pub fn status_line(&self) -> String {
        match &self.tls {
            Some(tls) => format!(
                "TLS, listening on {}:{} with cert {}",
                self.network,
                self.address,
                tls.cert_path().display()
            ),
            None => format!("Listening on non-TLS {}:{}", self.network, self.address),
        }
    }

    /// Bound socket address, for TCP listeners.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            Inner::Tcp(listener) => listener.local_addr().ok(),
            Inner::Unix(_) => None,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}

async fn bind(network: Network, address: &str) -> Result<Inner, TransportError> {
    let bind_err = |source| TransportError::Bind {
        network,
        address: address.to_string(),
        source,
    };

    if network == Network::Unix {
        let listener = UnixListener::bind(address).map_err(bind_err)?;
        return Ok(Inner::Unix(UnixSocket {
            listener,
            path: PathBuf::from(address),
        }));
    }

    let addrs = resolve(network, address).await?;
    let listener = TcpListener::bind(&addrs[..]).await.map_err(bind_err)?;
    Ok(Inner::Tcp(listener))
}

async fn resolve(network: Network, address: &str) -> Result<Vec<SocketAddr>, TransportError> {
    let resolve_err = |source| TransportError::Resolve {
        address: address.to_string(),
        source,
    };

    let expanded = network.expand(address);
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&*expanded)
        .await
        .map_err(resolve_err)?
        .filter(|addr| network.admits(addr))
        .collect();

    if addrs.is_empty() {
        return Err(resolve_err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no {} address", network),
        )));
    }
    Ok(addrs)
}
