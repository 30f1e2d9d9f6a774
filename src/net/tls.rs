//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Load the PEM certificate chain and private key
//! - Translate configured minor-version offsets into a wire version window
//! - Serve the same certificate for every client hello
//! - Run the server side of the TLS handshake on accepted streams
//!
//! # Design Decisions
//! - rustls only speaks TLS 1.2 and 1.3; a window that covers neither still
//!   binds, and every handshake is refused when it starts
//! - Certificate selection goes through `ResolvesServerCert` so a stapling
//!   resolver can replace the fixed one

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{ServerConfig, SupportedProtocolVersion};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;

/// Major version byte shared by SSL 3.0 and every TLS release.
pub const TLS_VERSION_BASE: u16 = 0x0300;

/// Error type for certificate and key loading.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse PEM in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no certificates found in {}", .path.display())]
    NoCertificates { path: PathBuf },

    #[error("no private key found in {}", .path.display())]
    NoPrivateKey { path: PathBuf },

    #[error("unsupported private key in {}: {source}", .path.display())]
    UnsupportedKey {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),
}

/// Inclusive range of TLS wire versions a listener will negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsVersionWindow {
    pub min: u16,
    pub max: u16,
}

impl TlsVersionWindow {
    /// Build a window from minor-version offsets, where 0 means TLS 1.0.
    ///
    /// An inverted window is kept as-is; it simply contains nothing.
    pub fn from_minor_offsets(min: u8, max: u8) -> Self {
        Self {
            min: wire_version(min),
            max: wire_version(max),
        }
    }

    pub fn contains(&self, version: u16) -> bool {
        self.min <= version && version <= self.max
    }

    /// Protocol versions the TLS stack implements that fall inside the window.
    pub fn supported_versions(&self) -> Vec<&'static SupportedProtocolVersion> {
        rustls::ALL_VERSIONS
            .iter()
            .copied()
            .filter(|v| self.contains(u16::from(v.version)))
            .collect()
    }
}

impl fmt::Display for TlsVersionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}..={:#06x}", self.min, self.max)
    }
}

fn wire_version(minor: u8) -> u16 {
    TLS_VERSION_BASE | (u16::from(minor) + 1)
}

/// Hands out one certificate regardless of SNI or client capabilities.
#[derive(Debug)]
pub struct FixedCertResolver {
    key: Arc<CertifiedKey>,
}

impl FixedCertResolver {
    pub fn new(key: CertifiedKey) -> Self {
        Self { key: Arc::new(key) }
    }
}

impl ResolvesServerCert for FixedCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        tracing::trace!(server_name = ?client_hello.server_name(), "Resolving certificate");
        Some(Arc::clone(&self.key))
    }
}

/// Server-side TLS wrapper applied to each accepted stream.
#[derive(Clone)]
pub struct TlsTransport {
    /// `None` when the version window excludes every implemented version.
    acceptor: Option<TlsAcceptor>,
    window: TlsVersionWindow,
    cert_path: PathBuf,
}

impl fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsTransport")
            .field("window", &self.window)
            .field("cert_path", &self.cert_path)
            .field("negotiable", &self.acceptor.is_some())
            .finish()
    }
}

impl TlsTransport {
    /// Load credentials and build the server configuration.
    pub fn from_config(config: &TlsConfig) -> Result<Self, CredentialError> {
        Self::with_provider(config, Arc::new(rustls::crypto::ring::default_provider()))
    }

    pub fn with_provider(
        config: &TlsConfig,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, CredentialError> {
        let cert_path = PathBuf::from(&config.cert_path);
        let key = load_certified_key(&cert_path, Path::new(&config.key_path), &provider)?;
        let window =
            TlsVersionWindow::from_minor_offsets(config.min_minor_version, config.max_minor_version);

        let versions = window.supported_versions();
        let acceptor = if versions.is_empty() {
            tracing::warn!(
                window = %window,
                "No supported TLS version in configured window, handshakes will be refused"
            );
            None
        } else {
            let server_config = ServerConfig::builder_with_provider(provider)
                .with_protocol_versions(&versions)?
                .with_no_client_auth()
                .with_cert_resolver(Arc::new(FixedCertResolver::new(key)));
            Some(TlsAcceptor::from(Arc::new(server_config)))
        };

        tracing::debug!(
            cert_path = %cert_path.display(),
            window = %window,
            "TLS configuration loaded"
        );

        Ok(Self {
            acceptor,
            window,
            cert_path,
        })
    }

    pub fn window(&self) -> TlsVersionWindow {
        self.window
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Perform the server handshake on an accepted stream.
    pub async fn accept<IO>(&self, stream: IO) -> io::Result<TlsStream<IO>>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let acceptor = self.acceptor.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("no supported TLS version in window {}", self.window),
            )
        })?;

        let tls = acceptor.accept(stream).await?;
        tracing::debug!(
            version = ?tls.get_ref().1.protocol_version(),
            "TLS handshake complete"
        );
        Ok(tls)
    }
}

/// Read a PEM certificate chain and private key into a signing-ready pair.
pub fn load_certified_key(
    cert_path: &Path,
    key_path: &Path,
    provider: &CryptoProvider,
) -> Result<CertifiedKey, CredentialError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let signing_key =
        provider
            .key_provider
            .load_private_key(key)
            .map_err(|source| CredentialError::UnsupportedKey {
                path: key_path.to_path_buf(),
                source,
            })?;

    Ok(CertifiedKey::new(certs, signing_key))
}

fn open(path: &Path) -> Result<BufReader<File>, CredentialError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(CredentialError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, CredentialError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| CredentialError::NoPrivateKey {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pair(dir: &Path) -> (String, String) {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = dir.join("cert.pem");
        let key = dir.join("key.pem");
        std::fs::write(&cert, generated.cert.pem()).unwrap();
        std::fs::write(&key, generated.key_pair.serialize_pem()).unwrap();
        (
            cert.to_str().unwrap().to_string(),
            key.to_str().unwrap().to_string(),
        )
    }

    fn tls_config(cert_path: String, key_path: String, min: u8, max: u8) -> TlsConfig {
        TlsConfig {
            cert_path,
            key_path,
            min_minor_version: min,
            max_minor_version: max,
        }
    }

    #[test]
    fn window_uses_base_plus_offset() {
        let window = TlsVersionWindow::from_minor_offsets(0, 2);
        assert_eq!(window.min, 0x0301);
        assert_eq!(window.max, 0x0303);
        assert!(window.contains(0x0302));
        assert!(!window.contains(0x0304));
    }

    #[test]
    fn window_selects_implemented_versions() {
        let tls12_only = TlsVersionWindow::from_minor_offsets(0, 2).supported_versions();
        assert_eq!(tls12_only.len(), 1);
        assert_eq!(u16::from(tls12_only[0].version), 0x0303);

        let both = TlsVersionWindow::from_minor_offsets(2, 3).supported_versions();
        assert_eq!(both.len(), 2);

        assert!(TlsVersionWindow::from_minor_offsets(0, 1)
            .supported_versions()
            .is_empty());
    }

    #[test]
    fn inverted_window_is_empty() {
        let window = TlsVersionWindow::from_minor_offsets(3, 2);
        assert!(!window.contains(0x0303));
        assert!(!window.contains(0x0304));
        assert!(window.supported_versions().is_empty());
    }

    #[test]
    fn loads_generated_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = write_pair(dir.path());

        let transport = TlsTransport::from_config(&tls_config(cert.clone(), key, 0, 3)).unwrap();
        assert_eq!(transport.cert_path(), Path::new(&cert));
        assert_eq!(transport.window().max, 0x0304);
    }

    #[test]
    fn inverted_window_still_builds() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = write_pair(dir.path());

        assert!(TlsTransport::from_config(&tls_config(cert, key, 3, 2)).is_ok());
    }

    #[test]
    fn missing_cert_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, key) = write_pair(dir.path());
        let missing = dir.path().join("nope.pem").to_str().unwrap().to_string();

        let err = TlsTransport::from_config(&tls_config(missing, key, 0, 2)).unwrap_err();
        assert!(matches!(err, CredentialError::Read { .. }));
    }

    #[test]
    fn empty_paths_are_read_errors() {
        let err = TlsTransport::from_config(&TlsConfig::default()).unwrap_err();
        assert!(matches!(err, CredentialError::Read { .. }));
    }

    #[test]
    fn cert_file_without_certs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (_, key) = write_pair(dir.path());

        // A key file has PEM blocks but no CERTIFICATE section.
        let err = TlsTransport::from_config(&tls_config(key.clone(), key, 0, 2)).unwrap_err();
        assert!(matches!(err, CredentialError::NoCertificates { .. }));
    }

    #[test]
    fn key_file_without_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, _) = write_pair(dir.path());

        let err = TlsTransport::from_config(&tls_config(cert.clone(), cert, 0, 2)).unwrap_err();
        assert!(matches!(err, CredentialError::NoPrivateKey { .. }));
    }

    #[tokio::test]
    async fn empty_window_refuses_handshake() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = write_pair(dir.path());
        let transport = TlsTransport::from_config(&tls_config(cert, key, 0, 1)).unwrap();

        let (server, _client) = tokio::io::duplex(64);
        let err = match transport.accept(server).await {
            Ok(_) => panic!("handshake should be refused"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
