//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use handshake_listener::config::{ListenerConfig, TlsConfig};
use handshake_listener::BOLT_SIGNATURE;

/// A self-signed localhost certificate written to disk.
pub struct TestCert {
    pub cert_path: String,
    pub key_path: String,
    pub der: CertificateDer<'static>,
}

pub fn write_test_cert(dir: &Path) -> TestCert {
    let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_path = dir.join("server.pem");
    let key_path = dir.join("server.key");
    std::fs::write(&cert_path, generated.cert.pem()).unwrap();
    std::fs::write(&key_path, generated.key_pair.serialize_pem()).unwrap();

    TestCert {
        cert_path: cert_path.to_str().unwrap().to_string(),
        key_path: key_path.to_str().unwrap().to_string(),
        der: generated.cert.der().clone(),
    }
}

pub fn plain_config() -> ListenerConfig {
    ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        disable_tls: true,
        ..Default::default()
    }
}

pub fn tls_config(cert: &TestCert, min: u8, max: u8) -> ListenerConfig {
    ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        tls: TlsConfig {
            cert_path: cert.cert_path.clone(),
            key_path: cert.key_path.clone(),
            min_minor_version: min,
            max_minor_version: max,
        },
        ..Default::default()
    }
}

/// Connector trusting only `cert`, restricted to `versions`.
pub fn connector(cert: &TestCert, versions: &[&'static SupportedProtocolVersion]) -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.add(cert.der.clone()).unwrap();

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_protocol_versions(versions)
    .unwrap()
    .with_root_certificates(roots)
    .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

pub async fn tls_connect(
    connector: &TlsConnector,
    addr: std::net::SocketAddr,
) -> std::io::Result<TlsStream<TcpStream>> {
    let tcp = TcpStream::connect(addr).await?;
    let name = ServerName::try_from("localhost").unwrap();
    connector.connect(name, tcp).await
}

/// A handshake frame with the given magic and Bolt 4.4..4.1 proposals.
pub fn bolt_frame(signature: [u8; 4]) -> Vec<u8> {
    let mut frame = signature.to_vec();
    frame.extend_from_slice(&[0, 0, 4, 4, 0, 0, 3, 4, 0, 0, 2, 4, 0, 0, 1, 4]);
    frame
}

pub fn good_frame() -> Vec<u8> {
    bolt_frame(BOLT_SIGNATURE)
}
