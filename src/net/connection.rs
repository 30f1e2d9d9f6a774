//! Accepted connection types.
//!
//! # Responsibilities
//! - Present TCP and Unix-domain streams as one byte stream
//! - Describe the remote peer for log and report lines
//! - Wrap the stream in TLS when the listener requires it

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};
use tokio_rustls::server::TlsStream;

use crate::net::tls::TlsTransport;

/// Remote end of an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddr {
    Tcp(SocketAddr),
    /// Unix peers are usually unnamed.
    Unix(Option<String>),
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddr::Tcp(addr) => write!(f, "{}", addr),
            PeerAddr::Unix(Some(path)) => write!(f, "{}", path),
            PeerAddr::Unix(None) => write!(f, "@"),
        }
    }
}

/// A raw accepted stream, before any TLS.
#[derive(Debug)]
pub enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Stream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Stream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_flush(cx),
            Stream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Stream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// An established connection, ready for the handshake read.
pub enum Connection {
    Plain(Stream),
    Tls(Box<TlsStream<Stream>>),
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Plain(s) => f.debug_tuple("Plain").field(s).finish(),
            Connection::Tls(s) => f
                .debug_struct("Tls")
                .field("stream", s.get_ref().0)
                .field("version", &s.get_ref().1.protocol_version())
                .finish(),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

/// A connection fresh off `accept`, with TLS (if any) not yet negotiated.
///
/// The TLS handshake runs in [`Incoming::establish`] so it can share the
/// handshake read deadline.
#[derive(Debug)]
pub struct Incoming {
    stream: Stream,
    peer: PeerAddr,
    tls: Option<TlsTransport>,
}

impl Incoming {
    pub(crate) fn new(stream: Stream, peer: PeerAddr, tls: Option<TlsTransport>) -> Self {
        Self { stream, peer, tls }
    }

    pub fn peer(&self) -> &PeerAddr {
        &self.peer
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Complete transport setup, running the TLS handshake if required.
    pub async fn establish(self) -> io::Result<Connection> {
        match self.tls {
            Some(tls) => {
                let stream = tls.accept(self.stream).await?;
                Ok(Connection::Tls(Box::new(stream)))
            }
            None => Ok(Connection::Plain(self.stream)),
        }
    }
}
