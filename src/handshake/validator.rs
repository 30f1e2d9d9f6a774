//! Deadline-bounded handshake read and signature check.

use std::future::Future;
use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};

use crate::handshake::frame::{HandshakeFrame, BOLT_SIGNATURE, HANDSHAKE_LEN};

/// Error type for handshake validation.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Timeout, short read, reset, or failed TLS negotiation.
    #[error("Failed to receive Bolt handshake: {0}")]
    Read(#[source] io::Error),

    /// The reported text stays the same whichever byte differs.
    #[error("Bad Bolt handshake")]
    SignatureMismatch { received: [u8; 4], offset: usize },
}

/// Reads the fixed handshake prefix and checks its signature.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeValidator {
    expected: [u8; 4],
}

impl Default for HandshakeValidator {
    fn default() -> Self {
        Self::new(BOLT_SIGNATURE)
    }
}

impl HandshakeValidator {
    pub fn new(expected: [u8; 4]) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> [u8; 4] {
        self.expected
    }

    /// Establish the connection, read the frame, close, then compare.
    ///
    /// `connect` yields the readable stream; any transport negotiation it
    /// does counts against `deadline`. The stream is dropped before the
    /// signature is compared, whether or not the read succeeded.
    pub async fn validate<F, S>(
        &self,
        connect: F,
        deadline: Instant,
    ) -> Result<HandshakeFrame, HandshakeError>
    where
        F: Future<Output = io::Result<S>>,
        S: AsyncRead + Unpin,
    {
        let frame = read_frame(connect, deadline)
            .await
            .map_err(HandshakeError::Read)?;

        tracing::debug!(frame = ?frame, "Handshake received");

        match frame.signature_mismatch(&self.expected) {
            None => Ok(frame),
            Some(offset) => {
                tracing::debug!(offset, received = ?frame.signature(), "Signature mismatch");
                Err(HandshakeError::SignatureMismatch {
                    received: frame.signature(),
                    offset,
                })
            }
        }
    }

    /// [`validate`](Self::validate) for a stream that is already usable.
    pub async fn validate_stream<S>(
        &self,
        stream: S,
        deadline: Instant,
    ) -> Result<HandshakeFrame, HandshakeError>
    where
        S: AsyncRead + Unpin,
    {
        self.validate(std::future::ready(Ok(stream)), deadline).await
    }
}

async fn read_frame<F, S>(connect: F, deadline: Instant) -> io::Result<HandshakeFrame>
where
    F: Future<Output = io::Result<S>>,
    S: AsyncRead + Unpin,
{
    let read = async {
        let mut stream = connect.await?;
        let mut buf = [0u8; HANDSHAKE_LEN];
        stream.read_exact(&mut buf).await?;
        Ok::<_, io::Error>(HandshakeFrame::new(buf))
    };

    // On timeout the future, and the stream it owns, is dropped here.
    match timeout_at(deadline, read).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "read deadline exceeded",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn frame(signature: [u8; 4]) -> Vec<u8> {
        let mut bytes = signature.to_vec();
        bytes.extend_from_slice(&[0, 0, 4, 4, 0, 0, 0, 3, 0, 0, 0, 2, 0, 0, 0, 1]);
        bytes
    }

    fn deadline(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn accepts_bolt_frame() {
        let (server, mut client) = tokio::io::duplex(64);
        client.write_all(&frame(BOLT_SIGNATURE)).await.unwrap();

        let frame = HandshakeValidator::default()
            .validate_stream(server, deadline(1000))
            .await
            .unwrap();
        assert_eq!(frame.signature(), BOLT_SIGNATURE);
        assert_eq!(&frame.version_fields()[..4], &[0, 0, 4, 4]);
    }

    #[tokio::test]
    async fn rejects_every_single_byte_mismatch() {
        for pos in 0..4 {
            let mut sig = BOLT_SIGNATURE;
            sig[pos] = sig[pos].wrapping_add(1);

            let (server, mut client) = tokio::io::duplex(64);
            client.write_all(&frame(sig)).await.unwrap();

            let err = HandshakeValidator::default()
                .validate_stream(server, deadline(1000))
                .await
                .unwrap_err();
            match err {
                HandshakeError::SignatureMismatch { received, offset } => {
                    assert_eq!(received, sig);
                    assert_eq!(offset, pos);
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(
                HandshakeError::SignatureMismatch { received: sig, offset: pos }.to_string(),
                "Bad Bolt handshake"
            );
        }
    }

    #[tokio::test]
    async fn short_frame_then_close_is_read_failure() {
        let (server, mut client) = tokio::io::duplex(64);
        client.write_all(&BOLT_SIGNATURE).await.unwrap();
        drop(client);

        let err = HandshakeValidator::default()
            .validate_stream(server, deadline(1000))
            .await
            .unwrap_err();
        match err {
            HandshakeError::Read(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_frame_times_out_and_closes() {
        let (server, mut client) = tokio::io::duplex(64);
        client.write_all(&frame(BOLT_SIGNATURE)[..10]).await.unwrap();

        let started = std::time::Instant::now();
        let err = HandshakeValidator::default()
            .validate_stream(server, deadline(100))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        match err {
            HandshakeError::Read(e) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(90));
        assert!(elapsed < Duration::from_millis(600));

        // Server half is gone, so the client sees EOF.
        let mut buf = [0u8; 1];
        let n = tokio::io::AsyncReadExt::read(&mut client, &mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn connect_failure_is_read_failure() {
        let connect = async {
            Err::<tokio::io::DuplexStream, _>(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "handshake aborted",
            ))
        };
        let err = HandshakeValidator::default()
            .validate(connect, deadline(1000))
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::Read(e) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[tokio::test]
    async fn custom_signature() {
        let magic = [1, 2, 3, 4];
        let (server, mut client) = tokio::io::duplex(64);
        client.write_all(&frame(magic)).await.unwrap();

        let validator = HandshakeValidator::new(magic);
        assert_eq!(validator.expected(), magic);
        assert!(validator.validate_stream(server, deadline(1000)).await.is_ok());
    }
}
