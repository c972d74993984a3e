//! The `Transport` trait and its optional capabilities.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

/// An ordered, reliable byte-stream to a remote station.
///
/// The three capability hooks have no-op defaults; modem-backed transports
/// override the ones their hardware supports and the session feature-detects
/// them at the call site:
///
/// - [`flush_outgoing`](Transport::flush_outgoing) blocks until the TNC has
///   emptied its transmit buffer, meaning the frame is actually on the air.
/// - [`tx_buffer_len`](Transport::tx_buffer_len) reports how many bytes sit
///   unsent in the modem, used to compute honest transfer progress.
/// - [`set_robust`](Transport::set_robust) toggles the modem's robust (slow
///   but reliable) modulation.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Block until the transmit buffers of the underlying modem are empty.
    fn flush_outgoing(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    /// Number of bytes queued in the modem's transmit buffer, or `None` when
    /// the transport cannot tell.
    fn tx_buffer_len(&self) -> Option<usize> {
        None
    }

    /// Enable or disable robust mode. Returns `false` when the transport has
    /// no such notion.
    fn set_robust(&mut self, _robust: bool) -> bool {
        false
    }
}

impl Transport for tokio::net::TcpStream {}

impl Transport for tokio::io::DuplexStream {}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn flush_outgoing(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        (**self).flush_outgoing()
    }

    fn tx_buffer_len(&self) -> Option<usize> {
        (**self).tx_buffer_len()
    }

    fn set_robust(&mut self, robust: bool) -> bool {
        (**self).set_robust(robust)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn duplex_stream_is_a_transport() {
        let (mut a, mut b) = tokio::io::duplex(64);
        assert_eq!(a.tx_buffer_len(), None);
        assert!(!a.set_robust(true));
        a.flush_outgoing().await.unwrap();

        a.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn boxed_transport_forwards_capabilities() {
        struct Capable(tokio::io::DuplexStream);

        impl AsyncRead for Capable {
            fn poll_read(
                mut self: Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
                buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<io::Result<()>> {
                Pin::new(&mut self.0).poll_read(cx, buf)
            }
        }

        impl AsyncWrite for Capable {
            fn poll_write(
                mut self: Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
                buf: &[u8],
            ) -> std::task::Poll<Result<usize, io::Error>> {
                Pin::new(&mut self.0).poll_write(cx, buf)
            }
            fn poll_flush(
                mut self: Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Result<(), io::Error>> {
                Pin::new(&mut self.0).poll_flush(cx)
            }
            fn poll_shutdown(
                mut self: Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Result<(), io::Error>> {
                Pin::new(&mut self.0).poll_shutdown(cx)
            }
        }

        impl Transport for Capable {
            fn tx_buffer_len(&self) -> Option<usize> {
                Some(42)
            }
            fn set_robust(&mut self, _robust: bool) -> bool {
                true
            }
        }

        let (a, _b) = tokio::io::duplex(16);
        let mut boxed: Box<dyn Transport> = Box::new(Capable(a));
        assert_eq!(boxed.tx_buffer_len(), Some(42));
        assert!(boxed.set_robust(false));
    }
}
