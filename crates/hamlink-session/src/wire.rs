//! Buffered reading of the line/binary wire format.
//!
//! Protocol lines are terminated by a single CR (0x0D). The body framing
//! interleaves raw bytes with the line protocol, so the session needs one
//! buffered reader with byte, peek and delimiter primitives rather than a
//! generic line splitter.

use std::io;

use tokio::io::AsyncReadExt;
use tracing::debug;

use hamlink_transport::Transport;

const READ_CHUNK: usize = 1024;

/// A read buffer over the session's transport.
///
/// The transport itself is passed into each call so the session can keep
/// using it for writes and capability calls between reads.
#[derive(Debug, Default)]
pub(crate) struct WireReader {
    buf: Vec<u8>,
    pos: usize,
}

impl WireReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read more bytes from the transport into the buffer.
    async fn fill<T: Transport + ?Sized>(&mut self, conn: &mut T) -> io::Result<()> {
        if self.pos > 0 && self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = conn.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    /// Next byte without consuming it.
    pub async fn peek_byte<T: Transport + ?Sized>(&mut self, conn: &mut T) -> io::Result<u8> {
        while self.pos >= self.buf.len() {
            self.fill(conn).await?;
        }
        Ok(self.buf[self.pos])
    }

    pub async fn read_byte<T: Transport + ?Sized>(&mut self, conn: &mut T) -> io::Result<u8> {
        let b = self.peek_byte(conn).await?;
        self.pos += 1;
        Ok(b)
    }

    /// Read exactly `n` bytes.
    pub async fn read_exact<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        n: usize,
    ) -> io::Result<Vec<u8>> {
        while self.buf.len() - self.pos < n {
            self.fill(conn).await?;
        }
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    /// Read up to and including `delim`; the returned bytes exclude it.
    pub async fn read_until<T: Transport + ?Sized>(
        &mut self,
        conn: &mut T,
        delim: u8,
    ) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let b = self.read_byte(conn).await?;
            if b == delim {
                return Ok(out);
            }
            out.push(b);
        }
    }

    /// Read one CR-terminated protocol line, trimmed of stray whitespace.
    pub async fn read_line<T: Transport + ?Sized>(&mut self, conn: &mut T) -> io::Result<String> {
        let raw = self.read_until(conn, b'\r').await?;
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        debug!(target: "hamlink_session::wire", "<{line}");
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn lines_and_bytes_interleave() {
        let (mut tx, mut rx) = tokio::io::duplex(256);
        tx.write_all(b"FS =\r\x01\x0bsome bytes\r\nmore\r")
            .await
            .unwrap();

        let mut rd = WireReader::new();
        assert_eq!(rd.read_line(&mut rx).await.unwrap(), "FS =");
        assert_eq!(rd.read_byte(&mut rx).await.unwrap(), 0x01);
        assert_eq!(rd.read_byte(&mut rx).await.unwrap(), 0x0B);
        assert_eq!(rd.read_exact(&mut rx, 4).await.unwrap(), b"some");
        // A line with a stray LF after the CR of the previous token.
        assert_eq!(rd.read_line(&mut rx).await.unwrap(), "bytes");
        assert_eq!(rd.read_line(&mut rx).await.unwrap(), "more");
    }

    #[tokio::test]
    async fn peek_does_not_consume() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"F").await.unwrap();
        let mut rd = WireReader::new();
        assert_eq!(rd.peek_byte(&mut rx).await.unwrap(), b'F');
        assert_eq!(rd.peek_byte(&mut rx).await.unwrap(), b'F');
        assert_eq!(rd.read_byte(&mut rx).await.unwrap(), b'F');
    }

    #[tokio::test]
    async fn eof_surfaces_as_unexpected_eof() {
        let (tx, mut rx) = tokio::io::duplex(64);
        drop(tx);
        let mut rd = WireReader::new();
        let err = rd.read_line(&mut rx).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
