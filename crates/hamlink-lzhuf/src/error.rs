//! Error type for the codec.

use core::fmt;
use std::io;

/// Errors reported by [`Reader::close`](crate::Reader::close) and the
/// convenience helpers.
#[derive(Debug)]
pub enum Error {
    /// The CRC-16 header (B2 mode) or the uncompressed-length header does not
    /// match the decoded stream.
    Checksum,
    /// An I/O error from the underlying stream. A stream that ends before the
    /// length header is satisfied surfaces as
    /// [`io::ErrorKind::UnexpectedEof`].
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Checksum => write!(f, "lzhuf: invalid checksum"),
            Error::Io(e) => write!(f, "lzhuf: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Checksum => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
