//! Streaming LZHUF compression as used by the binary FBB forwarding
//! protocols B, B1 and B2.
//!
//! LZHUF combines a 4 KiB sliding-window LZSS match finder with an adaptive
//! Huffman entropy coder over a 314-symbol alphabet. A stream is framed by a
//! small header: an optional CRC-16 of the compressed data (the "B2" variant
//! used by Winlink), followed by the little-endian 32-bit uncompressed length,
//! followed by the bit-packed payload.
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  CRC-16 (LE, 2 bytes, B2 only)                                |
//! +---------------------------------------------------------------+
//! |  length (LE, signed 32-bit uncompressed byte count)           |
//! +---------------------------------------------------------------+
//! |  bit-packed LZHUF payload (MSB-first)                         |
//! +---------------------------------------------------------------+
//! ```
//!
//! [`Writer`] compresses, [`Reader`] decompresses. Both are purely in-memory
//! and perform no I/O beyond the streams handed to them. The adaptive Huffman
//! tree, including its rebuild-on-overflow behavior, must evolve identically
//! on both ends of a connection; any deviation desynchronizes the stream.
//!
//! A single `Reader` or `Writer` is not safe for concurrent use, but
//! independent instances may run in parallel.

mod bitio;
mod constants;
mod crc;
mod error;
mod reader;
mod tree;
mod writer;

pub use crc::{Crc16, CrcWriter};
pub use error::Error;
pub use reader::Reader;
pub use writer::Writer;

/// Compress `data` into a self-delimiting LZHUF stream.
///
/// Convenience wrapper around [`Writer`] for callers that already hold the
/// whole input in memory.
pub fn encode(data: &[u8], crc16: bool) -> std::io::Result<Vec<u8>> {
    let mut w = Writer::new(Vec::new(), crc16);
    std::io::Write::write_all(&mut w, data)?;
    w.finish()
}

/// Decompress a complete LZHUF stream, verifying its checksum and length.
pub fn decode(data: &[u8], crc16: bool) -> Result<Vec<u8>, Error> {
    let mut r = Reader::new(data, crc16).map_err(Error::Io)?;
    let mut out = Vec::new();
    std::io::Read::read_to_end(&mut r, &mut out).map_err(Error::Io)?;
    r.close()?;
    Ok(out)
}
