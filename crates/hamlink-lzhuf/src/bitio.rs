//! MSB-first bit reading with latched errors.

use std::io::{self, Read};

/// Reads 1–8 bit integers, most significant bit first, from a byte stream.
///
/// Bytes are fetched lazily: a refill happens only when the buffered bits
/// cannot satisfy a request, so a well-formed stream is never read past its
/// final payload byte. The first error (including end of input, reported as
/// [`io::ErrorKind::UnexpectedEof`]) is latched and returned from every
/// subsequent call.
#[derive(Debug)]
pub(crate) struct BitReader<R> {
    inner: R,
    buf: u16,
    len: u8,
    err: Option<io::ErrorKind>,
}

impl<R: Read> BitReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            buf: 0,
            len: 0,
            err: None,
        }
    }

    /// The wrapped reader.
    pub(crate) fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Read `n` bits (1 ≤ n ≤ 8) as an unsigned integer.
    pub(crate) fn read_bits(&mut self, n: u8) -> io::Result<u16> {
        debug_assert!((1..=8).contains(&n));
        if let Some(kind) = self.err {
            return Err(kind.into());
        }
        while self.len < n {
            let mut byte = [0u8; 1];
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.err = Some(io::ErrorKind::UnexpectedEof);
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                Ok(_) => {
                    self.buf = (self.buf << 8) | byte[0] as u16;
                    self.len += 8;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.err = Some(e.kind());
                    return Err(e);
                }
            }
        }
        self.len -= n;
        Ok((self.buf >> self.len) & ((1u16 << n) - 1))
    }

    pub(crate) fn read_bit(&mut self) -> io::Result<u16> {
        self.read_bits(1)
    }

    pub(crate) fn read_byte(&mut self) -> io::Result<u16> {
        self.read_bits(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_bits() {
        let mut r = BitReader::new(&[0b1010_0000u8][..]);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bit().unwrap(), 0);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bit().unwrap(), 0);
    }

    #[test]
    fn byte_across_boundary() {
        let mut r = BitReader::new(&[0b1111_0000u8, 0b1010_1010][..]);
        assert_eq!(r.read_bits(4).unwrap(), 0b1111);
        // Next 8 bits straddle the byte boundary.
        assert_eq!(r.read_byte().unwrap(), 0b0000_1010);
        assert_eq!(r.read_bits(4).unwrap(), 0b1010);
    }

    #[test]
    fn eof_is_latched() {
        let mut r = BitReader::new(&[0xFFu8][..]);
        assert_eq!(r.read_byte().unwrap(), 0xFF);
        let e = r.read_bit().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        // Sticky on the next call too.
        let e = r.read_byte().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn buffered_bits_served_before_eof() {
        // 4 bits consumed, 4 remain buffered; those must be served even
        // though the source is exhausted.
        let mut r = BitReader::new(&[0b1100_1010u8][..]);
        assert_eq!(r.read_bits(4).unwrap(), 0b1100);
        assert_eq!(r.read_bits(4).unwrap(), 0b1010);
        assert!(r.read_bit().is_err());
    }
}
