//! Streaming LZHUF encoder.

use std::io::{self, Write};

use crate::constants::{F, N, P_CODE, P_LEN, R, T, THRESHOLD};
use crate::crc::Crc16;
use crate::tree::LzhufState;

/// A streaming LZHUF compressor implementing [`io::Write`].
///
/// Compressed bytes are buffered internally; nothing reaches the wrapped
/// writer until [`finish`](Writer::finish) is called, because the header
/// (CRC and uncompressed length) can only be known once the input ends.
pub struct Writer<W: Write> {
    inner: W,
    z: Box<LzhufState>,
    crc16: bool,

    /// Compressed payload, accumulated until `finish`.
    buf: Vec<u8>,
    putbuf: u32,
    putlen: u8,

    /// Lookahead fill level.
    len: usize,
    /// Encoding cursor into the window.
    r: usize,
    /// Oldest lookahead slot, `(r + F) mod N`.
    s: usize,
    /// Bytes of the current match still to be consumed.
    to_consume: usize,
    pre_filled: bool,
    file_size: i32,
}

impl<W: Write> Writer<W> {
    /// Create an encoder. With `crc16` set, the stream carries the extended
    /// FBB B2 header used by Winlink.
    pub fn new(inner: W, crc16: bool) -> Self {
        let mut z = LzhufState::new();
        z.init_tree();
        Self {
            inner,
            z,
            crc16,
            buf: Vec::new(),
            putbuf: 0,
            putlen: 0,
            len: 0,
            r: N - F,
            s: 0,
            to_consume: 0,
            pre_filled: false,
            file_size: 0,
        }
    }

    /// Create an encoder for the extended FBB B2 format used by Winlink.
    pub fn b2(inner: W) -> Self {
        Self::new(inner, true)
    }

    /// Compress any remaining buffered input, write the framed stream to the
    /// wrapped writer and return it.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.pre_filled {
            self.seed_trees();
        }
        // Drain the lookahead.
        while self.len > 0 {
            if self.to_consume == 0 {
                self.emit();
            }
            self.z.delete_node(self.s);
            self.s = (self.s + 1) & (N - 1);
            self.r = (self.r + 1) & (N - 1);
            self.len -= 1;
            if self.len > 0 {
                self.z.insert_node(self.r);
            }
            self.to_consume -= 1;
        }
        // Flush the partial output byte, if any.
        if self.putlen > 0 {
            self.buf.push((self.putbuf >> 8) as u8);
        }

        let size_bytes = self.file_size.to_le_bytes();
        if self.crc16 {
            let mut crc = Crc16::new();
            crc.write(&size_bytes);
            crc.write(&self.buf);
            self.inner.write_all(&crc.sum().to_le_bytes())?;
        }
        self.inner.write_all(&size_bytes)?;
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Register the filled lookahead in the match-finder trees. The final
    /// insert primes `match_length`/`match_position` for the first emit.
    fn seed_trees(&mut self) {
        for i in 1..=F {
            self.z.insert_node(self.r - i);
        }
        self.z.insert_node(self.r);
        self.pre_filled = true;
        self.to_consume = 0;
    }

    /// Consume one input byte in the steady state: emit a pending symbol if
    /// due, then slide the window by one position.
    fn advance(&mut self, c: u8) {
        if self.to_consume == 0 {
            self.emit();
        }
        self.z.delete_node(self.s);
        self.z.text_buf[self.s] = c;
        if self.s < F - 1 {
            // Mirror the window head so keys can be compared linearly.
            self.z.text_buf[self.s + N] = c;
        }
        self.s = (self.s + 1) & (N - 1);
        self.r = (self.r + 1) & (N - 1);
        self.z.insert_node(self.r);
        self.to_consume -= 1;
    }

    /// Emit one symbol for the string at the current cursor: either a literal
    /// or a (length, position) pair.
    fn emit(&mut self) {
        let mut match_length = self.z.match_length;
        if match_length > self.len {
            match_length = self.len;
        }
        if match_length <= THRESHOLD {
            match_length = 1;
            self.encode_char(self.z.text_buf[self.r] as usize);
        } else {
            self.encode_char(255 - THRESHOLD + match_length);
            self.encode_position(self.z.match_position);
        }
        self.to_consume = match_length;
    }

    /// Emit the Huffman code for symbol `c`, walking leaf to root, then
    /// update the tree.
    fn encode_char(&mut self, c: usize) {
        let mut code: u16 = 0;
        let mut bits: u8 = 0;
        let mut k = self.z.prnt[c + T];
        loop {
            code >>= 1;
            // An odd node index is the right (heavier) sibling.
            if k & 1 != 0 {
                code += 0x8000;
            }
            bits += 1;
            k = self.z.prnt[k];
            if k == R {
                break;
            }
        }
        self.put_code(bits, code);
        self.z.update(c);
    }

    /// Emit a 12-bit window position: upper 6 bits through the code table,
    /// lower 6 bits verbatim.
    fn encode_position(&mut self, pos: usize) {
        let upper = pos >> 6;
        self.put_code(P_LEN[upper], (P_CODE[upper] as u16) << 8);
        self.put_code(6, ((pos & 0x3F) as u16) << 10);
    }

    /// Append `bits` bits of `code` (left-aligned at bit 15) to the output.
    fn put_code(&mut self, bits: u8, code: u16) {
        self.putbuf |= (code as u32) >> self.putlen;
        self.putlen += bits;
        if self.putlen < 8 {
            return;
        }
        self.buf.push((self.putbuf >> 8) as u8);
        self.putlen -= 8;
        if self.putlen >= 8 {
            self.buf.push(self.putbuf as u8);
            self.putlen -= 8;
            self.putbuf = (code as u32) << (bits - self.putlen);
        } else {
            self.putbuf <<= 8;
        }
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        let mut n = 0;
        // Fill the lookahead before the first symbol can be chosen.
        while !self.pre_filled && n < p.len() {
            self.z.text_buf[self.r + self.len] = p[n];
            n += 1;
            self.len += 1;
            self.file_size = self.file_size.wrapping_add(1);
            if self.len == F {
                self.seed_trees();
            }
        }
        while n < p.len() {
            self.advance(p[n]);
            n += 1;
            self.file_size = self.file_size.wrapping_add(1);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Compressed data only reaches the wrapped writer on finish().
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_b2() {
        let mut w = Writer::b2(Vec::new());
        w.write_all(b"test").unwrap();
        let out = w.finish().unwrap();
        assert!(out.len() > 6);
        // Length header sits after the 2-byte CRC.
        assert_eq!(&out[2..6], &4i32.to_le_bytes());
    }

    #[test]
    fn header_layout_plain() {
        let mut w = Writer::new(Vec::new(), false);
        w.write_all(b"test").unwrap();
        let out = w.finish().unwrap();
        assert_eq!(&out[..4], &4i32.to_le_bytes());
    }

    #[test]
    fn crc_covers_length_and_payload() {
        let mut w = Writer::b2(Vec::new());
        w.write_all(b"checksum me").unwrap();
        let out = w.finish().unwrap();
        let stored = u16::from_le_bytes([out[0], out[1]]);
        let mut crc = Crc16::new();
        crc.write(&out[2..]);
        assert_eq!(stored, crc.sum());
    }

    #[test]
    fn split_writes_match_single_write() {
        let data = b"the same bytes, delivered differently, must compress identically";
        let mut w1 = Writer::b2(Vec::new());
        w1.write_all(data).unwrap();
        let whole = w1.finish().unwrap();

        let mut w2 = Writer::b2(Vec::new());
        for chunk in data.chunks(7) {
            w2.write_all(chunk).unwrap();
        }
        let split = w2.finish().unwrap();
        assert_eq!(whole, split);
    }
}
