//! RFC 2047 encoded-word handling for header values.
//!
//! The protocol requires ASCII-only header values, but deployed gateways put
//! raw subject text into titles and file names. Encoding always produces
//! Q-encoded UTF-8; decoding accepts Q and B encoded words in the common
//! charsets, raw UTF-8, and bare Latin-1 bytes as a last resort (seen in
//! `File:` headers from older Windows clients).

/// Encode a header value as printable ASCII.
///
/// Values that are already printable ASCII (and cannot be mistaken for an
/// encoded word) pass through unchanged.
pub fn encode_header(value: &str) -> String {
    let needs_encoding = value.bytes().any(|b| !(0x20..0x7F).contains(&b)) || value.contains("=?");
    if !needs_encoding {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() * 3 + 12);
    out.push_str("=?utf-8?q?");
    for b in value.bytes() {
        match b {
            b' ' => out.push('_'),
            b'=' | b'?' | b'_' => push_hex(&mut out, b),
            0x21..=0x7E => out.push(b as char),
            _ => push_hex(&mut out, b),
        }
    }
    out.push_str("?=");
    out
}

fn push_hex(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('=');
    out.push(HEX[(b >> 4) as usize] as char);
    out.push(HEX[(b & 0xF) as usize] as char);
}

/// Decode a header value, expanding any encoded words.
///
/// Unknown charsets and malformed encoded words are left as-is rather than
/// rejected; gateways in the field produce both.
pub fn decode_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut last_was_encoded = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        match parse_encoded_word(candidate) {
            Some((decoded, consumed)) => {
                // Whitespace between two adjacent encoded words is elided.
                if !(last_was_encoded && before.chars().all(char::is_whitespace)) {
                    out.push_str(before);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                last_was_encoded = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                last_was_encoded = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode a file name from any of the encodings seen on the air: encoded
/// words, raw UTF-8, or Latin-1 bytes.
pub fn decode_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => decode_header(s),
        Err(_) => latin1_to_string(raw),
    }
}

pub(crate) fn latin1_to_string(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

/// Parse one `=?charset?enc?text?=` token at the start of `s`.
/// Returns the decoded text and the number of bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let charset = &inner[..charset_end];
    let enc_rest = &inner[charset_end + 1..];
    let enc = enc_rest.chars().next()?;
    let payload_rest = enc_rest.strip_prefix(|_: char| true)?.strip_prefix('?')?;
    let payload_end = payload_rest.find("?=")?;
    let payload = &payload_rest[..payload_end];

    let bytes = match enc.to_ascii_lowercase() {
        'q' => decode_q(payload)?,
        'b' => decode_base64(payload)?,
        _ => return None,
    };

    let text = match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "us-ascii" => String::from_utf8(bytes).ok()?,
        "iso-8859-1" | "latin1" | "windows-1252" => latin1_to_string(&bytes),
        _ => String::from_utf8_lossy(&bytes).into_owned(),
    };

    let consumed = 2 + charset_end + 1 + 1 + 1 + payload_end + 2;
    Some((text, consumed))
}

fn decode_q(payload: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = hex_val(bytes.next()?)?;
                let lo = hex_val(bytes.next()?)?;
                out.push(hi << 4 | lo);
            }
            _ => out.push(b),
        }
    }
    Some(out)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    fn val(b: u8) -> Option<u32> {
        match b {
            b'A'..=b'Z' => Some((b - b'A') as u32),
            b'a'..=b'z' => Some((b - b'a' + 26) as u32),
            b'0'..=b'9' => Some((b - b'0' + 52) as u32),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let payload = payload.trim_end_matches('=');
    let mut out = Vec::with_capacity(payload.len() * 3 / 4 + 2);
    for chunk in payload.as_bytes().chunks(4) {
        let mut acc = 0u32;
        for &b in chunk {
            acc = acc << 6 | val(b)?;
        }
        match chunk.len() {
            4 => out.extend_from_slice(&[(acc >> 16) as u8, (acc >> 8) as u8, acc as u8]),
            3 => {
                acc <<= 6;
                out.extend_from_slice(&[(acc >> 16) as u8, (acc >> 8) as u8]);
            }
            2 => {
                acc <<= 12;
                out.push((acc >> 16) as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}
