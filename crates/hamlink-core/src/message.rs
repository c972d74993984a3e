//! The B2F message format.
//!
//! A message is an RFC-5322-like header block with radio-specific fields,
//! followed by a blank line, the body, and the bytes of each attachment:
//!
//! ```text
//! Mid: ABCDEFGHIJKL
//! Date: 2016/12/30 01:00
//! Type: Private
//! From: LA5NTA
//! To: N0CALL
//! Subject: Hello
//! Mbo: LA5NTA
//! Body: 5
//! File: 3 foo.txt
//!
//! hello
//! bar
//! ```
//!
//! Header lines are CRLF-terminated. `Body:` declares the body length in
//! bytes; each `File:` header declares an attachment's length and name, and
//! the attachment bytes follow the body, each preceded by a CRLF separator.

use std::io::{self, Read, Write};

use chrono::Utc;

use crate::address::Address;
use crate::date::format_date;
use crate::error::MessageError;
use crate::mid::{generate_mid, MID_MAX_LEN};
use crate::wordenc::{decode_header, encode_header, latin1_to_string};

/// An ordered set of header lines. Keys are matched case-insensitively but
/// written as first set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, String)>,
}

impl Header {
    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Replace all values for `key` with a single one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.entries.push((key.to_string(), value.into()));
    }

    /// Append a value for `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.entries.push((key.to_string(), value.into()));
    }

    /// Replace the `idx`-th value of `key`, if present.
    pub fn set_nth(&mut self, key: &str, idx: usize, value: impl Into<String>) {
        if let Some((_, v)) = self
            .entries
            .iter_mut()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .nth(idx)
        {
            *v = value.into();
        }
    }

    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        for (k, v) in &self.entries {
            write!(w, "{k}: {v}\r\n")?;
        }
        Ok(())
    }
}

/// Message type carried in the `Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Private,
    Service,
    Inquiry,
    PositionReport,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Private => "Private",
            MessageType::Service => "Service",
            MessageType::Inquiry => "Inquiry",
            MessageType::PositionReport => "Position Report",
        }
    }
}

/// A named attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    data: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A parsed (or under-construction) B2F message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    header: Header,
    body: Vec<u8>,
    files: Vec<File>,
}

impl Message {
    /// Create a message with the standard originator headers filled in.
    pub fn new(msg_type: MessageType, mycall: &str) -> Self {
        let mut header = Header::default();
        let from = Address::from_string(mycall);
        header.set("Mid", generate_mid());
        header.set("Date", format_date(Utc::now()));
        header.set("Type", msg_type.as_str());
        header.set("From", from.to_string());
        header.set("Mbo", from.addr.clone());
        Self {
            header,
            body: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn mid(&self) -> &str {
        self.header.get("Mid").unwrap_or_default()
    }

    /// The decoded subject.
    pub fn subject(&self) -> String {
        decode_header(self.header.get("Subject").unwrap_or_default())
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.header.set("Subject", encode_header(subject));
    }

    pub fn msg_type(&self) -> &str {
        self.header.get("Type").unwrap_or_default()
    }

    pub fn from_addr(&self) -> Option<Address> {
        self.header.get("From").map(Address::from_string)
    }

    pub fn add_to(&mut self, addr: impl Into<Address>) {
        self.header.add("To", addr.into().to_string());
    }

    pub fn add_cc(&mut self, addr: impl Into<Address>) {
        self.header.add("Cc", addr.into().to_string());
    }

    pub fn to(&self) -> Vec<Address> {
        self.header
            .get_all("To")
            .into_iter()
            .map(Address::from_string)
            .collect()
    }

    pub fn cc(&self) -> Vec<Address> {
        self.header
            .get_all("Cc")
            .into_iter()
            .map(Address::from_string)
            .collect()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
        self.header.set("Body", self.body.len().to_string());
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Attach a file. The header value carries the name word-encoded so the
    /// header block stays ASCII.
    pub fn add_file(&mut self, file: File) {
        self.header
            .add("File", format!("{} {}", file.size(), encode_header(file.name())));
        self.files.push(file);
    }

    /// Check the invariants a message must satisfy before it can be proposed.
    pub fn validate(&self) -> Result<(), MessageError> {
        match self.header.get("Mid") {
            None => return Err(MessageError::MissingMid),
            Some(mid)
                if mid.is_empty() || mid.len() > MID_MAX_LEN || !mid.is_ascii() =>
            {
                return Err(MessageError::InvalidMid(mid.to_string()))
            }
            Some(_) => {}
        }
        if self.header.get("To").is_none() && self.header.get("Cc").is_none() {
            return Err(MessageError::NoRecipients);
        }
        Ok(())
    }

    /// Serialize into the wire form.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        self.header.write_to(w)?;
        w.write_all(b"\r\n")?;
        w.write_all(&self.body)?;
        for file in &self.files {
            w.write_all(b"\r\n")?;
            w.write_all(&file.data)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.body.len());
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }

    /// Parse a complete message from its wire form.
    ///
    /// Header lines that are not valid UTF-8 are interpreted as Latin-1,
    /// which is what old Windows clients put on the air.
    pub fn parse(data: &[u8]) -> Result<Self, MessageError> {
        let mut pos = 0;
        let mut header = Header::default();

        loop {
            let line_end = find_line_end(&data[pos..]).ok_or_else(|| {
                MessageError::HeaderSyntax(String::from_utf8_lossy(&data[pos..]).into_owned())
            })?;
            let (line, skip) = line_end;
            let raw = &data[pos..pos + line];
            pos += line + skip;
            if raw.is_empty() {
                break; // end of header block
            }
            let text = match std::str::from_utf8(raw) {
                Ok(s) => s.to_string(),
                Err(_) => latin1_to_string(raw),
            };
            let (key, value) = text
                .split_once(':')
                .ok_or_else(|| MessageError::HeaderSyntax(text.clone()))?;
            header.add(key.trim(), value.trim_start().trim_end_matches(&['\r', '\n'][..]));
        }

        let body_len = match header.get("Body") {
            None => 0,
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| MessageError::InvalidBodyHeader)?,
        };
        let body = take(data, &mut pos, body_len)?;

        let mut files = Vec::new();
        for value in header.get_all("File") {
            let (size, name) = value
                .split_once(' ')
                .ok_or_else(|| MessageError::InvalidFileHeader(value.to_string()))?;
            let size: usize = size
                .trim()
                .parse()
                .map_err(|_| MessageError::InvalidFileHeader(value.to_string()))?;
            let name = decode_header(name);

            skip_separator(data, &mut pos);
            let data_bytes = take(data, &mut pos, size)?;
            files.push(File::new(name, data_bytes));
        }

        Ok(Self {
            header,
            body,
            files,
        })
    }

    /// Read a complete message from a reader.
    pub fn read_from(mut r: impl Read) -> Result<Self, MessageError> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)
            .map_err(|e| MessageError::HeaderSyntax(e.to_string()))?;
        Self::parse(&buf)
    }
}

fn find_line_end(data: &[u8]) -> Option<(usize, usize)> {
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            if i > 0 && data[i - 1] == b'\r' {
                return Some((i - 1, 2));
            }
            return Some((i, 1));
        }
    }
    None
}

fn take(data: &[u8], pos: &mut usize, len: usize) -> Result<Vec<u8>, MessageError> {
    let end = pos.checked_add(len).filter(|&end| end <= data.len());
    let Some(end) = end else {
        return Err(MessageError::Truncated {
            expected: len,
            actual: data.len().saturating_sub(*pos),
        });
    };
    let out = data[*pos..end].to_vec();
    *pos = end;
    Ok(out)
}

fn skip_separator(data: &[u8], pos: &mut usize) {
    if data[*pos..].starts_with(b"\r\n") {
        *pos += 2;
    } else if data[*pos..].starts_with(b"\n") {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_graphic_ascii(s: &str) -> bool {
        s.bytes().all(|b| (0x20..0x7F).contains(&b))
    }

    #[test]
    fn new_message_has_standard_headers() {
        let msg = Message::new(MessageType::Private, "LA5NTA");
        assert_eq!(msg.mid().len(), 12);
        assert_eq!(msg.msg_type(), "Private");
        assert_eq!(msg.header().get("From"), Some("LA5NTA"));
        assert_eq!(msg.header().get("Mbo"), Some("LA5NTA"));
        assert!(msg.header().get("Date").is_some());
    }

    #[test]
    fn write_parse_roundtrip() {
        let mut msg = Message::new(MessageType::Private, "LA5NTA");
        msg.add_to("N0CALL");
        msg.set_subject("Test message");
        msg.set_body("A fairly short body.\r\nTwo lines, even.");
        msg.add_file(File::new("foo.txt", b"contents".to_vec()));

        let parsed = Message::parse(&msg.to_bytes()).unwrap();
        assert_eq!(parsed.mid(), msg.mid());
        assert_eq!(parsed.subject(), "Test message");
        assert_eq!(parsed.body(), msg.body());
        assert_eq!(parsed.files().len(), 1);
        assert_eq!(parsed.files()[0].name(), "foo.txt");
        assert_eq!(parsed.files()[0].data(), b"contents");
    }

    #[test]
    fn non_ascii_file_header_is_encoded() {
        let mut msg = Message::new(MessageType::Private, "N0CALL");
        msg.add_file(File::new("æøå.txt", Vec::new()));
        let value = msg.header().get("File").unwrap();
        assert!(is_graphic_ascii(value), "File header not ASCII: {value:?}");
    }

    #[test]
    fn file_name_decodes_from_all_three_encodings() {
        let mut msg = Message::new(MessageType::Private, "N0CALL");
        msg.add_to("N0CALL");
        msg.add_file(File::new("æøå.txt", Vec::new()));

        let word_encoded = msg.header().get("File").unwrap().to_string();
        let samples: [Vec<u8>; 3] = [
            word_encoded.into_bytes(),      // encoded word (round trip)
            "0 æøå.txt".as_bytes().to_vec(), // raw UTF-8
            b"0 \xE6\xF8\xE5.txt".to_vec(),  // Latin-1
        ];

        for (i, sample) in samples.iter().enumerate() {
            let mut raw = Vec::new();
            raw.extend_from_slice(b"Mid: TESTMID\r\nBody: 0\r\nFile: ");
            raw.extend_from_slice(sample);
            raw.extend_from_slice(b"\r\n\r\n\r\n");
            let parsed = Message::parse(&raw).unwrap();
            assert_eq!(parsed.files()[0].name(), "æøå.txt", "sample {i}");
        }
    }

    #[test]
    fn empty_attachment_roundtrip() {
        let mut msg = Message::new(MessageType::Private, "N0CALL");
        msg.add_file(File::new("foo.txt", Vec::new()));
        let bytes = msg.to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("File: 0 foo.txt"));

        let parsed = Message::parse(&bytes).unwrap();
        assert_eq!(parsed.files().len(), 1);
        assert_eq!(parsed.files()[0].size(), 0);
        assert_eq!(parsed.files()[0].name(), "foo.txt");
        assert!(parsed.body().is_empty());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let raw = b"Mid: TESTMID\r\nBody: 100\r\n\r\nshort";
        assert!(matches!(
            Message::parse(raw),
            Err(MessageError::Truncated { .. })
        ));
    }

    #[test]
    fn header_without_colon_is_an_error() {
        let raw = b"Mid TESTMID\r\n\r\n";
        assert!(matches!(
            Message::parse(raw),
            Err(MessageError::HeaderSyntax(_))
        ));
    }

    #[test]
    fn validate_requires_mid_and_recipient() {
        let mut msg = Message::default();
        assert!(matches!(msg.validate(), Err(MessageError::MissingMid)));

        msg.header_mut().set("Mid", "ABCDEFGHIJKL");
        assert!(matches!(msg.validate(), Err(MessageError::NoRecipients)));

        msg.add_to("N0CALL");
        assert!(msg.validate().is_ok());

        msg.header_mut().set("Mid", "THIRTEEN_CHAR");
        assert!(matches!(msg.validate(), Err(MessageError::InvalidMid(_))));
    }

    #[test]
    fn subject_is_word_decoded() {
        let raw = b"Mid: TESTMID\r\nSubject: =?utf-8?q?=C3=A6?=\r\nBody: 0\r\n\r\n";
        let msg = Message::parse(raw).unwrap();
        assert_eq!(msg.subject(), "æ");
    }

    #[test]
    fn multiple_recipients_preserved() {
        let mut msg = Message::new(MessageType::Private, "LA5NTA");
        msg.add_to("N0CALL");
        msg.add_to("foo@bar.baz");
        msg.add_cc("LE1OF");
        let parsed = Message::parse(&msg.to_bytes()).unwrap();
        assert_eq!(parsed.to().len(), 2);
        assert_eq!(parsed.to()[1].proto, "SMTP");
        assert_eq!(parsed.cc(), vec![Address::from_string("LE1OF")]);
    }
}
