//! Pending-message advisories.
//!
//! Newer CMS versions announce the messages they are about to propose with
//! `;PM:` lines, one per message:
//!
//! ```text
//! ;PM: LA5NTA TJKYEIMMHSRB 123 martin.h.pedersen@gmail.com subject text
//! ```

/// Advisory metadata for a message the remote is about to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// The callsign the message is addressed to.
    pub target: String,
    pub mid: String,
    /// Compressed size in bytes.
    pub size: u64,
    /// Originating address.
    pub sender: String,
    /// Subject, when the advisory carries one.
    pub subject: String,
}

impl PendingMessage {
    /// Parse a `;PM:` line. Malformed advisories yield `None` and are
    /// ignored by the session, as the field is purely informational.
    pub fn parse(line: &str) -> Option<PendingMessage> {
        let rest = line.strip_prefix(";PM:")?.trim();
        let mut fields = rest.split_ascii_whitespace();
        let target = fields.next()?.to_string();
        let mid = fields.next()?.to_string();
        let size = fields.next()?.parse().ok()?;
        let sender = fields.next()?.to_string();
        let subject = fields.collect::<Vec<_>>().join(" ");
        Some(PendingMessage {
            target,
            mid,
            size,
            sender,
            subject,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cms_v4_advisory() {
        let pm =
            PendingMessage::parse(";PM: LA5NTA TJKYEIMMHSRB 123 martin.h.pedersen@gmail.com")
                .unwrap();
        assert_eq!(pm.target, "LA5NTA");
        assert_eq!(pm.mid, "TJKYEIMMHSRB");
        assert_eq!(pm.size, 123);
        assert_eq!(pm.sender, "martin.h.pedersen@gmail.com");
        assert_eq!(pm.subject, "");
    }

    #[test]
    fn parses_subject_tail() {
        let pm = PendingMessage::parse(";PM: N0CALL ABCDEF 99 a@b.c Hello there").unwrap();
        assert_eq!(pm.subject, "Hello there");
    }

    #[test]
    fn malformed_lines_are_none() {
        assert!(PendingMessage::parse(";PM:").is_none());
        assert!(PendingMessage::parse(";PM: ONLY TWO").is_none());
        assert!(PendingMessage::parse(";PM: A B notanumber d").is_none());
        assert!(PendingMessage::parse("PM: A B 1 d").is_none());
    }
}
