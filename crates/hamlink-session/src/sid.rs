//! Station identifiers.
//!
//! Every B2F peer introduces itself with a bracketed SID of the form
//! `[program-version-capabilities$]`. The capability field is the text
//! between the last `-` and the `$`; the flag this implementation requires
//! from a peer is `B2F`.

use core::fmt;

/// Capabilities advertised in our own SID: B2F framing, hierarchical
/// routing, mail-agent extensions.
const LOCAL_CAPS: &str = "B2FHM";

/// A parsed station identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sid {
    raw: String,
    caps: String,
}

impl Sid {
    /// Parse a `[program-version-caps$]` line. Returns `None` when the line
    /// is not bracketed.
    pub fn parse(line: &str) -> Option<Sid> {
        let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
        let body = inner.strip_suffix('$').unwrap_or(inner);
        let caps = body.rsplit('-').next().unwrap_or_default().to_string();
        Some(Sid {
            raw: line.trim().to_string(),
            caps,
        })
    }

    /// Render the SID we announce for the given user agent.
    pub fn local(agent: &str, version: &str) -> String {
        format!("[{agent}-{version}-{LOCAL_CAPS}$]")
    }

    /// Whether the peer advertised `feature` (substring match on the
    /// capability field, as deployed software does it).
    pub fn supports(&self, feature: &str) -> bool {
        self.caps.contains(feature)
    }

    /// The full, unparsed identifier.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cms_sid() {
        let sid = Sid::parse("[WL2K-2.8.4.8-B2FWIHJM$]").unwrap();
        assert!(sid.supports("B2F"));
        assert!(!sid.supports("G"));
        assert!(sid.supports("H"));
        assert!(sid.supports("J"));
        assert!(sid.supports("M"));
    }

    #[test]
    fn parses_versionless_caps() {
        let sid = Sid::parse("[WL2K-4.0-B2FWIHJM$]").unwrap();
        assert!(sid.supports("B2F"));
    }

    #[test]
    fn rejects_unbracketed_lines() {
        assert!(Sid::parse("WL2K-2.8.4.8-B2FWIHJM").is_none());
        assert!(Sid::parse("Brentwood CMS >").is_none());
    }

    #[test]
    fn local_sid_is_wellformed() {
        let rendered = Sid::local("hamlink", "0.1.0");
        assert_eq!(rendered, "[hamlink-0.1.0-B2FHM$]");
        let parsed = Sid::parse(&rendered).unwrap();
        assert!(parsed.supports("B2F"));
    }

    #[test]
    fn caps_without_dollar() {
        let sid = Sid::parse("[OLD-1.0-B2F]").unwrap();
        assert!(sid.supports("B2F"));
    }
}
