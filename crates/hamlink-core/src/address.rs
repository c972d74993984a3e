//! Callsign and SMTP address handling.

use core::fmt;

/// An address in the forwarding network: a bare callsign for radio peers, or
/// a protocol-qualified address (`SMTP:user@host`) for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    /// Empty for callsigns reachable over the Winlink system.
    pub proto: String,
    pub addr: String,
}

impl Address {
    /// Parse an address the way gateways write them.
    ///
    /// Addresses in the `winlink.org` domain collapse to the bare upper-case
    /// callsign; other `user@host` addresses are qualified as SMTP; anything
    /// else is treated as a callsign and upper-cased.
    pub fn from_string(s: &str) -> Address {
        let (proto, rest) = match s.split_once(':') {
            Some((p, r)) if !p.contains('@') => (p.to_uppercase(), r),
            _ => (String::new(), s),
        };

        match rest.split_once('@') {
            Some((local, domain)) if domain.eq_ignore_ascii_case("winlink.org") => Address {
                proto: String::new(),
                addr: local.to_uppercase(),
            },
            Some(_) => Address {
                proto: if proto.is_empty() {
                    "SMTP".to_string()
                } else {
                    proto
                },
                addr: rest.to_string(),
            },
            None => Address {
                proto,
                addr: rest.to_uppercase(),
            },
        }
    }

    /// True when the address is a bare callsign (no protocol qualifier).
    pub fn is_callsign(&self) -> bool {
        self.proto.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.proto.is_empty() {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}:{}", self.proto, self.addr)
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::from_string(s)
    }
}

/// Parse a `;FW: CALL1 CALL2 …` forwarding line into its addresses.
pub fn parse_fw(line: &str) -> Option<Vec<Address>> {
    let rest = line.strip_prefix(";FW:")?;
    Some(
        rest.split_ascii_whitespace()
            .map(Address::from_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winlink_addresses_collapse_to_callsign() {
        for s in [
            "LA5NTA",
            "la5nta",
            "LA5NTA@winlink.org",
            "LA5NTA@WINLINK.org",
            "la5nta@WINLINK.org",
        ] {
            assert_eq!(
                Address::from_string(s),
                Address {
                    proto: String::new(),
                    addr: "LA5NTA".into()
                },
                "input {s:?}"
            );
        }
    }

    #[test]
    fn foreign_addresses_become_smtp() {
        assert_eq!(
            Address::from_string("foo@bar.baz"),
            Address {
                proto: "SMTP".into(),
                addr: "foo@bar.baz".into()
            }
        );
    }

    #[test]
    fn qualified_addresses_keep_proto() {
        let a = Address::from_string("SMTP:foo@bar.baz");
        assert_eq!(a.proto, "SMTP");
        assert_eq!(a.addr, "foo@bar.baz");
    }

    #[test]
    fn display_roundtrip() {
        for s in ["LA5NTA", "SMTP:foo@bar.baz"] {
            assert_eq!(Address::from_string(s).to_string(), s);
        }
    }

    #[test]
    fn fw_lines() {
        assert_eq!(
            parse_fw(";FW: LA5NTA"),
            Some(vec![Address::from_string("LA5NTA")])
        );
        assert_eq!(
            parse_fw(";FW: LE1OF LA5NTA"),
            Some(vec![
                Address::from_string("LE1OF"),
                Address::from_string("LA5NTA")
            ])
        );
        assert_eq!(
            parse_fw(";FW: la4tta"),
            Some(vec![Address {
                proto: String::new(),
                addr: "LA4TTA".into()
            }])
        );
        assert_eq!(parse_fw("FW: LA5NTA"), None);
    }
}
