//! Date header parsing and formatting.
//!
//! The documented format is `2006/01/02 15:04` in UTC, but store-and-forward
//! relays rewrite the header in a couple of undocumented variants, and
//! messages gatewayed from email carry RFC 5322 dates.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats accepted for the `Date` header, most common first.
const DATE_LAYOUTS: [&str; 3] = [
    "%Y/%m/%d %H:%M", // winlink.org/B2F
    "%Y.%m.%d %H:%M", // RMS Relay store-and-forward rewrite
    "%Y-%m-%d %H:%M", // seen from RMS Relay-3.0.30.0 on Radio Only messages
];

/// Parse a `Date` header value. Returns `None` for unrecognized layouts.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    for layout in DATE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    // Email-style dates, including the obsolete zone names.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

/// Format a timestamp the way the protocol documents it.
pub fn format_date(t: DateTime<Utc>) -> String {
    t.format("%Y/%m/%d %H:%M").to_string()
}
