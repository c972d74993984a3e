//! Message ID generation.

use rand::Rng;

/// The protocol caps MIDs at 12 ASCII characters.
pub const MID_MAX_LEN: usize = 12;

const MID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random 12-character message ID.
///
/// MIDs only need to be unique within the originating station's recent
/// traffic; 36^12 random identifiers are comfortably past that bar.
pub fn generate_mid() -> String {
    let mut rng = rand::thread_rng();
    (0..MID_MAX_LEN)
        .map(|_| MID_CHARSET[rng.gen_range(0..MID_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_and_charset() {
        for _ in 0..64 {
            let mid = generate_mid();
            assert_eq!(mid.len(), MID_MAX_LEN);
            assert!(mid.bytes().all(|b| MID_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn collisions_are_rare() {
        let mids: std::collections::HashSet<String> =
            (0..256).map(|_| generate_mid()).collect();
        assert_eq!(mids.len(), 256);
    }
}
