//! Round-trip and corruption-detection properties for the LZHUF codec.

use std::io::{Read, Write};

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hamlink_lzhuf::{decode, encode, Error, Reader, Writer};

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Compressible data: short alphabet with long runs.
fn texty_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let words: [&[u8]; 4] = [b"the ", b"quick ", b"brown ", b"fox "];
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        out.extend_from_slice(words[rng.gen_range(0..words.len())]);
    }
    out.truncate(len);
    out
}

#[test]
fn roundtrip_size_classes() {
    for crc16 in [true, false] {
        for (i, &size) in [0usize, 1, 2, 125, 4096, 65537].iter().enumerate() {
            for data in [
                random_bytes(size, 0xB2F0 + i as u64),
                texty_bytes(size, 0xB2F0 + i as u64),
            ] {
                let enc = encode(&data, crc16).unwrap();
                let dec = decode(&enc, crc16).unwrap();
                assert_eq!(dec, data, "size {size} crc16={crc16}");
            }
        }
    }
}

#[test]
fn streaming_roundtrip_chunked() {
    let data = texty_bytes(20_000, 42);

    let mut w = Writer::b2(Vec::new());
    for chunk in data.chunks(333) {
        w.write_all(chunk).unwrap();
    }
    let enc = w.finish().unwrap();

    let mut r = Reader::b2(&enc[..]).unwrap();
    let mut dec = Vec::new();
    let mut buf = [0u8; 129];
    loop {
        let n = r.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        dec.extend_from_slice(&buf[..n]);
    }
    assert_eq!(dec, data);
    r.close().unwrap();
}

#[test]
fn header_bitflips_detected_b2() {
    let data = texty_bytes(500, 7);
    let enc = encode(&data, true).unwrap();

    // Flip every bit of the CRC and length fields in turn.
    for byte in 0..6 {
        for bit in 0..8 {
            let mut bad = enc.clone();
            bad[byte] ^= 1 << bit;

            let mut r = match Reader::b2(&bad[..]) {
                Ok(r) => r,
                Err(_) => continue, // header unreadable counts as detected
            };
            let mut out = Vec::new();
            let _ = r.read_to_end(&mut out);
            assert!(
                matches!(r.close(), Err(Error::Checksum)),
                "flip of byte {byte} bit {bit} not detected"
            );
        }
    }
}

#[test]
fn shrunk_length_detected_plain() {
    let data = texty_bytes(300, 9);
    let mut enc = encode(&data, false).unwrap();
    // Declare one byte fewer than was encoded.
    let size = i32::from_le_bytes([enc[0], enc[1], enc[2], enc[3]]) - 1;
    enc[..4].copy_from_slice(&size.to_le_bytes());

    let mut r = Reader::new(&enc[..], false).unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert!(matches!(r.close(), Err(Error::Checksum)));
}

#[test]
fn concurrent_decoders_are_independent() {
    let a = texty_bytes(10_000, 1);
    let b = random_bytes(10_000, 2);
    let ea = encode(&a, true).unwrap();
    let eb = encode(&b, true).unwrap();

    let ha = std::thread::spawn(move || decode(&ea, true).unwrap());
    let hb = std::thread::spawn(move || decode(&eb, true).unwrap());
    assert_eq!(ha.join().unwrap(), a);
    assert_eq!(hb.join().unwrap(), b);
}

proptest! {
    #[test]
    fn roundtrip_arbitrary(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let enc = encode(&data, true).unwrap();
        prop_assert_eq!(decode(&enc, true).unwrap(), data);
    }

    #[test]
    fn roundtrip_runs(byte in any::<u8>(), len in 0usize..8192) {
        let data = vec![byte; len];
        let enc = encode(&data, true).unwrap();
        // Runs compress far below the input size once past the header.
        if len > 256 {
            prop_assert!(enc.len() < len / 2);
        }
        prop_assert_eq!(decode(&enc, true).unwrap(), data);
    }

    #[test]
    fn plain_mode_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let enc = encode(&data, false).unwrap();
        prop_assert_eq!(decode(&enc, false).unwrap(), data);
    }
}
