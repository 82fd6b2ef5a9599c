//! Content transform applied by `clean` and `smudge`.
//!
//! Both directions use rot13, so a clean followed by a smudge restores the
//! original bytes.

/// Rotate ASCII letters by 13 positions; every other byte is left alone.
pub fn rot13(input: &[u8]) -> Vec<u8> {
    input.iter().map(|&b| rot13_byte(b)).collect()
}

fn rot13_byte(b: u8) -> u8 {
    match b {
        b'a'..=b'z' => b'a' + (b - b'a' + 13) % 26,
        b'A'..=b'Z' => b'A' + (b - b'A' + 13) % 26,
        _ => b,
    }
}
