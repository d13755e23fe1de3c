//! Byte-wise XOR ciphers.
//!
//! All three variants compute `byte ^ key(i)` and are their own inverse, so the
//! same call encodes and decodes.

use log::trace;

/// How the key byte for each position is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy<'a> {
    /// Same key for every byte
    Constant(u8),
    /// Key derived from the absolute index, counting up from the start value
    Position(u32),
    /// Key derived once from the filename, then used as a constant
    Filename(&'a str),
}

/// Key for absolute index `index`
///
/// With nibbles `d1..d4` from least to most significant the key is
/// `((d2 ^ d4) << 4) | (d1 ^ d3)`.
pub fn key_by_index(index: u32) -> u8 {
    let d1 = index & 0xF;
    let d2 = (index >> 4) & 0xF;
    let d3 = (index >> 8) & 0xF;
    let d4 = (index >> 12) & 0xF;
    (((d2 ^ d4) << 4) | (d1 ^ d3)) as u8
}

/// Sum of the lowercased filename bytes, truncated to a byte
pub fn key_by_filename(filename: &str) -> u8 {
    filename
        .bytes()
        .map(|b| b.to_ascii_lowercase())
        .fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// Apply the cipher in place
pub fn apply_in_place(data: &mut [u8], strategy: KeyStrategy<'_>) {
    trace!("xor {} bytes with {:?}", data.len(), strategy);
    match strategy {
        KeyStrategy::Constant(key) => xor_constant(data, key),
        KeyStrategy::Filename(filename) => xor_constant(data, key_by_filename(filename)),
        KeyStrategy::Position(start) => {
            let mut index = start;
            for byte in data.iter_mut() {
                *byte ^= key_by_index(index);
                index = index.wrapping_add(1);
            }
        }
    }
}

fn xor_constant(data: &mut [u8], key: u8) {
    for byte in data.iter_mut() {
        *byte ^= key;
    }
}

/// Apply the cipher to a copy of `input`
pub fn apply(input: &[u8], strategy: KeyStrategy<'_>) -> Vec<u8> {
    let mut output = input.to_vec();
    apply_in_place(&mut output, strategy);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_by_index_zero() {
        assert_eq!(key_by_index(0), 0);
    }

    #[test]
    fn test_key_by_index_nibbles() {
        // d1=4 d2=3 d3=2 d4=1 -> ((3^1)<<4) | (4^2)
        assert_eq!(key_by_index(0x1234), 0x26);
        assert_eq!(key_by_index(0xE6), 0xE6);
        // only the low 16 bits participate
        assert_eq!(key_by_index(0x1_0000), 0);
    }

    #[test]
    fn test_key_by_filename_case_insensitive() {
        assert_eq!(key_by_filename("TEST.TXT"), key_by_filename("test.txt"));
        assert_eq!(key_by_filename("TeSt.TXT"), key_by_filename("test.txt"));
    }

    #[test]
    fn test_key_by_filename_value() {
        // 'a' + 'b' = 97 + 98
        assert_eq!(key_by_filename("AB"), 195);
        // 0x61 * 3 = 0x123 -> 0x23
        assert_eq!(key_by_filename("aaa"), 0x23);
    }

    #[test]
    fn test_constant_symmetric() {
        let input = b"hello";
        let enc = apply(input, KeyStrategy::Constant(0x5A));
        assert_ne!(enc, input);
        assert_eq!(apply(&enc, KeyStrategy::Constant(0x5A)), input);
    }

    #[test]
    fn test_position_symmetric() {
        let input = vec![1, 2, 3, 4, 5];
        let enc = apply(&input, KeyStrategy::Position(10));
        assert_eq!(enc.len(), input.len());
        assert_eq!(apply(&enc, KeyStrategy::Position(10)), input);
    }

    #[test]
    fn test_position_keys_advance() {
        let enc = apply(&[0u8; 3], KeyStrategy::Position(0xE6));
        assert_eq!(enc, vec![key_by_index(0xE6), key_by_index(0xE7), key_by_index(0xE8)]);
    }

    #[test]
    fn test_filename_strategy() {
        let input = b"Lineage II";
        assert_eq!(
            apply(input, KeyStrategy::Filename("File.TXT")),
            apply(input, KeyStrategy::Constant(key_by_filename("file.txt")))
        );
    }
}
