//! CRC-32 over framed buffers and verification of the stored footer value

use log::debug;

use crate::error::ChecksumResult;
use crate::framing::{FOOTER_CRC32_OFFSET, FOOTER_SIZE};

/// CRC-32 (IEEE) of `data`, continuing from `seed`
///
/// A seed of 0 starts a fresh checksum; passing a previous result chains it.
pub fn checksum(data: &[u8], seed: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(data);
    hasher.finalize()
}

/// Compare the CRC-32 stored in the default footer against the rest of the buffer
///
/// The checksum covers everything before the footer, header included.
pub fn verify_checksum(input: &[u8]) -> ChecksumResult {
    if input.len() < FOOTER_SIZE {
        debug!("input of {} bytes has no room for a footer", input.len());
        return ChecksumResult::Mismatch;
    }

    let body_len = input.len() - FOOTER_SIZE;
    let at = body_len + FOOTER_CRC32_OFFSET;
    let stored = u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]);
    let calc = checksum(&input[..body_len], 0);

    if stored == calc {
        ChecksumResult::Success
    } else {
        debug!("checksum mismatch: stored=0x{stored:08x} calc=0x{calc:08x}");
        ChecksumResult::Mismatch
    }
}
