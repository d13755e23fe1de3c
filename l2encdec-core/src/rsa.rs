//! Big-integer cipher over fixed 128-byte blocks.
//!
//! Plaintext is split into 124-byte chunks, each stored right-aligned in a
//! zeroed 128-byte block with its length at byte 3. Every block is then raised
//! to the exponent modulo the modulus as a big-endian integer. Blocks are
//! independent and processed by a small pool of scoped threads that claim
//! block indices from a shared atomic counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::CipherError;

pub const BLOCK_SIZE: usize = 128;

/// Payload bytes per block; the first 4 bytes hold the length tag
pub const BLOCK_BODY_SIZE: usize = 124;

const SIZE_TAG_OFFSET: usize = 3;

/// Upper bound on worker threads per call
pub const MAX_WORKERS: usize = 8;

const FALLBACK_WORKERS: usize = 4;

const NO_FAILURE: usize = usize::MAX;

#[inline]
fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Split `input` into length-tagged 128-byte blocks
pub fn add_padding(input: &[u8]) -> Vec<u8> {
    let blocks = input.len().div_ceil(BLOCK_BODY_SIZE);
    let mut output = vec![0u8; blocks * BLOCK_SIZE];

    for (chunk, block) in input
        .chunks(BLOCK_BODY_SIZE)
        .zip(output.chunks_exact_mut(BLOCK_SIZE))
    {
        block[SIZE_TAG_OFFSET] = chunk.len() as u8;
        let start = BLOCK_SIZE - align4(chunk.len());
        block[start..start + chunk.len()].copy_from_slice(chunk);
    }

    output
}

/// Collect the payload of each block written by [`add_padding`]
///
/// Stops at the first block whose tag points outside the buffer and returns
/// what was collected so far.
pub fn remove_padding(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() / BLOCK_SIZE * BLOCK_BODY_SIZE);

    for (index, block) in input.chunks(BLOCK_SIZE).enumerate() {
        let Some(&tag) = block.get(SIZE_TAG_OFFSET) else {
            warn!("block {index} too short for a size tag, stopping");
            break;
        };

        let size = usize::from(tag).min(BLOCK_BODY_SIZE);
        let start = BLOCK_SIZE - align4(size);
        if start + size > block.len() {
            warn!("block {index} payload exceeds the buffer, stopping");
            break;
        }

        output.extend_from_slice(&block[start..start + size]);
    }

    output
}

/// Modulus and exponent for one direction of the cipher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl RsaKey {
    pub fn new(modulus: BigUint, exponent: BigUint) -> Result<Self, CipherError> {
        if modulus.is_zero() {
            return Err(CipherError::InvalidKey("modulus"));
        }
        Ok(Self { modulus, exponent })
    }

    /// Parse hex-encoded operands; `role` names the exponent in errors
    pub fn from_hex(
        modulus_hex: &str,
        exponent_hex: &str,
        role: &'static str,
    ) -> Result<Self, CipherError> {
        let modulus = parse_hex(modulus_hex).ok_or(CipherError::InvalidKey("modulus"))?;
        let exponent = parse_hex(exponent_hex).ok_or(CipherError::InvalidKey(role))?;
        Self::new(modulus, exponent)
    }

    /// `block ^ exponent mod modulus`, right-aligned in a 128-byte block
    ///
    /// Returns `None` when the result needs more than 128 bytes.
    fn apply_block(&self, block: &[u8]) -> Option<[u8; BLOCK_SIZE]> {
        let value = BigUint::from_bytes_be(block);
        let result = value.modpow(&self.exponent, &self.modulus).to_bytes_be();
        if result.len() > BLOCK_SIZE {
            return None;
        }

        let mut out = [0u8; BLOCK_SIZE];
        out[BLOCK_SIZE - result.len()..].copy_from_slice(&result);
        Some(out)
    }
}

fn parse_hex(hex: &str) -> Option<BigUint> {
    BigUint::parse_bytes(hex.trim().as_bytes(), 16)
}

/// Worker count used when the caller does not pick one
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
        .min(MAX_WORKERS)
}

/// Run the modular exponentiation over every block of `blocks`
fn transform(blocks: &[u8], key: &RsaKey, workers: usize) -> Result<Vec<u8>, CipherError> {
    if blocks.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::BlockAlignment {
            len: blocks.len(),
            block: BLOCK_SIZE,
        });
    }

    let total = blocks.len() / BLOCK_SIZE;
    if total == 0 {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, total);
    debug!("transforming {total} blocks on {workers} workers");

    let next_block = AtomicUsize::new(0);
    let lowest_failure = AtomicUsize::new(NO_FAILURE);
    let (next, failed) = (&next_block, &lowest_failure);

    let mut output = vec![0u8; blocks.len()];
    let mut panicked = false;

    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let key = key.clone();
                s.spawn(move || {
                    let mut done = Vec::new();
                    while failed.load(Ordering::Acquire) == NO_FAILURE {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= total {
                            break;
                        }

                        let offset = index * BLOCK_SIZE;
                        match key.apply_block(&blocks[offset..offset + BLOCK_SIZE]) {
                            Some(block) => done.push((index, block)),
                            None => {
                                // every lower index is already claimed, so the minimum is exact
                                failed.fetch_min(index, Ordering::AcqRel);
                                break;
                            }
                        }
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, block) in done {
                        let offset = index * BLOCK_SIZE;
                        output[offset..offset + BLOCK_SIZE].copy_from_slice(&block);
                    }
                }
                Err(_) => panicked = true,
            }
        }
    });

    if panicked {
        return Err(CipherError::WorkerPanicked);
    }

    match lowest_failure.into_inner() {
        NO_FAILURE => Ok(output),
        index => Err(CipherError::BlockFailed(index)),
    }
}

/// Pad and encrypt `input` with an explicit worker count
pub fn encrypt_with_workers(
    input: &[u8],
    key: &RsaKey,
    workers: usize,
) -> Result<Vec<u8>, CipherError> {
    let padded = add_padding(input);
    transform(&padded, key, workers)
}

/// Decrypt and unpad `input` with an explicit worker count
pub fn decrypt_with_workers(
    input: &[u8],
    key: &RsaKey,
    workers: usize,
) -> Result<Vec<u8>, CipherError> {
    let padded = transform(input, key, workers)?;
    Ok(remove_padding(&padded))
}

/// Pad and encrypt `input` using hex-encoded modulus and public exponent
pub fn encrypt(input: &[u8], modulus_hex: &str, public_exp_hex: &str) -> Result<Vec<u8>, CipherError> {
    let key = RsaKey::from_hex(modulus_hex, public_exp_hex, "public exponent")?;
    encrypt_with_workers(input, &key, default_workers())
}

/// Decrypt and unpad `input` using hex-encoded modulus and private exponent
pub fn decrypt(input: &[u8], modulus_hex: &str, private_exp_hex: &str) -> Result<Vec<u8>, CipherError> {
    if input.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::BlockAlignment {
            len: input.len(),
            block: BLOCK_SIZE,
        });
    }
    let key = RsaKey::from_hex(modulus_hex, private_exp_hex, "private exponent")?;
    decrypt_with_workers(input, &key, default_workers())
}
