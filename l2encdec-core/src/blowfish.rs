//! Blowfish in raw block mode with little-endian halves

use ::blowfish::BlowfishLE;
use ::blowfish::cipher::generic_array::GenericArray;
use ::blowfish::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use log::trace;

use crate::error::CipherError;

pub const BLOCK_SIZE: usize = 8;

/// Longest key the Blowfish key schedule accepts
pub const MAX_KEY_LEN: usize = 56;

const MIN_KEY_LEN: usize = 4;

/// Normalize a key the way the game client hands it to Blowfish
///
/// The key is null-terminated if it is not already. The key schedule cycles
/// through the key bytes, so repeating a short key up to 4 bytes yields the
/// same schedule.
fn schedule_key(key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut key = key.to_vec();
    if key.last() != Some(&0) {
        key.push(0);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(CipherError::KeyLength(key.len()));
    }

    let cycle = key.len();
    while key.len() < MIN_KEY_LEN {
        let next = key[key.len() % cycle];
        key.push(next);
    }
    Ok(key)
}

fn cipher(key: &[u8]) -> Result<BlowfishLE, CipherError> {
    let key = schedule_key(key)?;
    BlowfishLE::new_from_slice(&key).map_err(|_| CipherError::KeyLength(key.len()))
}

/// Encrypt every complete 8-byte block, leaving a trailing partial block untouched
pub fn encrypt(input: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let bf = cipher(key)?;
    let mut output = input.to_vec();
    for block in output.chunks_exact_mut(BLOCK_SIZE) {
        bf.encrypt_block(GenericArray::from_mut_slice(block));
    }
    trace!("blowfish encrypted {} blocks", input.len() / BLOCK_SIZE);
    Ok(output)
}

/// Decrypt every complete 8-byte block, leaving a trailing partial block untouched
pub fn decrypt(input: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let bf = cipher(key)?;
    let mut output = input.to_vec();
    for block in output.chunks_exact_mut(BLOCK_SIZE) {
        bf.decrypt_block(GenericArray::from_mut_slice(block));
    }
    trace!("blowfish decrypted {} blocks", input.len() / BLOCK_SIZE);
    Ok(output)
}
