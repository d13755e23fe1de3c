//! Encoder and decoder for Lineage II client files
//!
//! # Modules
//!
//! - `framing`: wide-character header and hex tail
//! - `checksum`: CRC-32 and footer verification
//! - `xor`: constant, position-keyed and filename-keyed XOR
//! - `blowfish`: raw-block Blowfish
//! - `compression`: length-prefixed zlib used by the big-integer path
//! - `rsa`: padded big-integer cipher with parallel block processing
//! - `params`: configuration and protocol defaults
//! - `codec`: `encode`/`decode` and the auto-detecting variants

pub mod blowfish;
pub mod checksum;
pub mod codec;
pub mod compression;
pub mod error;
pub mod framing;
pub mod params;
pub mod rsa;
pub mod xor;

// Re-export commonly used items
pub use checksum::{checksum, verify_checksum};
pub use codec::{
    decode, decode_auto, detect_protocol, encode, encode_auto, protocol_from_filename,
};
pub use error::{
    ChecksumResult, CipherError, CompressionError, DecodeError, EncodeError, FramingError,
    ParamsError,
};
pub use params::{CipherType, Params, SUPPORTED_PROTOCOLS, init_params, is_supported};
