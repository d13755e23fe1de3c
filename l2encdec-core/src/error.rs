//! Error types for every stage of the codec.

use thiserror::Error;

/// Failures while resolving protocol defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("unsupported protocol: {0}")]
    UnknownProtocol(i32),

    #[error("protocol {0} requires a non-empty filename")]
    MissingFilename(u16),

    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Failures while adding or stripping the header and tail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Headers are written one byte per character, so only U+0000..=U+00FF fit.
    #[error("header character {0:?} does not fit in a single byte")]
    HeaderChar(char),

    #[error("header required but protocol {0} cannot derive one")]
    NoHeader(u16),

    #[error("malformed tail hex: {0}")]
    Tail(String),

    #[error("input too short for framing: need {needed} bytes, got {found}")]
    Truncated { needed: usize, found: usize },
}

/// Failures of the length-prefixed zlib layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressionError {
    #[error("deflate failed: {0}")]
    Deflate(String),

    #[error("input of {0} bytes exceeds the 4-byte length prefix")]
    TooLarge(usize),

    #[error("compressed buffer too short: {0} bytes")]
    Truncated(usize),

    #[error("inflate failed: {0}")]
    Corrupt(String),

    #[error("decompressed size mismatch: declared {declared}, got {actual}")]
    SizeMismatch { declared: usize, actual: usize },
}

/// Failures of the Blowfish and big-integer ciphers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("invalid {0}")]
    InvalidKey(&'static str),

    #[error("block cipher key must be at most 56 bytes, got {0}")]
    KeyLength(usize),

    #[error("input length {len} is not a multiple of {block}")]
    BlockAlignment { len: usize, block: usize },

    #[error("block {0} does not fit in the output block")]
    BlockFailed(usize),

    #[error("a cipher worker panicked")]
    WorkerPanicked,
}

/// Result of checking the CRC-32 stored in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumResult {
    Success,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("compression failed: {0}")]
    CompressionFailed(#[source] CompressionError),

    #[error("encryption failed: {0}")]
    EncryptionFailed(#[source] CipherError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(#[source] CompressionError),

    #[error("decryption failed: {0}")]
    DecryptionFailed(#[source] CipherError),
}

impl From<ParamsError> for EncodeError {
    fn from(e: ParamsError) -> Self {
        EncodeError::InvalidType(e.to_string())
    }
}

impl From<FramingError> for EncodeError {
    fn from(e: FramingError) -> Self {
        EncodeError::InvalidType(e.to_string())
    }
}

impl From<ParamsError> for DecodeError {
    fn from(e: ParamsError) -> Self {
        DecodeError::InvalidType(e.to_string())
    }
}

impl From<FramingError> for DecodeError {
    fn from(e: FramingError) -> Self {
        DecodeError::InvalidType(e.to_string())
    }
}
