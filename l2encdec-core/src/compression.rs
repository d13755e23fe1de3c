//! Length-prefixed zlib layer used ahead of the big-integer cipher.
//!
//! Layout: `[uncompressed length (4 LE) | zlib stream]`.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use log::trace;

use crate::error::CompressionError;

pub const SIZE_PREFIX_LEN: usize = 4;

const DEFLATE_CHUNK_SIZE: usize = 1024 * 1024;
const INFLATE_CHUNK_SIZE: usize = 1024 * 16;

/// Compress `input` at the best level behind a 4-byte length prefix
pub fn pack(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let declared = u32::try_from(input.len()).map_err(|_| CompressionError::TooLarge(input.len()))?;

    let mut output = Vec::with_capacity(input.len() / 2 + SIZE_PREFIX_LEN);
    output.extend_from_slice(&declared.to_le_bytes());

    let mut encoder = ZlibEncoder::new(output, Compression::best());
    for chunk in input.chunks(DEFLATE_CHUNK_SIZE) {
        encoder
            .write_all(chunk)
            .map_err(|e| CompressionError::Deflate(e.to_string()))?;
    }
    let output = encoder
        .finish()
        .map_err(|e| CompressionError::Deflate(e.to_string()))?;

    trace!("packed {} bytes into {}", input.len(), output.len());
    Ok(output)
}

/// Inflate a buffer produced by [`pack`], checking the declared length
///
/// Inflation stops as soon as the output outgrows the declared length.
pub fn unpack(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if input.len() <= SIZE_PREFIX_LEN {
        return Err(CompressionError::Truncated(input.len()));
    }

    let declared = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
    let stream = &input[SIZE_PREFIX_LEN..];

    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(declared.min(stream.len().saturating_mul(8)));
    let mut chunk = vec![0u8; INFLATE_CHUNK_SIZE];

    loop {
        let in_before = inflater.total_in() as usize;
        let out_before = inflater.total_out();

        let status = inflater
            .decompress(&stream[in_before..], &mut chunk, FlushDecompress::None)
            .map_err(|e| CompressionError::Corrupt(e.to_string()))?;

        let produced = (inflater.total_out() - out_before) as usize;
        output.extend_from_slice(&chunk[..produced]);
        if output.len() > declared {
            return Err(CompressionError::SizeMismatch {
                declared,
                actual: output.len(),
            });
        }

        if status == Status::StreamEnd {
            break;
        }
        if produced == 0 && inflater.total_in() as usize == in_before {
            return Err(CompressionError::Corrupt("unexpected end of stream".into()));
        }
    }

    if output.len() != declared {
        return Err(CompressionError::SizeMismatch {
            declared,
            actual: output.len(),
        });
    }

    trace!("unpacked {} bytes into {}", input.len(), output.len());
    Ok(output)
}
