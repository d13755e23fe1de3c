//! Encoding and decoding of framed files: header, cipher, tail

use log::{debug, trace, warn};

use crate::blowfish;
use crate::checksum::checksum;
use crate::compression;
use crate::error::{DecodeError, EncodeError};
use crate::framing::{self, FOOTER_CRC32_OFFSET, FOOTER_SIZE};
use crate::params::{CipherType, Params, init_params, is_supported};
use crate::rsa;
use crate::xor::{self, KeyStrategy};

/// Encode a plaintext payload into a framed file
pub fn encode(input: &[u8], p: &Params) -> Result<Vec<u8>, EncodeError> {
    p.validate_encode()?;

    let mut enc = match p.cipher {
        CipherType::None => input.to_vec(),
        CipherType::Xor => xor::apply(input, KeyStrategy::Constant(p.xor_key)),
        CipherType::XorPosition => xor::apply(input, KeyStrategy::Position(p.xor_start_position)),
        CipherType::XorFilename => xor::apply(input, KeyStrategy::Filename(&p.filename)),
        CipherType::Blowfish => {
            blowfish::encrypt(input, &p.block_cipher_key).map_err(EncodeError::EncryptionFailed)?
        }
        CipherType::Rsa => {
            let packed = compression::pack(input).map_err(EncodeError::CompressionFailed)?;
            rsa::encrypt(&packed, &p.rsa_modulus, &p.rsa_public_exponent)
                .map_err(EncodeError::EncryptionFailed)?
        }
    };
    trace!("{:?} produced {} bytes from {}", p.cipher, enc.len(), input.len());

    if let Some(header) = p.header_text() {
        framing::add_header(&mut enc, &header)?;
    }

    if !p.skip_tail {
        let tail = if p.tail.is_empty() {
            framing::make_tail(checksum(&enc, 0), FOOTER_CRC32_OFFSET, FOOTER_SIZE)
        } else {
            p.tail.clone()
        };
        framing::add_tail(&mut enc, &tail)?;
    }

    debug!("encoded protocol {} into {} bytes", p.protocol, enc.len());
    Ok(enc)
}

/// Decode a framed file back into its plaintext payload
///
/// The checksum is not verified here; see [`crate::verify_checksum`].
pub fn decode(input: &[u8], p: &Params) -> Result<Vec<u8>, DecodeError> {
    p.validate()?;

    let header_size = p.header_size();
    let footer_size = p.footer_size();
    debug!(
        "decoding {} bytes as {:?}: header={} footer={}",
        input.len(),
        p.cipher,
        header_size,
        footer_size
    );

    let data = framing::strip(input, header_size, footer_size)?;

    let dec = match p.cipher {
        CipherType::None => data.to_vec(),
        CipherType::Xor => xor::apply(data, KeyStrategy::Constant(p.xor_key)),
        CipherType::XorPosition => xor::apply(data, KeyStrategy::Position(p.xor_start_position)),
        CipherType::XorFilename => xor::apply(data, KeyStrategy::Filename(&p.filename)),
        CipherType::Blowfish => {
            blowfish::decrypt(data, &p.block_cipher_key).map_err(DecodeError::DecryptionFailed)?
        }
        CipherType::Rsa => {
            let packed = rsa::decrypt(data, &p.rsa_modulus, &p.rsa_private_exponent)
                .map_err(DecodeError::DecryptionFailed)?;
            compression::unpack(&packed).map_err(DecodeError::DecompressionFailed)?
        }
    };

    trace!("{:?} produced {} bytes from {}", p.cipher, dec.len(), data.len());
    Ok(dec)
}

/// Protocol announced by a default `Lineage2VerNNN` header, if it is supported
pub fn detect_protocol(input: &[u8]) -> Option<u16> {
    framing::read_protocol(input).filter(|&p| is_supported(p))
}

/// Resolve defaults for `protocol` and encode
///
/// The output framing cannot be inferred, so the protocol is always explicit.
pub fn encode_auto(
    input: &[u8],
    filename: &str,
    protocol: i32,
    skip_header: bool,
    skip_tail: bool,
    use_legacy_key: bool,
) -> Result<Vec<u8>, EncodeError> {
    let mut params = init_params(protocol, filename, use_legacy_key)?;
    params.skip_header = skip_header;
    params.skip_tail = skip_tail;
    encode(input, &params)
}

/// Decode, detecting the protocol from the header when `protocol` is `None`
pub fn decode_auto(
    input: &[u8],
    filename: &str,
    protocol: Option<i32>,
    skip_header: bool,
    skip_tail: bool,
    use_legacy_key: bool,
) -> Result<Vec<u8>, DecodeError> {
    let protocol = match protocol {
        Some(protocol) => protocol,
        None => match detect_protocol(input) {
            Some(detected) => {
                debug!("detected protocol {detected} from header");
                i32::from(detected)
            }
            None => {
                warn!("no supported protocol header found");
                return Err(DecodeError::InvalidType(
                    "cannot detect protocol from header".into(),
                ));
            }
        },
    };

    let mut params = init_params(protocol, filename, use_legacy_key)?;
    params.skip_header = skip_header;
    params.skip_tail = skip_tail;
    decode(input, &params)
}

/// Protocol digits from an output name such as `dec-413-file.ini`
pub fn protocol_from_filename(filename: &str) -> Option<u16> {
    let digits = filename.get(4..7)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CipherError, CompressionError};
    use crate::params::MODERN_RSA_MODULUS;

    fn params(protocol: i32) -> Params {
        init_params(protocol, "file.txt", false).unwrap()
    }

    #[test]
    fn test_none_passes_payload_through() {
        let p = Params {
            protocol: 111,
            ..Params::default()
        };
        let enc = encode(b"plain", &p).unwrap();
        assert_eq!(enc.len(), 28 + 5 + 20);
        assert_eq!(&enc[28..33], b"plain");
        assert_eq!(decode(&enc, &p).unwrap(), b"plain");
    }

    #[test]
    fn test_xor_body_layout() {
        let enc = encode(&[0x00, 0xFF], &params(111)).unwrap();
        assert_eq!(&enc[28..30], &[0xAC, 0x53]);
    }

    #[test]
    fn test_tail_carries_crc_of_header_and_body() {
        let enc = encode(b"TEST123", &params(111)).unwrap();
        let body_end = enc.len() - FOOTER_SIZE;
        let at = body_end + FOOTER_CRC32_OFFSET;
        let stored = u32::from_le_bytes([enc[at], enc[at + 1], enc[at + 2], enc[at + 3]]);
        assert_eq!(stored, checksum(&enc[..body_end], 0));
        assert!(enc[body_end..at].iter().all(|&b| b == 0));
        assert!(enc[at + 4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_skip_header_and_tail() {
        let mut p = params(111);
        p.skip_header = true;
        p.skip_tail = true;
        let enc = encode(b"abc", &p).unwrap();
        assert_eq!(enc, xor::apply(b"abc", KeyStrategy::Constant(0xAC)));
        assert_eq!(decode(&enc, &p).unwrap(), b"abc");
    }

    #[test]
    fn test_custom_header_and_tail() {
        let mut p = params(211);
        p.header = "Custom".into();
        p.tail = "DEADBEEF".into();

        let enc = encode(b"0123456789", &p).unwrap();
        assert_eq!(&enc[..4], &[b'C', 0, b'u', 0]);
        assert_eq!(&enc[enc.len() - 4..], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(enc.len(), 12 + 10 + 4);
        assert_eq!(decode(&enc, &p).unwrap(), b"0123456789");
    }

    #[test]
    fn test_invalid_tail_rejected() {
        let mut p = params(111);
        p.tail = "not hex".into();
        assert!(matches!(encode(b"x", &p), Err(EncodeError::InvalidType(_))));
    }

    #[test]
    fn test_encode_requires_header_source() {
        let p = Params {
            cipher: CipherType::Xor,
            protocol: 0,
            ..Params::default()
        };
        assert!(matches!(encode(b"x", &p), Err(EncodeError::InvalidType(_))));
    }

    #[test]
    fn test_decode_without_protocol_strips_default_header() {
        let enc = encode(b"hello", &params(111)).unwrap();
        let p = Params {
            cipher: CipherType::Xor,
            xor_key: 0xAC,
            ..Params::default()
        };
        assert_eq!(p.protocol, 0);
        assert_eq!(decode(&enc, &p).unwrap(), b"hello");
    }

    #[test]
    fn test_xor_filename_without_filename() {
        let mut p = params(121);
        p.filename.clear();
        assert!(matches!(encode(b"x", &p), Err(EncodeError::InvalidType(_))));
        assert!(matches!(decode(&[0u8; 64], &p), Err(DecodeError::InvalidType(_))));
    }

    #[test]
    fn test_decode_too_small() {
        assert!(matches!(
            decode(&[1, 2], &params(111)),
            Err(DecodeError::InvalidType(_))
        ));
    }

    #[test]
    fn test_legacy_keys_cannot_encode() {
        let p = init_params(413, "", true).unwrap();
        assert_eq!(
            encode(b"x", &p),
            Err(EncodeError::EncryptionFailed(CipherError::InvalidKey("public exponent")))
        );
    }

    #[test]
    fn test_rsa_decode_unaligned_body() {
        let p = params(413);
        let input = vec![0u8; 28 + 100 + 20];
        assert_eq!(
            decode(&input, &p),
            Err(DecodeError::DecryptionFailed(CipherError::BlockAlignment {
                len: 100,
                block: 128
            }))
        );
    }

    #[test]
    fn test_rsa_decode_bad_compressed_payload() {
        // identity exponent round-trips the padding but not a zlib stream
        let mut p = params(413);
        p.rsa_private_exponent = "1".into();
        let key = rsa::RsaKey::from_hex(MODERN_RSA_MODULUS, "1", "public exponent").unwrap();
        let body = rsa::encrypt_with_workers(b"\x05\x00\x00\x00garbage", &key, 1).unwrap();

        let mut input = framing::widen("Lineage2Ver413").unwrap();
        input.extend_from_slice(&body);
        input.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            decode(&input, &p),
            Err(DecodeError::DecompressionFailed(CompressionError::Corrupt(_)))
        ));
    }

    #[test]
    fn test_rsa_body_is_block_aligned() {
        let enc = encode(&[0x42; 1000], &params(414)).unwrap();
        assert_eq!((enc.len() - 28 - 20) % rsa::BLOCK_SIZE, 0);
    }

    #[test]
    fn test_detect_protocol() {
        let enc = encode(b"x", &params(212)).unwrap();
        assert_eq!(detect_protocol(&enc), Some(212));

        let unsupported = framing::widen("Lineage2Ver999").unwrap();
        assert_eq!(detect_protocol(&unsupported), None);
    }

    #[test]
    fn test_decode_auto_explicit_protocol_wins() {
        let enc = encode_auto(b"data", "", 111, false, false, false).unwrap();
        assert!(decode_auto(&enc, "", Some(120), false, false, false).unwrap() != b"data");
        assert_eq!(decode_auto(&enc, "", Some(111), false, false, false).unwrap(), b"data");
    }

    #[test]
    fn test_decode_auto_without_header_fails() {
        let enc = encode_auto(b"data", "", 111, true, false, false).unwrap();
        assert!(matches!(
            decode_auto(&enc, "", None, true, false, false),
            Err(DecodeError::InvalidType(_))
        ));
    }

    #[test]
    fn test_encode_auto_unknown_protocol() {
        assert!(matches!(
            encode_auto(b"x", "", 999, false, false, false),
            Err(EncodeError::InvalidType(_))
        ));
    }

    #[test]
    fn test_protocol_from_filename() {
        assert_eq!(protocol_from_filename("dec-413-skillname-e.dat"), Some(413));
        assert_eq!(protocol_from_filename("dec-abc-x.dat"), None);
        assert_eq!(protocol_from_filename("dec"), None);
    }
}
