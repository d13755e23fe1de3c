//! Codec configuration and the per-protocol defaults table.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use crate::error::{FramingError, ParamsError};
use crate::framing;

/// Every protocol the registry knows about
pub const SUPPORTED_PROTOCOLS: [u16; 9] = [111, 120, 121, 211, 212, 411, 412, 413, 414];

/// Shared key pair used by all big-integer protocols unless legacy keys are requested
pub const MODERN_RSA_MODULUS: &str = "75b4d6de5c016544068a1acf125869f43d2e09fc55b8b1e289556daf9b8757635593446288b3653da1ce91c87bb1a5c18f16323495c55d7d72c0890a83f69bfd1fd9434eb1c02f3e4679edfa43309319070129c267c85604d87bb65bae205de3707af1d2108881abb567c3b3d069ae67c3a4c6a3aa93d26413d4c66094ae2039";
pub const MODERN_RSA_PUBLIC_EXPONENT: &str = "30b4c2d798d47086145c75063c8e841e719776e400291d7838d3e6c4405b504c6a07f8fca27f32b86643d2649d1d5f124cdd0bf272f0909dd7352fe10a77b34d831043d9ae541f8263c6fe3d1c14c2f04e43a7253a6dda9a8c1562cbd493c1b631a1957618ad5dfe5ca28553f746e2fc6f2db816c7db223ec91e955081c1de65";
pub const MODERN_RSA_PRIVATE_EXPONENT: &str = "1d";

/// Transform applied to the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CipherType {
    #[default]
    None,
    Xor,
    XorPosition,
    XorFilename,
    Blowfish,
    Rsa,
}

/// Everything `encode` and `decode` need to know about a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub cipher: CipherType,
    /// Protocol number, used to derive the default header
    pub protocol: u16,
    /// Explicit header text; empty means `Lineage2Ver<protocol>`
    pub header: String,
    /// Explicit tail as hex; empty means a 20-byte footer carrying the CRC-32
    pub tail: String,
    pub skip_header: bool,
    pub skip_tail: bool,
    /// Source of the key for [`CipherType::XorFilename`]
    pub filename: String,
    pub xor_key: u8,
    pub xor_start_position: u32,
    pub block_cipher_key: Vec<u8>,
    pub rsa_modulus: String,
    pub rsa_public_exponent: String,
    pub rsa_private_exponent: String,
}

impl Params {
    /// Header text written on encode and expected on decode, if any
    pub fn header_text(&self) -> Option<String> {
        if self.skip_header {
            None
        } else if !self.header.is_empty() {
            Some(self.header.clone())
        } else {
            Some(framing::default_header(self.protocol))
        }
    }

    /// Widened header size decode strips
    pub fn header_size(&self) -> usize {
        if self.skip_header {
            0
        } else if !self.header.is_empty() {
            framing::header_len(&self.header)
        } else {
            framing::DEFAULT_HEADER_LEN
        }
    }

    /// Tail size decode strips
    pub fn footer_size(&self) -> usize {
        if self.skip_tail {
            0
        } else if !self.tail.is_empty() {
            framing::tail_len(&self.tail)
        } else {
            framing::FOOTER_SIZE
        }
    }

    /// Reject configurations that cannot decode correctly
    ///
    /// Decoding only needs the header size, so the protocol is not consulted.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.cipher == CipherType::XorFilename && self.filename.is_empty() {
            return Err(ParamsError::MissingFilename(self.protocol));
        }
        if !self.skip_header {
            if let Some(c) = self.header.chars().find(|&c| u32::from(c) > 0xFF) {
                return Err(FramingError::HeaderChar(c).into());
            }
        }
        Ok(())
    }

    /// [`Params::validate`], plus a protocol able to derive the default header
    pub fn validate_encode(&self) -> Result<(), ParamsError> {
        self.validate()?;
        if !self.skip_header && self.header.is_empty() && !(100..=999).contains(&self.protocol) {
            return Err(FramingError::NoHeader(self.protocol).into());
        }
        Ok(())
    }
}

/// Whether `protocol` has an entry in the registry
pub fn is_supported(protocol: u16) -> bool {
    SUPPORTED_PROTOCOLS.contains(&protocol)
}

static REGISTRY: OnceLock<HashMap<u16, Params>> = OnceLock::new();

fn rsa_legacy(modulus: &str, private_exponent: &str) -> Params {
    Params {
        cipher: CipherType::Rsa,
        rsa_modulus: modulus.to_string(),
        rsa_private_exponent: private_exponent.to_string(),
        ..Params::default()
    }
}

/// The immutable protocol defaults table, built on first use
fn registry() -> &'static HashMap<u16, Params> {
    REGISTRY.get_or_init(|| {
        HashMap::from([
            (
                111,
                Params {
                    cipher: CipherType::Xor,
                    xor_key: 0xAC,
                    ..Params::default()
                },
            ),
            (
                120,
                Params {
                    cipher: CipherType::XorPosition,
                    xor_start_position: 0xE6,
                    ..Params::default()
                },
            ),
            (
                121,
                Params {
                    cipher: CipherType::XorFilename,
                    ..Params::default()
                },
            ),
            (
                211,
                Params {
                    cipher: CipherType::Blowfish,
                    block_cipher_key: b"31==-%&@!^+][;'.]94-".to_vec(),
                    ..Params::default()
                },
            ),
            (
                212,
                Params {
                    cipher: CipherType::Blowfish,
                    block_cipher_key: b"[;'.]94-&@%!^+]-31==".to_vec(),
                    ..Params::default()
                },
            ),
            (
                411,
                rsa_legacy(
                    "8c9d5da87b30f5d7cd9dc88c746eaac5bb180267fa11737358c4c95d9adf59dd37689f9befb251508759555d6fe0eca87bebe0a10712cf0ec245af84cd22eb4cb675e98eaf5799fca62a20a2baa4801d5d70718dcd43283b8428f1387aec6600f937bfc7bb72404d187d3a9c438f1ffce9ce365dccf754232ff6def038a41385",
                    "1d",
                ),
            ),
            (
                412,
                rsa_legacy(
                    "a465134799cf2c45087093e7d0f0f144e6d528110c08f674730d436e40827330eccea46e70acf10cdda7d8f710e3b44dcca931812d76cd7494289bca8b73823f57efc0515b97e4a2a02612ccfa719cf7885104b06f2e7e2cc967b62e3d3b1aadb925db94cbc8cd3070a4bb13f7e202c7733a67b1b94c1ebc0afcbe1a63b448cf",
                    "25",
                ),
            ),
            (
                413,
                rsa_legacy(
                    "97df398472ddf737ef0a0cd17e8d172f0fef1661a38a8ae1d6e829bc1c6e4c3cfc19292dda9ef90175e46e7394a18850b6417d03be6eea274d3ed1dde5b5d7bde72cc0a0b71d03608655633881793a02c9a67d9ef2b45eb7c08d4be329083ce450e68f7867b6749314d40511d09bc5744551baa86a89dc38123dc1668fd72d83",
                    "35",
                ),
            ),
            (
                414,
                rsa_legacy(
                    "ad70257b2316ce09dfaf2ebc3f63b3d673b0c98a403950e26bb87379b11e17aed0e45af23e7171e5ec1fbc8d1ae32ffb7801b31266eef9c334b53469d4b7cbe83284273d35a9aab49b453e7012f374496c65f8089f5d134b0eb3d1e3b22051ed5977a6dd68c4f85785dfcc9f4412c81681944fc4b8ce27caf0242deaa5762e8d",
                    "25",
                ),
            ),
        ])
    })
}

fn modern_rsa() -> Params {
    Params {
        cipher: CipherType::Rsa,
        rsa_modulus: MODERN_RSA_MODULUS.to_string(),
        rsa_public_exponent: MODERN_RSA_PUBLIC_EXPONENT.to_string(),
        rsa_private_exponent: MODERN_RSA_PRIVATE_EXPONENT.to_string(),
        ..Params::default()
    }
}

/// Default parameters for `protocol`
///
/// Big-integer protocols resolve to the shared modern key pair unless
/// `use_legacy_key` is set. Protocol 121 needs a non-empty `filename`.
pub fn init_params(protocol: i32, filename: &str, use_legacy_key: bool) -> Result<Params, ParamsError> {
    let (protocol, defaults) = u16::try_from(protocol)
        .ok()
        .and_then(|p| registry().get(&p).map(|defaults| (p, defaults)))
        .ok_or(ParamsError::UnknownProtocol(protocol))?;

    let mut params = if defaults.cipher == CipherType::Rsa && !use_legacy_key {
        modern_rsa()
    } else {
        defaults.clone()
    };

    if params.cipher == CipherType::XorFilename && filename.is_empty() {
        return Err(ParamsError::MissingFilename(protocol));
    }

    params.protocol = protocol;

    params.filename = filename.to_string();
    params.header = framing::default_header(params.protocol);

    debug!(
        "protocol {} -> {:?}{}",
        params.protocol,
        params.cipher,
        if use_legacy_key { " (legacy keys)" } else { "" }
    );
    Ok(params)
}
