//! Wide-character header and hex-encoded tail around the payload

use log::trace;

use crate::error::FramingError;

/// Every default header starts with this tag
pub const HEADER_PREFIX: &str = "Lineage2Ver";

/// Digits following the prefix
pub const PROTOCOL_DIGITS: usize = 3;

/// Widened size of `Lineage2VerNNN`
pub const DEFAULT_HEADER_LEN: usize = (HEADER_PREFIX.len() + PROTOCOL_DIGITS) * 2;

/// Size of the default tail
pub const FOOTER_SIZE: usize = 20;

/// Position of the little-endian CRC-32 inside the default tail
pub const FOOTER_CRC32_OFFSET: usize = 12;

/// Header text used when none is given explicitly
pub fn default_header(protocol: u16) -> String {
    format!("{HEADER_PREFIX}{protocol}")
}

/// Encode a header as `[c, 0x00]` pairs
pub fn widen(header: &str) -> Result<Vec<u8>, FramingError> {
    let mut wide = Vec::with_capacity(header.len() * 2);
    for c in header.chars() {
        let byte = u8::try_from(u32::from(c)).map_err(|_| FramingError::HeaderChar(c))?;
        wide.push(byte);
        wide.push(0);
    }
    Ok(wide)
}

/// Number of bytes `header` occupies once widened
pub fn header_len(header: &str) -> usize {
    header.chars().count() * 2
}

/// Prepend the widened header to `data`
pub fn add_header(data: &mut Vec<u8>, header: &str) -> Result<(), FramingError> {
    let mut framed = widen(header)?;
    trace!("adding {}-byte header {:?}", framed.len(), header);
    framed.append(data);
    *data = framed;
    Ok(())
}

/// Build a zero-filled tail of `size` bytes carrying `crc` at `crc_offset`, as uppercase hex
pub fn make_tail(crc: u32, crc_offset: usize, size: usize) -> String {
    let mut tail = vec![0u8; size.max(crc_offset + 4)];
    tail[crc_offset..crc_offset + 4].copy_from_slice(&crc.to_le_bytes());
    tail.truncate(size);
    hex::encode_upper(tail)
}

/// Decode a tail hex string, left-padding odd lengths with a `0` nibble
pub fn decode_tail(tail: &str) -> Result<Vec<u8>, FramingError> {
    let padded = if tail.len() % 2 != 0 {
        format!("0{tail}")
    } else {
        tail.to_string()
    };
    hex::decode(&padded).map_err(|e| FramingError::Tail(e.to_string()))
}

/// Number of bytes a tail hex string decodes to
pub fn tail_len(tail: &str) -> usize {
    tail.len().div_ceil(2)
}

/// Append the decoded tail to `data`
pub fn add_tail(data: &mut Vec<u8>, tail: &str) -> Result<(), FramingError> {
    let bytes = decode_tail(tail)?;
    trace!("adding {}-byte tail", bytes.len());
    data.extend_from_slice(&bytes);
    Ok(())
}

/// Slice the body out of `input`, dropping `header_size` leading and `footer_size` trailing bytes
pub fn strip(input: &[u8], header_size: usize, footer_size: usize) -> Result<&[u8], FramingError> {
    let needed = header_size + footer_size;
    if input.len() < needed {
        return Err(FramingError::Truncated {
            needed,
            found: input.len(),
        });
    }
    Ok(&input[header_size..input.len() - footer_size])
}

/// Read the protocol number out of a default `Lineage2VerNNN` wide header
///
/// Every odd byte of the first 28 must be zero and the text must carry the
/// prefix followed by three ASCII digits. Whether the protocol is supported
/// is left to the caller.
pub fn read_protocol(input: &[u8]) -> Option<u16> {
    let wide = input.get(..DEFAULT_HEADER_LEN)?;

    let mut text = String::with_capacity(DEFAULT_HEADER_LEN / 2);
    for pair in wide.chunks_exact(2) {
        if pair[1] != 0 {
            return None;
        }
        text.push(char::from(pair[0]));
    }

    let digits = text.strip_prefix(HEADER_PREFIX)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_header() {
        let mut data = vec![0xAA, 0xBB];
        add_header(&mut data, "AB").unwrap();
        assert_eq!(data, vec![0x41, 0x00, 0x42, 0x00, 0xAA, 0xBB]);
    }

    #[test]
    fn test_add_empty_header() {
        let mut data = vec![0x11, 0x22];
        add_header(&mut data, "").unwrap();
        assert_eq!(data, vec![0x11, 0x22]);
    }

    #[test]
    fn test_header_rejects_wide_chars() {
        let mut data = Vec::new();
        assert_eq!(
            add_header(&mut data, "Ver\u{0416}"),
            Err(FramingError::HeaderChar('\u{0416}'))
        );
        assert!(data.is_empty());
    }

    #[test]
    fn test_latin1_header_counts_chars() {
        assert_eq!(header_len("é1"), 4);
        assert_eq!(widen("é").unwrap(), vec![0xE9, 0x00]);
    }

    #[test]
    fn test_default_header_len() {
        assert_eq!(DEFAULT_HEADER_LEN, 28);
        assert_eq!(header_len(&default_header(413)), DEFAULT_HEADER_LEN);
    }

    #[test]
    fn test_make_tail() {
        let tail = make_tail(0x12345678, 2, 8);
        assert_eq!(tail, "0000785634120000");
    }

    #[test]
    fn test_add_tail() {
        let mut data = vec![0xAA, 0xBB];
        add_tail(&mut data, "0102FF").unwrap();
        assert_eq!(data, vec![0xAA, 0xBB, 0x01, 0x02, 0xFF]);
    }

    #[test]
    fn test_add_tail_odd_length() {
        let mut data = Vec::new();
        add_tail(&mut data, "A").unwrap();
        assert_eq!(data, vec![0x0A]);
        assert_eq!(tail_len("A"), 1);
    }

    #[test]
    fn test_add_tail_rejects_non_hex() {
        let mut data = Vec::new();
        assert!(matches!(add_tail(&mut data, "zz"), Err(FramingError::Tail(_))));
    }

    #[test]
    fn test_make_tail_add_tail_roundtrip() {
        let mut data = Vec::new();
        add_tail(&mut data, &make_tail(0xDEADBEEF, 4, 16)).unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(
            u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            0xDEADBEEF
        );
    }

    #[test]
    fn test_strip() {
        let input = [1, 2, 3, 4, 5, 6];
        assert_eq!(strip(&input, 2, 1).unwrap(), &[3, 4, 5]);
        assert_eq!(strip(&input, 3, 3).unwrap(), &[] as &[u8]);
        assert_eq!(
            strip(&input, 4, 3),
            Err(FramingError::Truncated { needed: 7, found: 6 })
        );
    }

    #[test]
    fn test_read_protocol() {
        let mut data = widen("Lineage2Ver413").unwrap();
        data.extend_from_slice(&[0xFF; 4]);
        assert_eq!(read_protocol(&data), Some(413));
    }

    #[test]
    fn test_read_protocol_rejects_garbage() {
        assert_eq!(read_protocol(&[0u8; 10]), None);
        assert_eq!(read_protocol(&widen("Lineage2Verabc").unwrap()), None);
        assert_eq!(read_protocol(&widen("Lineage3Ver413").unwrap()), None);

        let mut narrow = widen("Lineage2Ver413").unwrap();
        narrow[1] = b'x';
        assert_eq!(read_protocol(&narrow), None);
    }
}
