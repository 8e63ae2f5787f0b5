//! On-disk framing for stored values.
//!
//! Every value file is a single frame:
//!
//! ```text
//! [magic: 4 bytes "GFKV"][frame version: 1 byte][length: 4 bytes LE][data: N bytes][crc32: 4 bytes LE]
//! ```
//!
//! The frame version describes this envelope only; the payload is opaque.

use std::io::{Error as IoError, ErrorKind, Result as IoResult};

use crc32fast::Hasher;

/// Current frame version.
const FRAME_VERSION: u8 = 1;

/// Magic bytes identifying a value file.
pub const MAGIC: [u8; 4] = *b"GFKV";

const HEADER_LEN: usize = MAGIC.len() + 1 + 4;
const TRAILER_LEN: usize = 4;

/// Reject unreasonably large values (16 MiB).
const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn invalid(msg: String) -> IoError {
    IoError::new(ErrorKind::InvalidData, msg)
}

/// Wraps `data` in a checksummed frame.
pub fn encode(data: &[u8]) -> IoResult<Vec<u8>> {
    if data.len() > MAX_VALUE_SIZE {
        return Err(invalid(format!(
            "value size {} exceeds maximum {}",
            data.len(),
            MAX_VALUE_SIZE
        )));
    }
    // Bounded by MAX_VALUE_SIZE above.
    #[allow(clippy::cast_possible_truncation)]
    let len = data.len() as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + TRAILER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(FRAME_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&checksum(data).to_le_bytes());
    Ok(out)
}

/// Unwraps a frame, verifying magic, length and checksum.
///
/// # Errors
/// Returns `InvalidData` for any truncation, trailing garbage, unknown frame
/// version or CRC mismatch.
pub fn decode(frame: &[u8]) -> IoResult<Vec<u8>> {
    if frame.len() < HEADER_LEN + TRAILER_LEN {
        return Err(invalid(format!("frame too short: {} bytes", frame.len())));
    }

    let (magic, rest) = frame.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(invalid(format!(
            "invalid magic bytes: expected {MAGIC:?}, got {magic:?}"
        )));
    }

    let (version, rest) = rest.split_at(1);
    if version[0] != FRAME_VERSION {
        return Err(invalid(format!(
            "unsupported frame version: {} (expected {FRAME_VERSION})",
            version[0]
        )));
    }

    let (len_bytes, rest) = rest.split_at(4);
    let mut len_buf = [0u8; 4];
    len_buf.copy_from_slice(len_bytes);
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_VALUE_SIZE {
        return Err(invalid(format!("value size {len} exceeds maximum {MAX_VALUE_SIZE}")));
    }
    if rest.len() != len + TRAILER_LEN {
        return Err(invalid(format!(
            "length mismatch: header says {len}, frame carries {}",
            rest.len().saturating_sub(TRAILER_LEN)
        )));
    }

    let (data, crc_bytes) = rest.split_at(len);
    let mut crc_buf = [0u8; 4];
    crc_buf.copy_from_slice(crc_bytes);
    let stored_crc = u32::from_le_bytes(crc_buf);
    let computed_crc = checksum(data);

    if stored_crc != computed_crc {
        return Err(invalid(format!(
            "CRC mismatch: stored={stored_crc:08x}, computed={computed_crc:08x} (data corrupted)"
        )));
    }

    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let payload = br#"{"a":{"id":"a"}}"#;
        let frame = encode(payload).unwrap();
        assert_eq!(&frame[..4], b"GFKV");
        assert_eq!(decode(&frame).unwrap(), payload.to_vec());
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode(b"").unwrap();
        assert!(decode(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_corruption_detected() {
        let mut frame = encode(b"hello world").unwrap();
        frame[HEADER_LEN + 2] ^= 0xFF;

        let err = decode(&frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[test]
    fn test_truncation_detected() {
        let frame = encode(b"hello world").unwrap();
        assert!(decode(&frame[..frame.len() - 3]).is_err());
        assert!(decode(&frame[..3]).is_err());
    }

    #[test]
    fn test_bad_magic() {
        let mut frame = encode(b"x").unwrap();
        frame[0] = b'Z';
        assert!(decode(&frame).unwrap_err().to_string().contains("magic"));
    }

    #[test]
    fn test_unknown_version() {
        let mut frame = encode(b"x").unwrap();
        frame[4] = 99;
        assert!(decode(&frame).unwrap_err().to_string().contains("version"));
    }
}
