//! Variable-length integer encoding.
//!
//! 7 bits per byte, low groups first, high bit set on every byte but the
//! last. Posting lists use it for key lengths and occurrence counts.

use crate::error::{FolioError, Result};

/// Append the encoding of `value` to `out`, returning the number of bytes written.
pub fn encode_u64(value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        out.push(byte);

        if val == 0 {
            break;
        }
    }

    out.len() - start
}

/// Decode a value from the front of `bytes`, returning it with the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return Err(FolioError::format("varint overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(FolioError::format("incomplete varint"))
}

/// Number of bytes [`encode_u64`] produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}
