//! Binary encoding of a processing order
//!
//! ```text
//! ┌──────────────┬──────────────┬───────────────────────────┐
//! │ version: u32 │ count: u32   │ count × code: i32         │
//! └──────────────┴──────────────┴───────────────────────────┘
//!   all little-endian
//! ```
//!
//! The older headerless form, exactly five `i32` codes, is still accepted
//! when decoding.

use thiserror::Error;

use crate::order::{ProcessingOrder, NUM_EFFECTS};

/// Current blob version
pub const ORDER_BLOB_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;
const CODE_LEN: usize = std::mem::size_of::<i32>();
const LEGACY_LEN: usize = NUM_EFFECTS * CODE_LEN;

/// Errors decoding an order blob
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderCodecError {
    #[error("order blob has {found} bytes, expected {expected}")]
    Length { expected: usize, found: usize },

    #[error("unsupported order blob version {0}")]
    Version(u32),

    #[error("order blob holds {0} entries, expected {n}", n = NUM_EFFECTS)]
    Count(u32),

    #[error("decoded order {0:?} is not a permutation")]
    NotPermutation([i32; NUM_EFFECTS]),
}

/// Encode an order as a versioned blob
pub fn encode_order(order: &ProcessingOrder) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + LEGACY_LEN);
    bytes.extend_from_slice(&ORDER_BLOB_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(NUM_EFFECTS as u32).to_le_bytes());
    for code in order.codes() {
        bytes.extend_from_slice(&code.to_le_bytes());
    }
    bytes
}

/// Decode a versioned or legacy blob into a valid permutation
pub fn decode_order(bytes: &[u8]) -> Result<ProcessingOrder, OrderCodecError> {
    let body = if bytes.len() == LEGACY_LEN {
        bytes
    } else {
        if bytes.len() < HEADER_LEN {
            return Err(OrderCodecError::Length {
                expected: HEADER_LEN + LEGACY_LEN,
                found: bytes.len(),
            });
        }
        let version = read_u32(&bytes[0..4]);
        if version != ORDER_BLOB_VERSION {
            return Err(OrderCodecError::Version(version));
        }
        let count = read_u32(&bytes[4..8]);
        if count as usize != NUM_EFFECTS {
            return Err(OrderCodecError::Count(count));
        }
        let body = &bytes[HEADER_LEN..];
        if body.len() != LEGACY_LEN {
            return Err(OrderCodecError::Length {
                expected: HEADER_LEN + LEGACY_LEN,
                found: bytes.len(),
            });
        }
        body
    };

    let mut codes = [0i32; NUM_EFFECTS];
    for (code, chunk) in codes.iter_mut().zip(body.chunks_exact(CODE_LEN)) {
        *code = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let order = ProcessingOrder::from_codes(codes);
    if !order.is_permutation() {
        return Err(OrderCodecError::NotPermutation(codes));
    }
    Ok(order)
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::all_permutations;

    fn legacy(codes: [i32; NUM_EFFECTS]) -> Vec<u8> {
        codes.iter().flat_map(|c| c.to_le_bytes()).collect()
    }

    #[test]
    fn test_every_permutation_roundtrips() {
        for order in all_permutations() {
            let blob = encode_order(&order);
            assert_eq!(blob.len(), 28);
            assert_eq!(decode_order(&blob), Ok(order));
        }
    }

    #[test]
    fn test_blob_layout() {
        let blob = encode_order(&ProcessingOrder::from_codes([2, 0, 1, 3, 4]));
        assert_eq!(&blob[0..4], &[1, 0, 0, 0]);
        assert_eq!(&blob[4..8], &[5, 0, 0, 0]);
        assert_eq!(&blob[8..12], &[2, 0, 0, 0]);
        assert_eq!(&blob[24..28], &[4, 0, 0, 0]);
    }

    #[test]
    fn test_legacy_blob_decodes() {
        let codes = [4, 3, 2, 1, 0];
        let blob = legacy(codes);
        assert_eq!(blob.len(), 20);
        assert_eq!(decode_order(&blob), Ok(ProcessingOrder::from_codes(codes)));
    }

    #[test]
    fn test_wrong_lengths_fail() {
        for len in [0, 3, 12, 19, 21, 27, 29, 40] {
            let mut blob = encode_order(&ProcessingOrder::identity());
            blob.resize(len, 0);
            assert!(
                matches!(decode_order(&blob), Err(OrderCodecError::Length { found, .. }) if found == len),
                "len {len}"
            );
        }
    }

    #[test]
    fn test_header_is_checked() {
        let mut blob = encode_order(&ProcessingOrder::identity());
        blob[0] = 2;
        assert_eq!(decode_order(&blob), Err(OrderCodecError::Version(2)));

        let mut blob = encode_order(&ProcessingOrder::identity());
        blob[4] = 6;
        assert_eq!(decode_order(&blob), Err(OrderCodecError::Count(6)));
    }

    #[test]
    fn test_non_permutations_rejected() {
        let dup = [0, 0, 1, 2, 3];
        assert_eq!(decode_order(&legacy(dup)), Err(OrderCodecError::NotPermutation(dup)));
        let sentinel = [5, 5, 5, 5, 5];
        assert!(decode_order(&legacy(sentinel)).is_err());
        let out_of_range = [0, 1, 2, 3, 99];
        assert!(decode_order(&legacy(out_of_range)).is_err());
    }
}
