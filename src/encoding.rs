// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Byte-level encodings shared by the protocol messages and the key schedule.

use crate::errors::InternalError;

const WORD: usize = core::mem::size_of::<u64>();

/// Encodes an integer as a big-endian byte string of exactly `length` bytes.
pub(crate) fn i2osp(value: usize, length: usize) -> Result<Vec<u8>, InternalError> {
    if length == 0 || length > WORD {
        return Err(InternalError::I2ospError);
    }

    let bytes = (value as u64).to_be_bytes();
    if bytes[..WORD - length].iter().any(|&b| b != 0) {
        return Err(InternalError::I2ospError);
    }

    Ok(bytes[WORD - length..].to_vec())
}

/// Decodes a big-endian byte string into an integer. Inputs longer than the
/// native word are not used by the protocol.
pub(crate) fn os2ip(input: &[u8]) -> usize {
    input
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b))
}

/// Prepends a `length`-byte big-endian length prefix to `input`.
pub(crate) fn encode_vector_len(input: &[u8], length: usize) -> Result<Vec<u8>, InternalError> {
    Ok([&i2osp(input.len(), length)?[..], input].concat())
}

/// Prepends the default two-byte length prefix to `input`.
pub(crate) fn encode_vector(input: &[u8]) -> Result<Vec<u8>, InternalError> {
    encode_vector_len(input, 2)
}

/// Byte-wise xor of two equal-length strings.
pub(crate) fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Left-pads a serialized group element with zero bytes up to `length`.
/// Fixed-width encodings pass through unchanged.
pub(crate) fn pad_point(element: &[u8], length: usize) -> Vec<u8> {
    if element.len() >= length {
        return element.to_vec();
    }

    let mut padded = vec![0u8; length - element.len()];
    padded.extend_from_slice(element);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i2osp_round_trips() {
        assert_eq!(i2osp(0, 1).unwrap(), vec![0]);
        assert_eq!(i2osp(255, 1).unwrap(), vec![255]);
        assert_eq!(i2osp(259, 2).unwrap(), vec![1, 3]);
        assert_eq!(os2ip(&i2osp(65535, 2).unwrap()), 65535);
        assert_eq!(os2ip(&i2osp(32, 1).unwrap()), 32);
    }

    #[test]
    fn i2osp_rejects_out_of_range() {
        assert_eq!(i2osp(256, 1), Err(InternalError::I2ospError));
        assert_eq!(i2osp(65536, 2), Err(InternalError::I2ospError));
        assert_eq!(i2osp(1, 0), Err(InternalError::I2ospError));
        assert_eq!(i2osp(1, 9), Err(InternalError::I2ospError));
    }

    #[test]
    fn vectors_carry_their_length() {
        let encoded = encode_vector(b"opaque").unwrap();
        assert_eq!(&encoded[..2], &[0, 6]);
        assert_eq!(&encoded[2..], b"opaque");

        let empty = encode_vector(b"").unwrap();
        assert_eq!(empty, vec![0, 0]);

        let one_byte = encode_vector_len(b"ab", 1).unwrap();
        assert_eq!(one_byte, vec![2, b'a', b'b']);
    }

    #[test]
    fn xor_is_an_involution() {
        let a = [0x0fu8; 16];
        let b: Vec<u8> = (0..16).collect();
        assert_eq!(xor(&xor(&a, &b), &b), a.to_vec());
    }

    #[test]
    fn pad_point_fills_on_the_left() {
        assert_eq!(pad_point(&[1, 2], 4), vec![0, 0, 1, 2]);
        let full = [7u8; 32];
        assert_eq!(pad_point(&full, 32), full.to_vec());
    }
}
