// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Ristretto255 group operations over curve25519-dalek.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::traits::Identity;
use digest::Digest;
use rand::{CryptoRng, RngCore};
use sha2::Sha512;

use super::{Element, Scalar};
use crate::errors::ProtocolError;

pub(crate) const SCALAR_LENGTH: usize = 32;
pub(crate) const ELEMENT_LENGTH: usize = 32;

// Uniform-bytes length for hash-to-group and hash-to-scalar.
const UNIFORM_BYTES: usize = 64;

pub(super) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let mut scalar_bytes = [0u8; 64];
        rng.fill_bytes(&mut scalar_bytes);
        let scalar = curve25519_dalek::scalar::Scalar::from_bytes_mod_order_wide(&scalar_bytes);

        if scalar != curve25519_dalek::scalar::Scalar::ZERO {
            break Scalar(scalar);
        }
    }
}

pub(super) fn decode_scalar(input: &[u8]) -> Result<Scalar, ProtocolError> {
    let bytes: [u8; SCALAR_LENGTH] = input.try_into().map_err(|_| ProtocolError::InvalidScalar)?;
    let scalar = Option::from(curve25519_dalek::scalar::Scalar::from_canonical_bytes(bytes))
        .ok_or(ProtocolError::InvalidScalar)?;

    if scalar == curve25519_dalek::scalar::Scalar::ZERO {
        return Err(ProtocolError::InvalidScalar);
    }

    Ok(Scalar(scalar))
}

pub(super) fn reduce_scalar(input: &[u8]) -> Result<Scalar, ProtocolError> {
    let bytes: [u8; SCALAR_LENGTH] = input.try_into().map_err(|_| ProtocolError::InvalidScalar)?;
    Ok(Scalar(curve25519_dalek::scalar::Scalar::from_bytes_mod_order(
        bytes,
    )))
}

pub(super) fn decode_element(input: &[u8]) -> Result<Element, ProtocolError> {
    let point = CompressedRistretto::from_slice(input)
        .map_err(|_| ProtocolError::InvalidPoint)?
        .decompress()
        .ok_or(ProtocolError::InvalidPoint)?;

    if point == RistrettoPoint::identity() {
        return Err(ProtocolError::InvalidPoint);
    }

    Ok(Element(point))
}

pub(super) fn base() -> Element {
    Element(RISTRETTO_BASEPOINT_POINT)
}

pub(super) fn hash_to_group(input: &[u8], dst: &[u8]) -> Element {
    let uniform = expand_message_xmd_sha512(input, dst, UNIFORM_BYTES);
    let mut bytes = [0u8; UNIFORM_BYTES];
    bytes.copy_from_slice(&uniform);
    Element(RistrettoPoint::from_uniform_bytes(&bytes))
}

pub(super) fn hash_to_scalar(input: &[u8], dst: &[u8]) -> Scalar {
    let uniform = expand_message_xmd_sha512(input, dst, UNIFORM_BYTES);
    let mut bytes = [0u8; UNIFORM_BYTES];
    bytes.copy_from_slice(&uniform);
    Scalar(curve25519_dalek::scalar::Scalar::from_bytes_mod_order_wide(
        &bytes,
    ))
}

pub(super) fn suite_hash(input: &[u8]) -> Vec<u8> {
    Sha512::digest(input).to_vec()
}

// expand_message_xmd with SHA-512 (RFC 9380, section 5.3.1). The lengths
// used by this crate keep ell and the DST well under the one-byte limits.
fn expand_message_xmd_sha512(msg: &[u8], dst: &[u8], len_in_bytes: usize) -> Vec<u8> {
    const B_IN_BYTES: usize = 64;
    const S_IN_BYTES: usize = 128;

    debug_assert!(len_in_bytes <= 255 * B_IN_BYTES);
    debug_assert!(dst.len() <= 255);

    let ell = len_in_bytes.div_ceil(B_IN_BYTES);
    let dst_prime = [dst, &[dst.len() as u8][..]].concat();

    let mut hasher = Sha512::new();
    hasher.update([0u8; S_IN_BYTES]);
    hasher.update(msg);
    hasher.update((len_in_bytes as u16).to_be_bytes());
    hasher.update([0u8]);
    hasher.update(&dst_prime);
    let b_0 = hasher.finalize();

    let mut hasher = Sha512::new();
    hasher.update(b_0);
    hasher.update([1u8]);
    hasher.update(&dst_prime);
    let mut b_i = hasher.finalize();

    let mut uniform_bytes = b_i.to_vec();
    for i in 2..=ell {
        let mut hasher = Sha512::new();
        let strxor: Vec<u8> = b_0.iter().zip(b_i.iter()).map(|(x, y)| x ^ y).collect();
        hasher.update(strxor);
        hasher.update([i as u8]);
        hasher.update(&dst_prime);
        b_i = hasher.finalize();
        uniform_bytes.extend_from_slice(&b_i);
    }

    uniform_bytes.truncate(len_in_bytes);
    uniform_bytes
}

#[cfg(test)]
mod tests {
    use super::super::Group;
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const GROUP: Group = Group::Ristretto255Sha512;

    fn keypair_strategy() -> BoxedStrategy<(Scalar, Element)> {
        any::<[u8; 32]>()
            .prop_map(|seed| {
                let mut rng = StdRng::from_seed(seed);
                let sk = GROUP.random_scalar(&mut rng);
                let pk = GROUP.base().mult(&sk);
                (sk, pk)
            })
            .no_shrink()
            .boxed()
    }

    #[test]
    fn rejects_the_identity_element() {
        let identity = RistrettoPoint::identity().compress().to_bytes();
        assert_eq!(
            GROUP.decode_element(&identity).unwrap_err(),
            ProtocolError::InvalidPoint
        );
    }

    #[test]
    fn rejects_invalid_element_encodings() {
        // A 32-byte string that does not decompress to a ristretto point.
        let bad =
            hex::decode("2a292df7e32cababbd9de088d1d1abec9fc0440f637ed2fba145094dc14bea08")
                .unwrap();
        assert_eq!(
            GROUP.decode_element(&bad).unwrap_err(),
            ProtocolError::InvalidPoint
        );
        assert_eq!(
            GROUP.decode_element(&bad[..31]).unwrap_err(),
            ProtocolError::InvalidPoint
        );
    }

    #[test]
    fn rejects_non_canonical_scalars() {
        let too_large = [0xaau8; 32];
        assert_eq!(
            GROUP.decode_scalar(&too_large).unwrap_err(),
            ProtocolError::InvalidScalar
        );
        assert_eq!(
            GROUP.decode_scalar(&[0u8; 32]).unwrap_err(),
            ProtocolError::InvalidScalar
        );
    }

    #[test]
    fn hash_to_group_separates_domains() {
        let a = GROUP.hash_to_group(b"input", b"domain-one");
        let b = GROUP.hash_to_group(b"input", b"domain-two");
        assert_ne!(a.serialize(), b.serialize());
        assert_eq!(
            a.serialize(),
            GROUP.hash_to_group(b"input", b"domain-one").serialize()
        );
    }

    proptest! {
        #[test]
        fn scalar_serialization_round_trips((sk, _) in keypair_strategy()) {
            let decoded = GROUP.decode_scalar(&sk.serialize()).unwrap();
            prop_assert_eq!(decoded.serialize(), sk.serialize());
        }

        #[test]
        fn diffie_hellman_commutes((sk1, pk1) in keypair_strategy(), (sk2, pk2) in keypair_strategy()) {
            let dh1 = pk1.mult(&sk2).serialize();
            let dh2 = pk2.mult(&sk1).serialize();
            prop_assert_eq!(dh1, dh2);
        }

        #[test]
        fn blinding_inverts((sk, _) in keypair_strategy()) {
            let element = GROUP.hash_to_group(b"some password", b"test");
            let unblinded = element.mult(&sk).mult(&sk.invert());
            prop_assert_eq!(unblinded.serialize(), element.serialize());
        }
    }
}
