// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Uniform interface over prime-order groups with hash-to-curve.
//!
//! The [`Group`] identifier selects a concrete group for both the OPRF and
//! the key exchange and dispatches the full capability set: scalar and
//! element construction, decoding with validation, fixed-width
//! serialization, hash-to-group and hash-to-scalar.

pub(crate) mod ristretto;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::errors::ProtocolError;

/// Identifies the prime-order group with hash-to-curve capability used for
/// the OPRF and the AKE.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Group {
    /// The Ristretto255 group paired with SHA-512.
    Ristretto255Sha512 = 1,
}

/// A secret integer of the selected group, with a fixed serialized length.
#[derive(Clone, Debug)]
pub(crate) struct Scalar(pub(super) curve25519_dalek::scalar::Scalar);

/// A validated element of the selected group, with a fixed serialized length.
#[derive(Clone, Debug)]
pub(crate) struct Element(pub(super) curve25519_dalek::ristretto::RistrettoPoint);

impl Group {
    /// Byte length of a serialized scalar.
    pub fn scalar_length(&self) -> usize {
        match self {
            Group::Ristretto255Sha512 => ristretto::SCALAR_LENGTH,
        }
    }

    /// Byte length of a serialized group element.
    pub fn element_length(&self) -> usize {
        match self {
            Group::Ristretto255Sha512 => ristretto::ELEMENT_LENGTH,
        }
    }

    /// Samples a fresh non-zero scalar.
    pub(crate) fn random_scalar<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Scalar {
        match self {
            Group::Ristretto255Sha512 => ristretto::random_scalar(rng),
        }
    }

    /// Decodes a canonical scalar encoding, rejecting non-canonical bytes and
    /// the zero scalar.
    pub(crate) fn decode_scalar(&self, input: &[u8]) -> Result<Scalar, ProtocolError> {
        match self {
            Group::Ristretto255Sha512 => ristretto::decode_scalar(input),
        }
    }

    /// Interprets bytes as a scalar by reduction modulo the group order.
    /// Total on correctly-sized input; used where the bytes are
    /// authenticated separately.
    pub(crate) fn reduce_scalar(&self, input: &[u8]) -> Result<Scalar, ProtocolError> {
        match self {
            Group::Ristretto255Sha512 => ristretto::reduce_scalar(input),
        }
    }

    /// Decodes a group element, rejecting invalid encodings and the identity.
    pub(crate) fn decode_element(&self, input: &[u8]) -> Result<Element, ProtocolError> {
        match self {
            Group::Ristretto255Sha512 => ristretto::decode_element(input),
        }
    }

    /// The fixed group generator.
    pub(crate) fn base(&self) -> Element {
        match self {
            Group::Ristretto255Sha512 => ristretto::base(),
        }
    }

    /// Maps arbitrary input to a group element, domain-separated by `dst`.
    pub(crate) fn hash_to_group(&self, input: &[u8], dst: &[u8]) -> Element {
        match self {
            Group::Ristretto255Sha512 => ristretto::hash_to_group(input, dst),
        }
    }

    /// Maps arbitrary input to a scalar, domain-separated by `dst`.
    pub(crate) fn hash_to_scalar(&self, input: &[u8], dst: &[u8]) -> Scalar {
        match self {
            Group::Ristretto255Sha512 => ristretto::hash_to_scalar(input, dst),
        }
    }

    /// The hash function paired with the group in its ciphersuite.
    pub(crate) fn hash(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Group::Ristretto255Sha512 => ristretto::suite_hash(input),
        }
    }
}

impl TryFrom<u8> for Group {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Group::Ristretto255Sha512),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

impl Scalar {
    pub(crate) fn serialize(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub(crate) fn invert(&self) -> Scalar {
        Scalar(self.0.invert())
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Element {
    pub(crate) fn serialize(&self) -> Vec<u8> {
        self.0.compress().to_bytes().to_vec()
    }

    pub(crate) fn mult(&self, scalar: &Scalar) -> Element {
        Element(self.0 * scalar.0)
    }
}
