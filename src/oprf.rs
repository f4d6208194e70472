// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! 2HashDH oblivious pseudo-random function over the configured group.
//!
//! The client hashes its password to the group and blinds it with a fresh
//! scalar; the server multiplies by its per-credential key without learning
//! the password; the client unblinds and hashes down to the OPRF output.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::encoding::encode_vector;
use crate::errors::ProtocolError;
use crate::group::{Element, Group, Scalar};

const STR_FINALIZE: &[u8] = b"Finalize";
const STR_HASH_TO_GROUP: &[u8] = b"OPAQUE-HashToGroup";
pub(crate) const STR_DERIVE_KEY_PAIR: &[u8] = b"OPAQUE-DeriveKeyPair";

/// Client-side blinding state, kept between the two protocol rounds.
#[derive(Debug)]
pub(crate) struct OprfClient {
    pub(crate) password: Vec<u8>,
    pub(crate) blind: Scalar,
}

impl Zeroize for OprfClient {
    fn zeroize(&mut self) {
        self.password.zeroize();
        self.blind.zeroize();
    }
}

impl Drop for OprfClient {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Hashes the password to the group and blinds it with a fresh scalar.
pub(crate) fn blind<R: RngCore + CryptoRng>(
    group: Group,
    rng: &mut R,
    password: &[u8],
) -> (OprfClient, Element) {
    let blind = group.random_scalar(rng);
    let blinded = group.hash_to_group(password, STR_HASH_TO_GROUP).mult(&blind);

    (
        OprfClient {
            password: password.to_vec(),
            blind,
        },
        blinded,
    )
}

/// Multiplies a received blinded element by the server's OPRF key.
pub(crate) fn evaluate(group: Group, key: &Scalar, blinded: &[u8]) -> Result<Element, ProtocolError> {
    let element = group.decode_element(blinded)?;
    Ok(element.mult(key))
}

/// Unblinds the evaluated element and hashes down to the OPRF output.
pub(crate) fn finalize(
    group: Group,
    state: &OprfClient,
    evaluated: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let element = group
        .decode_element(evaluated)
        .map_err(|_| ProtocolError::OprfEvaluationFailure)?;
    let unblinded = element.mult(&state.blind.invert());

    let input = [
        encode_vector(&state.password)?,
        encode_vector(&unblinded.serialize())?,
        STR_FINALIZE.to_vec(),
    ]
    .concat();

    Ok(group.hash(&input))
}

/// Deterministically derives an OPRF key scalar; the same seed and info
/// always yield the same key.
pub(crate) fn derive_key(group: Group, seed: &[u8], info: &[u8]) -> Scalar {
    group.hash_to_scalar(seed, info)
}
