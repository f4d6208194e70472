// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Build and recovery of the client's credential envelope.
//!
//! The envelope binds the client's long-term key to the randomized password
//! derived from the OPRF output. In Internal mode the key itself is
//! re-derivable and the envelope stores no ciphertext at all; in External
//! mode a caller-provided secret key rides along under a one-time pad. Both
//! variants authenticate the key material together with the cleartext
//! credentials under a key only the right password can reproduce.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::encoding::{encode_vector, xor};
use crate::errors::utils::check_slice_size;
use crate::errors::ProtocolError;
use crate::group::Scalar;
use crate::hash::ct_equal;
use crate::oprf::STR_DERIVE_KEY_PAIR;
use crate::parameters::Parameters;
use crate::Mode;

const STR_AUTH_KEY: &[u8] = b"AuthKey";
const STR_EXPORT_KEY: &[u8] = b"ExportKey";
const STR_MASKING_KEY: &[u8] = b"MaskingKey";
const STR_PRIVATE_KEY: &[u8] = b"PrivateKey";
const STR_PAD: &[u8] = b"Pad";

/// The client's stored credential envelope; opaque to the server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Envelope {
    pub(crate) nonce: Vec<u8>,
    pub(crate) inner: Vec<u8>,
    pub(crate) auth_tag: Vec<u8>,
}

impl Envelope {
    pub(crate) fn serialize(&self) -> Vec<u8> {
        [&self.nonce[..], &self.inner[..], &self.auth_tag[..]].concat()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let checked = check_slice_size(input, p.envelope_size(), "envelope")?;
        let inner_size = match p.mode {
            Mode::Internal => 0,
            Mode::External => p.scalar_length(),
        };

        Ok(Self {
            nonce: checked[..p.nonce_len].to_vec(),
            inner: checked[p.nonce_len..p.nonce_len + inner_size].to_vec(),
            auth_tag: checked[p.nonce_len + inner_size..].to_vec(),
        })
    }
}

/// Stretches the OPRF output through the memory-hard function and extracts
/// the randomized password.
pub(crate) fn build_prk(p: &Parameters, oprf_output: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let hardened = p.mhf.harden(oprf_output)?;
    Ok(p.kdf.extract(&[], &[&hardened[..], oprf_output].concat()))
}

/// The key under which the server masks its credential response.
pub(crate) fn masking_key(p: &Parameters, randomized_pwd: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    Ok(p.kdf.expand(randomized_pwd, STR_MASKING_KEY, p.hash.size())?)
}

/// Credentials covered by the envelope's authentication tag. Missing
/// identities default to the respective public keys.
pub(crate) fn cleartext_credentials(
    client_public_key: &[u8],
    server_public_key: &[u8],
    client_identity: Option<&[u8]>,
    server_identity: Option<&[u8]>,
) -> Result<Vec<u8>, ProtocolError> {
    let client_identity = client_identity.unwrap_or(client_public_key);
    let server_identity = server_identity.unwrap_or(server_public_key);

    Ok([
        client_public_key,
        server_public_key,
        &encode_vector(client_identity)?[..],
        &encode_vector(server_identity)?[..],
    ]
    .concat())
}

/// Builds an envelope for the given randomized password, returning it
/// together with the client public key and the export key.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create<R: RngCore + CryptoRng>(
    p: &Parameters,
    rng: &mut R,
    randomized_pwd: &[u8],
    server_public_key: &[u8],
    client_secret_key: Option<&[u8]>,
    client_identity: Option<&[u8]>,
    server_identity: Option<&[u8]>,
    forced_nonce: Option<Vec<u8>>,
) -> Result<(Envelope, Vec<u8>, Vec<u8>), ProtocolError> {
    let nonce = match forced_nonce {
        Some(nonce) => nonce,
        None => {
            let mut nonce = vec![0u8; p.nonce_len];
            rng.fill_bytes(&mut nonce);
            nonce
        }
    };

    let (mut secret_key, inner) = match p.mode {
        Mode::Internal => (derive_secret_key(p, randomized_pwd, &nonce)?, Vec::new()),
        Mode::External => {
            let bytes = client_secret_key.ok_or(ProtocolError::Misuse)?;
            let secret_key = p.group.decode_scalar(bytes)?;
            let pad = p.kdf.expand(
                randomized_pwd,
                &[&nonce[..], STR_PAD].concat(),
                p.scalar_length(),
            )?;
            (secret_key, xor(bytes, &pad))
        }
    };

    let public_key = p.group.base().mult(&secret_key).serialize();
    secret_key.zeroize();

    let auth_key = p.kdf.expand(
        randomized_pwd,
        &[&nonce[..], STR_AUTH_KEY].concat(),
        p.kdf.size(),
    )?;
    let export_key = p.kdf.expand(
        randomized_pwd,
        &[&nonce[..], STR_EXPORT_KEY].concat(),
        p.hash.size(),
    )?;

    let cleartext = cleartext_credentials(
        &public_key,
        server_public_key,
        client_identity,
        server_identity,
    )?;
    let auth_tag = p
        .mac
        .mac(&auth_key, &[&nonce[..], &inner[..], &cleartext[..]].concat())?;

    Ok((
        Envelope {
            nonce,
            inner,
            auth_tag,
        },
        public_key,
        export_key,
    ))
}

/// Opens an envelope with the randomized password, returning the client's
/// long-term secret key, its public key and the export key.
///
/// A wrong password and a tampered envelope walk the same path: the secret
/// key is re-derived, the public key computed and the tag recomputed before
/// the single constant-time comparison.
pub(crate) fn recover(
    p: &Parameters,
    randomized_pwd: &[u8],
    server_public_key: &[u8],
    envelope: &Envelope,
    client_identity: Option<&[u8]>,
    server_identity: Option<&[u8]>,
) -> Result<(Scalar, Vec<u8>, Vec<u8>), ProtocolError> {
    let auth_key = p.kdf.expand(
        randomized_pwd,
        &[&envelope.nonce[..], STR_AUTH_KEY].concat(),
        p.kdf.size(),
    )?;
    let export_key = p.kdf.expand(
        randomized_pwd,
        &[&envelope.nonce[..], STR_EXPORT_KEY].concat(),
        p.hash.size(),
    )?;

    let secret_key = match p.mode {
        Mode::Internal => derive_secret_key(p, randomized_pwd, &envelope.nonce)?,
        Mode::External => {
            let pad = p.kdf.expand(
                randomized_pwd,
                &[&envelope.nonce[..], STR_PAD].concat(),
                p.scalar_length(),
            )?;
            // Reduction keeps this total; the tag check below is the
            // authority on whether the recovered bytes are genuine.
            p.group.reduce_scalar(&xor(&envelope.inner, &pad))?
        }
    };

    let public_key = p.group.base().mult(&secret_key).serialize();
    let cleartext = cleartext_credentials(
        &public_key,
        server_public_key,
        client_identity,
        server_identity,
    )?;
    let expected_tag = p.mac.mac(
        &auth_key,
        &[&envelope.nonce[..], &envelope.inner[..], &cleartext[..]].concat(),
    )?;

    if !ct_equal(&expected_tag, &envelope.auth_tag) {
        return Err(ProtocolError::InvalidEnvelope);
    }

    Ok((secret_key, public_key, export_key))
}

fn derive_secret_key(
    p: &Parameters,
    randomized_pwd: &[u8],
    nonce: &[u8],
) -> Result<Scalar, ProtocolError> {
    let seed = p.kdf.expand(
        randomized_pwd,
        &[nonce, STR_PRIVATE_KEY].concat(),
        p.scalar_length(),
    )?;

    Ok(p.group.hash_to_scalar(&seed, STR_DERIVE_KEY_PAIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::hash::{Hashing, Kdf, Mac};
    use crate::mhf::Mhf;
    use rand::rngs::OsRng;

    fn parameters(mode: Mode) -> Parameters {
        Parameters {
            group: Group::Ristretto255Sha512,
            kdf: Kdf(Hashing::Sha512),
            mac: Mac(Hashing::Sha512),
            hash: Hashing::Sha512,
            mhf: Mhf::Identity,
            mode,
            context: Vec::new(),
            nonce_len: 32,
        }
    }

    fn randomized_pwd(p: &Parameters) -> Vec<u8> {
        build_prk(p, &[0x11u8; 64]).unwrap()
    }

    #[test]
    fn internal_mode_round_trips() {
        let p = parameters(Mode::Internal);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();

        let (envelope, public_key, export_key) =
            create(&p, &mut rng, &rpwd, &pks, None, None, None, None).unwrap();
        assert!(envelope.inner.is_empty());

        let (_, recovered_pk, recovered_export) =
            recover(&p, &rpwd, &pks, &envelope, None, None).unwrap();
        assert_eq!(recovered_pk, public_key);
        assert_eq!(recovered_export, export_key);
    }

    #[test]
    fn external_mode_returns_the_original_key() {
        let p = parameters(Mode::External);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();
        let client_sk = p.group.random_scalar(&mut rng).serialize();

        let (envelope, public_key, _) = create(
            &p,
            &mut rng,
            &rpwd,
            &pks,
            Some(&client_sk[..]),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(envelope.inner.len(), p.scalar_length());

        let (secret_key, recovered_pk, _) =
            recover(&p, &rpwd, &pks, &envelope, None, None).unwrap();
        assert_eq!(secret_key.serialize(), client_sk);
        assert_eq!(recovered_pk, public_key);
    }

    #[test]
    fn external_mode_requires_a_secret_key() {
        let p = parameters(Mode::External);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();

        assert_eq!(
            create(&p, &mut rng, &rpwd, &pks, None, None, None, None).unwrap_err(),
            ProtocolError::Misuse
        );
    }

    #[test]
    fn tampered_tags_are_rejected() {
        let p = parameters(Mode::Internal);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();

        let (mut envelope, _, _) =
            create(&p, &mut rng, &rpwd, &pks, None, None, None, None).unwrap();
        envelope.auth_tag[0] ^= 1;

        assert_eq!(
            recover(&p, &rpwd, &pks, &envelope, None, None).unwrap_err(),
            ProtocolError::InvalidEnvelope
        );
    }

    #[test]
    fn wrong_password_is_rejected() {
        let p = parameters(Mode::Internal);
        let mut rng = OsRng;
        let pks = p.group.base().serialize();

        let (envelope, _, _) = create(
            &p,
            &mut rng,
            &randomized_pwd(&p),
            &pks,
            None,
            None,
            None,
            None,
        )
        .unwrap();

        let other = build_prk(&p, &[0x22u8; 64]).unwrap();
        assert_eq!(
            recover(&p, &other, &pks, &envelope, None, None).unwrap_err(),
            ProtocolError::InvalidEnvelope
        );
    }

    #[test]
    fn identities_are_bound_into_the_tag() {
        let p = parameters(Mode::Internal);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();

        let client_id = &b"client"[..];
        let server_id = &b"server"[..];

        let (envelope, _, _) = create(
            &p,
            &mut rng,
            &rpwd,
            &pks,
            None,
            Some(client_id),
            Some(server_id),
            None,
        )
        .unwrap();

        assert!(recover(&p, &rpwd, &pks, &envelope, Some(client_id), Some(server_id)).is_ok());
        assert_eq!(
            recover(&p, &rpwd, &pks, &envelope, Some(&b"other"[..]), Some(server_id)).unwrap_err(),
            ProtocolError::InvalidEnvelope
        );
    }

    #[test]
    fn serialization_round_trips() {
        let p = parameters(Mode::External);
        let mut rng = OsRng;
        let rpwd = randomized_pwd(&p);
        let pks = p.group.base().serialize();
        let client_sk = p.group.random_scalar(&mut rng).serialize();

        let (envelope, _, _) = create(
            &p,
            &mut rng,
            &rpwd,
            &pks,
            Some(&client_sk[..]),
            None,
            None,
            None,
        )
        .unwrap();

        let serialized = envelope.serialize();
        assert_eq!(serialized.len(), p.envelope_size());
        assert_eq!(Envelope::deserialize(&p, &serialized).unwrap(), envelope);

        assert!(matches!(
            Envelope::deserialize(&p, &serialized[1..]).unwrap_err(),
            ProtocolError::InvalidMessageLength { .. }
        ));
    }
}
