// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The three-message 3DH authenticated key exchange.
//!
//! Both sides mix three Diffie-Hellman products into one keying secret,
//! binding the ephemeral pairs and both long-term identities, then derive
//! MAC keys and the session key off a rolling transcript hash.

pub(crate) mod client;
pub(crate) mod server;

use rand::{CryptoRng, RngCore};

use crate::encoding::{encode_vector, encode_vector_len, i2osp};
use crate::errors::ProtocolError;
use crate::group::{Element, Group, Scalar};
use crate::hash::{Kdf, Transcript};
use crate::parameters::Parameters;

const STR_VERSION_TAG: &[u8] = b"RFCXXXX";
const STR_LABEL_PREFIX: &[u8] = b"OPAQUE ";
const STR_HANDSHAKE_SECRET: &[u8] = b"handshake secret";
const STR_SESSION_SECRET: &[u8] = b"session secret";
const STR_SERVER_MAC: &[u8] = b"server mac";
const STR_CLIENT_MAC: &[u8] = b"client mac";

/// Generates a fresh serialized key pair in the AKE group.
pub(crate) fn key_gen<R: RngCore + CryptoRng>(group: Group, rng: &mut R) -> (Vec<u8>, Vec<u8>) {
    let secret_key = group.random_scalar(rng);
    let public_key = group.base().mult(&secret_key);

    (secret_key.serialize(), public_key.serialize())
}

enum Role {
    Client,
    Server,
}

fn k3dh(
    p1: &Element,
    s1: &Scalar,
    p2: &Element,
    s2: &Scalar,
    p3: &Element,
    s3: &Scalar,
) -> Vec<u8> {
    [
        p1.mult(s1).serialize(),
        p2.mult(s2).serialize(),
        p3.mult(s3).serialize(),
    ]
    .concat()
}

fn ikm(
    role: &Role,
    group: Group,
    esk: &Scalar,
    secret_key: &Scalar,
    peer_epk: &[u8],
    peer_pk: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let epk = group.decode_element(peer_epk)?;
    let pk = group.decode_element(peer_pk)?;

    Ok(match role {
        Role::Client => k3dh(&epk, esk, &pk, esk, &epk, secret_key),
        Role::Server => k3dh(&epk, esk, &epk, secret_key, &pk, esk),
    })
}

fn build_label(length: usize, label: &[u8], context: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    Ok([
        i2osp(length, 2)?,
        encode_vector_len(&[STR_LABEL_PREFIX, label].concat(), 1)?,
        encode_vector_len(context, 1)?,
    ]
    .concat())
}

fn expand_label(
    kdf: &Kdf,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let info = build_label(kdf.size(), label, context)?;
    Ok(kdf.expand(secret, &info, kdf.size())?)
}

struct MacKeys {
    server_mac_key: Vec<u8>,
    client_mac_key: Vec<u8>,
}

fn derive_keys(
    kdf: &Kdf,
    ikm: &[u8],
    preamble: &[u8],
) -> Result<(MacKeys, Vec<u8>), ProtocolError> {
    let prk = kdf.extract(&[], ikm);
    let handshake_secret = expand_label(kdf, &prk, STR_HANDSHAKE_SECRET, preamble)?;
    let session_key = expand_label(kdf, &prk, STR_SESSION_SECRET, preamble)?;
    let server_mac_key = expand_label(kdf, &handshake_secret, STR_SERVER_MAC, &[])?;
    let client_mac_key = expand_label(kdf, &handshake_secret, STR_CLIENT_MAC, &[])?;

    Ok((
        MacKeys {
            server_mac_key,
            client_mac_key,
        },
        session_key,
    ))
}

struct AkeOutput {
    server_mac: Vec<u8>,
    client_mac: Vec<u8>,
    session_key: Vec<u8>,
}

/// The computation shared by both sides: 3DH keying material, transcript
/// hash, key schedule and the two MACs. The roles differ only in which
/// scalars multiply which peer keys.
#[allow(clippy::too_many_arguments)]
fn core_3dh(
    role: Role,
    p: &Parameters,
    esk: &Scalar,
    secret_key: &Scalar,
    peer_epk: &[u8],
    peer_pk: &[u8],
    client_identity: &[u8],
    server_identity: &[u8],
    serialized_ke1: &[u8],
    serialized_credential_response: &[u8],
    nonce_s: &[u8],
    epk_s: &[u8],
) -> Result<AkeOutput, ProtocolError> {
    let ikm = ikm(&role, p.group, esk, secret_key, peer_epk, peer_pk)?;

    let mut transcript = Transcript::new(p.hash);
    transcript.write(
        &[
            STR_VERSION_TAG.to_vec(),
            encode_vector(&p.context)?,
            encode_vector(client_identity)?,
            serialized_ke1.to_vec(),
            encode_vector(server_identity)?,
            serialized_credential_response.to_vec(),
            nonce_s.to_vec(),
            epk_s.to_vec(),
        ]
        .concat(),
    );

    let (keys, session_key) = derive_keys(&p.kdf, &ikm, &transcript.sum())?;
    let server_mac = p.mac.mac(&keys.server_mac_key, &transcript.sum())?;
    transcript.write(&server_mac);
    let client_mac = p.mac.mac(&keys.client_mac_key, &transcript.sum())?;

    Ok(AkeOutput {
        server_mac,
        client_mac,
        session_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use rand::rngs::OsRng;

    #[test]
    fn label_encoding_is_stable() {
        let label = build_label(64, b"server mac", &[]).unwrap();
        let mut expected = vec![0u8, 64];
        expected.push(17); // "OPAQUE " + "server mac"
        expected.extend_from_slice(b"OPAQUE server mac");
        expected.push(0);
        assert_eq!(label, expected);
    }

    #[test]
    fn both_roles_derive_identical_keys() {
        let p = Parameters::test_default(Mode::Internal);
        let mut rng = OsRng;

        let (sk_c, pk_c) = key_gen(p.group, &mut rng);
        let (sk_s, pk_s) = key_gen(p.group, &mut rng);
        let esk_c = p.group.random_scalar(&mut rng);
        let epk_c = p.group.base().mult(&esk_c).serialize();
        let esk_s = p.group.random_scalar(&mut rng);
        let epk_s = p.group.base().mult(&esk_s).serialize();

        let serialized_ke1 = vec![1u8; 96];
        let serialized_response = vec![2u8; 192];
        let nonce_s = vec![3u8; 32];

        let client = core_3dh(
            Role::Client,
            &p,
            &esk_c,
            &p.group.decode_scalar(&sk_c).unwrap(),
            &epk_s,
            &pk_s,
            b"client",
            b"server",
            &serialized_ke1,
            &serialized_response,
            &nonce_s,
            &epk_s,
        )
        .unwrap();

        let server = core_3dh(
            Role::Server,
            &p,
            &esk_s,
            &p.group.decode_scalar(&sk_s).unwrap(),
            &epk_c,
            &pk_c,
            b"client",
            b"server",
            &serialized_ke1,
            &serialized_response,
            &nonce_s,
            &epk_s,
        )
        .unwrap();

        assert_eq!(client.server_mac, server.server_mac);
        assert_eq!(client.client_mac, server.client_mac);
        assert_eq!(client.session_key, server.session_key);
    }

    #[test]
    fn transcript_differences_change_every_key() {
        let p = Parameters::test_default(Mode::Internal);
        let mut rng = OsRng;

        let (sk, pk) = key_gen(p.group, &mut rng);
        let esk = p.group.random_scalar(&mut rng);
        let epk = p.group.base().mult(&esk).serialize();
        let secret_key = p.group.decode_scalar(&sk).unwrap();

        let run = |identity: &[u8]| {
            core_3dh(
                Role::Client,
                &p,
                &esk,
                &secret_key,
                &epk,
                &pk,
                identity,
                b"server",
                &[1u8; 96],
                &[2u8; 192],
                &[3u8; 32],
                &epk,
            )
            .unwrap()
        };

        let first = run(b"client");
        let second = run(b"someone-else");
        assert_ne!(first.server_mac, second.server_mac);
        assert_ne!(first.client_mac, second.client_mac);
        assert_ne!(first.session_key, second.session_key);
    }
}
