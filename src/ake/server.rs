// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Server side of the key exchange: answers KE1 with KE2, verifies KE3.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::{core_3dh, Role};
use crate::errors::ProtocolError;
use crate::group::Scalar;
use crate::hash::ct_equal;
use crate::messages::{CredentialResponse, KE1, KE2, KE3};
use crate::parameters::Parameters;

/// The state the server keeps between its two calls: the client MAC it
/// expects in KE3 and the session key it will release on success.
pub(crate) struct AkeServer {
    expected_client_mac: Option<Vec<u8>>,
    session_key: Option<Vec<u8>>,
}

impl AkeServer {
    pub(crate) fn new() -> Self {
        Self {
            expected_client_mac: None,
            session_key: None,
        }
    }

    /// Samples the server ephemeral pair and nonce, runs the 3DH core and
    /// assembles KE2.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn response<R: RngCore + CryptoRng>(
        &mut self,
        p: &Parameters,
        rng: &mut R,
        server_secret_key: &Scalar,
        client_identity: &[u8],
        server_identity: &[u8],
        client_public_key: &[u8],
        ke1: &KE1,
        credential_response: CredentialResponse,
    ) -> Result<KE2, ProtocolError> {
        let mut esk = p.group.random_scalar(rng);
        let epk_s = p.group.base().mult(&esk).serialize();
        let mut nonce_s = vec![0u8; p.nonce_len];
        rng.fill_bytes(&mut nonce_s);

        let output = core_3dh(
            Role::Server,
            p,
            &esk,
            server_secret_key,
            &ke1.epk_u,
            client_public_key,
            client_identity,
            server_identity,
            &ke1.serialize(),
            &credential_response.serialize(),
            &nonce_s,
            &epk_s,
        );
        esk.zeroize();
        let output = output?;

        self.expected_client_mac = Some(output.client_mac);
        self.session_key = Some(output.session_key);

        Ok(KE2 {
            credential_response,
            nonce_s,
            epk_s,
            mac: output.server_mac,
        })
    }

    /// Constant-time comparison of the received client MAC against the
    /// expected one.
    pub(crate) fn finalize(&self, ke3: &KE3) -> Result<(), ProtocolError> {
        let expected = self
            .expected_client_mac
            .as_ref()
            .ok_or(ProtocolError::Misuse)?;

        if !ct_equal(expected, &ke3.mac) {
            return Err(ProtocolError::InvalidClientMac);
        }

        Ok(())
    }

    pub(crate) fn session_key(&self) -> Option<&[u8]> {
        self.session_key.as_deref()
    }

    pub(crate) fn expected_client_mac(&self) -> Option<&[u8]> {
        self.expected_client_mac.as_deref()
    }

    /// Serializes the in-flight state as `expected_client_mac ∥ session_key`.
    pub(crate) fn serialize_state(&self) -> Result<Vec<u8>, ProtocolError> {
        match (&self.expected_client_mac, &self.session_key) {
            (Some(mac), Some(key)) => Ok([&mac[..], &key[..]].concat()),
            _ => Err(ProtocolError::Misuse),
        }
    }

    pub(crate) fn set_state(&mut self, expected_client_mac: Vec<u8>, session_key: Vec<u8>) {
        self.expected_client_mac = Some(expected_client_mac);
        self.session_key = Some(session_key);
    }
}

impl Zeroize for AkeServer {
    fn zeroize(&mut self) {
        if let Some(mac) = self.expected_client_mac.as_mut() {
            mac.zeroize();
        }
        if let Some(session_key) = self.session_key.as_mut() {
            session_key.zeroize();
        }
    }
}

impl Drop for AkeServer {
    fn drop(&mut self) {
        self.zeroize();
    }
}
