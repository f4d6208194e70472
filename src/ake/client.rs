// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Client side of the key exchange: emits KE1, verifies KE2, emits KE3.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::{core_3dh, Role};
use crate::errors::ProtocolError;
use crate::group::Scalar;
use crate::hash::ct_equal;
use crate::messages::{CredentialRequest, KE1, KE2, KE3};
use crate::parameters::Parameters;

#[derive(Debug)]
pub(crate) struct AkeClient {
    esk: Option<Scalar>,
    serialized_ke1: Option<Vec<u8>>,
    session_key: Option<Vec<u8>>,
}

impl AkeClient {
    pub(crate) fn new() -> Self {
        Self {
            esk: None,
            serialized_ke1: None,
            session_key: None,
        }
    }

    /// Samples the ephemeral pair and the client nonce and assembles KE1.
    pub(crate) fn start<R: RngCore + CryptoRng>(
        &mut self,
        p: &Parameters,
        rng: &mut R,
        credential_request: CredentialRequest,
    ) -> Result<KE1, ProtocolError> {
        let esk = p.group.random_scalar(rng);
        let epk_u = p.group.base().mult(&esk).serialize();
        let mut nonce_u = vec![0u8; p.nonce_len];
        rng.fill_bytes(&mut nonce_u);

        let ke1 = KE1 {
            credential_request,
            nonce_u,
            epk_u,
        };

        self.esk = Some(esk);
        self.serialized_ke1 = Some(ke1.serialize());
        self.session_key = None;

        Ok(ke1)
    }

    /// Completes the exchange: derives the 3DH keys, checks the server MAC
    /// and produces KE3. Consumes the ephemeral state; a failed session
    /// cannot be resumed.
    pub(crate) fn finalize(
        &mut self,
        p: &Parameters,
        client_identity: &[u8],
        server_identity: &[u8],
        client_secret_key: &Scalar,
        server_public_key: &[u8],
        ke2: &KE2,
    ) -> Result<KE3, ProtocolError> {
        let mut esk = self.esk.take().ok_or(ProtocolError::Misuse)?;
        let serialized_ke1 = self.serialized_ke1.take().ok_or(ProtocolError::Misuse)?;

        let output = core_3dh(
            Role::Client,
            p,
            &esk,
            client_secret_key,
            &ke2.epk_s,
            server_public_key,
            client_identity,
            server_identity,
            &serialized_ke1,
            &ke2.credential_response.serialize(),
            &ke2.nonce_s,
            &ke2.epk_s,
        );
        esk.zeroize();
        let output = output?;

        if !ct_equal(&output.server_mac, &ke2.mac) {
            return Err(ProtocolError::InvalidServerMac);
        }

        self.session_key = Some(output.session_key);

        Ok(KE3 {
            mac: output.client_mac,
        })
    }

    pub(crate) fn session_key(&self) -> Option<&[u8]> {
        self.session_key.as_deref()
    }
}

impl Zeroize for AkeClient {
    fn zeroize(&mut self) {
        if let Some(esk) = self.esk.as_mut() {
            esk.zeroize();
        }
        if let Some(session_key) = self.session_key.as_mut() {
            session_key.zeroize();
        }
    }
}

impl Drop for AkeClient {
    fn drop(&mut self) {
        self.zeroize();
    }
}
