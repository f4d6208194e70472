// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The server façade: registration responses and the login key exchange.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::ake;
use crate::ake::server::AkeServer;
use crate::encoding::pad_point;
use crate::errors::ProtocolError;
use crate::messages::{
    CredentialRequest, CredentialResponse, RegistrationRequest, RegistrationResponse,
    RegistrationUpload, KE1, KE2, KE3,
};
use crate::oprf;
use crate::parameters::Parameters;
use crate::ClientRecord;

const STR_OPRF_KEY: &[u8] = b"OprfKey";

/// An OPAQUE server. One instance serves a single login flow; the AKE state
/// between [`Server::init`] and [`Server::finish`] lives inside and can be
/// serialized for multi-process deployments.
pub struct Server {
    p: Parameters,
    ake: AkeServer,
}

impl Server {
    pub(crate) fn new(p: Parameters) -> Self {
        Self {
            p,
            ake: AkeServer::new(),
        }
    }

    /// Generates the server's long-term key pair in the AKE group.
    pub fn key_gen<R: RngCore + CryptoRng>(&self, rng: &mut R) -> (Vec<u8>, Vec<u8>) {
        ake::key_gen(self.p.group, rng)
    }

    /// The per-credential OPRF evaluation. The key is derived
    /// deterministically from the seed and the credential identifier, so
    /// unknown identifiers can be answered consistently across queries.
    fn oprf_response(
        &self,
        oprf_seed: &[u8],
        credential_identifier: &[u8],
        blinded: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        let seed = self.p.kdf.expand(
            oprf_seed,
            &[credential_identifier, STR_OPRF_KEY].concat(),
            self.p.scalar_length(),
        )?;
        let key = oprf::derive_key(self.p.group, &seed, oprf::STR_DERIVE_KEY_PAIR);
        let evaluated = oprf::evaluate(self.p.group, &key, blinded)?;

        Ok(pad_point(
            &evaluated.serialize(),
            self.p.oprf_point_length(),
        ))
    }

    /// Answers a registration request with the evaluated element and the
    /// server's public key.
    pub fn registration_response(
        &self,
        request: &RegistrationRequest,
        server_public_key: &[u8],
        credential_identifier: &[u8],
        oprf_seed: &[u8],
    ) -> Result<RegistrationResponse, ProtocolError> {
        let data = self.oprf_response(oprf_seed, credential_identifier, &request.data)?;

        Ok(RegistrationResponse {
            data,
            server_public_key: server_public_key.to_vec(),
        })
    }

    fn credential_response<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        request: &CredentialRequest,
        server_public_key: &[u8],
        record: &ClientRecord,
        oprf_seed: &[u8],
    ) -> Result<CredentialResponse, ProtocolError> {
        let data = self.oprf_response(oprf_seed, &record.credential_identifier, &request.data)?;

        #[cfg(feature = "test-overrides")]
        let forced_nonce = record.masking_nonce.clone();
        #[cfg(not(feature = "test-overrides"))]
        let forced_nonce: Option<Vec<u8>> = None;

        let masking_nonce = match forced_nonce {
            Some(nonce) => nonce,
            None => {
                let mut nonce = vec![0u8; self.p.nonce_len];
                rng.fill_bytes(&mut nonce);
                nonce
            }
        };

        let clear = [server_public_key, &record.upload.envelope[..]].concat();
        let masked_response =
            self.p
                .mask_response(&record.upload.masking_key, &masking_nonce, &clear)?;

        Ok(CredentialResponse {
            data,
            masking_nonce,
            masked_response,
        })
    }

    /// Responds to KE1 with KE2 for the given client record. For an unknown
    /// credential identifier the caller supplies a record built around
    /// [`Configuration::fake_envelope`](crate::Configuration::fake_envelope)
    /// and a random masking key, which keeps the response indistinguishable
    /// from a registered account's.
    #[allow(clippy::too_many_arguments)]
    pub fn init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        ke1: &KE1,
        server_identity: Option<&[u8]>,
        server_secret_key: &[u8],
        server_public_key: &[u8],
        oprf_seed: &[u8],
        record: &ClientRecord,
    ) -> Result<KE2, ProtocolError> {
        self.p.group.decode_element(server_public_key)?;
        let mut secret_key = self.p.group.decode_scalar(server_secret_key)?;

        let response =
            self.credential_response(rng, &ke1.credential_request, server_public_key, record, oprf_seed)?;

        let client_identity = record
            .client_identity
            .as_deref()
            .unwrap_or(&record.upload.public_key);
        let server_identity = server_identity.unwrap_or(server_public_key);

        let ke2 = self.ake.response(
            &self.p,
            rng,
            &secret_key,
            client_identity,
            server_identity,
            &record.upload.public_key,
            ke1,
            response,
        );
        secret_key.zeroize();

        ke2
    }

    /// Verifies the client MAC in KE3. On success the session key remains
    /// available through [`Server::session_key`].
    pub fn finish(&self, ke3: &KE3) -> Result<(), ProtocolError> {
        self.ake.finalize(ke3)
    }

    /// The shared session key, available after a successful [`Server::init`].
    pub fn session_key(&self) -> Option<&[u8]> {
        self.ake.session_key()
    }

    /// The client MAC expected in KE3, available after [`Server::init`].
    pub fn expected_mac(&self) -> Option<&[u8]> {
        self.ake.expected_client_mac()
    }

    /// Serializes the in-flight AKE state as
    /// `expected_client_mac ∥ session_key`.
    pub fn serialize_state(&self) -> Result<Vec<u8>, ProtocolError> {
        self.ake.serialize_state()
    }

    /// Restores AKE state captured by [`Server::serialize_state`], allowing
    /// [`Server::finish`] to run in a different process than
    /// [`Server::init`].
    pub fn set_ake_state(&mut self, state: &[u8]) -> Result<(), ProtocolError> {
        let mac_size = self.p.mac.size();
        if state.len() != mac_size + self.p.kdf.size() {
            return Err(ProtocolError::InvalidStateLength);
        }

        self.ake
            .set_state(state[..mac_size].to_vec(), state[mac_size..].to_vec());

        Ok(())
    }

    /// Deserializes a [`RegistrationRequest`] with strict length checking.
    pub fn deserialize_registration_request(
        &self,
        input: &[u8],
    ) -> Result<RegistrationRequest, ProtocolError> {
        RegistrationRequest::deserialize(&self.p, input)
    }

    /// Deserializes a [`RegistrationResponse`] with strict length checking.
    pub fn deserialize_registration_response(
        &self,
        input: &[u8],
    ) -> Result<RegistrationResponse, ProtocolError> {
        RegistrationResponse::deserialize(&self.p, input)
    }

    /// Deserializes a [`RegistrationUpload`] with strict length checking.
    pub fn deserialize_registration_upload(
        &self,
        input: &[u8],
    ) -> Result<RegistrationUpload, ProtocolError> {
        RegistrationUpload::deserialize(&self.p, input)
    }

    /// Deserializes a [`KE1`] with strict length checking.
    pub fn deserialize_ke1(&self, input: &[u8]) -> Result<KE1, ProtocolError> {
        KE1::deserialize(&self.p, input)
    }

    /// Deserializes a [`KE2`] with strict length checking.
    pub fn deserialize_ke2(&self, input: &[u8]) -> Result<KE2, ProtocolError> {
        KE2::deserialize(&self.p, input)
    }

    /// Deserializes a [`KE3`] with strict length checking.
    pub fn deserialize_ke3(&self, input: &[u8]) -> Result<KE3, ProtocolError> {
        KE3::deserialize(&self.p, input)
    }
}
