// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The client façade: registration and login flows.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::ake;
use crate::ake::client::AkeClient;
use crate::envelope::{self, Envelope};
use crate::errors::ProtocolError;
use crate::messages::{
    CredentialRequest, RegistrationRequest, RegistrationResponse, RegistrationUpload, KE1, KE2,
    KE3,
};
use crate::oprf;
use crate::parameters::Parameters;
use crate::Credentials;

/// An OPAQUE client. One instance serves a single registration or login
/// flow; the state between the two calls of a flow lives inside.
#[derive(Debug)]
pub struct Client {
    p: Parameters,
    oprf: Option<oprf::OprfClient>,
    ake: AkeClient,
}

impl Client {
    pub(crate) fn new(p: Parameters) -> Self {
        Self {
            p,
            oprf: None,
            ake: AkeClient::new(),
        }
    }

    /// Generates a fresh key pair in the AKE group, for clients registering
    /// in External mode.
    pub fn key_gen<R: RngCore + CryptoRng>(&self, rng: &mut R) -> (Vec<u8>, Vec<u8>) {
        ake::key_gen(self.p.group, rng)
    }

    /// Starts registration by blinding the password.
    pub fn registration_init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        password: &[u8],
    ) -> Result<RegistrationRequest, ProtocolError> {
        let (state, blinded) = oprf::blind(self.p.group, rng, password);
        self.oprf = Some(state);

        Ok(RegistrationRequest {
            data: blinded.serialize(),
        })
    }

    /// Completes registration: finishes the OPRF, builds the envelope and
    /// returns the upload for the server together with the export key.
    ///
    /// `client_secret_key` must be provided in External mode and is ignored
    /// otherwise.
    pub fn registration_finalize<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        client_secret_key: Option<&[u8]>,
        credentials: &Credentials,
        response: &RegistrationResponse,
    ) -> Result<(RegistrationUpload, Vec<u8>), ProtocolError> {
        let oprf_state = self.oprf.take().ok_or(ProtocolError::Misuse)?;

        self.p.group.decode_element(&response.server_public_key)?;
        let oprf_output = oprf::finalize(self.p.group, &oprf_state, &response.data)?;
        let mut randomized_pwd = envelope::build_prk(&self.p, &oprf_output)?;

        #[cfg(feature = "test-overrides")]
        let forced_nonce = credentials.envelope_nonce.clone();
        #[cfg(not(feature = "test-overrides"))]
        let forced_nonce = None;

        let created = envelope::create(
            &self.p,
            rng,
            &randomized_pwd,
            &response.server_public_key,
            client_secret_key,
            credentials.client.as_deref(),
            credentials.server.as_deref(),
            forced_nonce,
        );
        let masking_key = envelope::masking_key(&self.p, &randomized_pwd);
        randomized_pwd.zeroize();
        let (envelope, public_key, export_key) = created?;

        Ok((
            RegistrationUpload {
                public_key,
                masking_key: masking_key?,
                envelope: envelope.serialize(),
            },
            export_key,
        ))
    }

    /// Starts a login flow: blinds the password and emits KE1.
    pub fn init<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        password: &[u8],
    ) -> Result<KE1, ProtocolError> {
        let (state, blinded) = oprf::blind(self.p.group, rng, password);
        self.oprf = Some(state);

        self.ake.start(
            &self.p,
            rng,
            CredentialRequest {
                data: blinded.serialize(),
            },
        )
    }

    /// Completes a login flow: finishes the OPRF, unmasks the credential
    /// response, recovers the envelope, verifies the server MAC and emits
    /// KE3 together with the export key. The session key is available
    /// afterwards through [`Client::session_key`].
    pub fn finish(
        &mut self,
        client_identity: Option<&[u8]>,
        server_identity: Option<&[u8]>,
        ke2: &KE2,
    ) -> Result<(KE3, Vec<u8>), ProtocolError> {
        let response = &ke2.credential_response;

        let expected_len = self.p.ake_point_length() + self.p.envelope_size();
        if response.masked_response.len() != expected_len {
            return Err(ProtocolError::InvalidMessageLength {
                name: "masked_response",
                expected: expected_len,
                actual: response.masked_response.len(),
            });
        }

        let oprf_state = self.oprf.take().ok_or(ProtocolError::Misuse)?;
        let oprf_output = oprf::finalize(self.p.group, &oprf_state, &response.data)?;
        let mut randomized_pwd = envelope::build_prk(&self.p, &oprf_output)?;

        let mut masking_key = envelope::masking_key(&self.p, &randomized_pwd)?;
        let clear = self.p.mask_response(
            &masking_key,
            &response.masking_nonce,
            &response.masked_response,
        )?;
        masking_key.zeroize();

        let server_public_key = clear[..self.p.ake_point_length()].to_vec();
        let envelope = Envelope::deserialize(&self.p, &clear[self.p.ake_point_length()..])?;

        let recovered = envelope::recover(
            &self.p,
            &randomized_pwd,
            &server_public_key,
            &envelope,
            client_identity,
            server_identity,
        );
        randomized_pwd.zeroize();
        let (mut client_secret_key, client_public_key, export_key) = recovered?;

        let client_identity = client_identity.unwrap_or(&client_public_key);
        let server_identity = server_identity.unwrap_or(&server_public_key);

        let ke3 = self.ake.finalize(
            &self.p,
            client_identity,
            server_identity,
            &client_secret_key,
            &server_public_key,
            ke2,
        );
        client_secret_key.zeroize();

        Ok((ke3?, export_key))
    }

    /// The shared session key, available after a successful
    /// [`Client::finish`].
    pub fn session_key(&self) -> Option<&[u8]> {
        self.ake.session_key()
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
