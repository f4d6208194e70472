// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Wire messages of the registration and login flows.
//!
//! Every field is fixed-width for a given configuration, so the encodings
//! are plain concatenations and every deserializer demands an exact length
//! before anything cryptographic happens.

use crate::errors::utils::check_slice_size;
use crate::errors::ProtocolError;
use crate::parameters::Parameters;

/// The blinded password element the client sends to initiate registration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistrationRequest {
    pub(crate) data: Vec<u8>,
}

impl RegistrationRequest {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let checked = check_slice_size(input, p.oprf_point_length(), "registration_request")?;

        Ok(Self {
            data: checked.to_vec(),
        })
    }
}

/// The server's answer to a registration request: the evaluated element and
/// the server's long-term public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistrationResponse {
    pub(crate) data: Vec<u8>,
    pub(crate) server_public_key: Vec<u8>,
}

impl RegistrationResponse {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        [&self.data[..], &self.server_public_key[..]].concat()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let oprf_len = p.oprf_point_length();
        let checked = check_slice_size(
            input,
            oprf_len + p.ake_point_length(),
            "registration_response",
        )?;

        Ok(Self {
            data: checked[..oprf_len].to_vec(),
            server_public_key: checked[oprf_len..].to_vec(),
        })
    }
}

/// The record material the client uploads at the end of registration; the
/// server stores it verbatim under the credential identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistrationUpload {
    pub(crate) public_key: Vec<u8>,
    pub(crate) masking_key: Vec<u8>,
    pub(crate) envelope: Vec<u8>,
}

impl RegistrationUpload {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        [&self.public_key[..], &self.masking_key[..], &self.envelope[..]].concat()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let pk_len = p.ake_point_length();
        let masking_len = p.hash.size();
        let checked = check_slice_size(
            input,
            pk_len + masking_len + p.envelope_size(),
            "registration_upload",
        )?;

        Ok(Self {
            public_key: checked[..pk_len].to_vec(),
            masking_key: checked[pk_len..pk_len + masking_len].to_vec(),
            envelope: checked[pk_len + masking_len..].to_vec(),
        })
    }

    /// The client's long-term public key, as stored by the server.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// The OPRF part of KE1.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialRequest {
    pub(crate) data: Vec<u8>,
}

impl CredentialRequest {
    pub(crate) fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// The masked credential part of KE2.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialResponse {
    pub(crate) data: Vec<u8>,
    pub(crate) masking_nonce: Vec<u8>,
    pub(crate) masked_response: Vec<u8>,
}

impl CredentialResponse {
    pub(crate) fn serialize(&self) -> Vec<u8> {
        [
            &self.data[..],
            &self.masking_nonce[..],
            &self.masked_response[..],
        ]
        .concat()
    }
}

/// The first message of the login flow, client to server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KE1 {
    pub(crate) credential_request: CredentialRequest,
    pub(crate) nonce_u: Vec<u8>,
    pub(crate) epk_u: Vec<u8>,
}

impl KE1 {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.credential_request.serialize()[..],
            &self.nonce_u[..],
            &self.epk_u[..],
        ]
        .concat()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let oprf_len = p.oprf_point_length();
        let checked = check_slice_size(
            input,
            oprf_len + p.nonce_len + p.ake_point_length(),
            "ke1",
        )?;

        Ok(Self {
            credential_request: CredentialRequest {
                data: checked[..oprf_len].to_vec(),
            },
            nonce_u: checked[oprf_len..oprf_len + p.nonce_len].to_vec(),
            epk_u: checked[oprf_len + p.nonce_len..].to_vec(),
        })
    }
}

/// The second message of the login flow, server to client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KE2 {
    pub(crate) credential_response: CredentialResponse,
    pub(crate) nonce_s: Vec<u8>,
    pub(crate) epk_s: Vec<u8>,
    pub(crate) mac: Vec<u8>,
}

impl KE2 {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.credential_response.serialize()[..],
            &self.nonce_s[..],
            &self.epk_s[..],
            &self.mac[..],
        ]
        .concat()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let oprf_len = p.oprf_point_length();
        let ake_len = p.ake_point_length();
        let masked_len = ake_len + p.envelope_size();
        let checked = check_slice_size(
            input,
            oprf_len + 2 * p.nonce_len + masked_len + ake_len + p.mac.size(),
            "ke2",
        )?;

        let mut offset = oprf_len;
        let data = checked[..offset].to_vec();
        let masking_nonce = checked[offset..offset + p.nonce_len].to_vec();
        offset += p.nonce_len;
        let masked_response = checked[offset..offset + masked_len].to_vec();
        offset += masked_len;
        let nonce_s = checked[offset..offset + p.nonce_len].to_vec();
        offset += p.nonce_len;
        let epk_s = checked[offset..offset + ake_len].to_vec();
        offset += ake_len;
        let mac = checked[offset..].to_vec();

        Ok(Self {
            credential_response: CredentialResponse {
                data,
                masking_nonce,
                masked_response,
            },
            nonce_s,
            epk_s,
            mac,
        })
    }
}

/// The third and final message of the login flow, client to server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KE3 {
    pub(crate) mac: Vec<u8>,
}

impl KE3 {
    /// Byte encoding of the message.
    pub fn serialize(&self) -> Vec<u8> {
        self.mac.clone()
    }

    pub(crate) fn deserialize(p: &Parameters, input: &[u8]) -> Result<Self, ProtocolError> {
        let checked = check_slice_size(input, p.mac.size(), "ke3")?;

        Ok(Self {
            mac: checked.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    fn bytes(len: usize, fill: u8) -> Vec<u8> {
        vec![fill; len]
    }

    #[test]
    fn round_trips_at_exact_lengths() {
        let p = Parameters::test_default(Mode::Internal);
        let elem = p.oprf_point_length();

        let request = RegistrationRequest::deserialize(&p, &bytes(elem, 1)).unwrap();
        assert_eq!(
            RegistrationRequest::deserialize(&p, &request.serialize()).unwrap(),
            request
        );

        let response =
            RegistrationResponse::deserialize(&p, &bytes(elem + p.ake_point_length(), 2)).unwrap();
        assert_eq!(
            RegistrationResponse::deserialize(&p, &response.serialize()).unwrap(),
            response
        );

        let upload_len = p.ake_point_length() + p.hash.size() + p.envelope_size();
        let upload = RegistrationUpload::deserialize(&p, &bytes(upload_len, 3)).unwrap();
        assert_eq!(
            RegistrationUpload::deserialize(&p, &upload.serialize()).unwrap(),
            upload
        );

        let ke1_len = elem + p.nonce_len + p.ake_point_length();
        let ke1 = KE1::deserialize(&p, &bytes(ke1_len, 4)).unwrap();
        assert_eq!(KE1::deserialize(&p, &ke1.serialize()).unwrap(), ke1);

        let ke2_len = elem
            + 2 * p.nonce_len
            + p.ake_point_length()
            + p.envelope_size()
            + p.ake_point_length()
            + p.mac.size();
        let ke2 = KE2::deserialize(&p, &bytes(ke2_len, 5)).unwrap();
        assert_eq!(KE2::deserialize(&p, &ke2.serialize()).unwrap(), ke2);

        let ke3 = KE3::deserialize(&p, &bytes(p.mac.size(), 6)).unwrap();
        assert_eq!(KE3::deserialize(&p, &ke3.serialize()).unwrap(), ke3);
    }

    #[test]
    fn off_by_one_lengths_are_rejected() {
        let p = Parameters::test_default(Mode::Internal);
        let elem = p.oprf_point_length();
        let ke1_len = elem + p.nonce_len + p.ake_point_length();
        let ke2_len =
            elem + 2 * p.nonce_len + 2 * p.ake_point_length() + p.envelope_size() + p.mac.size();
        let upload_len = p.ake_point_length() + p.hash.size() + p.envelope_size();

        let cases: &[(usize, fn(&Parameters, &[u8]) -> bool)] = &[
            (elem, |p, b| RegistrationRequest::deserialize(p, b).is_err()),
            (elem + 32, |p, b| {
                RegistrationResponse::deserialize(p, b).is_err()
            }),
            (upload_len, |p, b| {
                RegistrationUpload::deserialize(p, b).is_err()
            }),
            (ke1_len, |p, b| KE1::deserialize(p, b).is_err()),
            (ke2_len, |p, b| KE2::deserialize(p, b).is_err()),
            (p.mac.size(), |p, b| KE3::deserialize(p, b).is_err()),
        ];

        for &(good_len, rejects) in cases {
            assert!(rejects(&p, &bytes(good_len + 1, 0)));
            assert!(rejects(&p, &bytes(good_len - 1, 0)));
        }
    }

    #[test]
    fn external_mode_lengths_include_the_inner_envelope() {
        let p = Parameters::test_default(Mode::External);
        let upload_len = p.ake_point_length() + p.hash.size() + p.envelope_size();
        assert_eq!(upload_len, 32 + 64 + (32 + 64 + 32));
        assert!(RegistrationUpload::deserialize(&p, &bytes(upload_len, 1)).is_ok());
    }
}
