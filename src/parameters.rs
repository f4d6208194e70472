// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Protocol parameters derived from a [`Configuration`](crate::Configuration),
//! shared by a matched client and server.

use crate::encoding;
use crate::errors::ProtocolError;
use crate::group::Group;
use crate::hash::{Hashing, Kdf, Mac};
use crate::mhf::Mhf;
use crate::Mode;

const STR_CREDENTIAL_RESPONSE_PAD: &[u8] = b"CredentialResponsePad";

#[derive(Clone, Debug)]
pub(crate) struct Parameters {
    pub(crate) group: Group,
    pub(crate) kdf: Kdf,
    pub(crate) mac: Mac,
    pub(crate) hash: Hashing,
    pub(crate) mhf: Mhf,
    pub(crate) mode: Mode,
    pub(crate) context: Vec<u8>,
    pub(crate) nonce_len: usize,
}

impl Parameters {
    pub(crate) fn oprf_point_length(&self) -> usize {
        self.group.element_length()
    }

    pub(crate) fn ake_point_length(&self) -> usize {
        self.group.element_length()
    }

    pub(crate) fn scalar_length(&self) -> usize {
        self.group.scalar_length()
    }

    pub(crate) fn envelope_size(&self) -> usize {
        let inner_size = match self.mode {
            Mode::Internal => 0,
            Mode::External => self.scalar_length(),
        };

        self.nonce_len + self.mac.size() + inner_size
    }

    /// One-time-pad masking of the credential response. Applying the mask a
    /// second time with the same key and nonce restores the input.
    pub(crate) fn mask_response(
        &self,
        masking_key: &[u8],
        masking_nonce: &[u8],
        input: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        let mask = self.kdf.expand(
            masking_key,
            &[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD].concat(),
            input.len(),
        )?;

        Ok(encoding::xor(input, &mask))
    }
}

#[cfg(test)]
impl Parameters {
    /// Default-shaped parameters with an identity MHF, for unit tests.
    pub(crate) fn test_default(mode: Mode) -> Self {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters(mode: Mode) -> Parameters {
        Parameters::test_default(mode)
    }

    #[test]
    fn envelope_size_follows_the_mode() {
        assert_eq!(parameters(Mode::Internal).envelope_size(), 32 + 64);
        assert_eq!(parameters(Mode::External).envelope_size(), 32 + 64 + 32);
    }

    #[test]
    fn masking_is_an_involution() {
        let p = parameters(Mode::Internal);
        let key = [3u8; 64];
        let nonce = [7u8; 32];
        let clear = [9u8; 128];

        let masked = p.mask_response(&key, &nonce, &clear).unwrap();
        assert_ne!(masked, clear.to_vec());
        assert_eq!(p.mask_response(&key, &nonce, &masked).unwrap(), clear);
    }
}
