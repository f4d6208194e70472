// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Memory-hard password stretching applied to the OPRF output on the client.

use crate::errors::{InternalError, ProtocolError};

// Scrypt cost parameters: N = 2^15, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

// Argon2 needs a salt; the stretch must stay deterministic in its input, so a
// fixed all-zero salt is used, as for any password-independent KSF salt.
const ARGON2_SALT: [u8; 16] = [0u8; 16];

/// Identifies the memory-hard function for expensive key derivation on the
/// client.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Mhf {
    /// No stretching; returns its input. Only acceptable for tests.
    Identity = 1,
    /// scrypt with N=32768, r=8, p=1.
    Scrypt = 2,
    /// Argon2id with the argon2 crate's default cost parameters.
    Argon2id = 3,
}

impl Mhf {
    /// Stretches `input`, producing the same number of bytes.
    pub(crate) fn harden(&self, input: &[u8]) -> Result<Vec<u8>, InternalError> {
        match self {
            Mhf::Identity => Ok(input.to_vec()),
            Mhf::Scrypt => {
                let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, input.len())
                    .map_err(|_| InternalError::MhfError)?;
                let mut output = vec![0u8; input.len()];
                scrypt::scrypt(input, &[], &params, &mut output)
                    .map_err(|_| InternalError::MhfError)?;
                Ok(output)
            }
            Mhf::Argon2id => {
                let mut output = vec![0u8; input.len()];
                argon2::Argon2::default()
                    .hash_password_into(input, &ARGON2_SALT, &mut output)
                    .map_err(|_| InternalError::MhfError)?;
                Ok(output)
            }
        }
    }
}

impl TryFrom<u8> for Mhf {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Mhf::Identity),
            2 => Ok(Mhf::Scrypt),
            3 => Ok(Mhf::Argon2id),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        let input = [0x5au8; 64];
        assert_eq!(Mhf::Identity.harden(&input).unwrap(), input.to_vec());
    }

    #[test]
    fn stretching_is_deterministic_and_length_preserving() {
        let input = [0x42u8; 64];
        for mhf in [Mhf::Scrypt, Mhf::Argon2id] {
            let first = mhf.harden(&input).unwrap();
            assert_eq!(first.len(), input.len());
            assert_ne!(first, input.to_vec());
            assert_eq!(first, mhf.harden(&input).unwrap());
        }
    }
}
