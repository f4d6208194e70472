// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime-selected hash, KDF and MAC primitives.
//!
//! The configuration carries one identifier per slot (KDF, MAC, transcript
//! hash); the wrappers here bind those identifiers to concrete SHA-2
//! instantiations so the rest of the crate can stay byte-oriented.

use digest::Digest;
use hkdf::Hkdf;
use hmac::Mac as _;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::errors::{InternalError, ProtocolError};

/// Identifies a hash function for the KDF, MAC and transcript-hash slots of a
/// [`Configuration`](crate::Configuration).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Hashing {
    /// SHA-256
    Sha256 = 1,
    /// SHA-512
    Sha512 = 2,
}

impl Hashing {
    /// Output size of the hash function, in bytes.
    pub fn size(&self) -> usize {
        match self {
            Hashing::Sha256 => 32,
            Hashing::Sha512 => 64,
        }
    }
}

impl TryFrom<u8> for Hashing {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Hashing::Sha256),
            2 => Ok(Hashing::Sha512),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// HKDF extract/expand over the configured hash.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Kdf(pub(crate) Hashing);

impl Kdf {
    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
        match self.0 {
            Hashing::Sha256 => Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec(),
            Hashing::Sha512 => Hkdf::<Sha512>::extract(Some(salt), ikm).0.to_vec(),
        }
    }

    /// HKDF-Expand, chained over HMAC. The protocol expands from secrets that
    /// can be shorter than the hash output (an application-chosen oprf seed,
    /// for instance), which the stricter `Hkdf::from_prk` constructor refuses.
    pub fn expand(
        &self,
        prk: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, InternalError> {
        let mac = Mac(self.0);
        let hash_len = self.size();
        let blocks = length.div_ceil(hash_len);
        if blocks > 255 {
            return Err(InternalError::HkdfError);
        }

        let mut okm = Vec::with_capacity(blocks * hash_len);
        let mut previous: Vec<u8> = Vec::new();
        for counter in 1..=blocks {
            previous = mac.mac(prk, &[&previous[..], info, &[counter as u8][..]].concat())?;
            okm.extend_from_slice(&previous);
        }

        okm.truncate(length);
        Ok(okm)
    }
}

/// HMAC over the configured hash.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Mac(pub(crate) Hashing);

impl Mac {
    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn mac(&self, key: &[u8], message: &[u8]) -> Result<Vec<u8>, InternalError> {
        match self.0 {
            Hashing::Sha256 => {
                let mut mac = hmac::Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|_| InternalError::HmacError)?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Hashing::Sha512 => {
                let mut mac = hmac::Hmac::<Sha512>::new_from_slice(key)
                    .map_err(|_| InternalError::HmacError)?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

/// Constant-time equality on authentication tags. Mismatched lengths compare
/// unequal without inspecting the contents.
pub(crate) fn ct_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// A rolling hash over the key-exchange transcript. `sum` reads the digest of
/// everything written so far without disturbing the stream.
#[derive(Clone)]
pub(crate) enum Transcript {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Transcript {
    pub fn new(hashing: Hashing) -> Self {
        match hashing {
            Hashing::Sha256 => Transcript::Sha256(Sha256::new()),
            Hashing::Sha512 => Transcript::Sha512(Sha512::new()),
        }
    }

    pub fn write(&mut self, input: &[u8]) {
        match self {
            Transcript::Sha256(digest) => digest.update(input),
            Transcript::Sha512(digest) => digest.update(input),
        }
    }

    pub fn sum(&self) -> Vec<u8> {
        match self {
            Transcript::Sha256(digest) => digest.clone().finalize().to_vec(),
            Transcript::Sha512(digest) => digest.clone().finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_matches_hkdf_for_full_size_prks() {
        let kdf = Kdf(Hashing::Sha512);
        let prk = kdf.extract(&[], b"input keying material");
        let expanded = kdf.expand(&prk, b"info", 96).unwrap();

        let reference = Hkdf::<Sha512>::from_prk(&prk).unwrap();
        let mut okm = [0u8; 96];
        reference.expand(b"info", &mut okm).unwrap();

        assert_eq!(expanded, okm.to_vec());
    }

    #[test]
    fn expand_accepts_short_prks() {
        let kdf = Kdf(Hashing::Sha512);
        let seed = [1u8; 32];
        let okm = kdf.expand(&seed, b"credential", 32).unwrap();
        assert_eq!(okm.len(), 32);
        assert_eq!(okm, kdf.expand(&seed, b"credential", 32).unwrap());
    }

    #[test]
    fn expand_rejects_oversized_requests() {
        let kdf = Kdf(Hashing::Sha256);
        assert_eq!(
            kdf.expand(&[0u8; 32], b"", 256 * 32),
            Err(InternalError::HkdfError)
        );
    }

    #[test]
    fn transcript_sum_is_non_destructive() {
        let mut transcript = Transcript::new(Hashing::Sha512);
        transcript.write(b"hello");
        let first = transcript.sum();
        assert_eq!(first, transcript.sum());

        transcript.write(b" world");
        assert_eq!(transcript.sum(), Sha512::digest(b"hello world").to_vec());
    }

    #[test]
    fn tag_comparison_handles_length_mismatch() {
        assert!(ct_equal(b"equal", b"equal"));
        assert!(!ct_equal(b"equal", b"equal!"));
        assert!(!ct_equal(b"equal", b"esual"));
    }

    #[test]
    fn identifier_bytes_round_trip() {
        for hashing in [Hashing::Sha256, Hashing::Sha512] {
            assert_eq!(Hashing::try_from(hashing as u8).unwrap(), hashing);
        }
        assert_eq!(
            Hashing::try_from(0),
            Err(ProtocolError::InvalidConfiguration)
        );
    }
}
