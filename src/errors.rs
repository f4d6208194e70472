// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol

use displaydoc::Display;
use thiserror::Error;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Copy, Debug, Display, Eq, Error, Hash, PartialEq)]
pub enum InternalError {
    /// Computing HKDF failed while deriving subkeys
    HkdfError,
    /// Computing HMAC failed while supplying a secret key
    HmacError,
    /// Computing the memory-hard function failed
    MhfError,
    /// Integer does not fit into the requested byte width
    I2ospError,
}

/// Represents an error in protocol handling
#[derive(Clone, Copy, Debug, Display, Eq, Error, Hash, PartialEq)]
pub enum ProtocolError {
    /// Internal error during the protocol run: {0}
    Internal(InternalError),
    /// Invalid length for {name}: expected {expected}, but is actually {actual}.
    InvalidMessageLength {
        /// name of the checked field
        name: &'static str,
        /// expected length
        expected: usize,
        /// actual length
        actual: usize,
    },
    /// Configuration encoding has an invalid length.
    InvalidConfigurationLength,
    /// Unrecognized configuration identifier or parameter value.
    InvalidConfiguration,
    /// Input could not be decoded to a group element.
    InvalidPoint,
    /// Input could not be decoded to a group scalar.
    InvalidScalar,
    /// The evaluated element received from the server is invalid.
    OprfEvaluationFailure,
    /// Invalid envelope authentication tag.
    InvalidEnvelope,
    /// Failed to authenticate the server: invalid server mac.
    InvalidServerMac,
    /// Failed to authenticate the client: invalid client mac.
    InvalidClientMac,
    /// Invalid state length.
    InvalidStateLength,
    /// Protocol method called out of order.
    Misuse,
}

impl From<InternalError> for ProtocolError {
    fn from(e: InternalError) -> ProtocolError {
        ProtocolError::Internal(e)
    }
}

pub(crate) mod utils {
    use super::*;

    pub fn check_slice_size<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], ProtocolError> {
        if slice.len() != expected_len {
            return Err(ProtocolError::InvalidMessageLength {
                name: arg_name,
                expected: expected_len,
                actual: slice.len(),
            });
        }
        Ok(slice)
    }
}
