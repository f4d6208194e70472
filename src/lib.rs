// Copyright (c) the opaque developers.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the OPAQUE asymmetric password-authenticated key
//! exchange protocol.
//!
//! OPAQUE lets a client and a server authenticate each other with a password
//! without the server ever seeing it, and derive a high-entropy session key
//! on both sides plus an export key only the client learns. The server
//! stores a per-user record that resists offline dictionary attacks if
//! stolen; a network attacker learns nothing beyond one guess per online
//! attempt.
//!
//! Both parties agree on a [`Configuration`] — the group, the KDF/MAC/hash
//! functions, the memory-hard function, the envelope [`Mode`] and the nonce
//! length — which serializes to seven bytes for distribution.
//!
//! # Registration
//!
//! Registration is one round trip over an authenticated channel, producing
//! the record the server stores. Login is a three-message key exchange over
//! any channel:
//!
//! ```
//! use opaque::{ClientRecord, Configuration, Credentials};
//! use rand::rngs::OsRng;
//!
//! # fn main() -> Result<(), opaque::ProtocolError> {
//! let mut rng = OsRng;
//! let configuration = Configuration::default();
//!
//! // Server setup, done once: a long-term key pair and an OPRF seed.
//! let mut server = configuration.server()?;
//! let (server_secret_key, server_public_key) = server.key_gen(&mut rng);
//! let oprf_seed = [0x01u8; 32];
//!
//! // Registration round trip.
//! let mut client = configuration.client()?;
//! let request = client.registration_init(&mut rng, b"password")?;
//!
//! let credential_identifier = b"client";
//! let response = server.registration_response(
//!     &request,
//!     &server_public_key,
//!     credential_identifier,
//!     &oprf_seed,
//! )?;
//!
//! let mut credentials = Credentials::default();
//! credentials.client = Some(b"client".to_vec());
//! credentials.server = Some(b"server".to_vec());
//! let (upload, export_key_registration) =
//!     client.registration_finalize(&mut rng, None, &credentials, &response)?;
//!
//! let record = ClientRecord::new(
//!     credential_identifier.to_vec(),
//!     Some(b"client".to_vec()),
//!     upload,
//! );
//!
//! // Login: KE1 -> KE2 -> KE3.
//! let mut client = configuration.client()?;
//! let ke1 = client.init(&mut rng, b"password")?;
//! let ke2 = server.init(
//!     &mut rng,
//!     &ke1,
//!     Some(&b"server"[..]),
//!     &server_secret_key,
//!     &server_public_key,
//!     &oprf_seed,
//!     &record,
//! )?;
//! let (ke3, export_key_login) =
//!     client.finish(Some(&b"client"[..]), Some(&b"server"[..]), &ke2)?;
//! server.finish(&ke3)?;
//!
//! assert_eq!(client.session_key(), server.session_key());
//! assert_eq!(export_key_registration, export_key_login);
//! # Ok(())
//! # }
//! ```
//!
//! Messages travel as bytes: every message type has a `serialize` method and
//! the [`Client`] and [`Server`] expose matching strict `deserialize_*`
//! methods.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ake;
mod client;
mod encoding;
mod envelope;
pub mod errors;
mod group;
mod hash;
mod messages;
mod mhf;
mod oprf;
mod parameters;
mod server;

pub use client::Client;
pub use errors::ProtocolError;
pub use group::Group;
pub use hash::Hashing;
pub use messages::{
    RegistrationRequest, RegistrationResponse, RegistrationUpload, KE1, KE2, KE3,
};
pub use mhf::Mhf;
pub use server::Server;

use encoding::{i2osp, os2ip};
use parameters::Parameters;

const CONFIGURATION_LENGTH: usize = 7;

/// Designates the envelope mode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Mode {
    /// The client's long-term key is derived from the password; the envelope
    /// stores no key material.
    Internal = 1,
    /// The client brings its own long-term key, stored in the envelope under
    /// a one-time pad.
    External = 2,
}

impl TryFrom<u8> for Mode {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Mode::Internal),
            2 => Ok(Mode::External),
            _ => Err(ProtocolError::InvalidConfiguration),
        }
    }
}

/// The primitive selection shared by a client and a server. Serializes to
/// seven bytes; both parties must hold identical configurations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    /// The prime-order group used for the OPRF and the AKE.
    pub group: Group,
    /// The hash behind HKDF key derivation.
    pub kdf: Hashing,
    /// The hash behind HMAC authentication tags.
    pub mac: Hashing,
    /// The hash for transcripts and general hashing.
    pub hash: Hashing,
    /// The memory-hard function stretching the OPRF output on the client.
    pub mhf: Mhf,
    /// The envelope mode.
    pub mode: Mode,
    /// Optional application context mixed into the key-exchange transcript.
    /// Not part of the 7-byte encoding.
    pub context: Vec<u8>,
    /// Length of protocol nonces in bytes; at least 16, recommended 32.
    pub nonce_len: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            group: Group::Ristretto255Sha512,
            kdf: Hashing::Sha512,
            mac: Hashing::Sha512,
            hash: Hashing::Sha512,
            mhf: Mhf::Scrypt,
            mode: Mode::Internal,
            context: Vec::new(),
            nonce_len: 32,
        }
    }
}

impl Configuration {
    /// The byte encoding of the configuration, always
    /// `CONFIGURATION_LENGTH` bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(vec![
            self.group as u8,
            self.kdf as u8,
            self.mac as u8,
            self.hash as u8,
            self.mhf as u8,
            self.mode as u8,
            i2osp(self.nonce_len, 1)?[0],
        ])
    }

    /// Decodes a configuration, rejecting any length other than
    /// `CONFIGURATION_LENGTH` and any unrecognized identifier.
    pub fn deserialize(encoded: &[u8]) -> Result<Self, ProtocolError> {
        if encoded.len() != CONFIGURATION_LENGTH {
            return Err(ProtocolError::InvalidConfigurationLength);
        }

        let configuration = Self {
            group: Group::try_from(encoded[0])?,
            kdf: Hashing::try_from(encoded[1])?,
            mac: Hashing::try_from(encoded[2])?,
            hash: Hashing::try_from(encoded[3])?,
            mhf: Mhf::try_from(encoded[4])?,
            mode: Mode::try_from(encoded[5])?,
            context: Vec::new(),
            nonce_len: os2ip(&encoded[6..]),
        };

        if configuration.nonce_len < 16 {
            return Err(ProtocolError::InvalidConfiguration);
        }

        Ok(configuration)
    }

    /// A newly instantiated [`Client`] for this configuration.
    pub fn client(&self) -> Result<Client, ProtocolError> {
        Ok(Client::new(self.to_internal()?))
    }

    /// A newly instantiated [`Server`] for this configuration.
    pub fn server(&self) -> Result<Server, ProtocolError> {
        Ok(Server::new(self.to_internal()?))
    }

    /// A zero-filled byte string of the exact envelope size for this
    /// configuration. Used to build records for unknown credential
    /// identifiers so login responses stay uniform (client-enumeration
    /// mitigation).
    pub fn fake_envelope(&self) -> Vec<u8> {
        let inner_size = match self.mode {
            Mode::Internal => 0,
            Mode::External => self.group.scalar_length(),
        };

        vec![0u8; self.nonce_len + self.mac.size() + inner_size]
    }

    fn to_internal(&self) -> Result<Parameters, ProtocolError> {
        if self.nonce_len < 16 || self.nonce_len > 255 {
            return Err(ProtocolError::InvalidConfiguration);
        }

        Ok(Parameters {
            group: self.group,
            kdf: hash::Kdf(self.kdf),
            mac: hash::Mac(self.mac),
            hash: self.hash,
            mhf: self.mhf,
            mode: self.mode,
            context: self.context.clone(),
            nonce_len: self.nonce_len,
        })
    }
}

/// The client and server identities bound into the envelope at
/// registration. Missing identities default to the respective public keys.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// The client identity, e.g. a username.
    pub client: Option<Vec<u8>>,
    /// The server identity, e.g. a domain name.
    pub server: Option<Vec<u8>>,
    /// Forces the envelope nonce, for deterministic tests.
    #[cfg(feature = "test-overrides")]
    pub envelope_nonce: Option<Vec<u8>>,
}

/// The server-side record for one registered client: created at
/// registration, read-only at login.
#[derive(Clone, Debug)]
pub struct ClientRecord {
    /// Opaque handle under which the record is stored, decoupled from the
    /// client identity.
    pub credential_identifier: Vec<u8>,
    /// The client identity bound at registration, if any.
    pub client_identity: Option<Vec<u8>>,
    /// The upload received at the end of registration.
    pub upload: RegistrationUpload,
    /// Forces the masking nonce, for deterministic tests.
    #[cfg(feature = "test-overrides")]
    pub masking_nonce: Option<Vec<u8>>,
}

impl ClientRecord {
    /// Assembles a record from the parts the server persists.
    pub fn new(
        credential_identifier: Vec<u8>,
        client_identity: Option<Vec<u8>>,
        upload: RegistrationUpload,
    ) -> Self {
        Self {
            credential_identifier,
            client_identity,
            upload,
            #[cfg(feature = "test-overrides")]
            masking_nonce: None,
        }
    }
}
