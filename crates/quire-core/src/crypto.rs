//! Caller key material.
//!
//! A [`KeyCredential`](crate::KeyCredential) is built from a [`Keypair`]; its
//! hex public key is the unique id used when no `uid` attribute is present.

use std::fmt;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Ed25519 verifying key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Ed25519PublicKey({}..)", &hex[..12])
    }
}

/// A caller key. Only the public half is kept; the signing key never
/// outlives construction.
#[derive(Clone)]
pub struct Keypair {
    public: Ed25519PublicKey,
}

impl Keypair {
    /// A fresh key from the operating system's RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// The key deterministically derived from `seed`.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(secret: SigningKey) -> Self {
        Self {
            public: Ed25519PublicKey(secret.verifying_key().to_bytes()),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.public
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .finish()
    }
}
