//! Caller credentials and identity resolution.

use std::collections::BTreeMap;

use crate::crypto::{Ed25519PublicKey, Keypair};
use crate::error::IdentityError;

/// Credential attribute carrying a caller-chosen user ID.
pub const UID_ATTRIBUTE: &str = "uid";

/// The ambient identity of a caller, as presented by the host.
pub trait Credential: Send + Sync {
    fn issuer(&self) -> Result<String, IdentityError>;

    fn attribute(&self, name: &str) -> Result<Option<String>, IdentityError>;

    fn unique_id(&self) -> Result<String, IdentityError>;
}

/// Derive the stable UID of a caller.
///
/// `issuer##uid` when the credential carries a `uid` attribute, otherwise
/// `issuer##$unique-id`.
pub fn resolve_uid(credential: &dyn Credential) -> Result<String, IdentityError> {
    let issuer = credential.issuer()?;
    match credential.attribute(UID_ATTRIBUTE)? {
        Some(uid) => Ok(format!("{}##{}", issuer, uid)),
        None => Ok(format!("{}##${}", issuer, credential.unique_id()?)),
    }
}

/// A credential backed by an Ed25519 key.
///
/// The unique id is the hex public key.
#[derive(Debug, Clone)]
pub struct KeyCredential {
    issuer: String,
    attributes: BTreeMap<String, String>,
    public_key: Ed25519PublicKey,
}

impl KeyCredential {
    pub fn new(issuer: impl Into<String>, keypair: &Keypair) -> Self {
        Self {
            issuer: issuer.into(),
            attributes: BTreeMap::new(),
            public_key: keypair.public_key(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }
}

impl Credential for KeyCredential {
    fn issuer(&self) -> Result<String, IdentityError> {
        if self.issuer.is_empty() {
            return Err(IdentityError::Issuer("credential carries no issuer".into()));
        }
        Ok(self.issuer.clone())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, IdentityError> {
        Ok(self.attributes.get(name).cloned())
    }

    fn unique_id(&self) -> Result<String, IdentityError> {
        Ok(self.public_key.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_uid_attribute() {
        let cred = KeyCredential::new("org1", &Keypair::from_seed(&[1; 32]))
            .with_attribute(UID_ATTRIBUTE, "alice");
        assert_eq!(resolve_uid(&cred).unwrap(), "org1##alice");
    }

    #[test]
    fn test_resolve_falls_back_to_unique_id() {
        let keypair = Keypair::from_seed(&[2; 32]);
        let cred = KeyCredential::new("org1", &keypair);
        assert_eq!(
            resolve_uid(&cred).unwrap(),
            format!("org1##${}", keypair.public_key().to_hex())
        );
    }

    #[test]
    fn test_missing_issuer_is_an_error() {
        let cred = KeyCredential::new("", &Keypair::from_seed(&[3; 32]));
        assert!(matches!(resolve_uid(&cred), Err(IdentityError::Issuer(_))));
    }
}
