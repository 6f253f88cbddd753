//! Strong identifier type.
//!
//! Every principal, group, template, object and index is named by an [`Id`].
//! IDs are derived, never random: each endorsing peer must compute the same
//! key for the same request.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte identifier, Blake3 over a domain tag and length-prefixed parts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; 32]);

impl Id {
    /// Derive an ID from a domain tag and its identifying parts.
    ///
    /// Parts are length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    pub fn derive(domain: &str, parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"quire/");
        hasher.update(domain.as_bytes());
        hasher.update(&[0]);
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidId(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidId(format!("expected 32 bytes: {}", s)))?;
        Ok(Self(arr))
    }

    /// ID of the reserved `none` group created at ledger initialization.
    pub const NONE_GROUP: Self = Self([0xff; 32]);
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", &self.to_hex()[..16])
    }
}

// Full hex, so IDs in messages can be passed back as arguments.
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Id {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// Stored as hex text so rich-query selectors can compare IDs as strings.
impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hex_roundtrip() {
        let id = Id::from_bytes([0x42; 32]);
        let recovered = Id::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_id_derive_is_deterministic() {
        assert_eq!(Id::derive("user", &["alice"]), Id::derive("user", &["alice"]));
        assert_ne!(Id::derive("user", &["alice"]), Id::derive("group", &["alice"]));
    }

    #[test]
    fn test_id_derive_length_prefixes_parts() {
        assert_ne!(Id::derive("acl", &["ab", "c"]), Id::derive("acl", &["a", "bc"]));
    }

    #[test]
    fn test_id_from_hex_rejects_short_input() {
        assert!(Id::from_hex("abcd").is_err());
        assert!(Id::from_hex("zz").is_err());
    }

    #[test]
    fn test_id_display_parses_back() {
        let id = Id::derive("object", &["photos", "cat.png"]);
        assert_eq!(Id::from_hex(&id.to_string()).unwrap(), id);
        assert_eq!(format!("{:?}", id).len(), "Id()".len() + 16);
    }

    #[test]
    fn test_id_serializes_as_hex_string() {
        let id = Id::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
    }
}
