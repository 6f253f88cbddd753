//! Permission bitmasks.
//!
//! Two unrelated bit spaces share the `u32` representation: system bits gate
//! principal-level operations, access bits gate bucket and object operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;

/// System permission bits held by a user.
pub mod sys {
    pub const ADD_USERS: u32 = 0x01;
    pub const ADD_SUB_USERS: u32 = 0x02;
    /// Covers both groups and subgroups.
    pub const ADD_GROUPS: u32 = 0x04;
    pub const ADD_BUCKETS: u32 = 0x08;
    /// Granted to the administrator registered by ledger initialization.
    pub const ALL: u32 = 0xFFFF_FFFF;
}

/// Access bits carried by ACL entries and sub-user/subgroup links.
pub mod access {
    pub const LIST: u32 = 0x01;
    pub const READ: u32 = 0x02;
    pub const CREATE: u32 = 0x04;
    pub const OVERWRITE: u32 = 0x08;
    pub const DELETE: u32 = 0x10;
}

/// Rights a principal holds over itself, the seed of every inherited map.
pub const FULL: u32 = 0xFF;

/// Bucket name matching every bucket in a link's permission map.
pub const WILDCARD: &str = "*";

/// A single access right being tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Read,
    Create,
    Overwrite,
    Delete,
    List,
}

impl AccessKind {
    /// The access bit this kind tests.
    pub const fn bit(self) -> u32 {
        match self {
            Self::Read => access::READ,
            Self::Create => access::CREATE,
            Self::Overwrite => access::OVERWRITE,
            Self::Delete => access::DELETE,
            Self::List => access::LIST,
        }
    }

    /// Numeric code used by callers passing integers.
    pub const fn code(self) -> u32 {
        match self {
            Self::Read => 0,
            Self::Create => 1,
            Self::Overwrite => 2,
            Self::Delete => 3,
            Self::List => 4,
        }
    }

    pub fn from_code(code: u32) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Self::Read),
            1 => Ok(Self::Create),
            2 => Ok(Self::Overwrite),
            3 => Ok(Self::Delete),
            4 => Ok(Self::List),
            other => Err(CoreError::InvalidAccessCode(other)),
        }
    }
}

impl TryFrom<u32> for AccessKind {
    type Error = CoreError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

/// Whether `held` contains every bit in `required`.
pub const fn has_all(held: u32, required: u32) -> bool {
    held & required == required
}

/// The grant a link carries for `bucket`.
///
/// An exact entry wins when it is non-zero; a zero or missing exact entry
/// falls back to the wildcard. `None` when neither yields a non-zero grant.
pub fn link_grant(perms: &BTreeMap<String, u32>, bucket: &str) -> Option<u32> {
    match perms.get(bucket) {
        Some(&bits) if bits != 0 => Some(bits),
        _ => perms.get(WILDCARD).copied().filter(|&bits| bits != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_codes_roundtrip() {
        for kind in [
            AccessKind::Read,
            AccessKind::Create,
            AccessKind::Overwrite,
            AccessKind::Delete,
            AccessKind::List,
        ] {
            assert_eq!(AccessKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(matches!(
            AccessKind::from_code(5),
            Err(CoreError::InvalidAccessCode(5))
        ));
    }

    #[test]
    fn test_link_grant_prefers_exact() {
        let mut perms = BTreeMap::new();
        perms.insert("photos".to_string(), access::READ);
        perms.insert(WILDCARD.to_string(), access::LIST);
        assert_eq!(link_grant(&perms, "photos"), Some(access::READ));
        assert_eq!(link_grant(&perms, "other"), Some(access::LIST));
    }

    #[test]
    fn test_link_grant_zero_exact_falls_back() {
        let mut perms = BTreeMap::new();
        perms.insert("photos".to_string(), 0);
        perms.insert(WILDCARD.to_string(), access::LIST);
        assert_eq!(link_grant(&perms, "photos"), Some(access::LIST));

        perms.remove(WILDCARD);
        assert_eq!(link_grant(&perms, "photos"), None);
    }

    #[test]
    fn test_link_grant_zero_wildcard_is_absent() {
        let mut perms = BTreeMap::new();
        perms.insert(WILDCARD.to_string(), 0);
        assert_eq!(link_grant(&perms, "photos"), None);
    }

    #[test]
    fn test_has_all() {
        assert!(has_all(sys::ALL, sys::ADD_BUCKETS));
        assert!(!has_all(sys::ADD_USERS, sys::ADD_USERS | sys::ADD_GROUPS));
    }
}
