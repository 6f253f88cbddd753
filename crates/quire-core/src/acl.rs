//! ACL templates and applied snapshots.
//!
//! A template is a named, editable list of entries owned by one principal.
//! Applying a template to a bucket or object copies its `(id, kind, bits)`
//! triples into an [`AclSnapshot`]; later template edits do not reach
//! existing snapshots.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::Id;

/// Whether an entry names a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Group,
}

impl EntryKind {
    pub const fn code(self) -> u32 {
        match self {
            Self::User => 0,
            Self::Group => 1,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::User),
            1 => Ok(Self::Group),
            other => Err(CoreError::InvalidEntryKind(other)),
        }
    }
}

/// One template entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub id: Id,
    pub kind: EntryKind,
    pub bits: u32,
    /// Display label of the resolved user UID or group name.
    pub entity: String,
}

/// A named, owned, editable ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclTemplate {
    pub id: Id,
    pub owner: Id,
    pub name: String,
    pub entries: Vec<AclEntry>,
}

impl AclTemplate {
    /// Template IDs are unique per `(owner, name)`.
    pub fn derive_id(owner: &Id, name: &str) -> Id {
        Id::derive("acl", &[&owner.to_hex(), name])
    }

    pub fn new(owner: Id, name: impl Into<String>, entries: Vec<AclEntry>) -> Self {
        let name = name.into();
        Self {
            id: Self::derive_id(&owner, &name),
            owner,
            name,
            entries,
        }
    }

    fn position(&self, kind: EntryKind, id: &Id) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.kind == kind && e.id == *id)
    }

    pub fn find(&self, kind: EntryKind, id: &Id) -> Option<&AclEntry> {
        self.position(kind, id).map(|i| &self.entries[i])
    }

    pub fn add_entry(&mut self, entry: AclEntry) -> Result<()> {
        if self.position(entry.kind, &entry.id).is_some() {
            return Err(CoreError::EntryPresent {
                kind: entry.kind,
                id: entry.id,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn edit_entry(&mut self, kind: EntryKind, id: &Id, bits: u32) -> Result<()> {
        let i = self
            .position(kind, id)
            .ok_or(CoreError::EntryMissing { kind, id: *id })?;
        self.entries[i].bits = bits;
        Ok(())
    }

    pub fn remove_entry(&mut self, kind: EntryKind, id: &Id) -> Result<AclEntry> {
        let i = self
            .position(kind, id)
            .ok_or(CoreError::EntryMissing { kind, id: *id })?;
        Ok(self.entries.remove(i))
    }

    /// Freeze the current entries.
    pub fn snapshot(&self) -> AclSnapshot {
        AclSnapshot {
            entries: self
                .entries
                .iter()
                .map(|e| SnapshotEntry {
                    id: e.id,
                    kind: e.kind,
                    bits: e.bits,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: Id,
    pub kind: EntryKind,
    pub bits: u32,
}

/// A by-value ACL embedded in a bucket or object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AclSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl AclSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }
}
