//! Stored records and the listing shapes built from them.
//!
//! Records are plain data. Each implements [`Record`], which ties it to the
//! state key it lives under.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::acl::{AclSnapshot, AclTemplate};
use crate::error::Result;
use crate::key::{RecordKind, StateKey};
use crate::perms::{self, has_all};
use crate::types::Id;

/// A record that knows its own state key.
pub trait Record: Serialize {
    const KIND: RecordKind;

    fn key(&self) -> Result<StateKey>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Principals
// ─────────────────────────────────────────────────────────────────────────────

/// A link from a user to one of its sub-users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUser {
    pub id: Id,
    pub uid: String,
    /// Bucket name (or `"*"`) to access bits.
    pub perms: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub uid: String,
    pub sys_perms: u32,
    pub parent: Option<Id>,
    pub sub_users: Vec<SubUser>,
}

impl User {
    pub fn derive_id(uid: &str) -> Id {
        Id::derive("user", &[uid])
    }

    pub fn new(uid: impl Into<String>, sys_perms: u32, parent: Option<Id>) -> Self {
        let uid = uid.into();
        Self {
            id: Self::derive_id(&uid),
            uid,
            sys_perms,
            parent,
            sub_users: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn can(&self, required: u32) -> bool {
        has_all(self.sys_perms, required)
    }

    pub fn sub_user(&self, id: &Id) -> Option<&SubUser> {
        self.sub_users.iter().find(|s| s.id == *id)
    }

    pub fn sub_user_by_uid_mut(&mut self, uid: &str) -> Option<&mut SubUser> {
        self.sub_users.iter_mut().find(|s| s.uid == uid)
    }
}

impl Record for User {
    const KIND: RecordKind = RecordKind::User;

    fn key(&self) -> Result<StateKey> {
        Ok(StateKey::user(&self.id))
    }
}

/// A link from a group to one of its subgroups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub id: Id,
    pub name: String,
    pub perms: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Id,
    pub name: String,
    /// Absent only for the reserved `none` group.
    pub owner: Option<Id>,
    pub parent: Option<Id>,
    pub members: Vec<Id>,
    pub sub_groups: Vec<SubGroup>,
}

impl Group {
    pub const NONE: &'static str = "none";

    pub fn derive_id(name: &str) -> Id {
        Id::derive("group", &[name])
    }

    pub fn new(name: impl Into<String>, owner: Id, parent: Option<Id>) -> Self {
        let name = name.into();
        Self {
            id: Self::derive_id(&name),
            name,
            owner: Some(owner),
            parent,
            members: Vec::new(),
            sub_groups: Vec::new(),
        }
    }

    /// The reserved ownerless group written at ledger initialization.
    pub fn none() -> Self {
        Self {
            id: Id::NONE_GROUP,
            name: Self::NONE.to_string(),
            owner: None,
            parent: None,
            members: Vec::new(),
            sub_groups: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, id: &Id) -> bool {
        self.owner.as_ref() == Some(id)
    }

    pub fn has_member(&self, id: &Id) -> bool {
        self.members.contains(id)
    }

    pub fn sub_group(&self, id: &Id) -> Option<&SubGroup> {
        self.sub_groups.iter().find(|s| s.id == *id)
    }

    pub fn sub_group_by_name_mut(&mut self, name: &str) -> Option<&mut SubGroup> {
        self.sub_groups.iter_mut().find(|s| s.name == name)
    }
}

impl Record for Group {
    const KIND: RecordKind = RecordKind::Group;

    fn key(&self) -> Result<StateKey> {
        Ok(StateKey::group(&self.id))
    }
}

impl Record for AclTemplate {
    const KIND: RecordKind = RecordKind::Acl;

    fn key(&self) -> Result<StateKey> {
        Ok(StateKey::acl(&self.id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Buckets and objects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub owner: Id,
    pub acl: Option<AclSnapshot>,
    pub metadata: BTreeMap<String, String>,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl Record for Bucket {
    const KIND: RecordKind = RecordKind::Bucket;

    fn key(&self) -> Result<StateKey> {
        StateKey::bucket(&self.name)
    }
}

/// Object state flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectFlags(pub u64);

impl ObjectFlags {
    /// No backing bytes in blob storage.
    pub const INDEX_ONLY: Self = Self(0x01);
    /// Bytes have not been confirmed uploaded.
    pub const STAGED: Self = Self(0x02);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for ObjectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: Id,
    pub bucket: String,
    pub key: String,
    pub owner: Id,
    pub acl: Option<AclSnapshot>,
    /// Hex content digest supplied by the uploader.
    pub digest: String,
    pub size: u64,
    pub metadata: BTreeMap<String, String>,
    pub tags: Vec<String>,
    /// Unix milliseconds.
    pub created_at: i64,
    pub flags: ObjectFlags,
}

impl Object {
    /// `generation` separates writes that agree on every other part, such as
    /// a delete and re-create of one key within the same millisecond.
    pub fn derive_id(
        bucket: &str,
        key: &str,
        owner: &Id,
        created_at: i64,
        digest: &str,
        generation: u32,
    ) -> Id {
        Id::derive(
            "object",
            &[
                bucket,
                key,
                &owner.to_hex(),
                &created_at.to_string(),
                digest,
                &generation.to_string(),
            ],
        )
    }

    pub fn is_index_only(&self) -> bool {
        self.flags.contains(ObjectFlags::INDEX_ONLY)
    }

    pub fn is_staged(&self) -> bool {
        self.flags.contains(ObjectFlags::STAGED)
    }
}

impl Record for Object {
    const KIND: RecordKind = RecordKind::Object;

    fn key(&self) -> Result<StateKey> {
        StateKey::object(&self.bucket, &self.key)
    }
}

/// Tombstone kept after an object is removed, until its owner purges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecord {
    pub object: Object,
    pub deleter: Id,
    /// Unix milliseconds.
    pub deleted_at: i64,
}

impl Record for DeleteRecord {
    const KIND: RecordKind = RecordKind::DeletedObject;

    fn key(&self) -> Result<StateKey> {
        StateKey::deleted(&self.object.bucket, &self.object.id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Indexes
// ─────────────────────────────────────────────────────────────────────────────

/// Declaration of a secondary index over one metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: Id,
    pub owner: Id,
    pub bucket: String,
    pub field: String,
}

impl IndexRecord {
    pub fn derive_id(owner: &Id, bucket: &str, field: &str) -> Id {
        Id::derive("index", &[&owner.to_hex(), bucket, field])
    }

    pub fn new(owner: Id, bucket: impl Into<String>, field: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let field = field.into();
        Self {
            id: Self::derive_id(&owner, &bucket, &field),
            owner,
            bucket,
            field,
        }
    }
}

impl Record for IndexRecord {
    const KIND: RecordKind = RecordKind::Index;

    fn key(&self) -> Result<StateKey> {
        StateKey::index(&self.owner, &self.bucket, &self.field)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listings
// ─────────────────────────────────────────────────────────────────────────────

/// One object in a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingObject {
    pub key: String,
    pub owner: Id,
    pub size: u64,
    pub created_at: i64,
    pub digest: String,
    pub id: Option<Id>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub tags: Option<Vec<String>>,
}

impl ListingObject {
    /// `include_meta` adds the object ID, metadata and tags.
    pub fn from_object(object: &Object, include_meta: bool) -> Self {
        Self {
            key: object.key.clone(),
            owner: object.owner,
            size: object.size,
            created_at: object.created_at,
            digest: object.digest.clone(),
            id: include_meta.then_some(object.id),
            metadata: include_meta.then(|| object.metadata.clone()),
            tags: include_meta.then(|| object.tags.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListing {
    pub bucket: String,
    pub count: usize,
    /// Continuation token; `None` when the listing is exhausted.
    pub token: Option<String>,
    pub objects: Vec<ListingObject>,
}

/// Effective per-principal rights, keyed by user or group ID.
pub type PermissionMap = BTreeMap<Id, u32>;

/// Seed map for a single principal: full rights over itself.
pub fn seed_map(id: Id) -> PermissionMap {
    let mut map = PermissionMap::new();
    map.insert(id, perms::FULL);
    map
}
