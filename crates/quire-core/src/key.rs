//! Structured state keys.
//!
//! A [`StateKey`] is a record kind followed by string segments. The byte form
//! is `0x00 kind 0x00 (segment 0x00)*`, which keeps two properties:
//!
//! - a key built from a subset of leading segments is a byte prefix of every
//!   key that extends it, so partial keys drive prefix scans
//! - segment boundaries are unambiguous, so `("ab", "c")` and `("a", "bc")`
//!   never collide
//!
//! Segments must not contain `0x00`.

use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::Id;

/// Separator byte between kind and segments.
pub const SEPARATOR: u8 = 0x00;

/// Record type discriminator, the first component of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Group,
    Acl,
    Bucket,
    Object,
    DeletedObject,
    Index,
    IndexEntry,
}

impl RecordKind {
    pub const ALL: [RecordKind; 8] = [
        Self::User,
        Self::Group,
        Self::Acl,
        Self::Bucket,
        Self::Object,
        Self::DeletedObject,
        Self::Index,
        Self::IndexEntry,
    ];

    /// Name written into the key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Acl => "ACL",
            Self::Bucket => "Bucket",
            Self::Object => "Object",
            Self::DeletedObject => "DeletedObject",
            Self::Index => "Index",
            Self::IndexEntry => "IndexEntry",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownRecordKind(s.to_string()))
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject segments that would break the key framing.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.as_bytes().contains(&SEPARATOR) {
        return Err(CoreError::ReservedSeparator(segment.to_string()));
    }
    Ok(())
}

/// A composite key: record kind plus ordered segments.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    kind: RecordKind,
    segments: Vec<String>,
}

impl StateKey {
    /// A key with no segments; as a prefix it covers every record of `kind`.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
        }
    }

    /// Append a segment.
    pub fn push(mut self, segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        self.segments.push(segment);
        Ok(self)
    }

    pub fn from_parts(kind: RecordKind, parts: &[&str]) -> Result<Self> {
        parts
            .iter()
            .try_fold(Self::new(kind), |key, part| key.push(*part))
    }

    // Hex IDs never contain NUL.
    fn with_id(mut self, id: &Id) -> Self {
        self.segments.push(id.to_hex());
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Byte form of the key.
    pub fn encode(&self) -> Vec<u8> {
        let len = 2
            + self.kind.as_str().len()
            + self.segments.iter().map(|s| s.len() + 1).sum::<usize>();
        let mut buf = Vec::with_capacity(len);
        buf.push(SEPARATOR);
        buf.extend_from_slice(self.kind.as_str().as_bytes());
        buf.push(SEPARATOR);
        for segment in &self.segments {
            buf.extend_from_slice(segment.as_bytes());
            buf.push(SEPARATOR);
        }
        buf
    }

    /// Parse the byte form produced by [`StateKey::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rest = bytes
            .strip_prefix(&[SEPARATOR])
            .ok_or_else(|| CoreError::MalformedKey("missing leading separator".into()))?;
        let body = rest
            .strip_suffix(&[SEPARATOR])
            .ok_or_else(|| CoreError::MalformedKey("missing trailing separator".into()))?;

        let mut parts = body.split(|b| *b == SEPARATOR).map(|part| {
            std::str::from_utf8(part)
                .map_err(|e| CoreError::MalformedKey(format!("segment is not utf-8: {}", e)))
        });

        let kind = match parts.next() {
            Some(kind) => RecordKind::parse(kind?)?,
            None => return Err(CoreError::MalformedKey("missing kind".into())),
        };
        let segments = parts
            .map(|part| part.map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { kind, segments })
    }

    /// Whether `other` extends this key segment by segment.
    pub fn is_prefix_of(&self, other: &StateKey) -> bool {
        self.kind == other.kind
            && self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Record keys
    // ─────────────────────────────────────────────────────────────────────

    pub fn user(id: &Id) -> Self {
        Self::new(RecordKind::User).with_id(id)
    }

    pub fn group(id: &Id) -> Self {
        Self::new(RecordKind::Group).with_id(id)
    }

    pub fn acl(id: &Id) -> Self {
        Self::new(RecordKind::Acl).with_id(id)
    }

    pub fn bucket(name: &str) -> Result<Self> {
        Self::new(RecordKind::Bucket).push(name)
    }

    /// Prefix over every live object in `bucket`.
    pub fn objects_in(bucket: &str) -> Result<Self> {
        Self::new(RecordKind::Object).push(bucket)
    }

    pub fn object(bucket: &str, key: &str) -> Result<Self> {
        Self::objects_in(bucket)?.push(key)
    }

    /// Prefix over every delete record in `bucket`.
    pub fn deleted_in(bucket: &str) -> Result<Self> {
        Self::new(RecordKind::DeletedObject).push(bucket)
    }

    pub fn deleted(bucket: &str, id: &Id) -> Result<Self> {
        Ok(Self::deleted_in(bucket)?.with_id(id))
    }

    /// Prefix over every index `owner` declared on `bucket`.
    pub fn indexes_of(owner: &Id, bucket: &str) -> Result<Self> {
        Self::new(RecordKind::Index).with_id(owner).push(bucket)
    }

    pub fn index(owner: &Id, bucket: &str, field: &str) -> Result<Self> {
        Self::indexes_of(owner, bucket)?.push(field)
    }

    /// Prefix over every entry of one index.
    pub fn index_entries(index: &Id) -> Self {
        Self::new(RecordKind::IndexEntry).with_id(index)
    }

    /// Prefix over the entries of one index holding `value`.
    pub fn index_value(index: &Id, value: &str) -> Result<Self> {
        Self::index_entries(index).push(value)
    }

    pub fn index_entry(index: &Id, value: &str, object_key: &str) -> Result<Self> {
        Self::index_value(index, value)?.push(object_key)
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({}", self.kind)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        write!(f, ")")
    }
}
