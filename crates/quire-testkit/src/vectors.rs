//! Golden vectors for state key encoding.
//!
//! Keys decide ledger ordering and prefix scans. Every vector pins the exact
//! bytes a key must encode to.

use quire_core::{Id, RecordKind, StateKey};

/// A golden key vector.
#[derive(Debug, Clone)]
pub struct KeyVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub kind: RecordKind,
    pub segments: Vec<String>,
    /// Expected encoding (hex).
    pub expected_hex: &'static str,
}

/// Get all golden key vectors.
pub fn all_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "bucket record",
            kind: RecordKind::Bucket,
            segments: vec!["photos".into()],
            expected_hex: "004275636b65740070686f746f7300",
        },
        KeyVector {
            name: "object record",
            kind: RecordKind::Object,
            segments: vec!["photos".into(), "cat.png".into()],
            expected_hex: "004f626a6563740070686f746f73006361742e706e6700",
        },
        KeyVector {
            name: "objects-in-bucket prefix",
            kind: RecordKind::Object,
            segments: vec!["photos".into()],
            expected_hex: "004f626a6563740070686f746f7300",
        },
        KeyVector {
            name: "reserved none group",
            kind: RecordKind::Group,
            segments: vec![Id::NONE_GROUP.to_hex()],
            expected_hex: "0047726f7570006666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666666600",
        },
        KeyVector {
            name: "delete records prefix",
            kind: RecordKind::DeletedObject,
            segments: vec!["docs".into()],
            expected_hex: "0044656c657465644f626a65637400646f637300",
        },
        KeyVector {
            name: "all users",
            kind: RecordKind::User,
            segments: Vec::new(),
            expected_hex: "005573657200",
        },
    ]
}

/// Build the key a vector describes.
pub fn key_from_vector(vector: &KeyVector) -> quire_core::Result<StateKey> {
    let parts: Vec<&str> = vector.segments.iter().map(String::as_str).collect();
    StateKey::from_parts(vector.kind, &parts)
}

/// Check every vector, reporting `(name, matches, actual hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = key_from_vector(v)
                .map(|key| hex::encode(key.encode()))
                .unwrap_or_default();
            (v.name.to_string(), hex == v.expected_hex, hex)
        })
        .collect()
}
