//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use quire_core::{access, Id, Keypair, RecordKind, StateKey};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Id.
pub fn id() -> impl Strategy<Value = Id> {
    any::<[u8; 32]>().prop_map(Id::from_bytes)
}

/// Generate a key segment free of the separator byte.
pub fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._/-]{1,16}".prop_map(String::from)
}

/// Generate a bucket name.
pub fn bucket_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

pub fn record_kind() -> impl Strategy<Value = RecordKind> {
    proptest::sample::select(RecordKind::ALL.to_vec())
}

/// Generate a well-formed state key with up to four segments.
pub fn state_key() -> impl Strategy<Value = StateKey> {
    (record_kind(), prop::collection::vec(segment(), 0..=4)).prop_map(|(kind, segments)| {
        segments
            .into_iter()
            .try_fold(StateKey::new(kind), |key, segment| key.push(segment))
            .unwrap_or_else(|_| StateKey::new(kind))
    })
}

/// Generate object access bits.
pub fn access_bits() -> impl Strategy<Value = u32> {
    0u32..=(access::LIST | access::READ | access::CREATE | access::OVERWRITE | access::DELETE)
}

/// Generate a per-bucket grant map, sometimes holding a wildcard.
pub fn perms_map() -> impl Strategy<Value = BTreeMap<String, u32>> {
    prop::collection::btree_map(
        prop_oneof![3 => bucket_name(), 1 => Just("*".to_string())],
        access_bits(),
        0..4,
    )
}

/// Generate the link grants of a parent chain, nearest link first.
pub fn link_chain(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(access_bits(), 1..=max_len)
}
