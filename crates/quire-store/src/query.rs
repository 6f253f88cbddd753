//! Rich-query selectors.
//!
//! A [`Selector`] is a key scope plus a conjunction of conditions over field
//! paths of the decoded CBOR record. It is the subset of a document-store
//! query language the engine needs: equality and array containment.

use ciborium::value::Value;
use quire_core::{codec, StateKey};

/// A single condition over a field path.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value.
    Eq { path: Vec<String>, value: Value },
    /// The field is an array holding the value.
    Contains { path: Vec<String>, value: Value },
}

impl Condition {
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Condition::Eq { path, value } => codec::lookup(record, path) == Some(value),
            Condition::Contains { path, value } => codec::lookup(record, path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// Scope plus conditions; every condition must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    scope: StateKey,
    conditions: Vec<Condition>,
}

impl Selector {
    /// Select records whose key extends `scope`.
    pub fn new(scope: StateKey) -> Self {
        Self {
            scope,
            conditions: Vec::new(),
        }
    }

    pub fn eq(mut self, path: &[&str], value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, path: &[&str], value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Contains {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: value.into(),
        });
        self
    }

    pub fn scope(&self) -> &StateKey {
        &self.scope
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether the decoded record satisfies every condition.
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Decode raw record bytes and test them.
    ///
    /// Bytes that are not valid CBOR never match.
    pub fn matches_bytes(&self, bytes: &[u8]) -> bool {
        codec::decode_value(bytes)
            .map(|value| self.matches(&value))
            .unwrap_or(false)
    }
}
