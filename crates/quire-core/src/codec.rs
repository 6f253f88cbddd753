//! CBOR record codec.
//!
//! Stored values are CBOR maps produced by serde. Records can be decoded
//! into their typed form or into a [`Value`] tree for selector evaluation.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};

/// Encode a record to CBOR bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(buf)
}

/// Decode CBOR bytes into a record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Decode CBOR bytes into an untyped value tree.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    decode(bytes)
}

/// Follow a path of map keys through a value tree.
pub fn lookup<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, segment| {
        node.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(segment.as_ref()))
            .map(|(_, v)| v)
    })
}
