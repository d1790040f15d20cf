//! Conversion between consumer records and stored document values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

/// Encodes records into document values and back.
///
/// Documents are stored as JSON-shaped trees so the store can address
/// individual fields by path. A codec decides how a record maps onto that
/// tree.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> EngineResult<Value>;

    fn decode<T: DeserializeOwned>(&self, value: Value) -> EngineResult<T>;
}

/// The default codec: serde's JSON data model, field names as declared.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> EngineResult<Value> {
        serde_json::to_value(value).map_err(|e| EngineError::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, value: Value) -> EngineResult<T> {
        serde_json::from_value(value).map_err(|e| EngineError::Codec(e.to_string()))
    }
}

/// Lay `stored` over `zero`, the encoded zero value of the record.
///
/// Keys already present in `zero` are the declared field names. A stored
/// key with no exact match folds onto a declared name that differs only in
/// ASCII case, so fields written through lower-cased field paths land on
/// their declared names. A declared name is claimed at most once, and an
/// exact stored key always wins it. Any other key, map entries included,
/// is kept verbatim.
pub(crate) fn overlay_stored(zero: &mut Value, stored: Value) {
    match (zero, stored) {
        (Value::Object(declared), Value::Object(stored)) => overlay_fields(declared, stored),
        (zero, stored) => *zero = stored,
    }
}

fn overlay_fields(declared: &mut Map<String, Value>, stored: Map<String, Value>) {
    let mut unclaimed: Vec<String> = declared
        .keys()
        .filter(|name| !stored.contains_key(*name))
        .cloned()
        .collect();
    for (key, value) in stored {
        let name = if declared.contains_key(&key) {
            key
        } else {
            match unclaimed.iter().position(|name| name.eq_ignore_ascii_case(&key)) {
                Some(at) => unclaimed.swap_remove(at),
                None => {
                    declared.insert(key, value);
                    continue;
                }
            }
        };
        if let Some(slot) = declared.get_mut(&name) {
            overlay_stored(slot, value);
        }
    }
}
