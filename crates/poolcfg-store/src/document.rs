//! Stored documents and dot-separated field paths.
//!
//! A document is `{"_id": <scope>, "val": <record>}`. Field paths address
//! the document from its root, so every writable path starts with the value
//! container segment ([`VALUE_FIELD`]). Path segments match existing object
//! keys ignoring ASCII case; segments that do not exist yet are created
//! lower-cased.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Scope identifier of the base (default) document.
pub const BASE_SCOPE: &str = "";

/// Name of the document field holding the serialized record.
pub const VALUE_FIELD: &str = "val";

/// A single stored scope entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub val: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, val: Value) -> Self {
        Self { id: id.into(), val }
    }

    /// A document with no value yet.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Value::Null)
    }

    pub fn is_base(&self) -> bool {
        self.id == BASE_SCOPE
    }

    /// Read the value at `path`, if present.
    pub fn get_path(&self, path: &str) -> StoreResult<Option<&Value>> {
        let segments = value_segments(path)?;
        let mut current = &self.val;
        for segment in segments {
            match current {
                Value::Object(map) => match find_key(map, segment) {
                    Some(key) => current = &map[&key],
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Write `value` at `path`, creating intermediate objects.
    pub fn set_path(&mut self, path: &str, value: Value) -> StoreResult<()> {
        let segments = value_segments(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StoreError::invalid_path(path, "cannot replace the whole value"))?;

        let mut current = &mut self.val;
        for segment in parents {
            let map = as_object_mut(current, path)?;
            let key = find_key(map, segment).unwrap_or_else(|| segment.to_lowercase());
            current = map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
        }
        let map = as_object_mut(current, path)?;
        let key = find_key(map, last).unwrap_or_else(|| last.to_lowercase());
        map.insert(key, value);
        Ok(())
    }

    /// Remove the value at `path`. Returns `true` if something was removed.
    pub fn unset_path(&mut self, path: &str) -> StoreResult<bool> {
        let segments = value_segments(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::invalid_path(path, "cannot unset the whole value"));
        };

        let mut current = &mut self.val;
        for segment in parents {
            let Value::Object(map) = current else {
                return Ok(false);
            };
            let Some(key) = find_key(map, segment) else {
                return Ok(false);
            };
            current = map
                .get_mut(&key)
                .ok_or_else(|| StoreError::invalid_path(path, "key vanished during traversal"))?;
        }
        let Value::Object(map) = current else {
            return Ok(false);
        };
        Ok(match find_key(map, last) {
            Some(key) => map.remove(&key).is_some(),
            None => false,
        })
    }
}

/// Build the document path for a record field name: `val.<name>`, lower-cased.
pub fn value_path(field: &str) -> String {
    format!("{VALUE_FIELD}.{}", field.to_lowercase())
}

/// Split `path` and strip its leading value-container segment.
fn value_segments(path: &str) -> StoreResult<Vec<&str>> {
    let mut segments = path.split('.');
    match segments.next() {
        Some(first) if first.eq_ignore_ascii_case(VALUE_FIELD) => {}
        _ => {
            return Err(StoreError::invalid_path(
                path,
                format!("paths must start with {VALUE_FIELD:?}"),
            ))
        }
    }
    let rest: Vec<&str> = segments.collect();
    if rest.iter().any(|s| s.is_empty()) {
        return Err(StoreError::invalid_path(path, "empty path segment"));
    }
    Ok(rest)
}

fn find_key(map: &Map<String, Value>, segment: &str) -> Option<String> {
    if map.contains_key(segment) {
        return Some(segment.to_string());
    }
    map.keys().find(|k| k.eq_ignore_ascii_case(segment)).cloned()
}

fn as_object_mut<'a>(value: &'a mut Value, path: &str) -> StoreResult<&'a mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::invalid_path(path, "traverses a non-object value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_id_and_value_container() {
        let doc = Document::new("pool1", json!({"image": "alpine"}));
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded, json!({"_id": "pool1", "val": {"image": "alpine"}}));
    }

    #[test]
    fn value_path_lowercases() {
        assert_eq!(value_path("MaxContainers"), "val.maxcontainers");
        assert_eq!(value_path("env.PATH"), "val.env.path");
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut doc = Document::empty("p");
        doc.set_path("val.limits.memory", json!(512)).unwrap();
        assert_eq!(doc.val, json!({"limits": {"memory": 512}}));
    }

    #[test]
    fn segments_match_existing_keys_ignoring_case() {
        let mut doc = Document::new("p", json!({"Image": "alpine"}));
        doc.set_path("val.image", json!("debian")).unwrap();
        assert_eq!(doc.val, json!({"Image": "debian"}));
        assert_eq!(doc.get_path("val.IMAGE").unwrap(), Some(&json!("debian")));
    }

    #[test]
    fn set_through_scalar_is_rejected() {
        let mut doc = Document::new("p", json!({"image": "alpine"}));
        let err = doc.set_path("val.image.tag", json!("3.19")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
    }

    #[test]
    fn paths_must_address_the_value_container() {
        let mut doc = Document::empty("p");
        assert!(doc.set_path("_id", json!("other")).is_err());
        assert!(doc.set_path("val", json!({})).is_err());
        assert!(doc.set_path("val..x", json!(1)).is_err());
    }

    #[test]
    fn unset_path_is_tolerant_of_missing_fields() {
        let mut doc = Document::new("p", json!({"limits": {"memory": 1, "swap": 2}}));
        assert!(doc.unset_path("val.limits.memory").unwrap());
        assert!(!doc.unset_path("val.limits.memory").unwrap());
        assert!(!doc.unset_path("val.missing.deep").unwrap());
        assert_eq!(doc.val, json!({"limits": {"swap": 2}}));
    }

    #[test]
    fn get_path_on_missing_field() {
        let doc = Document::new("p", json!({"a": {"b": 1}}));
        assert_eq!(doc.get_path("val.a.c").unwrap(), None);
        assert_eq!(doc.get_path("val.a.b.c").unwrap(), None);
    }
}
