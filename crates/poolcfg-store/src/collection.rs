//! Document collection semantics shared by every backend.
//!
//! A [`Collection`] is the in-memory image of one named collection. Backends
//! hold it behind their own locking and persistence and delegate the actual
//! document manipulation here, so all stores agree on upsert, filter, and
//! field-path behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ConditionalOutcome, FieldCondition, IdFilter, UpsertOutcome};

/// Documents of one collection, keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Document>", into = "Vec<Document>")]
pub struct Collection {
    documents: BTreeMap<String, Document>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn find_by_id(&self, name: &str, id: &str) -> StoreResult<Document> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name, id))
    }

    pub fn upsert(&mut self, document: Document) -> UpsertOutcome {
        match self.documents.insert(document.id.clone(), document) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        }
    }

    pub fn conditional_upsert(
        &mut self,
        id: &str,
        condition: &FieldCondition,
        path: &str,
        value: Value,
    ) -> StoreResult<ConditionalOutcome> {
        match self.documents.get_mut(id) {
            Some(document) => {
                if !condition.matches(document.get_path(path)?) {
                    return Ok(ConditionalOutcome::NotApplied);
                }
                document.set_path(path, value)?;
            }
            None => {
                let mut document = Document::empty(id);
                document.set_path(path, value)?;
                self.documents.insert(id.to_string(), document);
            }
        }
        Ok(ConditionalOutcome::Applied)
    }

    pub fn find(&self, filter: &IdFilter) -> Vec<Document> {
        self.documents
            .values()
            .filter(|doc| filter.matches(&doc.id))
            .cloned()
            .collect()
    }

    pub fn set_field(&mut self, id: &str, path: &str, value: Value) -> StoreResult<UpsertOutcome> {
        match self.documents.get_mut(id) {
            Some(document) => {
                document.set_path(path, value)?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let mut document = Document::empty(id);
                document.set_path(path, value)?;
                self.documents.insert(id.to_string(), document);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    pub fn unset_field(&mut self, name: &str, id: &str, path: &str) -> StoreResult<()> {
        let document = self
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(name, id))?;
        document.unset_path(path)?;
        Ok(())
    }

    pub fn remove(&mut self, name: &str, id: &str) -> StoreResult<()> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(name, id))
    }
}

impl From<Vec<Document>> for Collection {
    fn from(documents: Vec<Document>) -> Self {
        Self {
            documents: documents
                .into_iter()
                .map(|doc| (doc.id.clone(), doc))
                .collect(),
        }
    }
}

impl From<Collection> for Vec<Document> {
    fn from(collection: Collection) -> Self {
        collection.documents.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Collection {
        let mut coll = Collection::new();
        coll.upsert(Document::new("", json!({"image": "alpine"})));
        coll.upsert(Document::new("pool1", json!({"image": "debian"})));
        coll.upsert(Document::new("pool2", json!({})));
        coll
    }

    #[test]
    fn upsert_reports_created_then_updated() {
        let mut coll = Collection::new();
        assert_eq!(coll.upsert(Document::empty("a")), UpsertOutcome::Created);
        assert_eq!(coll.upsert(Document::empty("a")), UpsertOutcome::Updated);
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn find_filters_by_id() {
        let coll = seeded();
        let pools: Vec<_> = coll
            .find(&IdFilter::NotEqual(String::new()))
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(pools, vec!["pool1", "pool2"]);

        let some: Vec<_> = coll
            .find(&IdFilter::In(vec!["pool2".into(), "ghost".into()]))
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(some, vec!["pool2"]);
    }

    #[test]
    fn conditional_upsert_creates_missing_document() {
        let mut coll = Collection::new();
        let cond = FieldCondition::AbsentOrEquals(json!(""));
        let outcome = coll
            .conditional_upsert("p", &cond, "val.owner", json!("a"))
            .unwrap();
        assert_eq!(outcome, ConditionalOutcome::Applied);
        assert_eq!(coll.find_by_id("c", "p").unwrap().val, json!({"owner": "a"}));
    }

    #[test]
    fn conditional_upsert_rejects_occupied_field() {
        let mut coll = Collection::new();
        let cond = FieldCondition::AbsentOrEquals(json!(""));
        coll.set_field("p", "val.owner", json!("")).unwrap();
        assert_eq!(
            coll.conditional_upsert("p", &cond, "val.owner", json!("a")).unwrap(),
            ConditionalOutcome::Applied
        );
        assert_eq!(
            coll.conditional_upsert("p", &cond, "val.owner", json!("b")).unwrap(),
            ConditionalOutcome::NotApplied
        );
        assert_eq!(coll.find_by_id("c", "p").unwrap().val, json!({"owner": "a"}));
    }

    #[test]
    fn unset_and_remove_missing_documents() {
        let mut coll = seeded();
        let err = coll.unset_field("c", "ghost", "val.image").unwrap_err();
        assert!(err.is_not_found());
        coll.unset_field("c", "pool1", "val.missing").unwrap();

        coll.remove("c", "pool1").unwrap();
        assert!(coll.remove("c", "pool1").unwrap_err().is_not_found());
        assert!(coll.find_by_id("c", "pool1").unwrap_err().is_not_found());
    }

    #[test]
    fn serializes_as_document_list() {
        let coll = seeded();
        let encoded = serde_json::to_value(&coll).unwrap();
        assert_eq!(encoded.as_array().unwrap().len(), 3);
        let decoded: Collection = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, coll);
    }
}
