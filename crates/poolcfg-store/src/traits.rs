//! The [`ScopeStore`] trait defining the storage interface.

use serde_json::Value;

use crate::document::Document;
use crate::error::StoreResult;

/// Result of an unconditional upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Result of a conditional upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionalOutcome {
    /// The filter matched (or the document did not exist) and the write
    /// was applied.
    Applied,
    /// The document exists but the filter did not match. Equivalent to a
    /// duplicate-key rejection of the upsert's insert.
    NotApplied,
}

/// Which documents a [`ScopeStore::find`] returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdFilter {
    /// Every document in the collection.
    All,
    /// Every document whose id differs from the given one.
    NotEqual(String),
    /// Documents whose id is in the list.
    In(Vec<String>),
}

impl IdFilter {
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::All => true,
            Self::NotEqual(other) => id != other,
            Self::In(ids) => ids.iter().any(|candidate| candidate == id),
        }
    }
}

/// Condition on a field's current value, evaluated by
/// [`ScopeStore::conditional_upsert`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldCondition {
    /// The field is not present.
    Absent,
    /// The field is present and equal to the value.
    Equals(Value),
    /// The field is not present, or is present and equal to the value.
    AbsentOrEquals(Value),
}

impl FieldCondition {
    pub fn matches(&self, current: Option<&Value>) -> bool {
        match (self, current) {
            (Self::Absent, current) => current.is_none(),
            (Self::Equals(expected), Some(current)) => current == expected,
            (Self::Equals(_), None) => false,
            (Self::AbsentOrEquals(_), None) => true,
            (Self::AbsentOrEquals(expected), Some(current)) => current == expected,
        }
    }
}

/// Keyed document collections holding scope entries.
///
/// Every operation names its collection and is a self-contained unit of
/// work. Implementations must be thread-safe. Writes are last-writer-wins,
/// except [`conditional_upsert`](Self::conditional_upsert), which must
/// evaluate its filter and apply its write atomically.
pub trait ScopeStore: Send + Sync {
    /// Read a document by id.
    ///
    /// Returns `Err(StoreError::NotFound)` if it does not exist.
    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Document>;

    /// Create or replace the document with `document.id`.
    fn upsert_by_id(&self, collection: &str, document: Document) -> StoreResult<UpsertOutcome>;

    /// Set `path` to `value` in document `id` if `condition` holds for the
    /// field's current value. A missing document is created.
    fn conditional_upsert(
        &self,
        collection: &str,
        id: &str,
        condition: &FieldCondition,
        path: &str,
        value: Value,
    ) -> StoreResult<ConditionalOutcome>;

    /// All documents matching `filter`, ordered by id.
    fn find(&self, collection: &str, filter: &IdFilter) -> StoreResult<Vec<Document>>;

    /// Set `path` to `value` in document `id`, creating the document if
    /// needed.
    fn set_field_by_id(
        &self,
        collection: &str,
        id: &str,
        path: &str,
        value: Value,
    ) -> StoreResult<UpsertOutcome>;

    /// Remove `path` from document `id`.
    ///
    /// Returns `Err(StoreError::NotFound)` if the document does not exist.
    /// A missing field is not an error.
    fn unset_field_by_id(&self, collection: &str, id: &str, path: &str) -> StoreResult<()>;

    /// Delete document `id`.
    ///
    /// Returns `Err(StoreError::NotFound)` if the document does not exist.
    fn remove_by_id(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Ids of every document in the collection.
    fn ids(&self, collection: &str) -> StoreResult<Vec<String>> {
        let documents = self.find(collection, &IdFilter::All)?;
        Ok(documents.into_iter().map(|doc| doc.id).collect())
    }
}

impl<S: ScopeStore + ?Sized> ScopeStore for std::sync::Arc<S> {
    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Document> {
        (**self).find_by_id(collection, id)
    }

    fn upsert_by_id(&self, collection: &str, document: Document) -> StoreResult<UpsertOutcome> {
        (**self).upsert_by_id(collection, document)
    }

    fn conditional_upsert(
        &self,
        collection: &str,
        id: &str,
        condition: &FieldCondition,
        path: &str,
        value: Value,
    ) -> StoreResult<ConditionalOutcome> {
        (**self).conditional_upsert(collection, id, condition, path, value)
    }

    fn find(&self, collection: &str, filter: &IdFilter) -> StoreResult<Vec<Document>> {
        (**self).find(collection, filter)
    }

    fn set_field_by_id(
        &self,
        collection: &str,
        id: &str,
        path: &str,
        value: Value,
    ) -> StoreResult<UpsertOutcome> {
        (**self).set_field_by_id(collection, id, path, value)
    }

    fn unset_field_by_id(&self, collection: &str, id: &str, path: &str) -> StoreResult<()> {
        (**self).unset_field_by_id(collection, id, path)
    }

    fn remove_by_id(&self, collection: &str, id: &str) -> StoreResult<()> {
        (**self).remove_by_id(collection, id)
    }
}
