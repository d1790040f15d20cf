//! In-memory scope store for tests and embedding.
//!
//! [`InMemoryScopeStore`] keeps every collection in a `HashMap` behind a
//! `RwLock`. Conditional upserts take the write lock for both the filter
//! check and the write, which makes them atomic with respect to every other
//! operation on the store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::collection::Collection;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ConditionalOutcome, FieldCondition, IdFilter, ScopeStore, UpsertOutcome};

/// An in-memory implementation of [`ScopeStore`].
///
/// Data is lost when the store is dropped.
pub struct InMemoryScopeStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryScopeStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(collection).map_or(0, Collection::len))
    }

    /// Names of all collections holding at least one document.
    pub fn collections(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .read()?
            .iter()
            .filter(|(_, coll)| !coll.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryScopeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryScopeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.collections.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("InMemoryScopeStore")
            .field("collection_count", &count)
            .finish()
    }
}

impl ScopeStore for InMemoryScopeStore {
    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Document> {
        match self.read()?.get(collection) {
            Some(coll) => coll.find_by_id(collection, id),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    fn upsert_by_id(&self, collection: &str, document: Document) -> StoreResult<UpsertOutcome> {
        let mut collections = self.write()?;
        Ok(collections
            .entry(collection.to_string())
            .or_default()
            .upsert(document))
    }

    fn conditional_upsert(
        &self,
        collection: &str,
        id: &str,
        condition: &FieldCondition,
        path: &str,
        value: Value,
    ) -> StoreResult<ConditionalOutcome> {
        let mut collections = self.write()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .conditional_upsert(id, condition, path, value)
    }

    fn find(&self, collection: &str, filter: &IdFilter) -> StoreResult<Vec<Document>> {
        Ok(self
            .read()?
            .get(collection)
            .map(|coll| coll.find(filter))
            .unwrap_or_default())
    }

    fn set_field_by_id(
        &self,
        collection: &str,
        id: &str,
        path: &str,
        value: Value,
    ) -> StoreResult<UpsertOutcome> {
        let mut collections = self.write()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .set_field(id, path, value)
    }

    fn unset_field_by_id(&self, collection: &str, id: &str, path: &str) -> StoreResult<()> {
        let mut collections = self.write()?;
        match collections.get_mut(collection) {
            Some(coll) => coll.unset_field(collection, id, path),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    fn remove_by_id(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.write()?;
        match collections.get_mut(collection) {
            Some(coll) => coll.remove(collection, id),
            None => Err(StoreError::not_found(collection, id)),
        }
    }
}
