//! File-backed scope store.
//!
//! Each collection lives in `<root>/<collection>.json` as a JSON array of
//! documents. Every operation loads the file, applies the change, and
//! persists it by writing a temporary file in the same directory and
//! renaming it over the original, so readers never observe a torn file.
//! A process-wide mutex serialises operations; concurrent processes
//! sharing one root are last-writer-wins.

use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::collection::Collection;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ConditionalOutcome, FieldCondition, IdFilter, ScopeStore, UpsertOutcome};

/// A [`ScopeStore`] persisting collections as JSON files under a directory.
#[derive(Debug)]
pub struct FileScopeStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileScopeStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: &str) -> StoreResult<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self.root.join(format!("{collection}.json")))
    }

    fn load(&self, collection: &str) -> StoreResult<Collection> {
        let path = self.path_for(collection)?;
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Collection::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn persist(&self, collection: &str, contents: &Collection) -> StoreResult<()> {
        let path = self.path_for(collection)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, contents)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(collection, documents = contents.len(), "collection persisted");
        Ok(())
    }

    /// Run `f` against the loaded collection and persist it if `f` succeeds.
    fn mutate<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut contents = self.load(collection)?;
        let result = f(&mut contents)?;
        self.persist(collection, &contents)?;
        Ok(result)
    }

    fn view<T>(&self, collection: &str, f: impl FnOnce(&Collection) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&self.load(collection)?)
    }
}

/// Collection names become file names: ASCII alphanumerics, `_`, `-`, and
/// non-leading `.` only.
fn validate_collection_name(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

impl ScopeStore for FileScopeStore {
    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.view(collection, |coll| coll.find_by_id(collection, id))
    }

    fn upsert_by_id(&self, collection: &str, document: Document) -> StoreResult<UpsertOutcome> {
        self.mutate(collection, |coll| Ok(coll.upsert(document)))
    }

    fn conditional_upsert(
        &self,
        collection: &str,
        id: &str,
        condition: &FieldCondition,
        path: &str,
        value: Value,
    ) -> StoreResult<ConditionalOutcome> {
        self.mutate(collection, |coll| {
            coll.conditional_upsert(id, condition, path, value)
        })
    }

    fn find(&self, collection: &str, filter: &IdFilter) -> StoreResult<Vec<Document>> {
        self.view(collection, |coll| Ok(coll.find(filter)))
    }

    fn set_field_by_id(
        &self,
        collection: &str,
        id: &str,
        path: &str,
        value: Value,
    ) -> StoreResult<UpsertOutcome> {
        self.mutate(collection, |coll| coll.set_field(id, path, value))
    }

    fn unset_field_by_id(&self, collection: &str, id: &str, path: &str) -> StoreResult<()> {
        self.mutate(collection, |coll| coll.unset_field(collection, id, path))
    }

    fn remove_by_id(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.mutate(collection, |coll| coll.remove(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileScopeStore::open(dir.path()).unwrap();
            store
                .upsert_by_id("scoped_env", Document::new("", json!({"image": "alpine"})))
                .unwrap();
            store
                .set_field_by_id("scoped_env", "pool1", "val.image", json!("debian"))
                .unwrap();
        }

        let store = FileScopeStore::open(dir.path()).unwrap();
        assert_eq!(
            store.find_by_id("scoped_env", "pool1").unwrap().val,
            json!({"image": "debian"})
        );
        assert_eq!(store.ids("scoped_env").unwrap(), vec!["", "pool1"]);
        assert!(dir.path().join("scoped_env.json").exists());
    }

    #[test]
    fn missing_file_is_an_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileScopeStore::open(dir.path()).unwrap();
        assert!(store.find_by_id("scoped_env", "").unwrap_err().is_not_found());
        assert!(store.find("scoped_env", &IdFilter::All).unwrap().is_empty());
    }

    #[test]
    fn failed_mutation_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileScopeStore::open(dir.path()).unwrap();
        store
            .upsert_by_id("c", Document::new("p", json!({"image": "alpine"})))
            .unwrap();
        let err = store
            .set_field_by_id("c", "p", "val.image.tag", json!("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert_eq!(
            store.find_by_id("c", "p").unwrap().val,
            json!({"image": "alpine"})
        );
    }

    #[test]
    fn remove_reports_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileScopeStore::open(dir.path()).unwrap();
        store.upsert_by_id("c", Document::empty("p")).unwrap();
        store.remove_by_id("c", "p").unwrap();
        assert!(store.remove_by_id("c", "p").unwrap_err().is_not_found());
    }

    #[test]
    fn rejects_unsafe_collection_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileScopeStore::open(dir.path()).unwrap();
        for name in ["", "../etc", ".hidden", "a/b"] {
            let err = store.find(name, &IdFilter::All).unwrap_err();
            assert!(matches!(err, StoreError::InvalidCollection(_)), "{name}");
        }
    }
}
