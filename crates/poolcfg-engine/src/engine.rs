//! The scoped configuration engine.
//!
//! [`ScopedConfig`] layers pool overrides on top of a base (default) record.
//! Every operation is a synchronous unit of work against the store:
//!
//! - `save`, `set_field`, `save_merge`, `remove`, and `remove_field` are
//!   last-writer-wins. `save_merge` is a read-modify-write and can lose an
//!   update when two callers merge into the same scope concurrently.
//! - `set_field_atomic` is the one conditional write: of several callers
//!   racing to fill the same empty field, exactly one succeeds.
//!
//! Missing documents read as the record's zero value in every load and in
//! `save_merge`; `remove_field` treats them as success; `remove` reports
//! them as errors.

use std::collections::BTreeMap;

use poolcfg_merge::{merge, Mergeable};
use poolcfg_store::{
    value_path, ConditionalOutcome, Document, FieldCondition, IdFilter, ScopeStore, BASE_SCOPE,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::codec::{overlay_stored, Codec, JsonCodec};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// A record type the engine can store and merge.
pub trait ConfigValue: Mergeable + Serialize + DeserializeOwned + Default + Clone {}

impl<T> ConfigValue for T where T: Mergeable + Serialize + DeserializeOwned + Default + Clone {}

/// Pool-scoped configuration over a [`ScopeStore`].
pub struct ScopedConfig<S, C = JsonCodec> {
    store: S,
    codec: C,
    config: EngineConfig,
    collection: String,
}

impl<S: ScopeStore> ScopedConfig<S> {
    /// Create an engine using the JSON codec.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_codec(store, config, JsonCodec)
    }
}

impl<S: ScopeStore, C: Codec> ScopedConfig<S, C> {
    pub fn with_codec(store: S, config: EngineConfig, codec: C) -> Self {
        let collection = config.collection_name();
        Self {
            store,
            codec,
            config,
            collection,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The store collection backing this engine's namespace.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- Writes ----

    /// Store `value` verbatim as the entry for `scope`.
    pub fn save<T: ConfigValue>(&self, scope: &str, value: &T) -> EngineResult<()> {
        let encoded = self.encode_record(value)?;
        let outcome = self
            .store
            .upsert_by_id(&self.collection, Document::new(scope, encoded))?;
        debug!(collection = %self.collection, scope, ?outcome, "saved scope entry");
        Ok(())
    }

    /// Store `value` as the base entry.
    pub fn save_base<T: ConfigValue>(&self, value: &T) -> EngineResult<()> {
        self.save(BASE_SCOPE, value)
    }

    /// Merge `value` on top of the entry stored at `scope` and store the
    /// result. Inheritance flags are not written.
    pub fn save_merge<T: ConfigValue>(&self, scope: &str, value: &T) -> EngineResult<()> {
        self.encode_record(value)?;
        let mut current: T = self.fetch(scope)?;
        let overridden = merge(&mut current, value, self.config.merge_options(), false)?;
        debug!(collection = %self.collection, scope, overridden, "merged into scope entry");
        self.save(scope, &current)
    }

    /// Set a single field of the entry at `scope`, creating the entry if
    /// needed. `name` is a case-insensitive, dot-separated field path.
    pub fn set_field<V: Serialize + ?Sized>(&self, scope: &str, name: &str, value: &V) -> EngineResult<()> {
        let path = value_path(name);
        let value = self.codec.encode(value)?;
        self.store
            .set_field_by_id(&self.collection, scope, &path, value)?;
        debug!(collection = %self.collection, scope, path, "set field");
        Ok(())
    }

    /// Set a field only if it is absent or holds an empty string.
    ///
    /// Returns `Ok(false)` without writing when the field is occupied.
    pub fn set_field_atomic<V: Serialize + ?Sized>(
        &self,
        scope: &str,
        name: &str,
        value: &V,
    ) -> EngineResult<bool> {
        let path = value_path(name);
        let value = self.codec.encode(value)?;
        let condition = FieldCondition::AbsentOrEquals(Value::String(String::new()));
        let outcome = self
            .store
            .conditional_upsert(&self.collection, scope, &condition, &path, value)?;
        debug!(collection = %self.collection, scope, path, ?outcome, "atomic set field");
        Ok(outcome == ConditionalOutcome::Applied)
    }

    /// Unset a single field. A missing entry or field is not an error.
    pub fn remove_field(&self, scope: &str, name: &str) -> EngineResult<()> {
        let path = value_path(name);
        match self
            .store
            .unset_field_by_id(&self.collection, scope, &path)
        {
            Ok(()) => {
                debug!(collection = %self.collection, scope, path, "removed field");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the whole entry at `scope`. A missing entry is an error.
    pub fn remove(&self, scope: &str) -> EngineResult<()> {
        self.store.remove_by_id(&self.collection, scope)?;
        debug!(collection = %self.collection, scope, "removed scope entry");
        Ok(())
    }

    // ---- Reads ----

    /// Resolve `scope`: the base entry with the pool entry merged on top,
    /// inheritance flags filled in. The base scope resolves to the base
    /// entry alone.
    pub fn load<T: ConfigValue>(&self, scope: &str) -> EngineResult<T> {
        self.load_with_base(scope, None)
    }

    /// Resolve the base entry.
    pub fn load_base<T: ConfigValue>(&self) -> EngineResult<T> {
        self.load(BASE_SCOPE)
    }

    /// Like [`load`](Self::load), but `base` replaces the stored base entry
    /// when given.
    pub fn load_with_base<T: ConfigValue>(&self, scope: &str, base: Option<&T>) -> EngineResult<T> {
        let base = match base {
            Some(base) => base.clone(),
            None => self.fetch(BASE_SCOPE)?,
        };
        if scope == BASE_SCOPE {
            return Ok(base);
        }
        let pool: T = self.fetch(scope)?;
        self.blend(base, &pool, scope)
    }

    /// Resolve the base entry and each of `pools` independently.
    ///
    /// With an empty `pools`, every stored pool is resolved. The result
    /// always holds the raw base under `""`. Requested pools without a
    /// stored entry are left out.
    pub fn load_pools<T, P>(&self, pools: &[P]) -> EngineResult<BTreeMap<String, T>>
    where
        T: ConfigValue,
        P: AsRef<str>,
    {
        let base: T = self.fetch(BASE_SCOPE)?;
        let filter = if pools.is_empty() {
            IdFilter::NotEqual(BASE_SCOPE.to_string())
        } else {
            IdFilter::In(pools.iter().map(|p| p.as_ref().to_string()).collect())
        };
        let documents = self.store.find(&self.collection, &filter)?;

        let mut resolved = BTreeMap::new();
        for document in documents {
            if document.is_base() {
                continue;
            }
            let pool: T = self.decode_entry(document.val)?;
            let merged = self.blend(base.clone(), &pool, &document.id)?;
            resolved.insert(document.id, merged);
        }
        resolved.insert(BASE_SCOPE.to_string(), base);
        debug!(collection = %self.collection, pools = resolved.len() - 1, "loaded pools");
        Ok(resolved)
    }

    /// Resolve the base entry and every stored pool.
    pub fn load_all<T: ConfigValue>(&self) -> EngineResult<BTreeMap<String, T>> {
        self.load_pools::<T, &str>(&[])
    }

    // ---- Internals ----

    fn blend<T: ConfigValue>(&self, mut base: T, pool: &T, scope: &str) -> EngineResult<T> {
        let overridden = merge(&mut base, pool, self.config.merge_options(), true)?;
        debug!(collection = %self.collection, scope, overridden, "resolved pool");
        Ok(base)
    }

    /// Read the entry at `scope`, reading a missing entry as zero.
    fn fetch<T: ConfigValue>(&self, scope: &str) -> EngineResult<T> {
        match self.store.find_by_id(&self.collection, scope) {
            Ok(document) => self.decode_entry(document.val),
            Err(e) if e.is_not_found() => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Decode a stored value on top of the record's zero value, so partial
    /// documents written field by field still decode.
    fn decode_entry<T: ConfigValue>(&self, stored: Value) -> EngineResult<T> {
        if stored.is_null() {
            return Ok(T::default());
        }
        let mut value = self.encode_record(&T::default())?;
        overlay_stored(&mut value, stored);
        self.codec.decode(value)
    }

    fn encode_record<T: ConfigValue>(&self, value: &T) -> EngineResult<Value> {
        let encoded = self.codec.encode(value)?;
        if !encoded.is_object() {
            return Err(EngineError::Validation(format!(
                "a record type is required as value, got {}",
                std::any::type_name::<T>()
            )));
        }
        Ok(encoded)
    }
}

impl<S, C> std::fmt::Debug for ScopedConfig<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedConfig")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish()
    }
}
