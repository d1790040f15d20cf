//! Keyed document storage for pool-scoped configuration.
//!
//! Scope entries are stored as documents `{"_id": <scope>, "val": <record>}`
//! in named collections. The empty id is the base (default) entry; every
//! other id is a pool override. The engine only ever talks to storage
//! through the [`ScopeStore`] trait.
//!
//! # Storage Backends
//!
//! - [`InMemoryScopeStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileScopeStore`] -- one JSON file per collection, atomic replace on write
//!
//! # Design Rules
//!
//! 1. A missing document is reported as [`StoreError::NotFound`]; callers
//!    decide whether that is an error.
//! 2. Field paths are dot separated and start with [`VALUE_FIELD`].
//! 3. Writes are last-writer-wins, except
//!    [`ScopeStore::conditional_upsert`], which is atomic.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod collection;
pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use collection::Collection;
pub use document::{value_path, Document, BASE_SCOPE, VALUE_FIELD};
pub use error::{StoreError, StoreResult};
pub use file::FileScopeStore;
pub use memory::InMemoryScopeStore;
pub use traits::{ConditionalOutcome, FieldCondition, IdFilter, ScopeStore, UpsertOutcome};
