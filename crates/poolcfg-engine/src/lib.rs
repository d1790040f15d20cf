//! Pool-scoped hierarchical configuration.
//!
//! A consumer stores one base record and any number of per-pool override
//! records of the same type under a namespace. Loading a pool merges its
//! override on top of the base; fields the pool leaves empty are inherited
//! and, for fields declared with a companion flag, reported as such.
//!
//! # Quick Start
//!
//! ```
//! use poolcfg_engine::{impl_record, EngineConfig, InMemoryScopeStore, ScopedConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Default, Serialize, Deserialize)]
//! struct Rule {
//!     max_containers: u32,
//!     #[serde(skip)]
//!     max_containers_inherited: bool,
//!     image: String,
//! }
//!
//! impl_record!(Rule { max_containers => max_containers_inherited, image });
//!
//! let engine = ScopedConfig::new(InMemoryScopeStore::new(), EngineConfig::new("rules"));
//! engine.save_base(&Rule { max_containers: 4, image: "alpine".into(), ..Default::default() })?;
//! engine.set_field("pool1", "image", "debian")?;
//!
//! let rule: Rule = engine.load("pool1")?;
//! assert_eq!(rule.max_containers, 4);
//! assert!(rule.max_containers_inherited);
//! assert_eq!(rule.image, "debian");
//! # Ok::<(), poolcfg_engine::EngineError>(())
//! ```
//!
//! # Modules
//!
//! - [`engine`] -- [`ScopedConfig`], the operations over a store
//! - [`config`] -- [`EngineConfig`], loadable from TOML
//! - [`codec`] -- [`Codec`] and the default [`JsonCodec`]
//! - [`error`] -- [`EngineError`]

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;

pub use codec::{Codec, JsonCodec};
pub use config::{EngineConfig, COLLECTION_PREFIX};
pub use engine::{ConfigValue, ScopedConfig};
pub use error::{EngineError, EngineResult};

pub use poolcfg_merge::{impl_record, EmptinessPolicy, MergeError, MergeOptions, Mergeable, Record};
pub use poolcfg_store::{
    FileScopeStore, InMemoryScopeStore, ScopeStore, StoreError, BASE_SCOPE, VALUE_FIELD,
};
