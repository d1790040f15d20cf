use std::collections::BTreeSet;
use std::path::Path;

use poolcfg_merge::MergeOptions;
use poolcfg_store::BASE_SCOPE;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Prefix applied to a namespace to form its store collection.
pub const COLLECTION_PREFIX: &str = "scoped_";

/// Setup of a single engine instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consumer namespace; mapped to the `scoped_<namespace>` collection.
    pub namespace: String,
    /// Treat zero values as meaningful overrides.
    pub allow_empty: bool,
    /// Replace whole record fields instead of merging them recursively.
    pub shallow_merge: bool,
    /// Pools this configuration is meant for. Informational: engine
    /// operations do not enforce it.
    pub allowed_pools: BTreeSet<String>,
}

impl EngineConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn shallow_merge(mut self, shallow_merge: bool) -> Self {
        self.shallow_merge = shallow_merge;
        self
    }

    pub fn allowed_pools<I, P>(mut self, pools: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.allowed_pools = pools.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(input: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.namespace.is_empty() {
            return Err(EngineError::Config("namespace must not be empty".into()));
        }
        if self.allowed_pools.contains(BASE_SCOPE) {
            return Err(EngineError::Config(
                "allowed_pools must not contain the base scope".into(),
            ));
        }
        Ok(())
    }

    pub fn collection_name(&self) -> String {
        format!("{COLLECTION_PREFIX}{}", self.namespace)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions::new(self.allow_empty, self.shallow_merge)
    }

    /// Whether `scope` is the base scope or one of the allowed pools.
    /// An empty allow-list admits every pool.
    pub fn is_pool_allowed(&self, scope: &str) -> bool {
        scope == BASE_SCOPE || self.allowed_pools.is_empty() || self.allowed_pools.contains(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::new("autoscale");
        assert_eq!(c.collection_name(), "scoped_autoscale");
        assert!(!c.allow_empty);
        assert!(!c.shallow_merge);
        assert_eq!(c.merge_options(), MergeOptions::deep());
    }

    #[test]
    fn parses_toml() {
        let c = EngineConfig::from_toml_str(
            r#"
            namespace = "node-container"
            allow_empty = true
            allowed_pools = ["pool1", "pool2"]
            "#,
        )
        .unwrap();
        assert_eq!(c.namespace, "node-container");
        assert!(c.allow_empty);
        assert!(!c.shallow_merge);
        assert!(c.is_pool_allowed("pool2"));
        assert!(c.is_pool_allowed(""));
        assert!(!c.is_pool_allowed("pool3"));
    }

    #[test]
    fn empty_allow_list_admits_everything() {
        assert!(EngineConfig::new("x").is_pool_allowed("anything"));
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            EngineConfig::from_toml_str("allow_empty = true"),
            Err(EngineError::Config(_))
        ));
        assert!(EngineConfig::from_toml_str("namespace = 3").is_err());
        let base_listed = EngineConfig::new("x").allowed_pools([""]);
        assert!(base_listed.validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolcfg.toml");
        std::fs::write(&path, "namespace = \"env\"\nshallow_merge = true\n").unwrap();
        let c = EngineConfig::from_file(&path).unwrap();
        assert!(c.shallow_merge);
        assert_eq!(c.merge_options(), MergeOptions::shallow());

        let err = EngineConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
