//! Emptiness policy and merge options.
//!
//! Whether an overlay value counts as "absent" decides whether it replaces
//! the base. Absent containers (`None`, empty sequences and maps, JSON
//! `null`) are always empty. Zero values (`0`, `""`, `false`) are empty only
//! when [`EmptinessPolicy::allow_empty`] is off.

/// Decides whether a value counts as absent for merge purposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptinessPolicy {
    /// When `true`, zero-valued scalars are meaningful overrides.
    pub allow_empty: bool,
}

impl EmptinessPolicy {
    /// Zero values count as empty.
    pub const STRICT: Self = Self { allow_empty: false };

    /// Only absent containers count as empty.
    pub const ALLOW_EMPTY: Self = Self { allow_empty: true };

    pub fn new(allow_empty: bool) -> Self {
        Self { allow_empty }
    }
}

/// Options shared by every level of a single merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub policy: EmptinessPolicy,
    /// Replace whole record fields instead of recursing into them.
    pub shallow: bool,
}

impl MergeOptions {
    pub fn new(allow_empty: bool, shallow: bool) -> Self {
        Self {
            policy: EmptinessPolicy::new(allow_empty),
            shallow,
        }
    }

    /// Deep merge with the strict emptiness policy.
    pub fn deep() -> Self {
        Self::default()
    }

    /// Shallow merge with the strict emptiness policy.
    pub fn shallow() -> Self {
        Self {
            shallow: true,
            ..Self::default()
        }
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.policy.allow_empty = allow_empty;
        self
    }
}

/// Per-call merge state passed down through nested values.
#[derive(Clone, Copy, Debug)]
pub struct MergeContext {
    pub options: MergeOptions,
    /// Write companion inheritance flags on records that declare them.
    pub track_inheritance: bool,
}

impl MergeContext {
    pub fn new(options: MergeOptions, track_inheritance: bool) -> Self {
        Self {
            options,
            track_inheritance,
        }
    }

    pub fn policy(&self) -> EmptinessPolicy {
        self.options.policy
    }
}
