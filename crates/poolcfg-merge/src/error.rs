//! Error types for structural merges.

use thiserror::Error;

/// Errors raised while merging an overlay into a base value.
///
/// The built-in [`Mergeable`](crate::Mergeable) impls never fail; errors come
/// from record fields whose own impl refuses an assignment. A merge stops at
/// the first error. Fields merged before the failing one remain applied to
/// the base.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The overlay value cannot be assigned into the destination.
    #[error("error trying to set field {path}: {reason}")]
    Unassignable { path: String, reason: String },
}

impl MergeError {
    /// Create an unassignable-field error at the current level.
    pub fn unassignable(reason: impl Into<String>) -> Self {
        Self::Unassignable {
            path: String::new(),
            reason: reason.into(),
        }
    }

    /// Prefix the error path with the enclosing field or key name.
    pub fn within(self, segment: &str) -> Self {
        match self {
            Self::Unassignable { path, reason } => Self::Unassignable {
                path: join(segment, &path),
                reason,
            },
        }
    }

    /// Dotted path of the field that failed, outermost first.
    pub fn path(&self) -> &str {
        match self {
            Self::Unassignable { path, .. } => path,
        }
    }
}

fn join(segment: &str, rest: &str) -> String {
    if rest.is_empty() {
        segment.to_string()
    } else {
        format!("{segment}.{rest}")
    }
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_builds_path_outermost_first() {
        let err = MergeError::unassignable("locked")
            .within("cpu")
            .within("limits");
        assert_eq!(err.path(), "limits.cpu");
        assert_eq!(err.to_string(), "error trying to set field limits.cpu: locked");
    }
}
