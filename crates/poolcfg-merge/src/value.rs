//! The [`Mergeable`] trait and its implementations for leaf, mapping, and
//! dynamic values.
//!
//! Leaves (scalars, strings, `Option`, `Vec`, date/time types, dynamic JSON
//! values) are replaced wholesale when the overlay is non-empty. Maps, typed
//! or JSON objects, take every non-empty overlay entry wholesale and delete
//! every key whose overlay value is empty, even if the base never had it.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::MergeResult;
use crate::policy::{EmptinessPolicy, MergeContext};

/// A value that can be structurally merged with another of the same type.
pub trait Mergeable {
    /// Whether the value is an absent container (`None`, empty sequence or
    /// map, JSON `null`). Nil values are empty under every policy.
    fn is_nil(&self) -> bool {
        false
    }

    /// Whether the value equals the zero value of its type.
    fn is_zero(&self) -> bool;

    /// Whether the value counts as absent under `policy`.
    fn is_empty(&self, policy: EmptinessPolicy) -> bool {
        self.is_nil() || (!policy.allow_empty && self.is_zero())
    }

    /// Merge `overlay` into `self`. Returns `true` if any part of `self`
    /// was taken from the overlay.
    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool>;
}

/// Replace `base` with `overlay` when the overlay is non-empty.
pub fn merge_leaf<T: Mergeable + Clone>(base: &mut T, overlay: &T, cx: &MergeContext) -> bool {
    if overlay.is_empty(cx.policy()) {
        return false;
    }
    base.clone_from(overlay);
    true
}

macro_rules! leaf_scalars {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Mergeable for $ty {
                fn is_zero(&self) -> bool {
                    *self == $zero
                }

                fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
                    Ok(merge_leaf(self, overlay, cx))
                }
            }
        )*
    };
}

leaf_scalars! {
    bool => false,
    char => '\0',
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, u128 => 0, usize => 0,
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, i128 => 0, isize => 0,
    f32 => 0.0, f64 => 0.0,
    Duration => Duration::ZERO,
}

impl Mergeable for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_leaf(self, overlay, cx))
    }
}

// Date/time values are atomic: never decomposed, replaced when non-empty.
macro_rules! leaf_temporal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Mergeable for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }

                fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
                    Ok(merge_leaf(self, overlay, cx))
                }
            }
        )*
    };
}

leaf_temporal!(DateTime<Utc>, NaiveDate, NaiveDateTime);

/// `Option` behaves like a pointer: `None` is nil, and the zero check looks
/// through one level of indirection.
impl<T: Mergeable + Clone> Mergeable for Option<T> {
    fn is_nil(&self) -> bool {
        self.is_none()
    }

    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, Mergeable::is_zero)
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_leaf(self, overlay, cx))
    }
}

/// Sequences are leaves. An empty `Vec` stands in for a nil sequence.
impl<T: Clone> Mergeable for Vec<T> {
    fn is_nil(&self) -> bool {
        self.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_leaf(self, overlay, cx))
    }
}

/// Per-key merge shared by the mapping impls. Non-empty overlay values
/// are taken wholesale. Empty ones delete the base key in deep mode and
/// are skipped in shallow mode, where a top-level map behaves like a
/// record whose fields are its keys. `apply` receives `None` to delete.
fn merge_entries<'a, K, V, I>(
    overlay: I,
    cx: &MergeContext,
    mut apply: impl FnMut(&K, Option<&V>),
) -> bool
where
    K: 'a,
    V: Mergeable + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut merged = false;
    for (key, value) in overlay {
        if !value.is_empty(cx.policy()) {
            apply(key, Some(value));
            merged = true;
        } else if !cx.options.shallow {
            apply(key, None);
        }
    }
    merged
}

impl<K, V> Mergeable for HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Mergeable + Clone,
{
    fn is_nil(&self) -> bool {
        self.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_entries(overlay, cx, |key, value| match value {
            Some(value) => {
                self.insert(key.clone(), value.clone());
            }
            None => {
                self.remove(key);
            }
        }))
    }
}

impl<K, V> Mergeable for BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Mergeable + Clone,
{
    fn is_nil(&self) -> bool {
        self.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_entries(overlay, cx, |key, value| match value {
            Some(value) => {
                self.insert(key.clone(), value.clone());
            }
            None => {
                self.remove(key);
            }
        }))
    }
}

/// Dynamic values are leaves, empty only when `null`. Nested objects are
/// never merged into: a non-null overlay replaces the base whatever its kind.
impl Mergeable for Value {
    fn is_nil(&self) -> bool {
        self.is_null()
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_leaf(self, overlay, cx))
    }
}

/// A JSON object merges like a typed map: `null` entries are tombstones,
/// every other entry replaces the base entry wholesale.
impl Mergeable for Map<String, Value> {
    fn is_nil(&self) -> bool {
        self.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn merge_from(&mut self, overlay: &Self, cx: &MergeContext) -> MergeResult<bool> {
        Ok(merge_entries(overlay, cx, |key, value| match value {
            Some(value) => {
                self.insert(key.clone(), value.clone());
            }
            None => {
                self.remove(key);
            }
        }))
    }
}
