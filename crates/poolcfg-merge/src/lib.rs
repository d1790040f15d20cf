//! Structural merge engine for pool-scoped configuration.
//!
//! Merges an overlay value onto a base value of the same type, field by
//! field, map key by map key. Overlay values that count as "absent" under
//! the active [`EmptinessPolicy`] keep the base; empty map entries delete the
//! base key (tombstones). Records may link fields to companion inheritance
//! flags, filled in when a merge runs with inheritance tracking.
//!
//! # Modules
//!
//! - [`policy`] -- [`EmptinessPolicy`], [`MergeOptions`], [`MergeContext`]
//! - [`value`] -- the [`Mergeable`] trait and leaf, map, and dynamic impls
//! - [`record`] -- [`RecordDescriptor`] and the [`impl_record!`] macro
//! - [`error`] -- [`MergeError`]

pub mod error;
pub mod policy;
pub mod record;
pub mod value;

pub use error::{MergeError, MergeResult};
pub use policy::{EmptinessPolicy, MergeContext, MergeOptions};
pub use record::{
    merge_record, record_is_zero, FieldDescriptor, InheritedFlag, Record, RecordBuilder,
    RecordDescriptor,
};
pub use value::{merge_leaf, Mergeable};

/// Merge `overlay` into `base` in place.
///
/// Returns `true` if any field of `base` was taken from the overlay. With
/// `track_inheritance`, records write their companion inheritance flags.
/// On error, fields merged before the failing one remain applied.
pub fn merge<T: Mergeable>(
    base: &mut T,
    overlay: &T,
    options: MergeOptions,
    track_inheritance: bool,
) -> MergeResult<bool> {
    let cx = MergeContext::new(options, track_inheritance);
    base.merge_from(overlay, &cx).inspect_err(|e| {
        tracing::debug!(path = e.path(), error = %e, "merge aborted");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Knobs {
        cpu: u32,
        name: String,
        enabled: bool,
        tags: BTreeMap<String, u8>,
    }

    impl_record!(Knobs {
        cpu,
        name,
        enabled,
        tags,
    });

    fn knobs() -> impl Strategy<Value = Knobs> {
        (
            0u32..4,
            prop_oneof![Just(String::new()), "[a-z]{1,6}"],
            any::<bool>(),
            prop::collection::btree_map("[a-c]", 0u8..3, 0..3),
        )
            .prop_map(|(cpu, name, enabled, tags)| Knobs {
                cpu,
                name,
                enabled,
                tags,
            })
    }

    #[test]
    fn zero_overrides_depend_on_allow_empty() {
        let mut strict = Knobs {
            cpu: 0,
            ..Default::default()
        };
        merge(&mut strict, &Knobs::default(), MergeOptions::deep(), false).unwrap();
        assert_eq!(strict.cpu, 0);

        let mut base = Knobs {
            cpu: 4,
            enabled: true,
            ..Default::default()
        };
        merge(&mut base, &Knobs::default(), MergeOptions::deep(), false).unwrap();
        assert_eq!((base.cpu, base.enabled), (4, true));

        merge(
            &mut base,
            &Knobs::default(),
            MergeOptions::deep().allow_empty(true),
            false,
        )
        .unwrap();
        assert_eq!((base.cpu, base.enabled), (0, false));
    }

    proptest! {
        #[test]
        fn scalar_takes_overlay_iff_non_empty(base in knobs(), overlay in knobs()) {
            let mut merged = base.clone();
            merge(&mut merged, &overlay, MergeOptions::deep(), false).unwrap();

            let cpu = if overlay.cpu != 0 { overlay.cpu } else { base.cpu };
            let name = if overlay.name.is_empty() { &base.name } else { &overlay.name };
            let enabled = overlay.enabled || base.enabled;
            prop_assert_eq!(merged.cpu, cpu);
            prop_assert_eq!(&merged.name, name);
            prop_assert_eq!(merged.enabled, enabled);
        }

        #[test]
        fn empty_overlay_is_identity(base in knobs(), shallow in any::<bool>()) {
            let mut merged = base.clone();
            let options = MergeOptions { shallow, ..MergeOptions::default() };
            let overridden = merge(&mut merged, &Knobs::default(), options, false).unwrap();
            prop_assert!(!overridden);
            prop_assert_eq!(merged, base);
        }

        #[test]
        fn merged_map_never_holds_tombstoned_keys(base in knobs(), overlay in knobs()) {
            let mut merged = base.clone();
            merge(&mut merged, &overlay, MergeOptions::deep(), false).unwrap();
            for (key, value) in &overlay.tags {
                if *value == 0 {
                    prop_assert!(!merged.tags.contains_key(key));
                } else {
                    prop_assert_eq!(merged.tags.get(key), Some(value));
                }
            }
            for (key, value) in &base.tags {
                if !overlay.tags.contains_key(key) {
                    prop_assert_eq!(merged.tags.get(key), Some(value));
                }
            }
        }
    }
}
