//! Record descriptors: the declared field list a record type merges through.
//!
//! A [`RecordDescriptor`] lists every mergeable field of a record with typed
//! accessors. A field may carry a typed link to a companion `bool` that
//! records whether the merged value came from the base (`true`) or from the
//! overlay (`false`). Descriptors are normally declared with
//! [`impl_record!`](crate::impl_record), which also implements
//! [`Mergeable`] for the record.
//!
//! ```
//! use poolcfg_merge::{impl_record, merge, MergeOptions};
//!
//! #[derive(Clone, Default)]
//! struct Limits {
//!     memory: u64,
//!     memory_inherited: bool,
//!     swap: u64,
//! }
//!
//! impl_record!(Limits {
//!     memory => memory_inherited,
//!     swap,
//! });
//!
//! let mut base = Limits { memory: 512, swap: 128, ..Default::default() };
//! let overlay = Limits { swap: 256, ..Default::default() };
//! merge(&mut base, &overlay, MergeOptions::deep(), true).unwrap();
//! assert_eq!((base.memory, base.swap), (512, 256));
//! assert!(base.memory_inherited);
//! ```

use std::fmt;

use crate::error::MergeResult;
use crate::policy::{EmptinessPolicy, MergeContext};
use crate::value::Mergeable;

/// A record type with a declared field list.
pub trait Record: Sized + 'static {
    /// The record's field descriptor, built once per type.
    fn descriptor() -> &'static RecordDescriptor<Self>;
}

/// Mutable accessor for a companion inheritance flag.
pub type InheritedFlag<R> = fn(&mut R) -> &mut bool;

trait FieldOps<R>: Send + Sync {
    fn is_zero(&self, record: &R) -> bool;
    fn is_empty(&self, record: &R, policy: EmptinessPolicy) -> bool;
    fn assign(&self, base: &mut R, overlay: &R);
    fn merge(&self, base: &mut R, overlay: &R, cx: &MergeContext) -> MergeResult<bool>;
}

struct Accessor<R, V> {
    get: fn(&R) -> &V,
    get_mut: fn(&mut R) -> &mut V,
}

impl<R, V> FieldOps<R> for Accessor<R, V>
where
    V: Mergeable + Clone,
{
    fn is_zero(&self, record: &R) -> bool {
        (self.get)(record).is_zero()
    }

    fn is_empty(&self, record: &R, policy: EmptinessPolicy) -> bool {
        (self.get)(record).is_empty(policy)
    }

    fn assign(&self, base: &mut R, overlay: &R) {
        (self.get_mut)(base).clone_from((self.get)(overlay));
    }

    fn merge(&self, base: &mut R, overlay: &R, cx: &MergeContext) -> MergeResult<bool> {
        (self.get_mut)(base).merge_from((self.get)(overlay), cx)
    }
}

/// One declared field of a record.
pub struct FieldDescriptor<R> {
    name: &'static str,
    ops: Box<dyn FieldOps<R>>,
    inherited: Option<InheritedFlag<R>>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field declares a companion inheritance flag.
    pub fn tracks_inheritance(&self) -> bool {
        self.inherited.is_some()
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("inherited", &self.inherited.is_some())
            .finish()
    }
}

/// The ordered field list of a record type.
pub struct RecordDescriptor<R> {
    name: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: 'static> RecordDescriptor<R> {
    pub fn builder(name: &'static str) -> RecordBuilder<R> {
        RecordBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    /// Look up a field by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    /// Whether every declared field holds its zero value.
    pub fn is_zero(&self, record: &R) -> bool {
        self.fields.iter().all(|field| field.ops.is_zero(record))
    }

    /// Merge `overlay` into `base` field by field, in declaration order.
    ///
    /// In shallow mode a field is replaced wholesale when the overlay's copy
    /// is non-empty. In deep mode each field merges recursively and, when
    /// inheritance tracking is on, its companion flag is set to whether the
    /// base value was kept. An error aborts the remaining fields.
    pub fn merge(&self, base: &mut R, overlay: &R, cx: &MergeContext) -> MergeResult<bool> {
        let mut merged = false;
        for field in &self.fields {
            if cx.options.shallow {
                if !field.ops.is_empty(overlay, cx.policy()) {
                    field.ops.assign(base, overlay);
                    merged = true;
                }
                continue;
            }

            let field_merged = field
                .ops
                .merge(base, overlay, cx)
                .map_err(|e| e.within(field.name))?;
            if cx.track_inheritance {
                if let Some(flag) = field.inherited {
                    *flag(base) = !field_merged;
                }
            }
            merged |= field_merged;
        }
        Ok(merged)
    }
}

impl<R> fmt::Debug for RecordDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`RecordDescriptor`].
pub struct RecordBuilder<R> {
    name: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: 'static> RecordBuilder<R> {
    /// Declare a field without an inheritance flag.
    pub fn field<V>(self, name: &'static str, get: fn(&R) -> &V, get_mut: fn(&mut R) -> &mut V) -> Self
    where
        V: Mergeable + Clone + 'static,
    {
        self.push(name, get, get_mut, None)
    }

    /// Declare a field linked to a companion inheritance flag.
    pub fn inherited_field<V>(
        self,
        name: &'static str,
        get: fn(&R) -> &V,
        get_mut: fn(&mut R) -> &mut V,
        flag: InheritedFlag<R>,
    ) -> Self
    where
        V: Mergeable + Clone + 'static,
    {
        self.push(name, get, get_mut, Some(flag))
    }

    fn push<V>(
        mut self,
        name: &'static str,
        get: fn(&R) -> &V,
        get_mut: fn(&mut R) -> &mut V,
        inherited: Option<InheritedFlag<R>>,
    ) -> Self
    where
        V: Mergeable + Clone + 'static,
    {
        debug_assert!(
            !self.fields.iter().any(|f| f.name == name),
            "field {name} declared twice on {}",
            self.name
        );
        self.fields.push(FieldDescriptor {
            name,
            ops: Box::new(Accessor { get, get_mut }),
            inherited,
        });
        self
    }

    pub fn build(self) -> RecordDescriptor<R> {
        RecordDescriptor {
            name: self.name,
            fields: self.fields,
        }
    }
}

/// [`Mergeable::merge_from`] for a record: merge through its descriptor.
pub fn merge_record<R: Record>(base: &mut R, overlay: &R, cx: &MergeContext) -> MergeResult<bool> {
    R::descriptor().merge(base, overlay, cx)
}

/// [`Mergeable::is_zero`] for a record: every declared field is zero.
pub fn record_is_zero<R: Record>(record: &R) -> bool {
    R::descriptor().is_zero(record)
}

/// Declare the field list of a record type and implement
/// [`Record`] and [`Mergeable`] for it.
///
/// Each entry names a field; `field => flag` links the field to a `bool`
/// companion that receives the inheritance result.
#[macro_export]
macro_rules! impl_record {
    (@field $builder:ident, $ty:ty, $field:ident) => {
        $builder.field(
            stringify!($field),
            |r: &$ty| &r.$field,
            |r: &mut $ty| &mut r.$field,
        )
    };
    (@field $builder:ident, $ty:ty, $field:ident => $flag:ident) => {
        $builder.inherited_field(
            stringify!($field),
            |r: &$ty| &r.$field,
            |r: &mut $ty| &mut r.$field,
            |r: &mut $ty| &mut r.$flag,
        )
    };
    ($ty:ty { $($field:ident $(=> $flag:ident)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn descriptor() -> &'static $crate::RecordDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::RecordDescriptor<$ty>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    let builder = $crate::RecordDescriptor::<$ty>::builder(stringify!($ty));
                    $(
                        let builder = $crate::impl_record!(@field builder, $ty, $field $(=> $flag)?);
                    )*
                    builder.build()
                })
            }
        }

        impl $crate::Mergeable for $ty {
            fn is_zero(&self) -> bool {
                $crate::record_is_zero(self)
            }

            fn merge_from(
                &mut self,
                overlay: &Self,
                cx: &$crate::MergeContext,
            ) -> $crate::MergeResult<bool> {
                $crate::merge_record(self, overlay, cx)
            }
        }
    };
}
