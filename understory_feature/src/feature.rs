// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features and their definitions.
//!
//! A [`Feature`] is a named capability unit owned by exactly one
//! [`FeatureHolder`]. Features are never built directly by callers; a
//! [`Definition`] creates them on behalf of a holder the first time the holder
//! is asked for them.

use core::any::{Any, TypeId};
use core::fmt;

use alloc::boxed::Box;

use crate::error::FeatureError;
use crate::holder::{FeatureHolder, WeakHolder};

/// The name and holder back-reference every feature carries.
///
/// The holder reference is non-owning: a feature never keeps its holder alive.
#[derive(Clone)]
pub struct FeatureBase {
    name: &'static str,
    holder: WeakHolder,
}

impl FeatureBase {
    /// Binds a feature named `name` to `holder`.
    #[must_use]
    pub fn new(name: &'static str, holder: &FeatureHolder) -> Self {
        Self {
            name,
            holder: holder.downgrade(),
        }
    }

    /// Returns the feature name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the holder, if it is still alive.
    #[must_use]
    pub fn holder(&self) -> Option<FeatureHolder> {
        self.holder.upgrade()
    }
}

impl fmt::Debug for FeatureBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureBase")
            .field("name", &self.name)
            .field("holder_alive", &self.holder.upgrade().is_some())
            .finish()
    }
}

/// Something whose behavior can be sealed by a construction-phase lock.
///
/// Holders push their lock state to every feature that exposes this trait
/// through [`Feature::as_lockable`].
pub trait Lockable {
    /// Returns whether the lock is set.
    fn is_locked(&self) -> bool;

    /// Sets or clears the lock.
    fn set_locked(&self, locked: bool);
}

/// A named capability unit owned by one holder.
///
/// Implementors embed a [`FeatureBase`] and override the optional hooks they
/// need.
///
/// # Example
///
/// ```rust
/// use understory_feature::{Feature, FeatureBase, FeatureDefinition, FeatureHolder};
///
/// #[derive(Debug)]
/// struct Label {
///     base: FeatureBase,
/// }
///
/// impl Feature for Label {
///     fn base(&self) -> &FeatureBase {
///         &self.base
///     }
/// }
///
/// let label = FeatureDefinition::new("label", |base| Label { base });
/// let holder = FeatureHolder::new();
/// let feature = holder.get(&label).unwrap();
/// assert_eq!(feature.name(), "label");
/// assert_eq!(feature.holder(), Some(holder));
/// ```
pub trait Feature: Any {
    /// Returns the embedded name and holder reference.
    fn base(&self) -> &FeatureBase;

    /// Returns the feature name.
    fn name(&self) -> &'static str {
        self.base().name()
    }

    /// Returns the owning holder, if it is still alive.
    fn holder(&self) -> Option<FeatureHolder> {
        self.base().holder()
    }

    /// Returns the concrete type name, for diagnostics.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Returns the lock interface if this feature understands the lock state.
    fn as_lockable(&self) -> Option<&dyn Lockable> {
        None
    }

    /// One-time initialization hook.
    ///
    /// The holder calls this exactly once, right after inserting a newly created
    /// feature and before handing it out. The feature is already reachable
    /// through the holder at that point.
    fn initialize(&self) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Returns whether an external serializer should persist this feature.
    fn is_persistent(&self) -> bool {
        false
    }
}

/// Identity and factory of a feature.
///
/// Holders cache features by [`name`](Definition::name) alone. Two definitions
/// sharing a name share the cached feature, regardless of the type each one
/// produces.
pub trait Definition {
    /// The feature type this definition produces.
    type Feature: Feature;

    /// Returns the name features are cached under.
    fn name(&self) -> &'static str;

    /// Creates a new feature bound to `holder`.
    fn create(&self, holder: &FeatureHolder) -> Self::Feature;

    /// Returns the [`TypeId`] of the produced feature type.
    fn produced_type(&self) -> TypeId {
        TypeId::of::<Self::Feature>()
    }

    /// Returns the name of the produced feature type.
    fn produced_type_name(&self) -> &'static str {
        core::any::type_name::<Self::Feature>()
    }
}

type Factory<F> = Box<dyn Fn(FeatureBase) -> F>;

/// A definition backed by a factory closure.
///
/// Equality is by name only, even between definitions of different feature
/// types.
pub struct FeatureDefinition<F> {
    name: &'static str,
    factory: Factory<F>,
}

impl<F: Feature> FeatureDefinition<F> {
    /// Creates a definition whose features are built by `factory`.
    pub fn new(name: &'static str, factory: impl Fn(FeatureBase) -> F + 'static) -> Self {
        Self {
            name,
            factory: Box::new(factory),
        }
    }
}

impl<F: Feature> Definition for FeatureDefinition<F> {
    type Feature = F;

    fn name(&self) -> &'static str {
        self.name
    }

    fn create(&self, holder: &FeatureHolder) -> F {
        (self.factory)(FeatureBase::new(self.name, holder))
    }
}

impl<F, G> PartialEq<FeatureDefinition<G>> for FeatureDefinition<F> {
    fn eq(&self, other: &FeatureDefinition<G>) -> bool {
        self.name == other.name
    }
}

impl<F> Eq for FeatureDefinition<F> {}

impl<F> core::hash::Hash for FeatureDefinition<F> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<F> fmt::Debug for FeatureDefinition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDefinition")
            .field("name", &self.name)
            .field("produces", &core::any::type_name::<F>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[derive(Debug)]
    struct Marker {
        base: FeatureBase,
    }

    impl Feature for Marker {
        fn base(&self) -> &FeatureBase {
            &self.base
        }
    }

    #[derive(Debug)]
    struct Other {
        base: FeatureBase,
    }

    impl Feature for Other {
        fn base(&self) -> &FeatureBase {
            &self.base
        }
    }

    #[test]
    fn equality_is_by_name_only() {
        let a = FeatureDefinition::new("shared", |base| Marker { base });
        let b = FeatureDefinition::new("shared", |base| Other { base });
        let c = FeatureDefinition::new("unique", |base| Marker { base });
        assert!(a == b);
        assert!(a != c);
        assert_ne!(a.produced_type(), b.produced_type());
    }

    #[test]
    fn create_binds_name_and_holder() {
        let holder = FeatureHolder::new();
        let def = FeatureDefinition::new("marker", |base| Marker { base });
        let feature = def.create(&holder);
        assert_eq!(feature.name(), "marker");
        assert_eq!(feature.holder(), Some(holder));
        assert!(feature.type_name().ends_with("Marker"));
        assert!(!feature.is_persistent());
        assert!(feature.as_lockable().is_none());
    }

    #[test]
    fn base_outlives_holder_without_keeping_it() {
        let holder = FeatureHolder::new();
        let base = FeatureBase::new("orphan", &holder);
        drop(holder);
        assert!(base.holder().is_none());
        assert!(format!("{base:?}").contains("holder_alive: false"));
    }

    #[test]
    fn definition_debug_names_product() {
        let def = FeatureDefinition::new("marker", |base| Marker { base });
        let debug = format!("{def:?}");
        assert!(debug.contains("marker"));
        assert!(debug.contains("Marker"));
    }
}
