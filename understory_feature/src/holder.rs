// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature holders.
//!
//! A [`FeatureHolder`] is an object assembled from a dynamic set of features. It
//! creates each feature lazily from its definition, caches it by name, and keeps
//! lock-aware features in sync with its own lock state.
//!
//! ## Ownership
//!
//! `FeatureHolder` is a cheap handle to shared, single-threaded state. Cloning
//! it yields another handle to the same holder, and equality is identity.
//! Features and child holders refer back to their holder through a
//! [`WeakHolder`], so the only strong edges point from parents to what they own.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use crate::error::FeatureError;
use crate::feature::{Definition, Feature};
use crate::function::FunctionDefinition;
use crate::tag::{TagSet, TypeTag};
use crate::value::Arguments;

#[derive(Default)]
struct FeatureSet {
    /// Features in insertion order.
    features: Vec<Rc<dyn Feature>>,
    by_name: HashMap<&'static str, usize>,
}

struct HolderInner {
    tags: TagSet,
    locked: Cell<bool>,
    required_parent: Option<TypeTag>,
    parent: RefCell<Option<WeakHolder>>,
    features: RefCell<FeatureSet>,
}

/// An object composed from lazily created, named features.
///
/// # Example
///
/// ```rust
/// use understory_feature::{Feature, FeatureBase, FeatureDefinition, FeatureHolder};
/// use std::rc::Rc;
///
/// #[derive(Debug)]
/// struct Inventory {
///     base: FeatureBase,
/// }
///
/// impl Feature for Inventory {
///     fn base(&self) -> &FeatureBase {
///         &self.base
///     }
/// }
///
/// let inventory = FeatureDefinition::new("inventory", |base| Inventory { base });
/// let holder = FeatureHolder::new();
///
/// let first = holder.get(&inventory).unwrap();
/// let second = holder.get(&inventory).unwrap();
/// assert!(Rc::ptr_eq(&first, &second));
/// assert_eq!(holder.len(), 1);
/// ```
#[derive(Clone)]
pub struct FeatureHolder {
    inner: Rc<HolderInner>,
}

impl FeatureHolder {
    /// Creates a locked holder that only satisfies [`TypeTag::HOLDER`].
    #[must_use]
    pub fn new() -> Self {
        HolderBuilder::new().build()
    }

    /// Returns a builder for configuring tags, lock state and parent type.
    #[must_use]
    pub fn builder() -> HolderBuilder {
        HolderBuilder::new()
    }

    /// Returns the tags this holder satisfies.
    #[must_use]
    #[inline]
    pub fn tags(&self) -> &TagSet {
        &self.inner.tags
    }

    /// Returns `true` if this holder satisfies `tag`.
    #[must_use]
    #[inline]
    pub fn satisfies(&self, tag: TypeTag) -> bool {
        self.inner.tags.contains(tag)
    }

    /// Returns the feature for `definition`, creating it on first request.
    ///
    /// A cached feature is looked up by the definition's name only. If it was
    /// created by a definition of another feature type, the factory of
    /// `definition` is not called and [`FeatureError::DefinitionMismatch`] is
    /// returned instead.
    ///
    /// A new feature receives the holder's current lock state, is inserted, and
    /// then initialized once. Initialization errors are returned, but the
    /// feature stays cached.
    pub fn get<D>(&self, definition: &D) -> Result<Rc<D::Feature>, FeatureError>
    where
        D: Definition + ?Sized,
    {
        let feature: Rc<dyn Any> = self.get_erased(definition)?;
        feature.downcast::<D::Feature>().map_err(|_| {
            let found = self
                .find(definition.name())
                .map_or("<unknown>", |f| f.type_name());
            warn!(
                feature = definition.name(),
                expected = definition.produced_type_name(),
                found,
                "cached feature does not match its definition"
            );
            FeatureError::DefinitionMismatch {
                name: definition.name(),
                expected: definition.produced_type_name(),
                found,
            }
        })
    }

    /// Returns the feature for `definition` without checking its type.
    pub fn get_erased<D>(&self, definition: &D) -> Result<Rc<dyn Feature>, FeatureError>
    where
        D: Definition + ?Sized,
    {
        if let Some(feature) = self.find(definition.name()) {
            return Ok(feature);
        }

        trace!(feature = definition.name(), "creating feature");
        let feature: Rc<dyn Feature> = Rc::new(definition.create(self));
        if let Some(lockable) = feature.as_lockable() {
            lockable.set_locked(self.is_locked());
        }
        self.insert(Rc::clone(&feature));
        feature.initialize()?;
        Ok(feature)
    }

    /// Invokes the function defined by `definition` on this holder.
    pub fn invoke<R>(
        &self,
        definition: &FunctionDefinition<R>,
        arguments: &Arguments,
    ) -> Result<R, FeatureError>
    where
        R: Default + 'static,
    {
        let function = self.get(definition)?;
        Ok(function.invoke(arguments)?)
    }

    /// Returns the cached feature named `name`, if any.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Rc<dyn Feature>> {
        let set = self.inner.features.borrow();
        set.by_name.get(name).map(|&idx| Rc::clone(&set.features[idx]))
    }

    /// Returns `true` if a feature named `name` has been created.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.features.borrow().by_name.contains_key(name)
    }

    /// Returns the number of created features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.features.borrow().features.len()
    }

    /// Returns `true` if no feature has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.features.borrow().features.is_empty()
    }

    /// Returns a snapshot of all features in creation order.
    #[must_use]
    pub fn features(&self) -> Vec<Rc<dyn Feature>> {
        self.inner.features.borrow().features.clone()
    }

    /// Returns a snapshot of the features an external serializer should walk.
    #[must_use]
    pub fn persistent_features(&self) -> Vec<Rc<dyn Feature>> {
        self.features()
            .into_iter()
            .filter(|f| f.is_persistent())
            .collect()
    }

    fn insert(&self, feature: Rc<dyn Feature>) {
        let mut set = self.inner.features.borrow_mut();
        let idx = set.features.len();
        set.by_name.insert(feature.name(), idx);
        set.features.push(feature);
    }

    /// Returns whether the holder is sealed.
    #[must_use]
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.locked.get()
    }

    /// Seals or unseals the holder and every lock-aware feature it holds.
    ///
    /// Features created later receive the state that is current when they are
    /// created.
    pub fn set_locked(&self, locked: bool) {
        self.inner.locked.set(locked);
        let features = self.features();
        debug!(locked, features = features.len(), "propagating holder lock");
        for feature in &features {
            if let Some(lockable) = feature.as_lockable() {
                lockable.set_locked(locked);
            }
        }
    }

    /// Returns the tag a parent must satisfy to own this holder.
    ///
    /// Holders without a required parent are never attached to a parent by
    /// property storage.
    #[must_use]
    #[inline]
    pub fn required_parent(&self) -> Option<TypeTag> {
        self.inner.required_parent
    }

    /// Returns `true` if `candidate` may become this holder's parent.
    #[must_use]
    pub fn accepts_parent(&self, candidate: &Self) -> bool {
        self.inner
            .required_parent
            .is_some_and(|tag| candidate.satisfies(tag))
    }

    /// Returns the parent, if one is set and still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner
            .parent
            .borrow()
            .as_ref()
            .and_then(WeakHolder::upgrade)
    }

    /// Sets or clears the parent back-reference.
    pub fn set_parent(&self, parent: Option<&Self>) {
        *self.inner.parent.borrow_mut() = parent.map(Self::downgrade);
    }

    /// Returns a non-owning reference to this holder.
    #[must_use]
    pub fn downgrade(&self) -> WeakHolder {
        WeakHolder(Rc::downgrade(&self.inner))
    }

    /// Returns `true` if both handles refer to the same holder.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for FeatureHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FeatureHolder {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for FeatureHolder {}

impl fmt::Debug for FeatureHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.inner.features.borrow();
        f.debug_struct("FeatureHolder")
            .field("tags", &self.inner.tags)
            .field("locked", &self.inner.locked.get())
            .field(
                "features",
                &set.features.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// A non-owning reference to a [`FeatureHolder`].
#[derive(Clone, Default)]
pub struct WeakHolder(Weak<HolderInner>);

impl WeakHolder {
    /// Creates a reference that never upgrades.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the holder if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<FeatureHolder> {
        self.0.upgrade().map(|inner| FeatureHolder { inner })
    }

    /// Returns `true` if this reference points at `holder`.
    #[must_use]
    pub fn points_to(&self, holder: &FeatureHolder) -> bool {
        Weak::ptr_eq(&self.0, &Rc::downgrade(&holder.inner))
    }
}

impl fmt::Debug for WeakHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakHolder")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

/// Builder for [`FeatureHolder`].
///
/// # Example
///
/// ```rust
/// use understory_feature::{FeatureHolder, TypeTag};
///
/// const WORLD: TypeTag = TypeTag::new("world");
/// const ENTITY: TypeTag = TypeTag::new("entity");
///
/// let world = FeatureHolder::builder().tag(WORLD).build();
/// let entity = FeatureHolder::builder()
///     .tag(ENTITY)
///     .locked(false)
///     .owned_by(WORLD)
///     .build();
///
/// assert!(world.is_locked());
/// assert!(!entity.is_locked());
/// assert!(entity.accepts_parent(&world));
/// assert!(!world.accepts_parent(&entity));
/// ```
#[derive(Clone, Debug)]
pub struct HolderBuilder {
    tags: TagSet,
    locked: bool,
    required_parent: Option<TypeTag>,
}

impl HolderBuilder {
    /// Creates a builder for a locked holder with no extra tags.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: TagSet::new(),
            locked: true,
            required_parent: None,
        }
    }

    /// Adds a tag the holder satisfies.
    #[must_use]
    pub fn tag(mut self, tag: TypeTag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Adds several tags the holder satisfies.
    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = TypeTag>) -> Self {
        for tag in tags {
            self.tags.insert(tag);
        }
        self
    }

    /// Sets the initial lock state (default: locked).
    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Makes the holder an ownable child of holders satisfying `tag`.
    #[must_use]
    pub fn owned_by(mut self, tag: TypeTag) -> Self {
        self.required_parent = Some(tag);
        self
    }

    /// Builds the holder.
    #[must_use]
    pub fn build(self) -> FeatureHolder {
        FeatureHolder {
            inner: Rc::new(HolderInner {
                tags: self.tags,
                locked: Cell::new(self.locked),
                required_parent: self.required_parent,
                parent: RefCell::new(None),
                features: RefCell::new(FeatureSet::default()),
            }),
        }
    }
}

impl Default for HolderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
