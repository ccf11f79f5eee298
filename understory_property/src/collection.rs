// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collection-valued properties.
//!
//! A [`CollectionProperty`] stores a collection of elements and exposes three
//! chains: a getter, an adder and a remover. Each holder starts with its own
//! fresh collection.

use alloc::boxed::Box;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;

use tracing::trace;
use understory_feature::{
    Arguments, Definition, ExecutorContext, Feature, FeatureBase, FeatureError, FeatureHolder,
    Function, FunctionDefinition, InvocationError, Lockable, Modifiers, ParameterType, Priority,
};

use crate::cell::{SharedCell, StandardCell, ValueCell, share};
use crate::ownership::{attach, detach};
use crate::property::STORAGE_EXECUTOR;
use crate::value::PropertyValue;

/// A collection a [`CollectionProperty`] can store.
pub trait Collection<E>: PropertyValue {
    /// Adds `element`.
    fn add_element(&mut self, element: E);

    /// Removes one occurrence of `element`. Returns `false` if it was absent.
    fn remove_element(&mut self, element: &E) -> bool;

    /// Returns `true` if at least one occurrence of `element` is stored.
    fn contains_element(&self, element: &E) -> bool;

    /// Returns the number of elements.
    fn element_count(&self) -> usize;
}

impl<E: PropertyValue + PartialEq> Collection<E> for Vec<E> {
    fn add_element(&mut self, element: E) {
        self.push(element);
    }

    fn remove_element(&mut self, element: &E) -> bool {
        match self.iter().position(|e| e == element) {
            Some(idx) => {
                self.remove(idx);
                true
            }
            None => false,
        }
    }

    fn contains_element(&self, element: &E) -> bool {
        self.contains(element)
    }

    fn element_count(&self) -> usize {
        self.len()
    }
}

impl<E: PropertyValue + PartialEq> Collection<E> for VecDeque<E> {
    fn add_element(&mut self, element: E) {
        self.push_back(element);
    }

    fn remove_element(&mut self, element: &E) -> bool {
        match self.iter().position(|e| e == element) {
            Some(idx) => self.remove(idx).is_some(),
            None => false,
        }
    }

    fn contains_element(&self, element: &E) -> bool {
        self.contains(element)
    }

    fn element_count(&self) -> usize {
        self.len()
    }
}

impl<E: PropertyValue + Ord> Collection<E> for BTreeSet<E> {
    fn add_element(&mut self, element: E) {
        self.insert(element);
    }

    fn remove_element(&mut self, element: &E) -> bool {
        self.remove(element)
    }

    fn contains_element(&self, element: &E) -> bool {
        self.contains(element)
    }

    fn element_count(&self) -> usize {
        self.len()
    }
}

impl<E, S> Collection<E> for hashbrown::HashSet<E, S>
where
    E: PropertyValue + Eq + Hash,
    S: BuildHasher + Clone + Default + 'static,
{
    fn add_element(&mut self, element: E) {
        self.insert(element);
    }

    fn remove_element(&mut self, element: &E) -> bool {
        self.remove(element)
    }

    fn contains_element(&self, element: &E) -> bool {
        self.contains(element)
    }

    fn element_count(&self) -> usize {
        self.len()
    }
}

type CollectionFactory<C> = Box<dyn Fn() -> C>;

/// Declaration of a collection property.
///
/// # Example
///
/// ```rust
/// use understory_feature::FeatureHolder;
/// use understory_property::CollectionPropertyDefinitionBuilder;
///
/// let tags = CollectionPropertyDefinitionBuilder::<String, Vec<String>>::new("tags").build();
///
/// let a = FeatureHolder::new();
/// let b = FeatureHolder::new();
/// a.get(&tags).unwrap().add(String::from("red")).unwrap();
///
/// assert_eq!(a.get(&tags).unwrap().get().unwrap(), ["red"]);
/// assert!(b.get(&tags).unwrap().get().unwrap().is_empty());
/// ```
pub struct CollectionPropertyDefinition<E: PropertyValue, C: Collection<E>> {
    name: &'static str,
    cell: Box<dyn ValueCell<C>>,
    collection: CollectionFactory<C>,
    persistent: bool,
    hidden: bool,
    storage_priority: Priority,
    getter: FunctionDefinition<C>,
    adder: FunctionDefinition<()>,
    remover: FunctionDefinition<()>,
    element: PhantomData<fn() -> E>,
}

impl<E: PropertyValue, C: Collection<E>> CollectionPropertyDefinition<E, C> {
    /// Creates a definition with default settings.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        CollectionPropertyDefinitionBuilder::new(name).build()
    }

    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns whether the property is flagged for persistence.
    #[must_use]
    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Returns the hidden flag.
    ///
    /// The flag is informational: holders still enumerate hidden properties,
    /// and external tools decide whether to show them.
    #[must_use]
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns a new collection from the factory.
    #[must_use]
    pub fn new_collection(&self) -> C {
        (self.collection)()
    }

    /// Returns the getter chain definition.
    #[must_use]
    pub fn getter(&self) -> &FunctionDefinition<C> {
        &self.getter
    }

    /// Returns the getter chain definition for registering executors.
    pub fn getter_mut(&mut self) -> &mut FunctionDefinition<C> {
        &mut self.getter
    }

    /// Returns the adder chain definition.
    #[must_use]
    pub fn adder(&self) -> &FunctionDefinition<()> {
        &self.adder
    }

    /// Returns the adder chain definition for registering executors.
    pub fn adder_mut(&mut self) -> &mut FunctionDefinition<()> {
        &mut self.adder
    }

    /// Returns the remover chain definition.
    #[must_use]
    pub fn remover(&self) -> &FunctionDefinition<()> {
        &self.remover
    }

    /// Returns the remover chain definition for registering executors.
    pub fn remover_mut(&mut self) -> &mut FunctionDefinition<()> {
        &mut self.remover
    }
}

impl<E: PropertyValue, C: Collection<E>> Definition for CollectionPropertyDefinition<E, C> {
    type Feature = CollectionProperty<E, C>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn create(&self, holder: &FeatureHolder) -> CollectionProperty<E, C> {
        let cell = share(self.cell.reproduce());
        cell.borrow_mut().set(self.new_collection());

        let priority = self.storage_priority;
        let getter = self
            .getter
            .instantiate_with(holder, [storage_getter(Rc::clone(&cell), priority)]);
        let adder = self
            .adder
            .instantiate_with(holder, [storage_adder::<E, C>(Rc::clone(&cell), priority)]);
        let remover = self
            .remover
            .instantiate_with(holder, [storage_remover::<E, C>(Rc::clone(&cell), priority)]);

        CollectionProperty {
            base: FeatureBase::new(self.name, holder),
            cell,
            getter,
            adder,
            remover,
            installed: Cell::new(false),
            locked: Cell::new(false),
            persistent: self.persistent,
            hidden: self.hidden,
            element: PhantomData,
        }
    }
}

impl<E: PropertyValue, C: Collection<E>> fmt::Debug for CollectionPropertyDefinition<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPropertyDefinition")
            .field("name", &self.name)
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .field("storage_priority", &self.storage_priority)
            .field("getter", &self.getter)
            .field("adder", &self.adder)
            .field("remover", &self.remover)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CollectionPropertyDefinition`].
///
/// Defaults: a [`StandardCell`], `C::default` as the collection factory,
/// persistent, not hidden, and storage executors at [`Priority::DEFAULT`].
pub struct CollectionPropertyDefinitionBuilder<E: PropertyValue, C: Collection<E>> {
    name: &'static str,
    cell: Box<dyn ValueCell<C>>,
    collection: CollectionFactory<C>,
    persistent: bool,
    hidden: bool,
    storage_priority: Priority,
    element: PhantomData<fn() -> E>,
}

impl<E: PropertyValue, C: Collection<E>> CollectionPropertyDefinitionBuilder<E, C> {
    /// Creates a builder for a collection property named `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: Box::new(StandardCell::<C>::default()),
            collection: Box::new(C::default),
            persistent: true,
            hidden: false,
            storage_priority: Priority::DEFAULT,
            element: PhantomData,
        }
    }

    /// Sets the template cell; each holder gets a reproduction of it.
    #[must_use]
    pub fn cell(mut self, cell: impl ValueCell<C> + 'static) -> Self {
        self.cell = Box::new(cell);
        self
    }

    /// Sets the factory producing each holder's initial collection.
    #[must_use]
    pub fn collection<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> C + 'static,
    {
        self.collection = Box::new(factory);
        self
    }

    /// Sets whether the property is flagged for persistence.
    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the informational hidden flag for external tools.
    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Sets the priority of the storage executors.
    #[must_use]
    pub fn storage_priority(mut self, priority: Priority) -> Self {
        self.storage_priority = priority;
        self
    }

    /// Builds the [`CollectionPropertyDefinition`].
    #[must_use]
    pub fn build(self) -> CollectionPropertyDefinition<E, C> {
        CollectionPropertyDefinition {
            name: self.name,
            cell: self.cell,
            collection: self.collection,
            persistent: self.persistent,
            hidden: self.hidden,
            storage_priority: self.storage_priority,
            getter: FunctionDefinition::new(self.name, []),
            adder: FunctionDefinition::new(self.name, [ParameterType::of::<E>()]),
            remover: FunctionDefinition::new(self.name, [ParameterType::of::<E>()]),
            element: PhantomData,
        }
    }
}

impl<E: PropertyValue, C: Collection<E>> fmt::Debug for CollectionPropertyDefinitionBuilder<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPropertyDefinitionBuilder")
            .field("name", &self.name)
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .field("storage_priority", &self.storage_priority)
            .finish_non_exhaustive()
    }
}

fn storage_getter<C: PropertyValue>(cell: SharedCell<C>, priority: Priority) -> ExecutorContext<C> {
    ExecutorContext::from_fn(
        STORAGE_EXECUTOR,
        priority,
        Modifiers::NONE,
        move |invocation, arguments| {
            let collection = cell.borrow().get();
            invocation.next(arguments)?;
            Ok(collection)
        },
    )
}

fn element_argument<E: PropertyValue>(arguments: &Arguments) -> Result<E, InvocationError> {
    arguments
        .get::<E>(0)
        .cloned()
        .ok_or_else(|| InvocationError::failure("missing element argument"))
}

fn storage_adder<E, C>(cell: SharedCell<C>, priority: Priority) -> ExecutorContext<()>
where
    E: PropertyValue,
    C: Collection<E>,
{
    ExecutorContext::from_fn(
        STORAGE_EXECUTOR,
        priority,
        Modifiers::NONE,
        move |invocation, arguments| {
            let element: E = element_argument(arguments)?;
            if let Some(holder) = invocation.holder() {
                attach(&element, holder, invocation.function_name());
            }
            cell.borrow_mut()
                .modify(&mut |collection: &mut C| collection.add_element(element.clone()));
            invocation.next(arguments)
        },
    )
}

fn storage_remover<E, C>(cell: SharedCell<C>, priority: Priority) -> ExecutorContext<()>
where
    E: PropertyValue,
    C: Collection<E>,
{
    ExecutorContext::from_fn(
        STORAGE_EXECUTOR,
        priority,
        Modifiers::NONE,
        move |invocation, arguments| {
            let element: E = element_argument(arguments)?;
            let mut removed = false;
            let mut still_stored = false;
            cell.borrow_mut().modify(&mut |collection: &mut C| {
                removed = collection.remove_element(&element);
                still_stored = collection.contains_element(&element);
            });
            // Sequences drop one occurrence; a remaining copy keeps its parent.
            if removed
                && !still_stored
                && let Some(holder) = invocation.holder()
            {
                detach(&element, holder, invocation.function_name());
            }
            invocation.next(arguments)
        },
    )
}

/// A collection property owned by one holder.
pub struct CollectionProperty<E: PropertyValue, C: Collection<E>> {
    base: FeatureBase,
    cell: SharedCell<C>,
    getter: Function<C>,
    adder: Function<()>,
    remover: Function<()>,
    installed: Cell<bool>,
    locked: Cell<bool>,
    persistent: bool,
    hidden: bool,
    element: PhantomData<fn() -> E>,
}

impl<E: PropertyValue, C: Collection<E>> CollectionProperty<E, C> {
    /// Returns a copy of the collection produced by the getter chain.
    pub fn get(&self) -> Result<C, InvocationError> {
        if self.installed.get() {
            self.getter.invoke(&Arguments::new())
        } else {
            trace!(property = self.base.name(), "reading uninitialized collection");
            Ok(self.cell.borrow().get())
        }
    }

    /// Runs `element` through the adder chain.
    pub fn add(&self, element: E) -> Result<(), InvocationError> {
        if !self.installed.get() {
            return Err(InvocationError::Uninitialized(self.base.name()));
        }
        self.adder.invoke(&Arguments::new().with(element))
    }

    /// Runs `element` through the remover chain.
    pub fn remove(&self, element: E) -> Result<(), InvocationError> {
        if !self.installed.get() {
            return Err(InvocationError::Uninitialized(self.base.name()));
        }
        self.remover.invoke(&Arguments::new().with(element))
    }

    /// Returns the number of stored elements, bypassing the getter chain.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut len = 0;
        self.cell
            .borrow()
            .with(&mut |collection: &C| len = collection.element_count());
        len
    }

    /// Returns `true` if the stored collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the chains are installed.
    #[must_use]
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.installed.get()
    }

    /// Returns the hidden flag.
    ///
    /// The flag is informational: holders still enumerate hidden properties,
    /// and external tools decide whether to show them.
    #[must_use]
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns this holder's getter chain.
    #[must_use]
    pub fn getter(&self) -> &Function<C> {
        &self.getter
    }

    /// Returns this holder's adder chain.
    #[must_use]
    pub fn adder(&self) -> &Function<()> {
        &self.adder
    }

    /// Returns this holder's remover chain.
    #[must_use]
    pub fn remover(&self) -> &Function<()> {
        &self.remover
    }
}

impl<E: PropertyValue, C: Collection<E>> Feature for CollectionProperty<E, C> {
    fn base(&self) -> &FeatureBase {
        &self.base
    }

    fn as_lockable(&self) -> Option<&dyn Lockable> {
        Some(self)
    }

    fn initialize(&self) -> Result<(), FeatureError> {
        self.installed.set(true);
        Ok(())
    }

    /// Persisted iff flagged and non-empty.
    fn is_persistent(&self) -> bool {
        self.persistent && !self.is_empty()
    }
}

impl<E: PropertyValue, C: Collection<E>> Lockable for CollectionProperty<E, C> {
    fn is_locked(&self) -> bool {
        self.locked.get()
    }

    fn set_locked(&self, locked: bool) {
        self.locked.set(locked);
        self.getter.set_locked(locked);
        self.adder.set_locked(locked);
        self.remover.set_locked(locked);
    }
}

impl<E: PropertyValue, C: Collection<E>> fmt::Debug for CollectionProperty<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionProperty")
            .field("name", &self.base.name())
            .field("len", &self.len())
            .field("initialized", &self.installed.get())
            .field("locked", &self.locked.get())
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}
