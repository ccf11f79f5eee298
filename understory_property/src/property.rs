// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-value properties.
//!
//! This module provides [`PropertyDefinition`] for declaring a property and its
//! getter and setter chains, [`PropertyDefinitionBuilder`] for ergonomic
//! construction, and [`Property`], the per-holder feature.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use tracing::trace;
use understory_feature::{
    Arguments, Definition, ExecutorContext, Feature, FeatureBase, FeatureError, FeatureHolder,
    Function, FunctionDefinition, InvocationError, Lockable, Modifiers, ParameterType, Priority,
};

use crate::cell::{SharedCell, StandardCell, ValueCell, share};
use crate::ownership::{attach, detach};
use crate::value::PropertyValue;

/// Name of the executor that reads or writes the value cell.
///
/// It is appended to every property chain and sorts after user executors of
/// the same priority.
pub const STORAGE_EXECUTOR: &str = "storage";

type InitialValue<T> = Box<dyn Fn() -> T>;

/// Declaration of a single-value property.
///
/// The definition owns the getter and setter [`FunctionDefinition`]s. Register
/// executors on them through [`getter_mut`](Self::getter_mut) and
/// [`setter_mut`](Self::setter_mut) to intercept reads and writes.
///
/// # Example
///
/// ```rust
/// use understory_feature::{Arguments, FeatureHolder, Modifiers, Priority, TypeTag};
/// use understory_property::PropertyDefinitionBuilder;
///
/// let mut health = PropertyDefinitionBuilder::<u32>::new("health")
///     .initial_value(|| 10)
///     .build();
///
/// // Clamp every write to 100.
/// health.setter_mut().add_executor(
///     TypeTag::HOLDER,
///     "clamp",
///     Priority::new(6, 0),
///     Modifiers::NONE,
///     |inv, args| {
///         let value = args.get::<u32>(0).copied().unwrap_or_default();
///         inv.next(&Arguments::new().with(value.min(100)))
///     },
/// );
///
/// let hero = FeatureHolder::new();
/// let property = hero.get(&health).unwrap();
/// assert_eq!(property.get().unwrap(), 10);
///
/// property.set(250).unwrap();
/// assert_eq!(property.get().unwrap(), 100);
/// ```
pub struct PropertyDefinition<T: PropertyValue> {
    name: &'static str,
    cell: Box<dyn ValueCell<T>>,
    initial_value: Option<InitialValue<T>>,
    persistent: bool,
    hidden: bool,
    storage_priority: Priority,
    getter: FunctionDefinition<T>,
    setter: FunctionDefinition<()>,
}

impl<T: PropertyValue> PropertyDefinition<T> {
    /// Creates a definition with a [`StandardCell`] and default flags.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        PropertyDefinitionBuilder::new(name).build()
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

    /// Returns the priority of the storage executors.
    #[must_use]
    #[inline]
    pub fn storage_priority(&self) -> Priority {
        self.storage_priority
    }

    /// Returns the getter chain definition.
    #[must_use]
    pub fn getter(&self) -> &FunctionDefinition<T> {
        &self.getter
    }

    /// Returns the getter chain definition for registering executors.
    pub fn getter_mut(&mut self) -> &mut FunctionDefinition<T> {
        &mut self.getter
    }

    /// Returns the setter chain definition.
    #[must_use]
    pub fn setter(&self) -> &FunctionDefinition<()> {
        &self.setter
    }

    /// Returns the setter chain definition for registering executors.
    pub fn setter_mut(&mut self) -> &mut FunctionDefinition<()> {
        &mut self.setter
    }
}

impl<T: PropertyValue> Definition for PropertyDefinition<T> {
    type Feature = Property<T>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn create(&self, holder: &FeatureHolder) -> Property<T> {
        let cell = share(self.cell.reproduce());
        let getter = self.getter.instantiate_with(
            holder,
            [storage_getter(Rc::clone(&cell), self.storage_priority)],
        );
        let setter = self.setter.instantiate_with(
            holder,
            [storage_setter(Rc::clone(&cell), self.storage_priority)],
        );
        Property {
            base: FeatureBase::new(self.name, holder),
            cell,
            getter,
            setter,
            installed: Cell::new(false),
            locked: Cell::new(false),
            initial_value: RefCell::new(self.initial_value.as_ref().map(|factory| factory())),
            persistent: self.persistent,
            hidden: self.hidden,
        }
    }
}

// Manual Debug impl since the cell and initial value factory aren't Debug
impl<T: PropertyValue> fmt::Debug for PropertyDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("name", &self.name)
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .field("storage_priority", &self.storage_priority)
            .field("has_initial_value", &self.initial_value.is_some())
            .field("getter", &self.getter)
            .field("setter", &self.setter)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PropertyDefinition`].
///
/// Defaults: a [`StandardCell`], no initial value, persistent, not hidden, and
/// storage executors at [`Priority::DEFAULT`].
pub struct PropertyDefinitionBuilder<T: PropertyValue> {
    name: &'static str,
    cell: Box<dyn ValueCell<T>>,
    initial_value: Option<InitialValue<T>>,
    persistent: bool,
    hidden: bool,
    storage_priority: Priority,
}

impl<T: PropertyValue> PropertyDefinitionBuilder<T> {
    /// Creates a builder for a property named `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: Box::new(StandardCell::<T>::default()),
            initial_value: None,
            persistent: true,
            hidden: false,
            storage_priority: Priority::DEFAULT,
        }
    }

    /// Sets the template cell; each holder gets a reproduction of it.
    #[must_use]
    pub fn cell(mut self, cell: impl ValueCell<T> + 'static) -> Self {
        self.cell = Box::new(cell);
        self
    }

    /// Sets a factory for the value applied once when a holder's property is
    /// initialized.
    #[must_use]
    pub fn initial_value<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        self.initial_value = Some(Box::new(factory));
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
    ///
    /// User executors at a lower priority run after the value was read or
    /// written.
    #[must_use]
    pub fn storage_priority(mut self, priority: Priority) -> Self {
        self.storage_priority = priority;
        self
    }

    /// Builds the [`PropertyDefinition`].
    #[must_use]
    pub fn build(self) -> PropertyDefinition<T> {
        PropertyDefinition {
            name: self.name,
            cell: self.cell,
            initial_value: self.initial_value,
            persistent: self.persistent,
            hidden: self.hidden,
            storage_priority: self.storage_priority,
            getter: FunctionDefinition::new(self.name, []),
            setter: FunctionDefinition::new(self.name, [ParameterType::of::<T>()]),
        }
    }
}

impl<T: PropertyValue> fmt::Debug for PropertyDefinitionBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinitionBuilder")
            .field("name", &self.name)
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .field("storage_priority", &self.storage_priority)
            .field("has_initial_value", &self.initial_value.is_some())
            .finish_non_exhaustive()
    }
}

fn storage_getter<T: PropertyValue>(cell: SharedCell<T>, priority: Priority) -> ExecutorContext<T> {
    ExecutorContext::from_fn(
        STORAGE_EXECUTOR,
        priority,
        Modifiers::NONE,
        move |invocation, arguments| {
            let value = cell.borrow().get();
            invocation.next(arguments)?;
            Ok(value)
        },
    )
}

fn storage_setter<T: PropertyValue>(cell: SharedCell<T>, priority: Priority) -> ExecutorContext<()> {
    ExecutorContext::from_fn(
        STORAGE_EXECUTOR,
        priority,
        Modifiers::NONE,
        move |invocation, arguments| {
            let Some(value) = arguments.get::<T>(0).cloned() else {
                return Err(InvocationError::failure("missing value argument"));
            };
            if let Some(holder) = invocation.holder() {
                let old = cell.borrow().get();
                detach(&old, holder, invocation.function_name());
                attach(&value, holder, invocation.function_name());
            }
            cell.borrow_mut().set(value);
            invocation.next(arguments)
        },
    )
}

/// A single-value property owned by one holder.
///
/// Reads and writes go through the getter and setter chains once the property
/// is initialized. Before that, [`get`](Self::get) reads the cell directly and
/// [`set`](Self::set) fails.
pub struct Property<T: PropertyValue> {
    base: FeatureBase,
    cell: SharedCell<T>,
    getter: Function<T>,
    setter: Function<()>,
    installed: Cell<bool>,
    locked: Cell<bool>,
    initial_value: RefCell<Option<T>>,
    persistent: bool,
    hidden: bool,
}

impl<T: PropertyValue> Property<T> {
    /// Returns the value produced by the getter chain.
    pub fn get(&self) -> Result<T, InvocationError> {
        if self.installed.get() {
            self.getter.invoke(&Arguments::new())
        } else {
            trace!(property = self.base.name(), "reading uninitialized property");
            Ok(self.cell.borrow().get())
        }
    }

    /// Runs `value` through the setter chain.
    pub fn set(&self, value: T) -> Result<(), InvocationError> {
        if !self.installed.get() {
            return Err(InvocationError::Uninitialized(self.base.name()));
        }
        self.setter.invoke(&Arguments::new().with(value))
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
    pub fn getter(&self) -> &Function<T> {
        &self.getter
    }

    /// Returns this holder's setter chain.
    #[must_use]
    pub fn setter(&self) -> &Function<()> {
        &self.setter
    }
}

impl<T: PropertyValue> Feature for Property<T> {
    fn base(&self) -> &FeatureBase {
        &self.base
    }

    fn as_lockable(&self) -> Option<&dyn Lockable> {
        Some(self)
    }

    fn initialize(&self) -> Result<(), FeatureError> {
        if self.installed.replace(true) {
            return Ok(());
        }
        let initial = self.initial_value.borrow_mut().take();
        if let Some(value) = initial {
            self.set(value)?;
        }
        Ok(())
    }

    /// Persisted iff flagged and the stored value is persistent.
    fn is_persistent(&self) -> bool {
        if !self.persistent {
            return false;
        }
        let mut persistent = false;
        self.cell
            .borrow()
            .with(&mut |value: &T| persistent = value.is_persistent());
        persistent
    }
}

impl<T: PropertyValue> Lockable for Property<T> {
    fn is_locked(&self) -> bool {
        self.locked.get()
    }

    fn set_locked(&self, locked: bool) {
        self.locked.set(locked);
        self.getter.set_locked(locked);
        self.setter.set_locked(locked);
    }
}

impl<T: PropertyValue> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.base.name())
            .field("initialized", &self.installed.get())
            .field("locked", &self.locked.get())
            .field("persistent", &self.persistent)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;
    use understory_feature::TypeTag;

    #[test]
    fn builder_defaults() {
        let def = PropertyDefinition::<u32>::new("count");
        assert_eq!(def.name(), "count");
        assert!(def.is_persistent());
        assert!(!def.is_hidden());
        assert_eq!(def.storage_priority(), Priority::DEFAULT);
        assert!(def.getter().parameters().is_empty());
        assert_eq!(def.setter().parameters(), [ParameterType::of::<u32>()]);
    }

    #[test]
    fn created_property_reads_raw_until_initialized() {
        let def = PropertyDefinitionBuilder::<u32>::new("count")
            .cell(StandardCell::new(0))
            .initial_value(|| 4)
            .build();
        let holder = FeatureHolder::new();
        let property = def.create(&holder);

        assert!(!property.is_initialized());
        assert_eq!(property.get().unwrap(), 0);
        assert!(matches!(
            property.set(1),
            Err(InvocationError::Uninitialized("count"))
        ));

        property.initialize().unwrap();
        assert!(property.is_initialized());
        assert_eq!(property.get().unwrap(), 4);
    }

    #[test]
    fn initial_value_goes_through_setter_once() {
        let mut def = PropertyDefinitionBuilder::<String>::new("title")
            .initial_value(|| String::from("untitled"))
            .build();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        def.setter_mut().add_executor(
            TypeTag::HOLDER,
            "log",
            Priority::DEFAULT,
            Modifiers::NONE,
            move |inv, args| {
                log.borrow_mut()
                    .push(args.get::<String>(0).cloned().unwrap_or_default());
                inv.next(args)
            },
        );

        let holder = FeatureHolder::new();
        let property = holder.get(&def).unwrap();
        holder.get(&def).unwrap();
        property.set(String::from("second")).unwrap();
        assert_eq!(*seen.borrow(), ["untitled", "second"]);
    }

    #[test]
    fn storage_runs_after_user_executors_of_equal_priority() {
        let mut def = PropertyDefinition::<u32>::new("count");
        def.getter_mut().add_executor(
            TypeTag::HOLDER,
            "double",
            Priority::DEFAULT,
            Modifiers::NONE,
            |inv, args| Ok(inv.next(args)? * 2),
        );
        let holder = FeatureHolder::new();
        let property = holder.get(&def).unwrap();
        let names: Vec<_> = property.getter().executor_names().collect();
        assert_eq!(names, ["double", STORAGE_EXECUTOR]);

        property.set(21).unwrap();
        assert_eq!(property.get().unwrap(), 42);
    }

    #[test]
    fn storage_priority_moves_the_write_earlier() {
        let mut def = PropertyDefinitionBuilder::<u32>::new("count")
            .storage_priority(Priority::new(6, 0))
            .build();
        let observed = Rc::new(Cell::new(0_u32));
        let sink = Rc::clone(&observed);
        def.setter_mut().add_executor(
            TypeTag::HOLDER,
            "observe",
            Priority::DEFAULT,
            Modifiers::NONE,
            move |inv, args| {
                sink.set(args.get::<u32>(0).copied().unwrap_or_default());
                inv.next(args)
            },
        );
        let holder = FeatureHolder::new();
        let property = holder.get(&def).unwrap();
        let names: Vec<_> = property.setter().executor_names().collect();
        assert_eq!(names, [STORAGE_EXECUTOR, "observe"]);

        property.set(7).unwrap();
        assert_eq!(observed.get(), 7);
        assert_eq!(property.get().unwrap(), 7);
    }

    #[test]
    fn persistence_needs_flag_and_value() {
        let holder = FeatureHolder::new();
        let flagged = PropertyDefinition::<Option<u32>>::new("flagged");
        let property = holder.get(&flagged).unwrap();
        assert!(!property.is_persistent());
        property.set(Some(3)).unwrap();
        assert!(property.is_persistent());

        let unflagged = PropertyDefinitionBuilder::<u32>::new("unflagged")
            .persistent(false)
            .build();
        assert!(!holder.get(&unflagged).unwrap().is_persistent());
    }

    #[test]
    fn lock_reaches_chains() {
        let mut def = PropertyDefinition::<u32>::new("count");
        def.setter_mut().add_executor(
            TypeTag::HOLDER,
            "frozen",
            Priority::HIGHEST,
            Modifiers::NONE.lock_sensitive(),
            |_, _| Ok(()),
        );
        let holder = FeatureHolder::builder().locked(false).build();
        let property = holder.get(&def).unwrap();

        // Unlocked: the blocking executor swallows the write.
        property.set(5).unwrap();
        assert_eq!(property.get().unwrap(), 0);

        holder.set_locked(true);
        assert!(property.is_locked());
        assert!(property.setter().is_locked());
        property.set(5).unwrap();
        assert_eq!(property.get().unwrap(), 5);
    }

    #[test]
    fn debug_shows_flags() {
        let def = PropertyDefinitionBuilder::<u32>::new("count").hidden(true).build();
        let debug = format!("{def:?}");
        assert!(debug.contains("count"));
        assert!(debug.contains("hidden: true"));

        let holder = FeatureHolder::new();
        let debug = format!("{:?}", holder.get(&def).unwrap());
        assert!(debug.contains("initialized: true"));
    }
}
