// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value cells.
//!
//! A [`ValueCell`] is the storage strategy behind one property instance.
//! Definitions keep a template cell and [reproduce](ValueCell::reproduce) it
//! for every holder, so no two holders ever share a cell.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use understory_feature::{FeatureHolder, WeakHolder};

/// Storage for a single property value.
///
/// # Example
///
/// ```rust
/// use understory_property::{StandardCell, ValueCell};
///
/// let template = StandardCell::new(5_u32);
/// let mut fresh = template.reproduce();
///
/// assert_eq!(template.get(), 5);
/// assert_eq!(fresh.get(), 0);
///
/// fresh.set(9);
/// assert_eq!(template.get(), 5);
/// ```
pub trait ValueCell<T> {
    /// Returns a copy of the stored value.
    fn get(&self) -> T;

    /// Replaces the stored value.
    fn set(&mut self, value: T);

    /// Returns a new, empty cell using the same storage strategy.
    fn reproduce(&self) -> Box<dyn ValueCell<T>>;

    /// Mutates the stored value.
    fn modify(&mut self, f: &mut dyn FnMut(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Inspects the stored value without handing out a copy.
    ///
    /// Cells that store their value inline should override this to avoid the
    /// clone made by the default implementation.
    fn with(&self, f: &mut dyn FnMut(&T)) {
        f(&self.get());
    }
}

pub(crate) type SharedCell<T> = Rc<RefCell<Box<dyn ValueCell<T>>>>;

pub(crate) fn share<T>(cell: Box<dyn ValueCell<T>>) -> SharedCell<T> {
    Rc::new(RefCell::new(cell))
}

/// A cell that stores its value inline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StandardCell<T> {
    value: T,
}

impl<T> StandardCell<T> {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Default + 'static> ValueCell<T> for StandardCell<T> {
    fn get(&self) -> T {
        self.value.clone()
    }

    fn set(&mut self, value: T) {
        self.value = value;
    }

    fn reproduce(&self) -> Box<dyn ValueCell<T>> {
        Box::new(Self::default())
    }

    fn modify(&mut self, f: &mut dyn FnMut(&mut T)) {
        f(&mut self.value);
    }

    fn with(&self, f: &mut dyn FnMut(&T)) {
        f(&self.value);
    }
}

/// A cell that refers to a holder without owning it.
///
/// Reads return `None` once the referenced holder has been dropped.
///
/// # Example
///
/// ```rust
/// use understory_feature::FeatureHolder;
/// use understory_property::{ReferenceCell, ValueCell};
///
/// let mut cell = ReferenceCell::new();
/// let target = FeatureHolder::new();
/// cell.set(Some(target.clone()));
/// assert_eq!(cell.get(), Some(target.clone()));
///
/// drop(target);
/// assert_eq!(cell.get(), None);
/// ```
#[derive(Clone, Default)]
pub struct ReferenceCell {
    target: Option<WeakHolder>,
}

impl ReferenceCell {
    /// Creates an empty reference.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueCell<Option<FeatureHolder>> for ReferenceCell {
    fn get(&self) -> Option<FeatureHolder> {
        self.target.as_ref().and_then(WeakHolder::upgrade)
    }

    fn set(&mut self, value: Option<FeatureHolder>) {
        self.target = value.as_ref().map(FeatureHolder::downgrade);
    }

    fn reproduce(&self) -> Box<dyn ValueCell<Option<FeatureHolder>>> {
        Box::new(Self::new())
    }
}

impl fmt::Debug for ReferenceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCell")
            .field("target_alive", &self.get().is_some())
            .finish()
    }
}
