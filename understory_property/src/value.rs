// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Values that properties can store.

use alloc::collections::{BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

use understory_feature::FeatureHolder;

/// A value storable in a property.
///
/// Besides being cloneable, a value reports the child holders it contains, so
/// that property storage can maintain their parent references, and whether it
/// should be persisted.
pub trait PropertyValue: Clone + Default + 'static {
    /// Calls `f` for each ownable child holder contained in this value.
    ///
    /// A holder is ownable if it declares a required parent type.
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        let _ = f;
    }

    /// Returns whether this value should be persisted.
    fn is_persistent(&self) -> bool {
        true
    }
}

macro_rules! plain_values {
    ($($ty:ty),* $(,)?) => {
        $(impl PropertyValue for $ty {})*
    };
}

plain_values!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl PropertyValue for FeatureHolder {
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        if self.required_parent().is_some() {
            f(self);
        }
    }
}

/// `None` is the null value: it is neither persisted nor a child.
impl<V: PropertyValue> PropertyValue for Option<V> {
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        if let Some(value) = self {
            value.for_each_child(f);
        }
    }

    fn is_persistent(&self) -> bool {
        self.as_ref().is_some_and(PropertyValue::is_persistent)
    }
}

impl<V: PropertyValue> PropertyValue for Vec<V> {
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        for value in self {
            value.for_each_child(f);
        }
    }
}

impl<V: PropertyValue> PropertyValue for VecDeque<V> {
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        for value in self {
            value.for_each_child(f);
        }
    }
}

impl<V: PropertyValue + Ord> PropertyValue for BTreeSet<V> {
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        for value in self {
            value.for_each_child(f);
        }
    }
}

impl<V, S> PropertyValue for hashbrown::HashSet<V, S>
where
    V: PropertyValue + Eq + core::hash::Hash,
    S: core::hash::BuildHasher + Clone + Default + 'static,
{
    fn for_each_child(&self, f: &mut dyn FnMut(&FeatureHolder)) {
        for value in self {
            value.for_each_child(f);
        }
    }
}

/// Collects the ownable children of `value`.
pub(crate) fn children<V: PropertyValue>(value: &V) -> Vec<FeatureHolder> {
    let mut children = Vec::new();
    value.for_each_child(&mut |child: &FeatureHolder| children.push(child.clone()));
    children
}
