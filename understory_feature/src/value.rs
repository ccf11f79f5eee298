// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased function arguments.
//!
//! This module provides [`ErasedValue`] for carrying values of any type through a
//! handler chain, [`Arguments`] for the ordered argument list of one call, and
//! [`ParameterType`] for describing what a function accepts.

use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;
use smallvec::SmallVec;

use crate::error::ArgumentMismatch;

/// A type-erased, cloneable value.
///
/// This wraps a value of any `'static + Clone` type, storing it on the heap
/// together with its type information for later downcasting.
///
/// # Example
///
/// ```rust
/// use understory_feature::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.type_name(), "i32");
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Creates a new erased value from a concrete value.
    #[must_use]
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the contained value.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Attempts to downcast to a reference of type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
}

impl<T: Clone + 'static> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }
}

/// The ordered argument list of one function call.
///
/// # Example
///
/// ```rust
/// use understory_feature::Arguments;
///
/// let args = Arguments::new().with(3_u32).with("label");
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.get::<u32>(0), Some(&3));
/// assert_eq!(args.get::<&str>(1), Some(&"label"));
/// assert_eq!(args.get::<u32>(1), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: SmallVec<[ErasedValue; 2]>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value and returns the list.
    #[must_use]
    pub fn with<T: Clone + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// Appends a value.
    pub fn push<T: Clone + 'static>(&mut self, value: T) {
        self.values.push(ErasedValue::new(value));
    }

    /// Returns the argument at `index` if it has type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(ErasedValue::downcast_ref)
    }

    /// Returns the erased argument at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&ErasedValue> {
        self.values.get(index)
    }

    /// Returns the number of arguments.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over the erased arguments.
    pub fn iter(&self) -> impl Iterator<Item = &ErasedValue> {
        self.values.iter()
    }
}

impl FromIterator<ErasedValue> for Arguments {
    fn from_iter<I: IntoIterator<Item = ErasedValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// The declared type of one function parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterType {
    /// Accepts a value of any type.
    Any,
    /// Accepts only values of exactly one type.
    Exact {
        /// The accepted type.
        type_id: TypeId,
        /// Name of the accepted type, for diagnostics.
        type_name: &'static str,
    },
}

impl ParameterType {
    /// A parameter that accepts exactly `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self::Exact {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the accepted type name, or `"any"`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Exact { type_name, .. } => type_name,
        }
    }

    /// Returns `true` if `value` can be passed for this parameter.
    #[must_use]
    pub fn accepts(&self, value: &ErasedValue) -> bool {
        match self {
            Self::Any => true,
            Self::Exact { type_id, .. } => *type_id == value.type_id(),
        }
    }
}

/// Checks `arguments` against `parameters`, reporting the first mismatch.
pub(crate) fn check_arguments(
    parameters: &[ParameterType],
    arguments: &Arguments,
) -> Result<(), ArgumentMismatch> {
    if parameters.len() != arguments.len() {
        return Err(ArgumentMismatch::Arity {
            expected: parameters.len(),
            found: arguments.len(),
        });
    }
    for (index, (parameter, value)) in parameters.iter().zip(arguments.iter()).enumerate() {
        if !parameter.accepts(value) {
            return Err(ArgumentMismatch::Type {
                index,
                expected: parameter.type_name(),
                found: value.type_name(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;

    #[test]
    fn erased_value_downcasts() {
        let value = ErasedValue::new(String::from("hello"));
        assert!(value.is::<String>());
        assert!(!value.is::<i32>());
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("hello"));
        assert_eq!(value.downcast_ref::<i32>(), None);
        assert_eq!(value.type_id(), TypeId::of::<String>());
    }

    #[test]
    fn erased_value_clone_is_independent() {
        let value = ErasedValue::new(7_u8);
        let cloned = value.clone();
        assert_eq!(cloned.downcast_ref::<u8>(), Some(&7));
        assert_eq!(value.downcast_ref::<u8>(), Some(&7));
    }

    #[test]
    fn erased_value_debug_names_type() {
        let debug = format!("{:?}", ErasedValue::new(1_i64));
        assert!(debug.contains("ErasedValue"));
        assert!(debug.contains("i64"));
    }

    #[test]
    fn arguments_push_and_get() {
        let mut args = Arguments::new();
        assert!(args.is_empty());
        args.push(1_i32);
        args.push(2.5_f64);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<i32>(0), Some(&1));
        assert_eq!(args.get::<f64>(1), Some(&2.5));
        assert!(args.get::<i32>(2).is_none());
        assert_eq!(args.value(1).map(ErasedValue::type_name), Some("f64"));
    }

    #[test]
    fn check_arity() {
        let parameters = [ParameterType::of::<i32>()];
        let err = check_arguments(&parameters, &Arguments::new()).unwrap_err();
        assert_eq!(
            err,
            ArgumentMismatch::Arity {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn check_types() {
        let parameters = [ParameterType::Any, ParameterType::of::<i32>()];
        let ok = Arguments::new().with("anything").with(5_i32);
        assert!(check_arguments(&parameters, &ok).is_ok());

        let bad = Arguments::new().with("anything").with(5_u64);
        let err = check_arguments(&parameters, &bad).unwrap_err();
        assert_eq!(
            err,
            ArgumentMismatch::Type {
                index: 1,
                expected: "i32",
                found: "u64"
            }
        );
    }
}
