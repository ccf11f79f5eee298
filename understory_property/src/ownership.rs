// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent bookkeeping for child holders stored in properties.

use tracing::trace;
use understory_feature::FeatureHolder;

use crate::value::{PropertyValue, children};

/// Clears the parent of every child in `value` whose parent is `holder`.
pub(crate) fn detach<V: PropertyValue>(value: &V, holder: &FeatureHolder, property: &str) {
    for child in children(value) {
        if child.parent().is_some_and(|parent| parent == *holder) {
            trace!(property, "detaching child holder");
            child.set_parent(None);
        }
    }
}

/// Makes `holder` the parent of every child in `value` that accepts it.
///
/// Children requiring another parent type are left untouched.
pub(crate) fn attach<V: PropertyValue>(value: &V, holder: &FeatureHolder, property: &str) {
    for child in children(value) {
        if child.accepts_parent(holder) {
            trace!(property, "attaching child holder");
            child.set_parent(Some(holder));
        } else {
            trace!(property, "child holder rejects this parent type");
        }
    }
}
