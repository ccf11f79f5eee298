// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: value-holding features with interceptable access.
//!
//! This crate builds properties on top of `understory_feature`. A property is
//! a feature that stores a value for its holder and routes every read and write
//! through a handler chain, so other code can observe, veto or rewrite access
//! by registering executors.
//!
//! ## Core Concepts
//!
//! ### Properties
//!
//! A [`PropertyDefinition`] declares a single-value property. Each holder that
//! requests it gets a [`Property`] with:
//!
//! - its own value cell, reproduced from the definition's template
//!   [`ValueCell`];
//! - a getter chain and a setter chain, each ending in a storage executor named
//!   [`STORAGE_EXECUTOR`];
//! - an optional initial value, applied once through the setter chain.
//!
//! [`CollectionPropertyDefinition`] does the same for collections, with getter,
//! adder and remover chains.
//!
//! ### Ownership
//!
//! Holders that declare a required parent type are ownable children. When such
//! a holder is stored in a property of an accepted parent, the storage executor
//! sets its parent reference; replacing or removing it clears the reference
//! again, provided it still points at that parent.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_feature::{FeatureHolder, TypeTag};
//! use understory_property::PropertyDefinition;
//!
//! const ROOM: TypeTag = TypeTag::new("room");
//!
//! let occupant = PropertyDefinition::<Option<FeatureHolder>>::new("occupant");
//!
//! let room = FeatureHolder::builder().tag(ROOM).build();
//! let guest = FeatureHolder::builder().owned_by(ROOM).build();
//!
//! let slot = room.get(&occupant).unwrap();
//! slot.set(Some(guest.clone())).unwrap();
//! assert_eq!(guest.parent(), Some(room.clone()));
//!
//! slot.set(None).unwrap();
//! assert_eq!(guest.parent(), None);
//! ```
//!
//! ## Cell Strategies
//!
//! | Cell | Description |
//! |------|-------------|
//! | [`StandardCell`] | Stores the value inline |
//! | [`ReferenceCell`] | Refers to a holder without owning it |
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. The `std` feature is forwarded to
//! `understory_feature` and `tracing`.

#![no_std]

extern crate alloc;

mod cell;
mod collection;
mod ownership;
mod property;
mod value;

pub use cell::{ReferenceCell, StandardCell, ValueCell};
pub use collection::{
    Collection, CollectionProperty, CollectionPropertyDefinition,
    CollectionPropertyDefinitionBuilder,
};
pub use property::{Property, PropertyDefinition, PropertyDefinitionBuilder, STORAGE_EXECUTOR};
pub use value::PropertyValue;
