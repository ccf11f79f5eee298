// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability tags for holder variants.
//!
//! This module provides [`TypeTag`], a named capability a holder satisfies, and
//! [`TagSet`], the set of tags carried by one holder.
//!
//! Executors are registered against a tag (a "variant"). A holder picks up every
//! executor whose tag it carries, so a specialised holder lists the tags of the
//! more general kinds it belongs to as well as its own.

use core::fmt;
use smallvec::SmallVec;

/// A named capability tag.
///
/// Tags are compared by name. They are cheap to copy and can be declared as
/// constants next to the definitions that use them.
///
/// # Example
///
/// ```rust
/// use understory_feature::{TagSet, TypeTag};
///
/// const ENTITY: TypeTag = TypeTag::new("entity");
/// const PLAYER: TypeTag = TypeTag::new("player");
///
/// let tags = TagSet::from_iter([ENTITY, PLAYER]);
/// assert!(tags.contains(PLAYER));
/// assert!(tags.contains(TypeTag::HOLDER));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTag(&'static str);

impl TypeTag {
    /// The root variant, satisfied by every holder.
    pub const HOLDER: Self = Self("holder");

    /// Creates a tag with the given name.
    #[must_use]
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the tag name.
    #[must_use]
    #[inline]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeTag").field(&self.0).finish()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The set of tags a holder satisfies.
///
/// Stored sorted and de-duplicated. [`TypeTag::HOLDER`] is always contained,
/// whether it was inserted or not.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: SmallVec<[TypeTag; 4]>,
}

impl TagSet {
    /// Creates a set that only satisfies [`TypeTag::HOLDER`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: TypeTag) -> bool {
        if tag == TypeTag::HOLDER {
            return false;
        }
        match self.tags.binary_search(&tag) {
            Ok(_) => false,
            Err(idx) => {
                self.tags.insert(idx, tag);
                true
            }
        }
    }

    /// Returns `true` if a holder with this set satisfies `tag`.
    #[must_use]
    #[inline]
    pub fn contains(&self, tag: TypeTag) -> bool {
        tag == TypeTag::HOLDER || self.tags.binary_search(&tag).is_ok()
    }

    /// Returns the explicitly inserted tags in name order.
    pub fn iter(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.tags.iter().copied()
    }

    /// Returns the number of explicitly inserted tags.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tag besides [`TypeTag::HOLDER`] is present.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<TypeTag> for TagSet {
    fn from_iter<I: IntoIterator<Item = TypeTag>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags.iter().map(|t| t.0)).finish()
    }
}
