// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// Two-level execution priority of an executor.
///
/// A priority is a tier and a sub-level, both in `0..10`. Its [`rank`] is
/// `tier * 10 + sub`; executors with a higher rank run earlier in a chain.
///
/// [`rank`]: Priority::rank
///
/// # Example
///
/// ```rust
/// use understory_feature::Priority;
///
/// const GUARD: Priority = Priority::new(7, 5);
/// assert_eq!(GUARD.rank(), 75);
/// assert!(GUARD > Priority::DEFAULT);
/// assert_eq!(Priority::level(4), Priority::DEFAULT);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority {
    tier: u8,
    sub: u8,
}

impl Priority {
    /// The lowest priority, tier 0 / sub-level 0.
    pub const LOWEST: Self = Self::new(0, 0);
    /// The priority used when none is given, tier 4 / sub-level 0.
    pub const DEFAULT: Self = Self::level(4);
    /// The highest priority, tier 9 / sub-level 9.
    pub const HIGHEST: Self = Self::new(9, 9);

    /// Creates a priority.
    ///
    /// # Panics
    ///
    /// Panics if `tier` or `sub` is not below 10. In a const context this is a
    /// compile error.
    #[must_use]
    pub const fn new(tier: u8, sub: u8) -> Self {
        assert!(tier < 10, "priority tier must be in 0..10");
        assert!(sub < 10, "priority sub-level must be in 0..10");
        Self { tier, sub }
    }

    /// Creates a priority at sub-level 0 of `tier`.
    #[must_use]
    pub const fn level(tier: u8) -> Self {
        Self::new(tier, 0)
    }

    /// Returns the tier.
    #[must_use]
    #[inline]
    pub const fn tier(self) -> u8 {
        self.tier
    }

    /// Returns the sub-level.
    #[must_use]
    #[inline]
    pub const fn sub(self) -> u8 {
        self.sub
    }

    /// Returns the combined rank, `tier * 10 + sub`.
    #[must_use]
    #[inline]
    pub const fn rank(self) -> u8 {
        self.tier * 10 + self.sub
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({}.{})", self.tier, self.sub)
    }
}
