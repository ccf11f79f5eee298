// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Periodic gating of an executor.
///
/// With `tick` being the number of earlier invocations of the function, the
/// executor is admitted iff `tick >= first` and `(tick - first)` is a multiple
/// of `repeat + 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delay {
    first: u32,
    repeat: u32,
}

impl Delay {
    /// Skips the first `first` invocations, then runs once every `repeat + 1`.
    #[must_use]
    pub const fn new(first: u32, repeat: u32) -> Self {
        Self { first, repeat }
    }

    /// Returns the number of initially skipped invocations.
    #[must_use]
    #[inline]
    pub const fn first(self) -> u32 {
        self.first
    }

    /// Returns the number of invocations skipped between two runs.
    #[must_use]
    #[inline]
    pub const fn repeat(self) -> u32 {
        self.repeat
    }

    /// Returns `true` if invocation number `tick` (zero-based) is admitted.
    #[must_use]
    pub const fn admits(self, tick: u64) -> bool {
        let first = self.first as u64;
        tick >= first && (tick - first) % (self.repeat as u64 + 1) == 0
    }
}

/// Why a gated executor was passed over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Skip {
    /// The executor is lock-sensitive and the function is locked.
    Locked,
    /// The current tick is not admitted by the executor's [`Delay`].
    Delayed,
    /// The executor reached its execution limit.
    Exhausted,
}

/// Gating modifiers attached to one executor registration.
///
/// All modifiers must admit an invocation for the executor to run. A skipped
/// executor does not count as executed.
///
/// # Example
///
/// ```rust
/// use understory_feature::Modifiers;
///
/// let once = Modifiers::NONE.with_limit(1);
/// assert!(once.admits(0, 0, false));
/// assert!(!once.admits(1, 1, false));
///
/// let every_other = Modifiers::NONE.with_delay(0, 1);
/// assert!(every_other.admits(0, 0, false));
/// assert!(!every_other.admits(1, 1, false));
/// assert!(every_other.admits(2, 1, false));
///
/// let sealed = Modifiers::NONE.lock_sensitive();
/// assert!(!sealed.admits(0, 0, true));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    limit: Option<u32>,
    delay: Option<Delay>,
    lock_sensitive: bool,
}

impl Modifiers {
    /// No gating: the executor runs whenever the chain reaches it.
    pub const NONE: Self = Self {
        limit: None,
        delay: None,
        lock_sensitive: false,
    };

    /// Equivalent to [`Modifiers::NONE`].
    #[must_use]
    pub const fn new() -> Self {
        Self::NONE
    }

    /// Limits the executor to `executions` runs per function instance.
    #[must_use]
    pub const fn with_limit(mut self, executions: u32) -> Self {
        self.limit = Some(executions);
        self
    }

    /// Attaches a [`Delay`].
    #[must_use]
    pub const fn with_delay(mut self, first: u32, repeat: u32) -> Self {
        self.delay = Some(Delay::new(first, repeat));
        self
    }

    /// Skips the executor while the function is locked.
    #[must_use]
    pub const fn lock_sensitive(mut self) -> Self {
        self.lock_sensitive = true;
        self
    }

    /// Returns the execution limit, if any.
    #[must_use]
    #[inline]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Returns the delay, if any.
    #[must_use]
    #[inline]
    pub const fn delay(&self) -> Option<Delay> {
        self.delay
    }

    /// Returns whether the executor is skipped while locked.
    #[must_use]
    #[inline]
    pub const fn is_lock_sensitive(&self) -> bool {
        self.lock_sensitive
    }

    /// Decides whether an executor runs.
    ///
    /// `tick` is the zero-based invocation index of the function, `executions`
    /// how often this executor already ran, and `locked` the function's lock
    /// state.
    pub fn check(&self, tick: u64, executions: u32, locked: bool) -> Result<(), Skip> {
        if self.lock_sensitive && locked {
            return Err(Skip::Locked);
        }
        if self.delay.is_some_and(|delay| !delay.admits(tick)) {
            return Err(Skip::Delayed);
        }
        if self.limit.is_some_and(|limit| executions >= limit) {
            return Err(Skip::Exhausted);
        }
        Ok(())
    }

    /// Returns `true` if [`check`](Self::check) admits the executor.
    #[must_use]
    pub fn admits(&self, tick: u64, executions: u32, locked: bool) -> bool {
        self.check(tick, executions, locked).is_ok()
    }
}
