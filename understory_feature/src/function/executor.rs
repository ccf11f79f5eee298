// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use super::{Invocation, Modifiers, Priority};
use crate::error::InvocationError;
use crate::value::Arguments;

/// One handler in a function's chain.
///
/// An executor may call [`Invocation::next`] to run the rest of the chain and
/// then return that result, a value of its own, or an error. Not calling `next`
/// ends the chain at this executor.
///
/// Closures with the matching signature implement this trait.
pub trait Executor<R> {
    /// Runs this handler.
    fn execute(
        &self,
        invocation: &mut Invocation<'_, R>,
        arguments: &Arguments,
    ) -> Result<R, InvocationError>;
}

impl<R, F> Executor<R> for F
where
    F: Fn(&mut Invocation<'_, R>, &Arguments) -> Result<R, InvocationError>,
{
    fn execute(
        &self,
        invocation: &mut Invocation<'_, R>,
        arguments: &Arguments,
    ) -> Result<R, InvocationError> {
        self(invocation, arguments)
    }
}

/// A resolved executor inside one function instance.
///
/// The executor itself is shared with the definition it came from, while the
/// execution counter belongs to this instance alone and is never reset.
pub struct ExecutorContext<R> {
    name: &'static str,
    priority: Priority,
    modifiers: Modifiers,
    executor: Rc<dyn Executor<R>>,
    executions: Cell<u32>,
}

impl<R> ExecutorContext<R> {
    /// Creates a context with a zero execution count.
    #[must_use]
    pub fn new(
        name: &'static str,
        priority: Priority,
        modifiers: Modifiers,
        executor: Rc<dyn Executor<R>>,
    ) -> Self {
        Self {
            name,
            priority,
            modifiers,
            executor,
            executions: Cell::new(0),
        }
    }

    /// Creates a context running a closure.
    #[must_use]
    pub fn from_fn<F>(name: &'static str, priority: Priority, modifiers: Modifiers, executor: F) -> Self
    where
        F: Fn(&mut Invocation<'_, R>, &Arguments) -> Result<R, InvocationError> + 'static,
        R: 'static,
    {
        Self::new(name, priority, modifiers, Rc::new(executor))
    }

    /// Returns the executor name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the priority.
    #[must_use]
    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the gating modifiers.
    #[must_use]
    #[inline]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns how often the executor ran in this instance.
    #[must_use]
    #[inline]
    pub fn executions(&self) -> u32 {
        self.executions.get()
    }

    pub(crate) fn executor(&self) -> &dyn Executor<R> {
        &*self.executor
    }

    pub(crate) fn record_execution(&self) {
        self.executions.set(self.executions.get().saturating_add(1));
    }
}

impl<R> fmt::Debug for ExecutorContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("modifiers", &self.modifiers)
            .field("executions", &self.executions.get())
            .finish_non_exhaustive()
    }
}
