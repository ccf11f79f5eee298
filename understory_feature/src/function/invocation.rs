// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::ExecutorContext;
use crate::error::InvocationError;
use crate::feature::{Feature, FeatureBase, Lockable};
use crate::holder::FeatureHolder;
use crate::value::{Arguments, ParameterType, check_arguments};

/// A function instance owned by one holder.
///
/// Holds the resolved, ordered executor chain together with the per-instance
/// state the modifiers need: one execution counter per executor, the number of
/// invocations so far, and the lock flag propagated from the holder.
pub struct Function<R> {
    base: FeatureBase,
    parameters: SmallVec<[ParameterType; 2]>,
    contexts: Vec<ExecutorContext<R>>,
    locked: Cell<bool>,
    ticks: Cell<u64>,
}

impl<R: Default + 'static> Function<R> {
    pub(crate) fn new(
        base: FeatureBase,
        parameters: SmallVec<[ParameterType; 2]>,
        contexts: Vec<ExecutorContext<R>>,
    ) -> Self {
        Self {
            base,
            parameters,
            contexts,
            locked: Cell::new(false),
            ticks: Cell::new(0),
        }
    }

    /// Runs the chain with `arguments`.
    ///
    /// The arguments are validated first; a rejected call does not count as an
    /// invocation. Then the first admitted executor runs. If no executor runs,
    /// the result is `R::default()`.
    pub fn invoke(&self, arguments: &Arguments) -> Result<R, InvocationError> {
        check_arguments(&self.parameters, arguments).map_err(|mismatch| {
            InvocationError::InvalidArguments {
                function: self.base.name(),
                mismatch,
            }
        })?;
        let tick = self.ticks.get();
        self.ticks.set(tick + 1);

        let mut invocation = Invocation {
            function: self,
            holder: self.base.holder(),
            cursor: 0,
            tick,
        };
        invocation.next(arguments)
    }

    /// Returns the executor names in chain order.
    pub fn executor_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.contexts.iter().map(ExecutorContext::name)
    }

    /// Returns the resolved executors in chain order.
    #[must_use]
    pub fn contexts(&self) -> &[ExecutorContext<R>] {
        &self.contexts
    }

    /// Returns the declared parameter types.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    /// Returns the number of accepted invocations so far.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.ticks.get()
    }
}

impl<R: 'static> Feature for Function<R> {
    fn base(&self) -> &FeatureBase {
        &self.base
    }

    fn as_lockable(&self) -> Option<&dyn Lockable> {
        Some(self)
    }
}

impl<R> Lockable for Function<R> {
    fn is_locked(&self) -> bool {
        self.locked.get()
    }

    fn set_locked(&self, locked: bool) {
        self.locked.set(locked);
    }
}

impl<R> fmt::Debug for Function<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.base.name())
            .field("executors", &self.contexts)
            .field("locked", &self.locked.get())
            .field("invocations", &self.ticks.get())
            .finish_non_exhaustive()
    }
}

/// The state of one running chain, handed to each executor.
///
/// The cursor only moves forward. Calling [`next`](Self::next) again after the
/// rest of the chain ran continues from where the previous call stopped.
pub struct Invocation<'a, R> {
    function: &'a Function<R>,
    holder: Option<FeatureHolder>,
    cursor: usize,
    tick: u64,
}

impl<R: Default + 'static> Invocation<'_, R> {
    /// Runs the next admitted executor and returns its result.
    ///
    /// Executors rejected by their modifiers are passed over without counting
    /// as executed. Returns `R::default()` once the chain is exhausted.
    pub fn next(&mut self, arguments: &Arguments) -> Result<R, InvocationError> {
        let function = self.function;
        let locked = function.locked.get();
        while let Some(context) = function.contexts.get(self.cursor) {
            self.cursor += 1;
            if let Err(skip) = context
                .modifiers()
                .check(self.tick, context.executions(), locked)
            {
                trace!(
                    function = function.base.name(),
                    executor = context.name(),
                    tick = self.tick,
                    ?skip,
                    "executor skipped"
                );
                continue;
            }
            context.record_execution();
            return context
                .executor()
                .execute(self, arguments)
                .map_err(|mut err| {
                    if err.attribute(context.name()) {
                        debug!(
                            function = function.base.name(),
                            executor = context.name(),
                            error = %err,
                            "executor failed"
                        );
                    }
                    err
                });
        }
        Ok(R::default())
    }
}

impl<R> Invocation<'_, R> {
    /// Returns the holder the function belongs to, if it is still alive.
    #[must_use]
    pub fn holder(&self) -> Option<&FeatureHolder> {
        self.holder.as_ref()
    }

    /// Returns the zero-based index of this invocation.
    #[must_use]
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns the name of the running function.
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        self.function.base.name()
    }

    /// Returns `true` if no executor is left to consider.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.function.contexts.len()
    }
}

impl<R> fmt::Debug for Invocation<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("function", &self.function.base.name())
            .field("cursor", &self.cursor)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Definition;
    use crate::function::{FunctionDefinition, Modifiers, Priority};
    use crate::tag::TypeTag;
    use alloc::rc::Rc;
    use alloc::string::String;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logging(def: &mut FunctionDefinition<u32>, log: &Log, name: &'static str, priority: Priority) {
        let log = Rc::clone(log);
        def.add_executor(TypeTag::HOLDER, name, priority, Modifiers::NONE, move |inv, args| {
            log.borrow_mut().push(name);
            inv.next(args)
        });
    }

    #[test]
    fn empty_chain_returns_default() {
        let def = FunctionDefinition::<u32>::new("f", []);
        let holder = FeatureHolder::new();
        let function = def.create(&holder);
        assert_eq!(function.invoke(&Arguments::new()).unwrap(), 0);
        assert_eq!(function.invocations(), 1);
    }

    #[test]
    fn chain_runs_by_rank() {
        let log = Log::default();
        let mut def = FunctionDefinition::<u32>::new("f", []);
        logging(&mut def, &log, "low", Priority::new(2, 0));
        logging(&mut def, &log, "high", Priority::new(8, 3));
        logging(&mut def, &log, "mid", Priority::DEFAULT);

        let holder = FeatureHolder::new();
        def.create(&holder).invoke(&Arguments::new()).unwrap();
        assert_eq!(*log.borrow(), ["high", "mid", "low"]);
    }

    #[test]
    fn executor_can_short_circuit() {
        let log = Log::default();
        let mut def = FunctionDefinition::<u32>::new("f", []);
        logging(&mut def, &log, "after", Priority::LOWEST);
        def.add_executor(TypeTag::HOLDER, "stop", Priority::DEFAULT, Modifiers::NONE, |_, _| {
            Ok(7)
        });

        let holder = FeatureHolder::new();
        assert_eq!(def.create(&holder).invoke(&Arguments::new()).unwrap(), 7);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn repeated_next_continues_from_cursor() {
        let log = Log::default();
        let mut def = FunctionDefinition::<u32>::new("f", []);
        logging(&mut def, &log, "a", Priority::new(2, 0));
        logging(&mut def, &log, "b", Priority::new(1, 0));
        def.add_executor(TypeTag::HOLDER, "twice", Priority::HIGHEST, Modifiers::NONE, |inv, args| {
            let first = inv.next(args)?;
            assert!(inv.is_exhausted());
            let second = inv.next(args)?;
            Ok(first + second + 1)
        });

        let holder = FeatureHolder::new();
        assert_eq!(def.create(&holder).invoke(&Arguments::new()).unwrap(), 1);
        assert_eq!(*log.borrow(), ["a", "b"]);
    }

    #[test]
    fn rejected_arguments_do_not_tick() {
        let mut def = FunctionDefinition::<u32>::new("f", [ParameterType::of::<u32>()]);
        def.add_executor(TypeTag::HOLDER, "tick", Priority::DEFAULT, Modifiers::NONE, |inv, _| {
            Ok(u32::try_from(inv.tick()).unwrap_or(u32::MAX))
        });
        let holder = FeatureHolder::new();
        let function = def.create(&holder);

        let err = function
            .invoke(&Arguments::new().with(String::from("x")))
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::InvalidArguments { function: "f", .. }
        ));
        assert_eq!(function.invocations(), 0);
        assert_eq!(function.invoke(&Arguments::new().with(1_u32)).unwrap(), 0);
        assert_eq!(function.invoke(&Arguments::new().with(1_u32)).unwrap(), 1);
    }

    #[test]
    fn executors_see_their_holder() {
        const NPC: TypeTag = TypeTag::new("npc");
        let mut def = FunctionDefinition::<bool>::new("is_npc", []);
        def.add_executor(TypeTag::HOLDER, "check", Priority::DEFAULT, Modifiers::NONE, |inv, _| {
            Ok(inv.holder().is_some_and(|h| h.satisfies(NPC)))
        });
        let npc = FeatureHolder::builder().tag(NPC).build();
        assert!(npc.invoke(&def, &Arguments::new()).unwrap());
        assert!(!FeatureHolder::new().invoke(&def, &Arguments::new()).unwrap());
    }

    #[test]
    fn failure_is_attributed_to_origin() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(TypeTag::HOLDER, "outer", Priority::HIGHEST, Modifiers::NONE, |inv, args| {
            inv.next(args)
        });
        def.add_executor(TypeTag::HOLDER, "inner", Priority::LOWEST, Modifiers::NONE, |_, _| {
            Err(InvocationError::failure("broken"))
        });
        let holder = FeatureHolder::new();
        let err = def.create(&holder).invoke(&Arguments::new()).unwrap_err();
        assert_eq!(err.executor(), Some("inner"));
    }

    #[test]
    fn function_is_lockable() {
        let def = FunctionDefinition::<u32>::new("f", []);
        let holder = FeatureHolder::builder().locked(false).build();
        let function = holder.get(&def).unwrap();
        assert!(!function.is_locked());
        holder.set_locked(true);
        assert!(function.is_locked());
    }
}
