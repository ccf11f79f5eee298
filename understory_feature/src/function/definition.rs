// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Reverse;
use core::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use smallvec::SmallVec;

use super::{Executor, ExecutorContext, Function, Invocation, Modifiers, Priority};
use crate::error::InvocationError;
use crate::feature::{Definition, FeatureBase};
use crate::holder::FeatureHolder;
use crate::tag::TypeTag;
use crate::value::{Arguments, ParameterType};

struct Registration<R> {
    priority: Priority,
    modifiers: Modifiers,
    executor: Rc<dyn Executor<R>>,
    seq: u64,
}

/// Definition of a named function and the executors registered for it.
///
/// Executors are registered per variant, identified by a [`TypeTag`]. When a
/// holder first requests the function, every variant the holder satisfies
/// contributes its executors to the new instance's chain:
///
/// - executor names are merged across variants; if two variants register the
///   same name, the most recent registration wins;
/// - the chain is ordered by descending [`Priority::rank`], ties by
///   registration order (re-registering a name moves it to the end).
///
/// The chain is resolved once per instance, so registrations made after a
/// holder created its instance do not reach that instance.
///
/// # Example
///
/// ```rust
/// use understory_feature::{
///     Arguments, FeatureHolder, FunctionDefinition, Modifiers, ParameterType, Priority, TypeTag,
/// };
///
/// const MONSTER: TypeTag = TypeTag::new("monster");
///
/// let mut damage = FunctionDefinition::<i32>::new("damage", [ParameterType::of::<i32>()]);
/// damage.add_executor(TypeTag::HOLDER, "base", Priority::DEFAULT, Modifiers::NONE, |_, args| {
///     Ok(args.get::<i32>(0).copied().unwrap_or_default())
/// });
/// damage.add_executor(MONSTER, "armor", Priority::new(6, 0), Modifiers::NONE, |inv, args| {
///     Ok(inv.next(args)? - 2)
/// });
///
/// let monster = FeatureHolder::builder().tag(MONSTER).build();
/// let crate_box = FeatureHolder::new();
/// let hit = Arguments::new().with(10_i32);
///
/// assert_eq!(monster.invoke(&damage, &hit).unwrap(), 8);
/// assert_eq!(crate_box.invoke(&damage, &hit).unwrap(), 10);
/// ```
pub struct FunctionDefinition<R> {
    name: &'static str,
    parameters: SmallVec<[ParameterType; 2]>,
    variants: HashMap<TypeTag, HashMap<&'static str, Registration<R>>>,
    next_seq: u64,
}

impl<R: Default + 'static> FunctionDefinition<R> {
    /// Creates a definition with the given parameter types and no executors.
    #[must_use]
    pub fn new(name: &'static str, parameters: impl IntoIterator<Item = ParameterType>) -> Self {
        Self {
            name,
            parameters: parameters.into_iter().collect(),
            variants: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Returns the function name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declared parameter types.
    #[must_use]
    #[inline]
    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    /// Sets the type of parameter `index`.
    ///
    /// Missing parameters before `index` are added as [`ParameterType::Any`].
    pub fn set_parameter(&mut self, index: usize, parameter: ParameterType) -> &mut Self {
        if index >= self.parameters.len() {
            self.parameters.resize(index + 1, ParameterType::Any);
        }
        self.parameters[index] = parameter;
        self
    }

    /// Registers a closure executor under `name` for `variant`.
    ///
    /// An existing registration with the same name in the same variant is
    /// replaced.
    pub fn add_executor<F>(
        &mut self,
        variant: TypeTag,
        name: &'static str,
        priority: Priority,
        modifiers: Modifiers,
        executor: F,
    ) -> &mut Self
    where
        F: Fn(&mut Invocation<'_, R>, &Arguments) -> Result<R, InvocationError> + 'static,
    {
        self.add_shared_executor(variant, name, priority, modifiers, Rc::new(executor))
    }

    /// Registers an already shared executor under `name` for `variant`.
    pub fn add_shared_executor(
        &mut self,
        variant: TypeTag,
        name: &'static str,
        priority: Priority,
        modifiers: Modifiers,
        executor: Rc<dyn Executor<R>>,
    ) -> &mut Self {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.variants.entry(variant).or_default().insert(
            name,
            Registration {
                priority,
                modifiers,
                executor,
                seq,
            },
        );
        self
    }

    /// Removes the executor `name` from `variant` only.
    ///
    /// Returns `false` if the variant had no such executor.
    pub fn remove_executor(&mut self, variant: TypeTag, name: &str) -> bool {
        let Some(executors) = self.variants.get_mut(&variant) else {
            return false;
        };
        let removed = executors.remove(name).is_some();
        if executors.is_empty() {
            self.variants.remove(&variant);
        }
        removed
    }

    /// Returns the executor names registered directly for `variant`, in the
    /// order a chain built from this variant alone would run them.
    #[must_use]
    pub fn executors_for_variant(&self, variant: TypeTag) -> Vec<&'static str> {
        let Some(executors) = self.variants.get(&variant) else {
            return Vec::new();
        };
        let mut entries: Vec<_> = executors.iter().collect();
        entries.sort_by_key(|(_, reg)| (Reverse(reg.priority.rank()), reg.seq));
        entries.into_iter().map(|(name, _)| *name).collect()
    }

    /// Returns the variants with at least one executor.
    pub fn variants(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.variants.keys().copied()
    }

    /// Creates an instance for `holder` with extra executors appended.
    ///
    /// The `trailing` executors sort after every registered executor of equal
    /// rank, in the order given. They are not subject to name merging.
    #[must_use]
    pub fn instantiate_with(
        &self,
        holder: &FeatureHolder,
        trailing: impl IntoIterator<Item = ExecutorContext<R>>,
    ) -> Function<R> {
        let mut merged: HashMap<&'static str, &Registration<R>> = HashMap::new();
        for (variant, executors) in &self.variants {
            if !holder.satisfies(*variant) {
                continue;
            }
            for (&name, registration) in executors {
                match merged.entry(name) {
                    Entry::Occupied(mut slot) => {
                        if registration.seq > slot.get().seq {
                            slot.insert(registration);
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(registration);
                    }
                }
            }
        }

        let mut keyed: Vec<((Reverse<u8>, bool, u64), ExecutorContext<R>)> = merged
            .into_iter()
            .map(|(name, reg)| {
                let context = ExecutorContext::new(
                    name,
                    reg.priority,
                    reg.modifiers,
                    Rc::clone(&reg.executor),
                );
                ((Reverse(reg.priority.rank()), false, reg.seq), context)
            })
            .collect();
        keyed.extend(trailing.into_iter().enumerate().map(|(idx, context)| {
            (
                (Reverse(context.priority().rank()), true, idx as u64),
                context,
            )
        }));
        keyed.sort_by_key(|(key, _)| *key);

        Function::new(
            FeatureBase::new(self.name, holder),
            self.parameters.clone(),
            keyed.into_iter().map(|(_, context)| context).collect(),
        )
    }
}

impl<R: Default + 'static> Definition for FunctionDefinition<R> {
    type Feature = Function<R>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn create(&self, holder: &FeatureHolder) -> Function<R> {
        self.instantiate_with(holder, [])
    }
}

impl<R> fmt::Debug for FunctionDefinition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variants: Vec<_> = self
            .variants
            .iter()
            .map(|(tag, executors)| (tag.name(), executors.len()))
            .collect();
        variants.sort_unstable();
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("variants", &variants)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;

    const ENTITY: TypeTag = TypeTag::new("entity");
    const PLAYER: TypeTag = TypeTag::new("player");

    fn noop(_: &mut Invocation<'_, u32>, _: &Arguments) -> Result<u32, InvocationError> {
        Ok(0)
    }

    fn names(function: &Function<u32>) -> Vec<&'static str> {
        function.executor_names().collect()
    }

    #[test]
    fn set_parameter_pads_with_any() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.set_parameter(2, ParameterType::of::<String>());
        assert_eq!(
            def.parameters(),
            [
                ParameterType::Any,
                ParameterType::Any,
                ParameterType::of::<String>()
            ]
        );
        def.set_parameter(0, ParameterType::of::<u8>());
        assert_eq!(def.parameters()[0], ParameterType::of::<u8>());
        assert_eq!(def.parameters().len(), 3);
    }

    #[test]
    fn variant_order_follows_rank_then_registration() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(ENTITY, "late", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(ENTITY, "high", Priority::new(8, 0), Modifiers::NONE, noop)
            .add_executor(ENTITY, "later", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(ENTITY, "low", Priority::LOWEST, Modifiers::NONE, noop);
        assert_eq!(
            def.executors_for_variant(ENTITY),
            ["high", "late", "later", "low"]
        );
        assert!(def.executors_for_variant(PLAYER).is_empty());
    }

    #[test]
    fn re_registration_moves_to_end_of_tier() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(ENTITY, "a", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(ENTITY, "b", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(ENTITY, "a", Priority::DEFAULT, Modifiers::NONE, noop);
        assert_eq!(def.executors_for_variant(ENTITY), ["b", "a"]);
    }

    #[test]
    fn remove_drops_empty_variants() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(ENTITY, "a", Priority::DEFAULT, Modifiers::NONE, noop);
        assert!(!def.remove_executor(PLAYER, "a"));
        assert!(!def.remove_executor(ENTITY, "missing"));
        assert!(def.remove_executor(ENTITY, "a"));
        assert_eq!(def.variants().count(), 0);
    }

    #[test]
    fn instance_merges_satisfied_variants() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(TypeTag::HOLDER, "root", Priority::LOWEST, Modifiers::NONE, noop)
            .add_executor(ENTITY, "entity", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(PLAYER, "player", Priority::HIGHEST, Modifiers::NONE, noop);

        let entity = FeatureHolder::builder().tag(ENTITY).build();
        assert_eq!(names(&def.create(&entity)), ["entity", "root"]);

        let player = FeatureHolder::builder().tags([ENTITY, PLAYER]).build();
        assert_eq!(names(&def.create(&player)), ["player", "entity", "root"]);
    }

    #[test]
    fn trailing_executors_follow_equal_rank() {
        let mut def = FunctionDefinition::<u32>::new("f", []);
        def.add_executor(TypeTag::HOLDER, "user", Priority::DEFAULT, Modifiers::NONE, noop)
            .add_executor(TypeTag::HOLDER, "below", Priority::LOWEST, Modifiers::NONE, noop);
        let holder = FeatureHolder::new();
        let storage = ExecutorContext::from_fn("storage", Priority::DEFAULT, Modifiers::NONE, noop);
        let function = def.instantiate_with(&holder, [storage]);
        assert_eq!(names(&function), ["user", "storage", "below"]);
    }

    #[test]
    fn debug_lists_variants() {
        let mut def = FunctionDefinition::<u32>::new("damage", []);
        def.add_executor(ENTITY, "a", Priority::DEFAULT, Modifiers::NONE, noop);
        let debug = format!("{def:?}");
        assert!(debug.contains("damage"));
        assert!(debug.contains("entity"));
    }
}
