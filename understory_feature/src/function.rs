// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Prioritized handler chains.
//!
//! A [`FunctionDefinition`] names an operation and collects [`Executor`]s for it,
//! each registered for a holder variant with a [`Priority`] and optional
//! [`Modifiers`]. A holder's [`Function`] instance runs the executors that
//! apply to it as a chain: each executor receives an [`Invocation`] and decides
//! whether to continue with [`Invocation::next`].

mod definition;
mod executor;
mod invocation;
mod modifier;
mod priority;

pub use definition::FunctionDefinition;
pub use executor::{Executor, ExecutorContext};
pub use invocation::{Function, Invocation};
pub use modifier::{Delay, Modifiers, Skip};
pub use priority::Priority;
