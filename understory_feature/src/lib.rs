// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Feature: runtime object composition.
//!
//! This crate assembles objects from named, lazily created features and lets
//! behavior be extended through prioritized handler chains instead of
//! subclassing.
//!
//! ## Core Concepts
//!
//! ### Holders and Features
//!
//! A [`FeatureHolder`] owns a dynamic set of [`Feature`]s, each created from a
//! [`Definition`] the first time it is requested:
//!
//! - features are cached by definition name, one per holder;
//! - a new feature is inserted before its [`Feature::initialize`] hook runs, so
//!   initialization may request it (or other features) again;
//! - the holder's lock state is pushed to every lock-aware feature.
//!
//! ### Variants
//!
//! Holders carry a [`TagSet`] of [`TypeTag`]s. Every holder satisfies
//! [`TypeTag::HOLDER`]; more specific holders add their own tags and those of
//! the broader kinds they belong to.
//!
//! ### Handler Chains
//!
//! A [`FunctionDefinition`] collects named [`Executor`]s per variant. A holder's
//! [`Function`] instance chains every executor registered for a variant the
//! holder satisfies, highest [`Priority`] first. Each executor may call
//! [`Invocation::next`] to delegate to the rest of the chain, and may be gated
//! by [`Modifiers`]:
//!
//! - **Limit** - run at most `n` times per instance
//! - **Delay** - skip the first invocations, then run periodically
//! - **Lock-skip** - do not run while the holder is locked
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_feature::{
//!     Arguments, FeatureHolder, FunctionDefinition, Modifiers, ParameterType, Priority, TypeTag,
//! };
//!
//! const PLAYER: TypeTag = TypeTag::new("player");
//!
//! // A function taking one `String` and returning a greeting.
//! let mut greet = FunctionDefinition::<String>::new("greet", [ParameterType::of::<String>()]);
//! greet.add_executor(TypeTag::HOLDER, "plain", Priority::DEFAULT, Modifiers::NONE, |_, args| {
//!     Ok(format!("hello {}", args.get::<String>(0).cloned().unwrap_or_default()))
//! });
//! greet.add_executor(PLAYER, "shout", Priority::new(5, 0), Modifiers::NONE, |inv, args| {
//!     Ok(inv.next(args)?.to_uppercase())
//! });
//! // Runs once, on the first invocation only.
//! greet.add_executor(PLAYER, "welcome", Priority::HIGHEST, Modifiers::NONE.with_limit(1), |inv, args| {
//!     Ok(format!("{}, welcome", inv.next(args)?))
//! });
//!
//! let player = FeatureHolder::builder().tag(PLAYER).build();
//! let args = Arguments::new().with(String::from("ada"));
//! assert_eq!(player.invoke(&greet, &args).unwrap(), "HELLO ADA, welcome");
//! assert_eq!(player.invoke(&greet, &args).unwrap(), "HELLO ADA");
//!
//! let rock = FeatureHolder::new();
//! assert_eq!(rock.invoke(&greet, &args).unwrap(), "hello ada");
//! ```
//!
//! ## Ownership
//!
//! Everything here is single-threaded. Holders are reference-counted handles;
//! features and child holders point back at their holder through a
//! [`WeakHolder`]. Per-instance counters and flags use interior mutability, so
//! running a chain only needs a shared reference.
//!
//! ## Logging
//!
//! Feature creation and gating decisions are reported through `tracing` at
//! `trace` level, lock propagation and executor failures at `debug`, and
//! definition mismatches at `warn`. No subscriber is installed.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. The `std` feature forwards to the
//! `std` features of `thiserror` and `tracing`.

#![no_std]

extern crate alloc;

mod error;
mod feature;
mod holder;
mod tag;
mod value;

pub mod function;

pub use error::{ArgumentMismatch, FeatureError, InvocationError};
pub use feature::{Definition, Feature, FeatureBase, FeatureDefinition, Lockable};
pub use function::{
    Delay, Executor, ExecutorContext, Function, FunctionDefinition, Invocation, Modifiers,
    Priority, Skip,
};
pub use holder::{FeatureHolder, HolderBuilder, WeakHolder};
pub use tag::{TagSet, TypeTag};
pub use value::{Arguments, ErasedValue, ParameterType};
