// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error kinds surfaced by holders and handler chains.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::error::Error;

/// Why an argument list was rejected by a function.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentMismatch {
    /// The number of arguments differs from the number of parameters.
    #[error("expected {expected} argument(s), found {found}")]
    Arity {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },
    /// An argument has the wrong type.
    #[error("argument {index} must be `{expected}`, found `{found}`")]
    Type {
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type.
        expected: &'static str,
        /// Supplied argument type.
        found: &'static str,
    },
}

/// Failure of a function invocation.
///
/// Every error raised while running a chain reaches the caller of
/// [`Function::invoke`](crate::Function::invoke) through this type. Executors
/// that ran before the failing one are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The arguments do not match the function's parameters.
    #[error("invalid arguments for `{function}`: {mismatch}")]
    InvalidArguments {
        /// Name of the invoked function.
        function: &'static str,
        /// What did not match.
        mismatch: ArgumentMismatch,
    },
    /// An executor signalled a failure, aborting the rest of the chain.
    #[error("executor `{executor}` failed: {message}")]
    ExecutorFailure {
        /// Name of the failing executor; empty until the chain attributes it.
        executor: &'static str,
        /// Failure description.
        message: String,
        /// Underlying fault, if the failure wraps another error.
        #[source]
        source: Option<Box<dyn Error + 'static>>,
    },
    /// A mutating accessor was used before its chain was installed.
    #[error("`{0}` has not been initialized")]
    Uninitialized(&'static str),
}

impl InvocationError {
    /// Creates an executor failure with the given message.
    ///
    /// The executor name is filled in by the chain that observes the failure.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::ExecutorFailure {
            executor: "",
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an unexpected fault from executor code into an executor failure.
    #[must_use]
    pub fn fault<E: Error + 'static>(error: E) -> Self {
        Self::ExecutorFailure {
            executor: "",
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Returns the failing executor's name, for executor failures.
    #[must_use]
    pub fn executor(&self) -> Option<&'static str> {
        match self {
            Self::ExecutorFailure { executor, .. } if !executor.is_empty() => Some(*executor),
            _ => None,
        }
    }

    /// Attributes an unattributed executor failure to `name`.
    ///
    /// Returns `true` if the name was filled in by this call.
    pub(crate) fn attribute(&mut self, name: &'static str) -> bool {
        match self {
            Self::ExecutorFailure { executor, .. } if executor.is_empty() => {
                *executor = name;
                true
            }
            _ => false,
        }
    }
}

/// Failure of a holder-level feature request.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// The feature cached under the definition's name has another type.
    ///
    /// Definitions are identified by name alone, so a second definition reusing
    /// a name gets the feature created by the first one.
    #[error("feature `{name}` is a `{found}`, but the definition produces `{expected}`")]
    DefinitionMismatch {
        /// The shared feature name.
        name: &'static str,
        /// Type produced by the requesting definition.
        expected: &'static str,
        /// Type of the cached feature.
        found: &'static str,
    },
    /// Initializing or invoking a feature failed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
