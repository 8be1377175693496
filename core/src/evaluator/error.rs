//! Runtime evaluation errors.
//!
//! # Error Categories
//!
//! - **Runtime errors**: failures of the evaluated program itself, including
//!   errors raised by host members, which are carried unmodified in
//!   [`RuntimeError::Host`].
//!
//! - **Resource exceeded errors**: evaluation stopped because a configured
//!   limit (recursion depth, loop iterations) was reached.

use std::sync::Arc;

use ecow::EcoString;
use thiserror::Error;

use crate::coercion::ConversionError;

/// Runtime evaluation error.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceededError),
}

#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("cannot access '{member}' on null")]
    NullReceiver { member: EcoString },

    #[error("class {class} has no accessible member '{member}'")]
    NoSuchMember { class: EcoString, member: EcoString },

    #[error("no applicable method {class}.{name}({args})")]
    NoApplicableMethod {
        class: EcoString,
        name: EcoString,
        args: EcoString,
    },

    #[error("index {index} out of bounds (length: {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    InvalidOperands {
        op: EcoString,
        left: EcoString,
        right: EcoString,
    },

    #[error("values of type {ty} cannot be indexed")]
    NotIndexable { ty: EcoString },

    #[error("{what} is not callable")]
    NotCallable { what: EcoString },

    #[error("{method} expected {expected}, found {found}")]
    ArgumentMismatch {
        method: EcoString,
        expected: EcoString,
        found: EcoString,
    },

    #[error("no value bound for input '{name}'")]
    UnboundInput { name: EcoString },

    #[error("condition must be a Boolean, found {found}")]
    NonBooleanCondition { found: EcoString },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Host(HostError),
}

impl RuntimeError {
    /// Wrap an error raised by host code.
    pub fn host(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        RuntimeError::Host(HostError(Arc::new(err)))
    }
}

/// An error raised by a host method, getter, setter or function.
///
/// Shared so that it can travel through cloned results unchanged.
#[derive(Debug, Clone)]
pub struct HostError(Arc<dyn std::error::Error + Send + Sync>);

impl HostError {
    pub fn new(err: Arc<dyn std::error::Error + Send + Sync>) -> Self {
        Self(err)
    }

    /// The error exactly as the host raised it.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.0)
    }
}

/// Resource limit exceeded errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceExceededError {
    /// Evaluation recursion depth exceeded.
    #[error("Evaluation stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("Loop iteration limit of {max} exceeded")]
    IterationLimit { max: usize },
}
