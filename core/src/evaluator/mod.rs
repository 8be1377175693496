//! Tree-walking evaluator for analyzed expressions.
//!
//! The evaluator interprets a [`TypedExpr`] against a root context object
//! and a set of variable bindings, producing a [`Value`].
//!
//! ## Design Principles
//!
//! - **Never panic**: host failures and bad operands surface as
//!   [`RuntimeError`]s
//! - **Stack-safe**: depth tracking prevents stack overflow from deeply
//!   nested expressions
//! - **Bounded**: loops count iterations against
//!   [`ExecutionOptions::max_iterations`]
//!
//! Member accesses go through the expression's call sites, which cache an
//! accessor per receiver class (see [`crate::optimizer`]).

mod error;
mod eval;
mod operators;


pub use error::{ExecutionError, HostError, ResourceExceededError, RuntimeError};

use crate::analyzer::TypedExpr;
use crate::api::ExecutionOptions;
use crate::optimizer::CallSite;
use crate::values::{Value, Variables};

/// Evaluate an analyzed expression.
///
/// ## Arguments
///
/// - `typed`: the analyzed statement sequence
/// - `sites`: call sites numbered by the analyzer's [`SiteId`](crate::analyzer::SiteId)s
/// - `root`: the context object; `this` and unbound inputs resolve against it
/// - `vars`: caller bindings; top-level declarations and assignments write here
/// - `options`: resource limits
pub fn execute(
    typed: &TypedExpr,
    sites: &[CallSite],
    root: &Value,
    vars: &mut Variables,
    options: &ExecutionOptions,
) -> Result<Value, ExecutionError> {
    eval::Evaluator::new(options, sites, root, vars).run(typed)
}

/// Store `value` through an analyzed setter expression such as `a.b.c`.
pub fn execute_set(
    typed: &TypedExpr,
    sites: &[CallSite],
    root: &Value,
    vars: &mut Variables,
    value: Value,
    options: &ExecutionOptions,
) -> Result<(), ExecutionError> {
    eval::Evaluator::new(options, sites, root, vars).run_set(typed, value)
}
