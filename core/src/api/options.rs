//! Resource limits applied while a compiled expression runs.

/// Limits for one call of [`execute`](crate::api::CompiledExpression::execute)
/// or [`execute_with`](crate::api::CompiledExpression::execute_with).
///
/// Both counters start from zero on every call; a shared expression keeps no
/// count between executions.
///
/// ```
/// use brisk_core::api::ExecutionOptions;
///
/// // Reject runaway `while` loops from user-supplied rules.
/// let options = ExecutionOptions {
///     max_iterations: Some(10_000),
///     ..ExecutionOptions::default()
/// };
/// assert_eq!(options.max_depth, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Nesting bound for statements and subexpressions being evaluated.
    /// Exceeding it fails with `StackOverflow`.
    pub max_depth: usize,

    /// Bound on the total number of loop-body runs across every `while`,
    /// `for` and `for (x : xs)` of the execution. `None` disables the check.
    pub max_iterations: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: None,
        }
    }
}

/// Engine-wide settings, fixed when the [`Engine`](crate::api::Engine) is built.
///
/// ```
/// use brisk_core::api::{Engine, EngineOptions, ExecutionOptions};
///
/// let engine = Engine::new(
///     EngineOptions {
///         default_execution_options: ExecutionOptions {
///             max_depth: 200,
///             max_iterations: Some(50_000),
///         },
///     },
///     |_| {},
/// );
/// assert_eq!(engine.options().default_execution_options.max_depth, 200);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Copied into every expression the engine compiles or loads; used by
    /// `execute` and `execute_set`.
    pub default_execution_options: ExecutionOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Engine, Error, TypeEnvironmentConfig};
    use crate::evaluator::ResourceExceededError;
    use crate::values::{Value, Variables};

    #[test]
    fn engine_defaults_reach_compiled_expressions() {
        let engine = Engine::new(
            EngineOptions {
                default_execution_options: ExecutionOptions {
                    max_depth: 1000,
                    max_iterations: Some(5),
                },
            },
            |_| {},
        );
        let expr = engine
            .compile("int n = 0; while (n < 10) { n++; } n", &TypeEnvironmentConfig::new())
            .unwrap();
        assert!(matches!(
            expr.execute(&Value::Null, &mut Variables::new()),
            Err(Error::ResourceExceeded(ResourceExceededError::IterationLimit { max: 5 }))
        ));

        let unlimited = ExecutionOptions::default();
        assert_eq!(
            expr.execute_with(&Value::Null, &mut Variables::new(), &unlimited)
                .unwrap(),
            Value::Int(10)
        );
    }
}
