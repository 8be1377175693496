//! Core of the brisk expression engine.
//!
//! Source text is parsed into an arena-allocated tree, analyzed against a
//! [`TypeEnvironment`](analyzer::TypeEnvironment) and emitted as an immutable
//! [`CompiledExpression`](api::CompiledExpression) whose property, method and
//! index accesses are bound lazily, per call site, by the accessor optimizer.

pub mod analyzer;
pub mod api;
pub mod coercion;
pub mod compiler;
pub mod evaluator;
pub mod optimizer;
pub mod parser;
pub mod persist;
pub mod scope_stack;
pub mod types;
pub mod values;

pub use api::{
    CompiledExpression, Engine, EngineOptions, EnvironmentBuilder, Error, ExecutionOptions,
    TypeEnvironmentConfig,
};
pub use values::{Value, Variables};

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(CompiledExpression: Send, Sync);
    assert_impl_all!(Value: Send, Sync);
    assert_impl_all!(Engine: Send, Sync);
}

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_call_site_rebinding() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
