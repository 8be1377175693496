//! Public API for the brisk expression engine.
//!
//! An [`Engine`] holds the host classes and functions expressions may use.
//! Compiling a source text against a [`TypeEnvironmentConfig`] yields a
//! [`CompiledExpression`], which is executed against a root context object
//! and a set of variable bindings.
//!
//! # Example
//!
//! ```
//! use brisk_core::{Engine, EngineOptions, TypeEnvironmentConfig, Value, Variables};
//! use brisk_core::types::TypeDescriptor;
//!
//! let engine = Engine::new(EngineOptions::default(), |_| {});
//! let config = TypeEnvironmentConfig::new()
//!     .strong_typing(true)
//!     .input("x", TypeDescriptor::integer());
//!
//! let expr = engine.compile("x * 2 + 1", &config).unwrap();
//! assert_eq!(expr.known_egress_type(), &TypeDescriptor::integer());
//!
//! let mut vars = Variables::new();
//! vars.insert("x".into(), Value::Int(20));
//! assert_eq!(expr.execute(&Value::Null, &mut vars).unwrap(), Value::Int(41));
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;

pub use crate::analyzer::TypeEnvironmentConfig;
pub use engine::Engine;
pub use environment::EnvironmentBuilder;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use expression::CompiledExpression;
pub use options::{EngineOptions, ExecutionOptions};
