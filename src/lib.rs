//! Brisk - an embeddable expression engine for Java-flavoured expressions
//!
//! # Overview
//!
//! Brisk evaluates small, Java-flavoured expressions and statement sequences
//! against objects of the host application. Common use cases include:
//!
//! - Rule engines and template bindings
//! - Data mappings between host objects
//! - User-defined filters and computed fields
//!
//! Expressions are compiled once and can then be executed any number of
//! times, from any number of threads, against different root objects and
//! variable bindings.
//!
//! # Quick Start
//!
//! ```
//! use brisk::{Engine, EngineOptions, TypeEnvironmentConfig, Value, Variables};
//! use brisk::types::{ClassBuilder, builtins};
//! use brisk::values::Object;
//!
//! let order = ClassBuilder::new("Order")
//!     .field("price", builtins::double())
//!     .field("quantity", builtins::integer())
//!     .build();
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register_class(order.clone());
//! });
//!
//! let expr = engine
//!     .compile("price * quantity", &TypeEnvironmentConfig::new())
//!     .unwrap();
//!
//! let root = Value::Object(Object::new(&order).with("price", 2.5).with("quantity", 4));
//! let total = expr.execute(&root, &mut Variables::new()).unwrap();
//! assert_eq!(total, Value::Double(10.0));
//! ```
//!
//! # Typing
//!
//! By default every unknown identifier becomes an input of the expression
//! and member accesses are resolved at runtime. A [`TypeEnvironmentConfig`]
//! with strong typing rejects unknown names and members at compile time and
//! reports the static result type through
//! [`CompiledExpression::known_egress_type`].
//!
//! # Host Functions
//!
//! ```
//! use brisk::{Engine, EngineOptions, TypeEnvironmentConfig, Value, Variables};
//! use brisk::types::{Function, TypeDescriptor};
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register_function(Function::new(
//!         "clamp",
//!         vec![TypeDescriptor::integer(), TypeDescriptor::integer(), TypeDescriptor::integer()],
//!         TypeDescriptor::integer(),
//!         |args| {
//!             let [v, lo, hi] = [&args[0], &args[1], &args[2]].map(|a| a.as_i64().unwrap_or(0));
//!             Ok(Value::Int(v.clamp(lo, hi) as i32))
//!         },
//!     ));
//! });
//!
//! let expr = engine.compile("clamp(42, 0, 10)", &TypeEnvironmentConfig::new()).unwrap();
//! assert_eq!(expr.execute(&Value::Null, &mut Variables::new()).unwrap(), Value::Int(10));
//! ```

mod error_renderer;

// Re-export public API from brisk_core
pub use brisk_core::api::{
    CompiledExpression, Diagnostic, Engine, EngineOptions, EnvironmentBuilder, Error,
    ExecutionOptions, RelatedInfo, Severity, TypeEnvironmentConfig,
};
pub use brisk_core::analyzer::{CompileError, CompileErrorKind, TypeEnvironment};
pub use brisk_core::compiler::{CompilerState, ExpressionCompiler};

// Re-export commonly used types and values
pub use brisk_core::coercion::{self, ConversionError, ConversionHandler};
pub use brisk_core::types::{self, Class, ClassBuilder, TypeDescriptor};
pub use brisk_core::values::{self, Value, Variables};

// Accessor strategy selection
pub use brisk_core::optimizer::{
    AccessorKind, AccessorStrategy, CallSite, get_default_accessor_strategy,
    set_default_accessor_strategy,
};

// Re-export errors
pub use brisk_core::evaluator::{ExecutionError, HostError, ResourceExceededError, RuntimeError};

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
