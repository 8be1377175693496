//! Environment builder for registering host classes and functions.

use std::sync::Arc;

use crate::types::{Class, ClassTable, Function, FunctionTable};

/// Builder for the classes and functions an engine knows about.
///
/// Registered classes resolve as type names (`Person p`), in `new`
/// expressions and `import` statements, and when persisted expressions are
/// loaded. Registered functions are callable by name.
///
/// # Example
///
/// ```
/// use brisk_core::{Engine, EngineOptions, Value};
/// use brisk_core::types::{ClassBuilder, Function, TypeDescriptor, builtins};
///
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.register_class(
///         ClassBuilder::new("Point")
///             .package("geo")
///             .field("x", builtins::integer())
///             .field("y", builtins::integer())
///             .field_constructor(&["x", "y"])
///             .build(),
///     );
///     env.register_function(Function::new(
///         "twice",
///         vec![TypeDescriptor::integer()],
///         TypeDescriptor::integer(),
///         |args| Ok(Value::Int(args[0].as_i64().unwrap_or(0) as i32 * 2)),
///     ));
/// });
/// assert!(engine.class("geo.Point").is_some());
/// ```
pub struct EnvironmentBuilder {
    classes: ClassTable,
    functions: FunctionTable,
}

impl EnvironmentBuilder {
    pub(crate) fn new() -> Self {
        Self {
            classes: ClassTable::with_builtins(),
            functions: FunctionTable::default(),
        }
    }

    /// Register a class under its simple and qualified names.
    pub fn register_class(&mut self, class: Arc<Class>) -> &mut Self {
        self.classes.register(class);
        self
    }

    pub fn register_function(&mut self, function: Function) -> &mut Self {
        self.functions.register(Arc::new(function));
        self
    }

    pub(crate) fn build(self) -> (ClassTable, FunctionTable) {
        (self.classes, self.functions)
    }
}
