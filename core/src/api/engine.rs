//! The brisk compilation engine.

use std::sync::Arc;

use super::{CompiledExpression, EngineOptions, EnvironmentBuilder, Error};
use crate::analyzer::{TypeEnvironment, TypeEnvironmentConfig};
use crate::compiler::ExpressionCompiler;
use crate::persist;
use crate::types::{Class, ClassTable, FunctionTable};

/// The brisk compilation and execution engine.
///
/// The engine manages:
/// - Host classes and functions (registered once, in [`Engine::new`])
/// - Runtime configuration ([`EngineOptions`])
///
/// Compiled expressions do not borrow the engine; they hold the classes
/// they use and can outlive it.
///
/// # Example
///
/// ```
/// use brisk_core::{Engine, EngineOptions, TypeEnvironmentConfig, Value, Variables};
/// use brisk_core::types::{ClassBuilder, builtins};
/// use brisk_core::values::Object;
///
/// let person = ClassBuilder::new("Person")
///     .field("name", builtins::string())
///     .build();
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.register_class(person.clone());
/// });
///
/// let expr = engine.compile("name + '!'", &TypeEnvironmentConfig::new()).unwrap();
/// let root = Value::Object(Object::new(&person).with("name", "Ada"));
/// let result = expr.execute(&root, &mut Variables::new()).unwrap();
/// assert_eq!(result, Value::str("Ada!"));
/// ```
pub struct Engine {
    classes: ClassTable,
    functions: FunctionTable,
    options: EngineOptions,
}

impl Engine {
    /// Create a new engine, registering host types with `init`.
    pub fn new(options: EngineOptions, init: impl FnOnce(&mut EnvironmentBuilder)) -> Self {
        let mut builder = EnvironmentBuilder::new();
        init(&mut builder);
        let (classes, functions) = builder.build();
        tracing::debug!(
            classes = classes.len(),
            functions = functions.len(),
            "engine created"
        );
        Self {
            classes,
            functions,
            options,
        }
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Look up a class by simple or qualified name.
    pub fn class(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    /// Access the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile an expression.
    ///
    /// Fails with [`Error::Api`] when `config` asks for verification only;
    /// use [`Engine::analyze`] for that.
    pub fn compile(&self, source: &str, config: &TypeEnvironmentConfig) -> Result<CompiledExpression, Error> {
        let mut env = TypeEnvironment::new(config);
        ExpressionCompiler::new(self, source)
            .compile(&mut env)?
            .ok_or_else(|| Error::Api("verify-only configuration produces no executable".to_string()))
    }

    /// Analyze without producing an executable, returning the populated
    /// environment (declared variables, required inputs, imports).
    pub fn analyze(&self, source: &str, config: &TypeEnvironmentConfig) -> Result<TypeEnvironment, Error> {
        let mut env = TypeEnvironment::new(config);
        ExpressionCompiler::new(self, source)
            .verify_only(true)
            .compile(&mut env)?;
        Ok(env)
    }

    /// Compile an assignable expression such as `customer.address.city`
    /// to write values through with [`CompiledExpression::execute_set`].
    pub fn compile_setter(
        &self,
        source: &str,
        config: &TypeEnvironmentConfig,
    ) -> Result<CompiledExpression, Error> {
        let mut env = TypeEnvironment::new(config);
        ExpressionCompiler::new(self, source)
            .setter(true)
            .compile(&mut env)?
            .ok_or_else(|| Error::Api("verify-only configuration produces no executable".to_string()))
    }

    /// Reconstruct an expression written by [`CompiledExpression::to_bytes`],
    /// linking its classes and functions against this engine.
    pub fn load(&self, bytes: &[u8]) -> Result<CompiledExpression, Error> {
        let image = persist::decode(bytes, &self.classes, &self.functions)?;
        Ok(CompiledExpression::from_image(image, self))
    }
}
