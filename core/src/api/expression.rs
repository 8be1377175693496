//! Compiled brisk expressions.

use std::sync::Arc;

use super::{Engine, Error, ExecutionOptions};
use crate::analyzer::{TypeEnvironment, TypedExpr};
use crate::compiler;
use crate::evaluator;
use crate::optimizer::CallSite;
use crate::persist::{self, Image};
use crate::types::TypeDescriptor;
use crate::values::{Value, Variables};

struct Program {
    typed: TypedExpr,
    sites: Vec<CallSite>,
    env: TypeEnvironment,
    setter: bool,
    options: ExecutionOptions,
}

/// A compiled expression ready for execution.
///
/// The analyzed tree and its environment are immutable; the only state an
/// execution touches is the accessor cache of each call site. Clones share
/// the same program and caches, and any number of threads may execute it
/// at once, each against its own root context and bindings.
///
/// # Example
///
/// ```
/// use brisk_core::{Engine, EngineOptions, TypeEnvironmentConfig, Value, Variables};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// let expr = engine
///     .compile("total = price * qty", &TypeEnvironmentConfig::new())
///     .unwrap();
///
/// let mut vars = Variables::new();
/// vars.insert("price".into(), Value::Int(3));
/// vars.insert("qty".into(), Value::Int(4));
/// assert_eq!(expr.execute(&Value::Null, &mut vars).unwrap(), Value::Int(12));
/// assert_eq!(vars.get("total"), Some(&Value::Int(12)));
/// ```
#[derive(Clone)]
pub struct CompiledExpression {
    program: Arc<Program>,
}

impl CompiledExpression {
    pub(crate) fn new(
        typed: TypedExpr,
        sites: Vec<CallSite>,
        env: TypeEnvironment,
        setter: bool,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            program: Arc::new(Program {
                typed,
                sites,
                env,
                setter,
                options,
            }),
        }
    }

    /// Evaluate against `root` with the engine's default limits.
    ///
    /// Errors raised by host members are returned unmodified inside
    /// [`Error::Runtime`].
    pub fn execute(&self, root: &Value, vars: &mut Variables) -> Result<Value, Error> {
        self.execute_with(root, vars, &self.program.options)
    }

    /// Evaluate with explicit resource limits.
    pub fn execute_with(
        &self,
        root: &Value,
        vars: &mut Variables,
        options: &ExecutionOptions,
    ) -> Result<Value, Error> {
        let program = &self.program;
        if program.setter {
            return Err(Error::Api(
                "setter expressions are executed with execute_set".to_string(),
            ));
        }
        Ok(evaluator::execute(
            &program.typed,
            &program.sites,
            root,
            vars,
            options,
        )?)
    }

    /// Write `value` through a setter expression compiled with
    /// [`Engine::compile_setter`], converting it to the target's type.
    pub fn execute_set(&self, root: &Value, vars: &mut Variables, value: Value) -> Result<(), Error> {
        let program = &self.program;
        if !program.setter {
            return Err(Error::Api(
                "only expressions compiled with compile_setter can be assigned through".to_string(),
            ));
        }
        Ok(evaluator::execute_set(
            &program.typed,
            &program.sites,
            root,
            vars,
            value,
            &program.options,
        )?)
    }

    /// Static type of the result; `Object` when it is only known at runtime.
    pub fn known_egress_type(&self) -> &TypeDescriptor {
        &self.program.typed.egress
    }

    /// The environment analysis produced: variables, inputs and imports.
    pub fn environment(&self) -> &TypeEnvironment {
        &self.program.env
    }

    /// Generic parameters of the last parameterized resolution made while
    /// analyzing this expression.
    pub fn last_type_parameters(&self) -> &[TypeDescriptor] {
        self.program.env.last_type_parameters()
    }

    pub fn call_site_count(&self) -> usize {
        self.program.sites.len()
    }

    pub fn call_sites(&self) -> &[CallSite] {
        &self.program.sites
    }

    pub fn is_setter(&self) -> bool {
        self.program.setter
    }

    /// Serialize to an opaque byte sequence; see [`Engine::load`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let program = &self.program;
        persist::encode(&program.typed, &program.env, program.setter)
    }

    pub(crate) fn from_image(image: Image, engine: &Engine) -> Self {
        let sites = compiler::call_sites(&image.typed, image.env.accessor_strategy());
        Self::new(
            image.typed,
            sites,
            image.env,
            image.setter,
            engine.options().default_execution_options.clone(),
        )
    }
}

impl core::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("egress", &self.program.typed.egress)
            .field("sites", &self.program.sites.len())
            .field("setter", &self.program.setter)
            .finish()
    }
}
