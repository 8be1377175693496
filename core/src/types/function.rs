//! Host functions callable by name from expressions.

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;

use crate::evaluator::RuntimeError;
use crate::types::{Class, TypeDescriptor};
use crate::values::Value;

/// Native body of a host [`Function`].
pub type NativeFunction = Arc<dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// A free function registered with the engine, e.g. a static import or a
/// function stub such as `echo(String)`.
pub struct Function {
    name: EcoString,
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
    invoke: NativeFunction,
}

impl Function {
    pub fn new<F>(name: &str, params: Vec<TypeDescriptor>, ret: TypeDescriptor, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            ret,
            invoke: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    pub fn ret(&self) -> &TypeDescriptor {
        &self.ret
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}) -> {}", self.name, self.params, self.ret)
    }
}

/// A name brought into an expression's scope by `import` or by the host.
#[derive(Clone)]
pub enum Import {
    Class(Arc<Class>),
    Function(Arc<Function>),
}

impl Import {
    /// Static type of the import when used as a bare identifier.
    pub fn ty(&self) -> TypeDescriptor {
        match self {
            Import::Class(class) => TypeDescriptor::class_of(class),
            Import::Function(_) => TypeDescriptor::object(),
        }
    }
}

impl fmt::Debug for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Import::Class(class) => write!(f, "Import::Class({})", class.qualified_name()),
            Import::Function(function) => write!(f, "Import::Function({})", function.name()),
        }
    }
}
