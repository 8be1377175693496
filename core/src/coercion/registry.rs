use std::sync::Arc;

use hashbrown::HashMap;
use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::coercion::handlers;
use crate::coercion::{ConversionError, ConversionHandler};
use crate::types::{Class, ClassId, ClassKind, TypeDescriptor, builtins};
use crate::values::{Array, Value};

lazy_static! {
    static ref REGISTRY: CoercionRegistry = CoercionRegistry::with_builtins();
}

/// The process-wide registry, seeded with the built-in handlers on first
/// use.
///
/// Registration is expected to finish before expressions execute
/// concurrently; lookups never block each other.
pub fn registry() -> &'static CoercionRegistry {
    &REGISTRY
}

/// Target class to conversion handler.
pub struct CoercionRegistry {
    handlers: RwLock<HashMap<ClassId, Arc<dyn ConversionHandler>>>,
}

impl CoercionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_handler(builtins::string(), Arc::new(handlers::StringHandler));
        registry.register_handler(builtins::integer(), Arc::new(handlers::IntegerHandler));
        registry.register_handler(builtins::long(), Arc::new(handlers::LongHandler));
        registry.register_handler(builtins::double(), Arc::new(handlers::DoubleHandler));
        registry.register_handler(builtins::boolean(), Arc::new(handlers::BooleanHandler));
        registry.register_handler(builtins::list(), Arc::new(handlers::ListHandler));
        registry.register_handler(builtins::array(), Arc::new(handlers::ArrayHandler));
        registry
    }

    /// Insert or replace the handler producing values of `target`.
    pub fn register_handler(&self, target: &Arc<Class>, handler: Arc<dyn ConversionHandler>) {
        tracing::debug!(target = %target.qualified_name(), "registered conversion handler");
        self.handlers.write().insert(target.id(), handler);
    }

    pub fn handler_for(&self, target: &Class) -> Option<Arc<dyn ConversionHandler>> {
        self.handlers.read().get(&target.id()).cloned()
    }

    /// Whether a value of class `from` can be made to satisfy `to`, either
    /// as is or through a registered handler.
    pub fn can_convert(&self, from: &Class, to: &Class) -> bool {
        from.is_subclass_of(to)
            || self
                .handler_for(to)
                .is_some_and(|handler| handler.can_convert_from(from))
    }

    /// Static-type variant of [`CoercionRegistry::can_convert`].
    pub fn can_coerce(&self, from: &TypeDescriptor, to: &TypeDescriptor) -> bool {
        to.is_assignable_from(from) || self.can_convert(from.class(), to.class())
    }

    /// Convert `value` so that it is an instance of `target`.
    pub fn convert(&self, value: Value, target: &Class) -> Result<Value, ConversionError> {
        if value.is_null() || value.class().is_subclass_of(target) {
            return Ok(value);
        }
        let source = value.class();
        match self.handler_for(target) {
            Some(handler) if handler.can_convert_from(&source) => {
                tracing::trace!(from = %source.name(), to = %target.name(), "coercing value");
                handler.convert_from(&value)
            }
            _ => Err(ConversionError::new(&value, target.name())),
        }
    }

    /// Convert `value` to a static type. Arrays are converted element-wise
    /// to their declared element type; other generic arguments are not
    /// enforced.
    pub fn convert_to(&self, value: Value, target: &TypeDescriptor) -> Result<Value, ConversionError> {
        if target.kind() == ClassKind::Array && !target.params().is_empty() {
            return self.convert_to_array(value, target);
        }
        if value.satisfies(target) {
            return Ok(value);
        }
        self.convert(value, target.class())
    }

    fn convert_to_array(&self, value: Value, target: &TypeDescriptor) -> Result<Value, ConversionError> {
        let element = target.element_type();
        let items = match &value {
            Value::Array(array) if element.is_assignable_from(array.element_type()) => {
                return Ok(value);
            }
            Value::Array(array) => array.snapshot(),
            Value::List(list) => list.snapshot(),
            Value::Null => return Ok(value),
            _ => return Err(ConversionError::new(&value, ecow::eco_format!("{target}"))),
        };
        let converted = items
            .into_iter()
            .map(|item| self.convert_to(item, &element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(Array::new(element, converted)))
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
