//! Type-directed value conversion.
//!
//! A [`CoercionRegistry`] maps a target class to the [`ConversionHandler`]
//! able to produce values of that class. It is consulted when a declared
//! variable is initialized, when arguments are bound to method or
//! constructor parameters, when a value is stored through a typed setter,
//! and by the explicit `convert(value, Class)` built-in.
//!
//! Conversion is the identity on values that already satisfy the target:
//! no handler is invoked for them.

mod handlers;
mod registry;

use ecow::EcoString;
use thiserror::Error;

use crate::types::Class;
use crate::values::Value;

pub use handlers::{
    ArrayHandler, BooleanHandler, DoubleHandler, IntegerHandler, ListHandler, LongHandler,
    StringHandler,
};
pub use registry::{CoercionRegistry, registry};

/// Converts values of other classes into values of one target class.
pub trait ConversionHandler: Send + Sync {
    /// Whether values of `source` can be converted by this handler.
    fn can_convert_from(&self, source: &Class) -> bool;

    /// Convert `value`. Only called when `can_convert_from` accepted the
    /// value's class.
    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError>;
}

/// No handler could convert a value to the required type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {from} to {to}{}", detail_suffix(.detail))]
pub struct ConversionError {
    pub from: EcoString,
    pub to: EcoString,
    pub detail: Option<EcoString>,
}

fn detail_suffix(detail: &Option<EcoString>) -> EcoString {
    match detail {
        Some(detail) => ecow::eco_format!(": {detail}"),
        None => EcoString::new(),
    }
}

impl ConversionError {
    pub fn new(value: &Value, to: impl Into<EcoString>) -> Self {
        Self {
            from: value.type_name(),
            to: to.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<EcoString>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
