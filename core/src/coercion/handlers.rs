//! Handlers for the built-in target classes.

use crate::coercion::{ConversionError, ConversionHandler};
use crate::types::{Class, ClassKind, TypeDescriptor};
use crate::values::{Array, Value};

fn parse_failure(value: &Value, to: &str, text: &str) -> ConversionError {
    ConversionError::new(value, to).with_detail(ecow::eco_format!("'{text}' is not a valid {to}"))
}

/// Anything to `String`, through its display form.
pub struct StringHandler;

impl ConversionHandler for StringHandler {
    fn can_convert_from(&self, _source: &Class) -> bool {
        true
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        Ok(match value {
            Value::Str(_) => value.clone(),
            other => Value::Str(ecow::eco_format!("{other}")),
        })
    }
}

fn numeric_source(source: &Class) -> bool {
    matches!(
        source.kind(),
        ClassKind::Integer
            | ClassKind::Long
            | ClassKind::Double
            | ClassKind::String
            | ClassKind::Boolean
    )
}

/// Numbers, numeric strings and booleans to `Integer`. Wider numbers are
/// truncated.
pub struct IntegerHandler;

impl ConversionHandler for IntegerHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        numeric_source(source)
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Int(_) => Ok(value.clone()),
            Value::Long(l) => Ok(Value::Int(*l as i32)),
            Value::Double(d) => Ok(Value::Int(*d as i32)),
            Value::Bool(b) => Ok(Value::Int(*b as i32)),
            Value::Str(s) => {
                let text = s.trim();
                text.parse::<i32>()
                    .map(Value::Int)
                    .or_else(|_| text.parse::<f64>().map(|d| Value::Int(d as i32)))
                    .map_err(|_| parse_failure(value, "Integer", text))
            }
            other => Err(ConversionError::new(other, "Integer")),
        }
    }
}

/// Numbers, numeric strings and booleans to `Long`.
pub struct LongHandler;

impl ConversionHandler for LongHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        numeric_source(source)
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Int(i) => Ok(Value::Long(*i as i64)),
            Value::Long(_) => Ok(value.clone()),
            Value::Double(d) => Ok(Value::Long(*d as i64)),
            Value::Bool(b) => Ok(Value::Long(*b as i64)),
            Value::Str(s) => {
                let text = s.trim().trim_end_matches(['L', 'l']);
                text.parse::<i64>()
                    .map(Value::Long)
                    .map_err(|_| parse_failure(value, "Long", text))
            }
            other => Err(ConversionError::new(other, "Long")),
        }
    }
}

/// Numbers, numeric strings and booleans to `Double`.
pub struct DoubleHandler;

impl ConversionHandler for DoubleHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        numeric_source(source)
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Int(i) => Ok(Value::Double(*i as f64)),
            Value::Long(l) => Ok(Value::Double(*l as f64)),
            Value::Double(_) => Ok(value.clone()),
            Value::Bool(b) => Ok(Value::Double(if *b { 1.0 } else { 0.0 })),
            Value::Str(s) => {
                let text = s.trim();
                text.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| parse_failure(value, "Double", text))
            }
            other => Err(ConversionError::new(other, "Double")),
        }
    }
}

/// Strings and numbers to `Boolean`. Non-zero numbers are `true`.
pub struct BooleanHandler;

impl ConversionHandler for BooleanHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        matches!(
            source.kind(),
            ClassKind::Boolean
                | ClassKind::String
                | ClassKind::Integer
                | ClassKind::Long
                | ClassKind::Double
        )
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Long(l) => Ok(Value::Bool(*l != 0)),
            Value::Double(d) => Ok(Value::Bool(*d != 0.0)),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
                text => Err(parse_failure(value, "Boolean", text)),
            },
            other => Err(ConversionError::new(other, "Boolean")),
        }
    }
}

/// Arrays to `List`.
pub struct ListHandler;

impl ConversionHandler for ListHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        matches!(source.kind(), ClassKind::Array | ClassKind::List)
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Array(array) => Ok(Value::list(array.snapshot())),
            Value::List(_) => Ok(value.clone()),
            other => Err(ConversionError::new(other, "List")),
        }
    }
}

/// Lists to `Object[]`. Typed targets are refined element-wise by
/// [`CoercionRegistry::convert_to`](crate::coercion::CoercionRegistry::convert_to).
pub struct ArrayHandler;

impl ConversionHandler for ArrayHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        matches!(source.kind(), ClassKind::Array | ClassKind::List)
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::List(list) => Ok(Value::Array(Array::new(
                TypeDescriptor::object(),
                list.snapshot(),
            ))),
            Value::Array(_) => Ok(value.clone()),
            other => Err(ConversionError::new(other, "Array")),
        }
    }
}
