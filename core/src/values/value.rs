use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use ecow::EcoString;

use crate::types::{Class, ClassKind, TypeDescriptor, builtins};
use crate::values::{Array, List, Map, Object};

/// A runtime value.
///
/// Scalars are stored inline. Containers and objects are shared handles:
/// cloning a `Value::List` clones the handle, and mutation through either
/// copy is visible through both.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(EcoString),
    List(List),
    Map(Map),
    Array(Array),
    Object(Object),
    Class(Arc<Class>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(List::new(items))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(Map::new(entries))
    }

    pub fn array(element: TypeDescriptor, items: Vec<Value>) -> Value {
        Value::Array(Array::new(element, items))
    }

    pub fn str(s: impl Into<EcoString>) -> Value {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime class of this value. `Value::Null` reports the null class.
    pub fn class(&self) -> Arc<Class> {
        match self {
            Value::Null => builtins::null().clone(),
            Value::Bool(_) => builtins::boolean().clone(),
            Value::Int(_) => builtins::integer().clone(),
            Value::Long(_) => builtins::long().clone(),
            Value::Double(_) => builtins::double().clone(),
            Value::Str(_) => builtins::string().clone(),
            Value::List(_) => builtins::list().clone(),
            Value::Map(_) => builtins::map().clone(),
            Value::Array(_) => builtins::array().clone(),
            Value::Object(object) => object.class().clone(),
            Value::Class(_) => builtins::class().clone(),
        }
    }

    /// Most precise static type recoverable from the value itself. Generic
    /// arguments are only known for arrays and class literals.
    pub fn runtime_type(&self) -> TypeDescriptor {
        match self {
            Value::Array(array) => TypeDescriptor::array_of(array.element_type().clone()),
            Value::Class(class) => TypeDescriptor::class_of(class),
            other => TypeDescriptor::new(other.class()),
        }
    }

    pub fn kind(&self) -> ClassKind {
        self.class().kind()
    }

    pub fn type_name(&self) -> EcoString {
        match self {
            Value::Array(array) => ecow::eco_format!("{}[]", array.element_type()),
            other => other.class().name().into(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Double(_))
    }

    /// True when this value may be stored where `ty` is expected without
    /// conversion.
    pub fn satisfies(&self, ty: &TypeDescriptor) -> bool {
        if ty.is_dynamic() || self.is_null() {
            return true;
        }
        match self {
            Value::Array(array) => {
                ty.is_array()
                    && (ty.params().is_empty()
                        || ty.element_type().is_dynamic()
                        || ty.element_type().is_assignable_from(array.element_type()))
            }
            other => other.class().is_subclass_of(ty.class()),
        }
    }
}

fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            write!(f, "Infinity")
        } else {
            write!(f, "-Infinity")
        }
    } else {
        let s = value.to_string();
        if s.contains('.') || s.contains('e') || s.contains('E') {
            write!(f, "{}", s)
        } else {
            write!(f, "{}.0", s)
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Double(d) => format_float(f, *d),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(list) => write_seq(f, &list.snapshot()),
            Value::Array(array) => write_seq(f, &array.snapshot()),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "{object}"),
            Value::Class(class) => write!(f, "class {}", class.qualified_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Long(l) => write!(f, "{l}L"),
            other => write!(f, "{other}"),
        }
    }
}

/// Structural equality for scalars and containers, identity for objects.
///
/// Numbers of different kinds are never equal here (`1 != 1L`); the `==`
/// operator applies numeric promotion on top of this.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b) || a.same_entries(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            // Containers are mutable; only the discriminant participates.
            Value::List(_) | Value::Map(_) | Value::Array(_) => {}
            Value::Object(object) => object.addr().hash(state),
            Value::Class(class) => class.id().hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<EcoString> for Value {
    fn from(s: EcoString) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
