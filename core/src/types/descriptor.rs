//! Static type descriptors: a class plus the generic arguments it was
//! declared with, e.g. `List<String>` or `Map<String, Integer>`.

use core::fmt;
use std::sync::Arc;

use crate::types::builtins;
use crate::types::class::{Class, ClassKind};

/// Static type of an expression or declaration.
///
/// Equality compares class identity and generic arguments.
#[derive(Clone)]
pub struct TypeDescriptor {
    class: Arc<Class>,
    params: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    pub fn new(class: Arc<Class>) -> Self {
        Self {
            class,
            params: Vec::new(),
        }
    }

    pub fn with_params(class: Arc<Class>, params: Vec<TypeDescriptor>) -> Self {
        Self { class, params }
    }

    pub fn of(class: &Arc<Class>) -> Self {
        Self::new(class.clone())
    }

    pub fn object() -> Self {
        Self::of(builtins::object())
    }

    pub fn null() -> Self {
        Self::of(builtins::null())
    }

    pub fn boolean() -> Self {
        Self::of(builtins::boolean())
    }

    pub fn integer() -> Self {
        Self::of(builtins::integer())
    }

    pub fn long() -> Self {
        Self::of(builtins::long())
    }

    pub fn double() -> Self {
        Self::of(builtins::double())
    }

    pub fn string() -> Self {
        Self::of(builtins::string())
    }

    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::with_params(builtins::list().clone(), vec![element])
    }

    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::with_params(builtins::map().clone(), vec![key, value])
    }

    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::with_params(builtins::array().clone(), vec![element])
    }

    /// Type of a class literal such as `Decimal` used as a value.
    pub fn class_of(class: &Arc<Class>) -> Self {
        Self::with_params(builtins::class().clone(), vec![Self::of(class)])
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    pub fn kind(&self) -> ClassKind {
        self.class.kind()
    }

    /// `Object` carries no static information; member access against it is
    /// resolved at runtime.
    pub fn is_dynamic(&self) -> bool {
        self.class.is_dynamic()
    }

    pub fn is_numeric(&self) -> bool {
        self.class.is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.kind() == ClassKind::String
    }

    pub fn is_boolean(&self) -> bool {
        self.kind() == ClassKind::Boolean
    }

    pub fn is_null(&self) -> bool {
        self.kind() == ClassKind::Null
    }

    pub fn is_array(&self) -> bool {
        self.kind() == ClassKind::Array
    }

    fn param_or_object(&self, idx: usize) -> TypeDescriptor {
        self.params.get(idx).cloned().unwrap_or_else(Self::object)
    }

    /// Element type of an array or list, `Object` when unknown.
    pub fn element_type(&self) -> TypeDescriptor {
        match self.kind() {
            ClassKind::Array | ClassKind::List => self.param_or_object(0),
            _ => Self::object(),
        }
    }

    pub fn key_type(&self) -> TypeDescriptor {
        match self.kind() {
            ClassKind::Map => self.param_or_object(0),
            _ => Self::object(),
        }
    }

    pub fn value_type(&self) -> TypeDescriptor {
        match self.kind() {
            ClassKind::Map => self.param_or_object(1),
            _ => Self::object(),
        }
    }

    /// True when a value of static type `other` may be stored where `self`
    /// is expected without any conversion.
    ///
    /// Raw types (no generic arguments) on either side are compatible with any
    /// parameterization; `Object` arguments accept anything.
    pub fn is_assignable_from(&self, other: &TypeDescriptor) -> bool {
        if self.is_dynamic() || other.is_null() {
            return true;
        }
        if !other.class.is_subclass_of(&self.class) {
            return false;
        }
        if self.params.is_empty() || other.params.is_empty() || self.class != other.class {
            return true;
        }
        self.params.len() == other.params.len()
            && self.params.iter().zip(&other.params).all(|(want, have)| {
                want.is_dynamic()
                    || have.is_dynamic()
                    || want == have
                    || (self.is_array() && want.is_assignable_from(have))
            })
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.class.id() == other.class.id() && self.params == other.params
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            return write!(f, "{}[]", self.element_type());
        }
        write!(f, "{}", self.class.name())?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{param}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<&Arc<Class>> for TypeDescriptor {
    fn from(class: &Arc<Class>) -> Self {
        Self::of(class)
    }
}
