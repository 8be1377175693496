use std::sync::Arc;

use crate::coercion::registry;
use crate::evaluator::RuntimeError;
use crate::optimizer::call_site::Member;
use crate::optimizer::introspect;
use crate::types::{Class, ClassKind, Getter, Method, PropertyKind, Setter, TypeDescriptor};
use crate::values::Value;

/// How a call site reaches its member.
pub enum Accessor {
    /// Introspects the receiver on every access.
    Universal,
    /// Valid only for receivers of the class the site is bound to.
    Specialized(Specialized),
}

pub enum Specialized {
    /// A field slot of a bean, with the field's type for stores.
    Slot { index: usize, ty: TypeDescriptor },
    /// A computed property.
    Computed {
        get: Option<Getter>,
        set: Option<Setter>,
        ty: TypeDescriptor,
    },
    /// A `getX()` method read as property `x`.
    GetterMethod(Arc<Method>),
    /// The only method of its name and arity.
    Method {
        method: Arc<Method>,
        params: Vec<TypeDescriptor>,
    },
    /// A map entry read as a property (`map.key`).
    MapKey(Value),
    ListIndex,
    ArrayIndex,
    MapIndex,
}

/// Tag of an [`Accessor`], for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Universal,
    Slot,
    Computed,
    GetterMethod,
    Method,
    MapKey,
    ListIndex,
    ArrayIndex,
    MapIndex,
}

impl Accessor {
    pub fn kind(&self) -> AccessorKind {
        match self {
            Accessor::Universal => AccessorKind::Universal,
            Accessor::Specialized(specialized) => match specialized {
                Specialized::Slot { .. } => AccessorKind::Slot,
                Specialized::Computed { .. } => AccessorKind::Computed,
                Specialized::GetterMethod(_) => AccessorKind::GetterMethod,
                Specialized::Method { .. } => AccessorKind::Method,
                Specialized::MapKey(_) => AccessorKind::MapKey,
                Specialized::ListIndex => AccessorKind::ListIndex,
                Specialized::ArrayIndex => AccessorKind::ArrayIndex,
                Specialized::MapIndex => AccessorKind::MapIndex,
            },
        }
    }

    /// Build the specialized accessor for `member` on receivers of exactly
    /// `class`. The error is the reason specialization is not possible.
    pub(crate) fn specialize(
        class: &Arc<Class>,
        receiver: &Value,
        member: &Member,
    ) -> Result<Accessor, &'static str> {
        if matches!(receiver, Value::Class(_)) {
            return Err("static members are not specialized");
        }
        let specialized = match member {
            Member::Property(name) => {
                if class.kind() == ClassKind::Map {
                    Specialized::MapKey(Value::str(name.clone()))
                } else if let Some(property) = class.property(name) {
                    let ty = property.ty().resolve(&receiver.runtime_type());
                    match &property.kind {
                        PropertyKind::Slot(index) => Specialized::Slot { index: *index, ty },
                        PropertyKind::Computed { get, set } => Specialized::Computed {
                            get: get.clone(),
                            set: set.clone(),
                            ty,
                        },
                    }
                } else if let Some(getter) = class.getter_method(name) {
                    Specialized::GetterMethod(getter)
                } else {
                    return Err("no such member");
                }
            }
            Member::Method { name, arity } => {
                let mut candidates = class
                    .methods(name)
                    .into_iter()
                    .filter(|m| m.arity() == *arity);
                let method = candidates.next().ok_or("no such method")?;
                if candidates.next().is_some() {
                    return Err("overloaded method");
                }
                let params = introspect::resolved_params(&method, &receiver.runtime_type());
                Specialized::Method { method, params }
            }
            Member::Index => match class.kind() {
                ClassKind::List => Specialized::ListIndex,
                ClassKind::Array => Specialized::ArrayIndex,
                ClassKind::Map => Specialized::MapIndex,
                _ => return Err("receiver is not indexable"),
            },
        };
        Ok(Accessor::Specialized(specialized))
    }

    pub(crate) fn get(&self, member: &Member, receiver: &Value) -> Result<Value, RuntimeError> {
        let Accessor::Specialized(specialized) = self else {
            return introspect::get_property(receiver, member.name());
        };
        match (specialized, receiver) {
            (Specialized::Slot { index, .. }, Value::Object(object)) => Ok(object.slot(*index)),
            (Specialized::Computed { get: Some(get), .. }, _) => get(receiver),
            (Specialized::GetterMethod(getter), _) => getter.invoke(receiver, &[]),
            (Specialized::MapKey(key), Value::Map(map)) => Ok(map.get(key).unwrap_or(Value::Null)),
            _ => introspect::get_property(receiver, member.name()),
        }
    }

    pub(crate) fn set(&self, member: &Member, receiver: &Value, value: Value) -> Result<(), RuntimeError> {
        let Accessor::Specialized(specialized) = self else {
            return introspect::set_property(receiver, member.name(), value);
        };
        match (specialized, receiver) {
            (Specialized::Slot { index, ty }, Value::Object(object)) => {
                object.set_slot(*index, registry().convert_to(value, ty)?);
                Ok(())
            }
            (Specialized::Computed { set: Some(set), ty, .. }, _) => {
                set(receiver, registry().convert_to(value, ty)?)
            }
            (Specialized::MapKey(key), Value::Map(map)) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            _ => introspect::set_property(receiver, member.name(), value),
        }
    }

    pub(crate) fn invoke(&self, member: &Member, receiver: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match self {
            Accessor::Specialized(Specialized::Method { method, params })
                if args.iter().zip(params).all(|(arg, param)| arg.satisfies(param)) =>
            {
                method.invoke(receiver, &args)
            }
            // Arguments that need conversion take the universal path.
            _ => introspect::invoke(receiver, member.name(), args),
        }
    }

    pub(crate) fn get_index(&self, receiver: &Value, index: &Value) -> Result<Value, RuntimeError> {
        match (self, receiver) {
            (Accessor::Specialized(Specialized::ListIndex), Value::List(list)) => {
                let at = introspect::position(index, list.len())?;
                Ok(list.get(at).unwrap_or(Value::Null))
            }
            (Accessor::Specialized(Specialized::ArrayIndex), Value::Array(array)) => {
                let at = introspect::position(index, array.len())?;
                Ok(array.get(at).unwrap_or(Value::Null))
            }
            (Accessor::Specialized(Specialized::MapIndex), Value::Map(map)) => {
                Ok(map.get(index).unwrap_or(Value::Null))
            }
            _ => introspect::get_index(receiver, index),
        }
    }

    pub(crate) fn set_index(&self, receiver: &Value, index: Value, value: Value) -> Result<(), RuntimeError> {
        match (self, receiver) {
            (Accessor::Specialized(Specialized::ListIndex), Value::List(list)) => {
                let at = introspect::position(&index, list.len())?;
                list.set(at, value).map(|_| ())
            }
            (Accessor::Specialized(Specialized::MapIndex), Value::Map(map)) => {
                map.insert(index, value);
                Ok(())
            }
            _ => introspect::set_index(receiver, index, value),
        }
    }
}
