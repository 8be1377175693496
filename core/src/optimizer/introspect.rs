//! Universal member semantics: every access looks the member up on the
//! receiver's runtime class. Specialized accessors must agree with these
//! functions for the receivers they accept.

use std::sync::Arc;

use ecow::EcoString;

use crate::coercion::registry;
use crate::evaluator::RuntimeError;
use crate::types::overload::{self, Resolution};
use crate::types::{Class, ClassKind, Method, PropertyKind, TypeDescriptor};
use crate::values::{Object, Value};

fn no_such_member(receiver: &Value, member: &str) -> RuntimeError {
    RuntimeError::NoSuchMember {
        class: receiver.type_name(),
        member: member.into(),
    }
}

fn null_receiver(member: &str) -> RuntimeError {
    RuntimeError::NullReceiver {
        member: member.into(),
    }
}

/// Read property `name` of `receiver`.
pub fn get_property(receiver: &Value, name: &str) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Null => return Err(null_receiver(name)),
        Value::Class(class) => {
            if let Some(field) = class.static_field(name) {
                return Ok(field.value().clone());
            }
        }
        Value::Map(map) => return Ok(map.get(&Value::str(name)).unwrap_or(Value::Null)),
        _ => {}
    }

    let class = receiver.class();
    if let Some(property) = class.property(name) {
        return match (&property.kind, receiver) {
            (PropertyKind::Slot(index), Value::Object(object)) => Ok(object.slot(*index)),
            (PropertyKind::Computed { get: Some(get), .. }, _) => get(receiver),
            _ => Err(no_such_member(receiver, name)),
        };
    }
    match class.getter_method(name) {
        Some(getter) => getter.invoke(receiver, &[]),
        None => Err(no_such_member(receiver, name)),
    }
}

/// Write property `name` of `receiver`, converting `value` to the
/// property's declared type first.
pub fn set_property(receiver: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    match receiver {
        Value::Null => return Err(null_receiver(name)),
        Value::Map(map) => {
            map.insert(Value::str(name), value);
            return Ok(());
        }
        _ => {}
    }

    let class = receiver.class();
    if let Some(property) = class.property(name) {
        let target = property.ty().resolve(&receiver.runtime_type());
        return match (&property.kind, receiver) {
            (PropertyKind::Slot(index), Value::Object(object)) => {
                object.set_slot(*index, registry().convert_to(value, &target)?);
                Ok(())
            }
            (PropertyKind::Computed { set: Some(set), .. }, _) => {
                set(receiver, registry().convert_to(value, &target)?)
            }
            _ => Err(no_such_member(receiver, name)),
        };
    }

    match class.setter_method(name) {
        Some(setter) => {
            let params = resolved_params(&setter, &receiver.runtime_type());
            let args = bind_args(&params, vec![value])?;
            setter.invoke(receiver, &args).map(|_| ())
        }
        None => Err(no_such_member(receiver, name)),
    }
}

pub(crate) fn resolved_params(method: &Method, receiver: &TypeDescriptor) -> Vec<TypeDescriptor> {
    method.params().iter().map(|p| p.resolve(receiver)).collect()
}

/// Convert each argument to its parameter type.
pub(crate) fn bind_args(params: &[TypeDescriptor], args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
    args.into_iter()
        .zip(params)
        .map(|(arg, param)| registry().convert_to(arg, param).map_err(RuntimeError::from))
        .collect()
}

fn describe_args(args: &[Value]) -> EcoString {
    let names: Vec<String> = args.iter().map(|arg| arg.type_name().to_string()).collect();
    names.join(", ").into()
}

/// Pick the overload of `candidates` that fits the runtime `args`.
///
/// Equally specific candidates are not an error at runtime: the first one,
/// in declaration order from the most derived class, is taken.
pub(crate) fn select<'m>(
    candidates: &'m [Arc<Method>],
    owner: &TypeDescriptor,
    args: &[Value],
) -> Option<(&'m Arc<Method>, Vec<TypeDescriptor>)> {
    let params: Vec<Vec<TypeDescriptor>> = candidates
        .iter()
        .map(|m| resolved_params(m, owner))
        .collect();
    let arg_types: Vec<TypeDescriptor> = args.iter().map(Value::runtime_type).collect();
    let index = match overload::resolve(&params, &arg_types, |from, to| {
        registry().can_coerce(from, to)
    }) {
        Resolution::Unique { index, .. } => index,
        Resolution::Ambiguous(indices) => *indices.first()?,
        Resolution::Deferred => params.iter().position(|p| p.len() == args.len())?,
        Resolution::NoMatch => return None,
    };
    let chosen = params.into_iter().nth(index)?;
    Some((candidates.get(index)?, chosen))
}

fn call_overloaded(
    candidates: &[Arc<Method>],
    owner: &TypeDescriptor,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let Some((method, params)) = select(candidates, owner, &args) else {
        return Err(RuntimeError::NoApplicableMethod {
            class: owner.class().name().into(),
            name: name.into(),
            args: describe_args(&args),
        });
    };
    let args = bind_args(&params, args)?;
    method.invoke(receiver, &args)
}

/// Call method `name` on `receiver`. Class values dispatch to static
/// methods first.
pub fn invoke(receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if receiver.is_null() {
        return Err(null_receiver(name));
    }
    if let Value::Class(class) = receiver {
        let statics = class.static_methods(name);
        if !statics.is_empty() {
            return call_overloaded(&statics, &TypeDescriptor::of(class), receiver, name, args);
        }
    }
    let candidates = receiver.class().methods(name);
    if candidates.is_empty() {
        return Err(no_such_member(receiver, name));
    }
    call_overloaded(&candidates, &receiver.runtime_type(), receiver, name, args)
}

/// Interpret `index` as a position in a sequence of `len` elements.
pub(crate) fn position(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let raw = match index.as_i64() {
        Some(raw) => raw,
        None => registry()
            .convert(index.clone(), crate::types::builtins::long())?
            .as_i64()
            .unwrap_or(-1),
    };
    if raw < 0 || raw as usize >= len {
        return Err(RuntimeError::IndexOutOfBounds { index: raw, len });
    }
    Ok(raw as usize)
}

pub fn get_index(receiver: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Null => Err(null_receiver("[]")),
        Value::List(list) => {
            let at = position(index, list.len())?;
            Ok(list.get(at).unwrap_or(Value::Null))
        }
        Value::Array(array) => {
            let at = position(index, array.len())?;
            Ok(array.get(at).unwrap_or(Value::Null))
        }
        Value::Map(map) => Ok(map.get(index).unwrap_or(Value::Null)),
        other => Err(RuntimeError::NotIndexable {
            ty: other.type_name(),
        }),
    }
}

/// Store `value` at `index`. Arrays convert it to their element type.
pub fn set_index(receiver: &Value, index: Value, value: Value) -> Result<(), RuntimeError> {
    match receiver {
        Value::Null => Err(null_receiver("[]")),
        Value::List(list) => {
            let at = position(&index, list.len())?;
            list.set(at, value).map(|_| ())
        }
        Value::Array(array) => {
            let at = position(&index, array.len())?;
            let value = registry().convert_to(value, array.element_type())?;
            array.set(at, value).map(|_| ())
        }
        Value::Map(map) => {
            map.insert(index, value);
            Ok(())
        }
        other => Err(RuntimeError::NotIndexable {
            ty: other.type_name(),
        }),
    }
}

/// Instantiate `class`. `ctor` is the constructor chosen at compile time,
/// if any; otherwise one is selected from the runtime arguments.
pub fn construct(class: &Arc<Class>, args: Vec<Value>, ctor: Option<usize>) -> Result<Value, RuntimeError> {
    let constructors = class.constructors();
    if constructors.is_empty() && args.is_empty() {
        return match class.kind() {
            ClassKind::List => Ok(Value::list(Vec::new())),
            ClassKind::Map => Ok(Value::map(Vec::new())),
            ClassKind::Bean => Ok(Value::Object(Object::new(class))),
            _ => Err(RuntimeError::NoApplicableMethod {
                class: class.name().into(),
                name: "new".into(),
                args: EcoString::new(),
            }),
        };
    }
    let owner = TypeDescriptor::of(class);
    let this = Value::Class(class.clone());
    match ctor.and_then(|index| constructors.get(index)) {
        Some(constructor) => {
            let params = resolved_params(constructor, &owner);
            let args = bind_args(&params, args)?;
            constructor.invoke(&this, &args)
        }
        None => call_overloaded(constructors, &owner, &this, "new", args),
    }
}
