//! Built-in classes and their intrinsic members.
//!
//! The classes themselves are bare so they can reference each other freely;
//! their methods live in per-kind tables that are built on first use, after
//! every built-in class exists.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;
use lazy_static::lazy_static;

use crate::evaluator::RuntimeError;
use crate::types::class::{Class, ClassBuilder, ClassKind, Method, NativeMethod, TypeRef};
use crate::values::Value;

lazy_static! {
    static ref OBJECT: Arc<Class> = ClassBuilder::with_kind("Object", ClassKind::Object)
        .package("java.lang")
        .build();
    static ref NULL: Arc<Class> = ClassBuilder::with_kind("null", ClassKind::Null).build();
    static ref BOOLEAN: Arc<Class> = lang("Boolean", ClassKind::Boolean).build();
    static ref INTEGER: Arc<Class> = lang("Integer", ClassKind::Integer).build();
    static ref LONG: Arc<Class> = lang("Long", ClassKind::Long).build();
    static ref DOUBLE: Arc<Class> = lang("Double", ClassKind::Double).build();
    static ref STRING: Arc<Class> = lang("String", ClassKind::String).build();
    static ref LIST: Arc<Class> = ClassBuilder::with_kind("List", ClassKind::List)
        .package("java.util")
        .extends(&OBJECT)
        .type_param("E")
        .constructor(vec![], |_, _| Ok(Value::list(Vec::new())))
        .build();
    static ref MAP: Arc<Class> = ClassBuilder::with_kind("Map", ClassKind::Map)
        .package("java.util")
        .extends(&OBJECT)
        .type_param("K")
        .type_param("V")
        .constructor(vec![], |_, _| Ok(Value::map(Vec::new())))
        .build();
    static ref ARRAY: Arc<Class> = ClassBuilder::with_kind("Array", ClassKind::Array)
        .extends(&OBJECT)
        .type_param("E")
        .property("length", &*INTEGER, |this| match this {
            Value::Array(array) => Ok(Value::Int(array.len() as i32)),
            other => Err(mismatch("length", "an array", other)),
        }, None)
        .build();
    static ref CLASS: Arc<Class> = lang("Class", ClassKind::Class).type_param("T").build();

    static ref INTRINSICS: HashMap<ClassKind, Vec<Arc<Method>>> = intrinsics();
    static ref STATIC_INTRINSICS: HashMap<ClassKind, Vec<Arc<Method>>> = static_intrinsics();
}

fn lang(name: &str, kind: ClassKind) -> ClassBuilder {
    ClassBuilder::with_kind(name, kind)
        .package("java.lang")
        .extends(&OBJECT)
}

pub fn object() -> &'static Arc<Class> {
    &OBJECT
}

pub fn null() -> &'static Arc<Class> {
    &NULL
}

pub fn boolean() -> &'static Arc<Class> {
    &BOOLEAN
}

pub fn integer() -> &'static Arc<Class> {
    &INTEGER
}

pub fn long() -> &'static Arc<Class> {
    &LONG
}

pub fn double() -> &'static Arc<Class> {
    &DOUBLE
}

pub fn string() -> &'static Arc<Class> {
    &STRING
}

pub fn list() -> &'static Arc<Class> {
    &LIST
}

pub fn map() -> &'static Arc<Class> {
    &MAP
}

pub fn array() -> &'static Arc<Class> {
    &ARRAY
}

pub fn class() -> &'static Arc<Class> {
    &CLASS
}

/// Every built-in class that may be named in source, with its aliases.
pub fn named() -> Vec<(&'static str, &'static Arc<Class>)> {
    vec![
        ("Object", object()),
        ("Boolean", boolean()),
        ("boolean", boolean()),
        ("Integer", integer()),
        ("int", integer()),
        ("Long", long()),
        ("long", long()),
        ("Double", double()),
        ("double", double()),
        ("String", string()),
        ("List", list()),
        ("ArrayList", list()),
        ("java.util.ArrayList", list()),
        ("Map", map()),
        ("HashMap", map()),
        ("java.util.HashMap", map()),
        ("Class", class()),
    ]
}

pub(crate) fn intrinsic_methods(kind: ClassKind) -> &'static [Arc<Method>] {
    INTRINSICS.get(&kind).map(Vec::as_slice).unwrap_or(&[])
}

pub(crate) fn intrinsic_static_methods(kind: ClassKind) -> &'static [Arc<Method>] {
    STATIC_INTRINSICS
        .get(&kind)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn mismatch(method: &str, expected: &str, found: &Value) -> RuntimeError {
    RuntimeError::ArgumentMismatch {
        method: method.into(),
        expected: expected.into(),
        found: found.type_name(),
    }
}

fn str_of<'v>(method: &str, value: &'v Value) -> Result<&'v EcoString, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(mismatch(method, "a String", other)),
    }
}

fn int_of(method: &str, value: &Value) -> Result<i32, RuntimeError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(mismatch(method, "an Integer", other)),
    }
}

fn text_of(value: &Value) -> EcoString {
    match value {
        Value::Str(s) => s.clone(),
        other => ecow::eco_format!("{other}"),
    }
}

struct Table {
    declaring: &'static str,
    methods: Vec<Arc<Method>>,
}

impl Table {
    fn new(declaring: &'static str) -> Self {
        Self {
            declaring,
            methods: Vec::new(),
        }
    }

    fn def<F>(mut self, name: &str, params: Vec<TypeRef>, ret: TypeRef, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let invoke: NativeMethod = Arc::new(f);
        self.methods.push(Arc::new(Method::native(
            self.declaring,
            name,
            params,
            ret,
            invoke,
        )));
        self
    }
}

fn t(class: &Arc<Class>) -> TypeRef {
    TypeRef::of(class)
}

fn bounds(index: i32, len: usize) -> Result<usize, RuntimeError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(RuntimeError::IndexOutOfBounds {
            index: index as i64,
            len,
        })
}

fn string_methods() -> Table {
    Table::new("String")
        .def("length", vec![], t(&INTEGER), |this, _| {
            Ok(Value::Int(str_of("length", this)?.chars().count() as i32))
        })
        .def("isEmpty", vec![], t(&BOOLEAN), |this, _| {
            Ok(Value::Bool(str_of("isEmpty", this)?.is_empty()))
        })
        .def("toUpperCase", vec![], TypeRef::This, |this, _| {
            Ok(Value::Str(str_of("toUpperCase", this)?.to_uppercase().into()))
        })
        .def("toLowerCase", vec![], TypeRef::This, |this, _| {
            Ok(Value::Str(str_of("toLowerCase", this)?.to_lowercase().into()))
        })
        .def("trim", vec![], TypeRef::This, |this, _| {
            Ok(Value::Str(str_of("trim", this)?.trim().into()))
        })
        .def("substring", vec![t(&INTEGER)], TypeRef::This, |this, args| {
            let s = str_of("substring", this)?;
            let len = s.chars().count();
            let start = int_of("substring", &args[0])?;
            let start = if start as usize == len { len } else { bounds(start, len)? };
            Ok(Value::Str(s.chars().skip(start).collect::<String>().into()))
        })
        .def(
            "substring",
            vec![t(&INTEGER), t(&INTEGER)],
            TypeRef::This,
            |this, args| {
                let s = str_of("substring", this)?;
                let len = s.chars().count();
                let start = int_of("substring", &args[0])?;
                let end = int_of("substring", &args[1])?;
                if start < 0 || end < start || end as usize > len {
                    return Err(RuntimeError::IndexOutOfBounds {
                        index: end as i64,
                        len,
                    });
                }
                let out: String = s
                    .chars()
                    .skip(start as usize)
                    .take((end - start) as usize)
                    .collect();
                Ok(Value::Str(out.into()))
            },
        )
        .def("contains", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            let s = str_of("contains", this)?;
            Ok(Value::Bool(s.contains(text_of(&args[0]).as_str())))
        })
        .def("startsWith", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            let s = str_of("startsWith", this)?;
            Ok(Value::Bool(s.starts_with(text_of(&args[0]).as_str())))
        })
        .def("endsWith", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            let s = str_of("endsWith", this)?;
            Ok(Value::Bool(s.ends_with(text_of(&args[0]).as_str())))
        })
        .def("indexOf", vec![t(&OBJECT)], t(&INTEGER), |this, args| {
            let s = str_of("indexOf", this)?;
            let needle = text_of(&args[0]);
            let index = s
                .find(needle.as_str())
                .map(|byte| s[..byte].chars().count() as i32)
                .unwrap_or(-1);
            Ok(Value::Int(index))
        })
        .def("concat", vec![t(&OBJECT)], TypeRef::This, |this, args| {
            let s = str_of("concat", this)?;
            Ok(Value::Str(ecow::eco_format!("{}{}", s, text_of(&args[0]))))
        })
        .def(
            "replace",
            vec![t(&OBJECT), t(&OBJECT)],
            TypeRef::This,
            |this, args| {
                let s = str_of("replace", this)?;
                let from = text_of(&args[0]);
                let to = text_of(&args[1]);
                Ok(Value::Str(s.replace(from.as_str(), to.as_str()).into()))
            },
        )
        .def("equalsIgnoreCase", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            let s = str_of("equalsIgnoreCase", this)?;
            Ok(Value::Bool(match &args[0] {
                Value::Str(other) => s.to_lowercase() == other.to_lowercase(),
                _ => false,
            }))
        })
}

fn number_methods(declaring: &'static str) -> Table {
    Table::new(declaring)
        .def("intValue", vec![], t(&INTEGER), |this, _| match this {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Long(l) => Ok(Value::Int(*l as i32)),
            Value::Double(d) => Ok(Value::Int(*d as i32)),
            other => Err(mismatch("intValue", "a number", other)),
        })
        .def("longValue", vec![], t(&LONG), |this, _| match this {
            Value::Int(i) => Ok(Value::Long(*i as i64)),
            Value::Long(l) => Ok(Value::Long(*l)),
            Value::Double(d) => Ok(Value::Long(*d as i64)),
            other => Err(mismatch("longValue", "a number", other)),
        })
        .def("doubleValue", vec![], t(&DOUBLE), |this, _| match this {
            Value::Int(i) => Ok(Value::Double(*i as f64)),
            Value::Long(l) => Ok(Value::Double(*l as f64)),
            Value::Double(d) => Ok(Value::Double(*d)),
            other => Err(mismatch("doubleValue", "a number", other)),
        })
}

fn list_of(value: &Value, method: &str) -> Result<crate::values::List, RuntimeError> {
    match value {
        Value::List(list) => Ok(list.clone()),
        other => Err(mismatch(method, "a List", other)),
    }
}

fn map_of(value: &Value, method: &str) -> Result<crate::values::Map, RuntimeError> {
    match value {
        Value::Map(map) => Ok(map.clone()),
        other => Err(mismatch(method, "a Map", other)),
    }
}

fn list_methods() -> Table {
    let e = || TypeRef::var("E");
    Table::new("List")
        .def("size", vec![], t(&INTEGER), |this, _| {
            Ok(Value::Int(list_of(this, "size")?.len() as i32))
        })
        .def("isEmpty", vec![], t(&BOOLEAN), |this, _| {
            Ok(Value::Bool(list_of(this, "isEmpty")?.len() == 0))
        })
        .def("get", vec![t(&INTEGER)], e(), |this, args| {
            let list = list_of(this, "get")?;
            let index = bounds(int_of("get", &args[0])?, list.len())?;
            Ok(list.get(index).unwrap_or(Value::Null))
        })
        .def("add", vec![e()], t(&BOOLEAN), |this, args| {
            list_of(this, "add")?.push(args[0].clone());
            Ok(Value::Bool(true))
        })
        .def("set", vec![t(&INTEGER), e()], e(), |this, args| {
            let list = list_of(this, "set")?;
            let index = bounds(int_of("set", &args[0])?, list.len())?;
            list.set(index, args[1].clone())
        })
        .def("remove", vec![t(&INTEGER)], e(), |this, args| {
            let list = list_of(this, "remove")?;
            let index = bounds(int_of("remove", &args[0])?, list.len())?;
            list.remove(index)
        })
        .def("contains", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            Ok(Value::Bool(list_of(this, "contains")?.index_of(&args[0]).is_some()))
        })
        .def("indexOf", vec![t(&OBJECT)], t(&INTEGER), |this, args| {
            let found = list_of(this, "indexOf")?.index_of(&args[0]);
            Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
        })
        .def("clear", vec![], t(&NULL), |this, _| {
            list_of(this, "clear")?.clear();
            Ok(Value::Null)
        })
}

fn map_methods() -> Table {
    let k = || TypeRef::var("K");
    let v = || TypeRef::var("V");
    Table::new("Map")
        .def("size", vec![], t(&INTEGER), |this, _| {
            Ok(Value::Int(map_of(this, "size")?.len() as i32))
        })
        .def("isEmpty", vec![], t(&BOOLEAN), |this, _| {
            Ok(Value::Bool(map_of(this, "isEmpty")?.len() == 0))
        })
        .def("get", vec![t(&OBJECT)], v(), |this, args| {
            Ok(map_of(this, "get")?.get(&args[0]).unwrap_or(Value::Null))
        })
        .def("put", vec![k(), v()], v(), |this, args| {
            let previous = map_of(this, "put")?.insert(args[0].clone(), args[1].clone());
            Ok(previous.unwrap_or(Value::Null))
        })
        .def("containsKey", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            Ok(Value::Bool(map_of(this, "containsKey")?.contains_key(&args[0])))
        })
        .def("remove", vec![t(&OBJECT)], v(), |this, args| {
            Ok(map_of(this, "remove")?.remove(&args[0]).unwrap_or(Value::Null))
        })
        .def(
            "keySet",
            vec![],
            TypeRef::generic(&LIST, vec![k()]),
            |this, _| Ok(Value::list(map_of(this, "keySet")?.keys())),
        )
        .def(
            "values",
            vec![],
            TypeRef::generic(&LIST, vec![v()]),
            |this, _| Ok(Value::list(map_of(this, "values")?.values())),
        )
}

fn object_methods() -> Table {
    Table::new("Object")
        .def("toString", vec![], t(&STRING), |this, _| {
            Ok(Value::Str(text_of(this)))
        })
        .def("equals", vec![t(&OBJECT)], t(&BOOLEAN), |this, args| {
            Ok(Value::Bool(*this == args[0]))
        })
}

fn class_methods() -> Table {
    Table::new("Class")
        .def("getName", vec![], t(&STRING), |this, _| match this {
            Value::Class(class) => Ok(Value::Str(class.qualified_name())),
            other => Err(mismatch("getName", "a Class", other)),
        })
        .def("getSimpleName", vec![], t(&STRING), |this, _| match this {
            Value::Class(class) => Ok(Value::Str(class.name().into())),
            other => Err(mismatch("getSimpleName", "a Class", other)),
        })
}

fn intrinsics() -> HashMap<ClassKind, Vec<Arc<Method>>> {
    let mut table = HashMap::new();
    table.insert(ClassKind::Object, object_methods().methods);
    table.insert(ClassKind::String, string_methods().methods);
    table.insert(ClassKind::Integer, number_methods("Integer").methods);
    table.insert(ClassKind::Long, number_methods("Long").methods);
    table.insert(ClassKind::Double, number_methods("Double").methods);
    table.insert(ClassKind::List, list_methods().methods);
    table.insert(ClassKind::Map, map_methods().methods);
    table.insert(ClassKind::Class, class_methods().methods);
    table
}

fn parse_error(method: &str, text: &str) -> RuntimeError {
    RuntimeError::ArgumentMismatch {
        method: method.into(),
        expected: "a numeric string".into(),
        found: ecow::eco_format!("'{text}'"),
    }
}

fn static_intrinsics() -> HashMap<ClassKind, Vec<Arc<Method>>> {
    let mut table = HashMap::new();
    table.insert(
        ClassKind::Integer,
        Table::new("Integer")
            .def("parseInt", vec![t(&STRING)], t(&INTEGER), |_, args| {
                let s = str_of("parseInt", &args[0])?;
                s.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| parse_error("parseInt", s))
            })
            .def("valueOf", vec![t(&INTEGER)], t(&INTEGER), |_, args| {
                Ok(Value::Int(int_of("valueOf", &args[0])?))
            })
            .methods,
    );
    table.insert(
        ClassKind::Long,
        Table::new("Long")
            .def("parseLong", vec![t(&STRING)], t(&LONG), |_, args| {
                let s = str_of("parseLong", &args[0])?;
                s.trim()
                    .parse()
                    .map(Value::Long)
                    .map_err(|_| parse_error("parseLong", s))
            })
            .methods,
    );
    table.insert(
        ClassKind::Double,
        Table::new("Double")
            .def("parseDouble", vec![t(&STRING)], t(&DOUBLE), |_, args| {
                let s = str_of("parseDouble", &args[0])?;
                s.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| parse_error("parseDouble", s))
            })
            .methods,
    );
    table.insert(
        ClassKind::String,
        Table::new("String")
            .def("valueOf", vec![t(&OBJECT)], t(&STRING), |_, args| {
                Ok(Value::Str(text_of(&args[0])))
            })
            .methods,
    );
    table
}
