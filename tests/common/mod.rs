//! Host classes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use brisk::types::{ClassBuilder, Function, TypeRef, builtins};
use brisk::values::Object;
use brisk::{Class, Engine, EngineOptions, RuntimeError, TypeDescriptor, Value};
use once_cell::sync::Lazy;

pub struct Fixtures {
    pub bar: Arc<Class>,
    pub sample_bean: Arc<Class>,
    pub foo: Arc<Class>,
    pub person: Arc<Class>,
    pub cheese: Arc<Class>,
}

/// One set of classes per test binary; class identity matters for call-site
/// caching.
pub static FIXTURES: Lazy<Fixtures> = Lazy::new(|| {
    let bar = ClassBuilder::new("Bar")
        .package("org.brisk.tests")
        .field_with_default("name", builtins::string(), Value::str("dog"))
        .field_with_default("woof", builtins::boolean(), Value::Bool(true))
        .field("testList", TypeDescriptor::list_of(TypeDescriptor::integer()))
        .build();

    let sample_bean = ClassBuilder::new("SampleBean")
        .package("org.brisk.tests")
        .field(
            "map2",
            TypeDescriptor::map_of(TypeDescriptor::string(), TypeDescriptor::integer()),
        )
        .build();

    let foo = ClassBuilder::new("Foo")
        .package("org.brisk.tests")
        .field_with_default("name", builtins::string(), Value::str("dog"))
        .field("bar", &bar)
        .field("sampleBean", &sample_bean)
        .method("getCountTest", vec![], builtins::integer(), |_, _| Ok(Value::Int(12)))
        .build();

    let person = ClassBuilder::new("Person")
        .package("org.brisk.tests")
        .field("name", builtins::string())
        .field_with_default("age", builtins::integer(), Value::Int(0))
        .field(
            "footributes",
            TypeDescriptor::list_of(TypeDescriptor::of(&foo)),
        )
        .field(
            "maptributes",
            TypeDescriptor::map_of(TypeDescriptor::string(), TypeDescriptor::of(&foo)),
        )
        .field_constructor(&[])
        .field_constructor(&["name", "age"])
        .method(
            "greet",
            vec![TypeRef::of(builtins::string())],
            builtins::string(),
            |this, args| {
                let name = match this {
                    Value::Object(object) => object.get("name").unwrap_or(Value::Null),
                    _ => Value::Null,
                };
                Ok(Value::str(format!("{}, {}", args[0], name)))
            },
        )
        .build();

    let cheese = ClassBuilder::new("Cheese")
        .package("org.brisk.tests")
        .field("type", builtins::string())
        .field_with_default("price", builtins::integer(), Value::Int(0))
        .build();

    Fixtures {
        bar,
        sample_bean,
        foo,
        person,
        cheese,
    }
});

pub fn engine() -> Engine {
    let fixtures = &*FIXTURES;
    Engine::new(EngineOptions::default(), |env| {
        env.register_class(fixtures.bar.clone())
            .register_class(fixtures.sample_bean.clone())
            .register_class(fixtures.foo.clone())
            .register_class(fixtures.person.clone())
            .register_class(fixtures.cheese.clone())
            .register_function(Function::new(
                "max",
                vec![TypeDescriptor::integer(), TypeDescriptor::integer()],
                TypeDescriptor::integer(),
                |args| match (args[0].as_i64(), args[1].as_i64()) {
                    (Some(a), Some(b)) => Ok(Value::Int(a.max(b) as i32)),
                    _ => Err(RuntimeError::ArgumentMismatch {
                        method: "max".into(),
                        expected: "two integers".into(),
                        found: format!("{}, {}", args[0].type_name(), args[1].type_name()).into(),
                    }),
                },
            ));
    })
}

/// A `Foo` whose bar holds `[-1]` and whose sample bean holds an empty map.
pub fn new_foo() -> Object {
    let fixtures = &*FIXTURES;
    let bar = Object::new(&fixtures.bar).with("testList", Value::list(vec![Value::Int(-1)]));
    let bean = Object::new(&fixtures.sample_bean).with("map2", Value::map([(Value::str("x"), Value::Int(0))]));
    Object::new(&fixtures.foo).with("bar", bar).with("sampleBean", bean)
}

pub fn new_person(name: &str, age: i32) -> Object {
    let fixtures = &*FIXTURES;
    let footributes = Value::list(vec![Value::Object(new_foo())]);
    let maptributes = Value::map([(Value::str("fooey"), Value::Object(new_foo()))]);
    Object::new(&fixtures.person)
        .with("name", name)
        .with("age", age)
        .with("footributes", footributes)
        .with("maptributes", maptributes)
}
