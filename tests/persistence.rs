//! Compiled expressions survive a round trip through bytes.

mod common;

use brisk::{Engine, EngineOptions, Error, TypeDescriptor, TypeEnvironmentConfig, Value, Variables};
use common::{FIXTURES, engine, new_person};
use pretty_assertions::assert_eq;

#[test]
fn round_trip_into_fresh_engine() {
    let config = TypeEnvironmentConfig::new()
        .strong_typing(true)
        .input("p", TypeDescriptor::of(&FIXTURES.person));
    let source = "String label = p.name.toUpperCase() + ' is ' + max(p.age, 18); label";
    let original = engine().compile(source, &config).unwrap();
    let bytes = original.to_bytes().unwrap();

    let loaded = engine().load(&bytes).unwrap();
    assert_eq!(loaded.known_egress_type(), original.known_egress_type());
    assert_eq!(loaded.call_site_count(), original.call_site_count());
    assert_eq!(
        loaded.environment().variables(),
        original.environment().variables()
    );
    assert_eq!(loaded.environment().input_type("p"), Some(&TypeDescriptor::of(&FIXTURES.person)));
    assert!(loaded.call_sites().iter().all(|site| site.binding().is_none()));

    let run = |expr: &brisk::CompiledExpression| {
        let mut vars = Variables::new();
        vars.insert("p".into(), Value::Object(new_person("Ada", 12)));
        expr.execute(&Value::Null, &mut vars).unwrap()
    };
    assert_eq!(run(&loaded), Value::str("ADA is 18"));
    assert_eq!(run(&loaded), run(&original));
}

#[test]
fn setters_round_trip() {
    let config = TypeEnvironmentConfig::new().context_type(TypeDescriptor::of(&FIXTURES.person));
    let setter = engine().compile_setter("age", &config).unwrap();
    let loaded = engine().load(&setter.to_bytes().unwrap()).unwrap();
    assert!(loaded.is_setter());

    let person = new_person("Ada", 36);
    loaded
        .execute_set(&Value::Object(person.clone()), &mut Variables::new(), Value::str("40"))
        .unwrap();
    assert_eq!(person.get("age"), Some(Value::Int(40)));
}

#[test]
fn missing_classes_are_reported() {
    let config = TypeEnvironmentConfig::new();
    let bytes = engine()
        .compile("new Cheese().price", &config)
        .unwrap()
        .to_bytes()
        .unwrap();

    let bare = Engine::new(EngineOptions::default(), |_| {});
    assert!(matches!(bare.load(&bytes), Err(Error::Persistence(_))));
}

#[test]
fn garbage_is_rejected() {
    let engine = engine();
    assert!(matches!(engine.load(b""), Err(Error::Persistence(_))));
    assert!(matches!(engine.load(b"not an expression"), Err(Error::Persistence(_))));

    let mut bytes = engine
        .compile("1 + 2", &TypeEnvironmentConfig::new())
        .unwrap()
        .to_bytes()
        .unwrap();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(engine.load(&bytes), Err(Error::Persistence(_))));
}
