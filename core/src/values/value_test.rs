use crate::types::{ClassBuilder, TypeDescriptor, builtins};
use crate::values::{Object, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_display_is_java_like() {
    assert_eq!(Value::Double(100.5).to_string(), "100.5");
    assert_eq!(Value::Double(1.0).to_string(), "1.0");
    assert_eq!(Value::Long(5).to_string(), "5");
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(
        Value::list(vec![Value::Int(1), Value::from("a")]).to_string(),
        "[1, a]"
    );
    assert_eq!(
        Value::map(vec![(Value::from("k"), Value::Int(1))]).to_string(),
        "{k=1}"
    );
}

#[test]
fn test_numbers_of_different_kinds_are_distinct() {
    assert_ne!(Value::Int(1), Value::Long(1));
    assert_ne!(Value::Int(1), Value::Double(1.0));
    assert_eq!(Value::Double(0.5), Value::Double(0.5));
}

#[test]
fn test_containers_compare_by_content_and_share_mutation() {
    let a = Value::list(vec![Value::Int(1)]);
    let b = Value::list(vec![Value::Int(1)]);
    assert_eq!(a, b);

    let alias = a.clone();
    if let Value::List(list) = &alias {
        list.push(Value::Int(2));
    }
    assert_ne!(a, b);
    assert_eq!(a, alias);
}

#[test]
fn test_map_equality_ignores_order() {
    let a = Value::map(vec![
        (Value::from("x"), Value::Int(1)),
        (Value::from("y"), Value::Int(2)),
    ]);
    let b = Value::map(vec![
        (Value::from("y"), Value::Int(2)),
        (Value::from("x"), Value::Int(1)),
    ]);
    assert_eq!(a, b);
}

#[test]
fn test_objects_compare_by_identity() {
    let class = ClassBuilder::new("Thing")
        .field("name", builtins::string())
        .build();
    let a = Object::new(&class).with("name", "x");
    let b = Object::new(&class).with("name", "x");
    assert_ne!(Value::Object(a.clone()), Value::Object(b));
    assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
    assert_eq!(a.get("name"), Some(Value::from("x")));
}

#[test]
fn test_runtime_class_and_type() {
    assert_eq!(Value::Int(3).class().id(), builtins::integer().id());
    assert_eq!(Value::Null.class().id(), builtins::null().id());
    let array = Value::array(TypeDescriptor::integer(), vec![Value::Int(1)]);
    assert_eq!(
        array.runtime_type(),
        TypeDescriptor::array_of(TypeDescriptor::integer())
    );
    assert_eq!(array.type_name(), "Integer[]");
}

#[test]
fn test_satisfies() {
    let base = ClassBuilder::new("Base").build();
    let derived = ClassBuilder::new("Derived").extends(&base).build();
    let value = Value::Object(Object::new(&derived));
    assert!(value.satisfies(&TypeDescriptor::of(&base)));
    assert!(value.satisfies(&TypeDescriptor::object()));
    assert!(!Value::Object(Object::new(&base)).satisfies(&TypeDescriptor::of(&derived)));
    assert!(Value::Null.satisfies(&TypeDescriptor::string()));
    assert!(!Value::Int(1).satisfies(&TypeDescriptor::string()));
}

#[test]
fn test_inherited_slots_are_laid_out_first() {
    let base = ClassBuilder::new("Base")
        .field("id", builtins::integer())
        .build();
    let derived = ClassBuilder::new("Derived")
        .extends(&base)
        .field("name", builtins::string())
        .field_constructor(&["id", "name"])
        .build();
    assert_eq!(derived.slot_count(), 2);

    let ctor = &derived.constructors()[0];
    let value = ctor
        .invoke(
            &Value::Class(derived.clone()),
            &[Value::Int(7), Value::from("seven")],
        )
        .unwrap();
    let Value::Object(object) = value else {
        panic!("expected object");
    };
    assert_eq!(object.get("id"), Some(Value::Int(7)));
    assert_eq!(object.get("name"), Some(Value::from("seven")));
}
