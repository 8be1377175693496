//! Accessor strategies are interchangeable: only binding kinds differ.

mod common;

use brisk::{
    AccessorKind, AccessorStrategy, Error, TypeEnvironmentConfig, Value, Variables,
    get_default_accessor_strategy, set_default_accessor_strategy,
};
use common::{engine, new_foo, new_person};
use pretty_assertions::assert_eq;

fn receivers() -> Vec<Value> {
    vec![
        Value::Object(new_person("Ada", 36)),
        Value::Object(new_foo()),
        Value::map([
            (Value::str("name"), Value::str("map")),
            (Value::str("age"), Value::Int(3)),
        ]),
        Value::Object(new_person("Grace", 85)),
    ]
}

#[test]
fn results_do_not_depend_on_strategy() {
    let engine = engine();
    let source = "name + '/' + (this.age == null ? 'n/a' : age)";
    let compile = |strategy| {
        engine
            .compile(source, &TypeEnvironmentConfig::new().accessor_strategy(strategy))
            .unwrap()
    };
    let specialized = compile(AccessorStrategy::Specialized);
    let universal = compile(AccessorStrategy::Universal);

    for root in receivers() {
        let a = specialized.execute(&root, &mut Variables::new());
        let b = universal.execute(&root, &mut Variables::new());
        match (a, b) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{root:?}"),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string(), "{root:?}"),
            (a, b) => panic!("strategies disagree on {root:?}: {a:?} vs {b:?}"),
        }
    }
}

#[test]
fn configured_strategy_selects_binding_kind() {
    let engine = engine();
    let root = Value::Object(new_person("Ada", 36));
    for (strategy, kind) in [
        (AccessorStrategy::Specialized, AccessorKind::Slot),
        (AccessorStrategy::Universal, AccessorKind::Universal),
    ] {
        let expr = engine
            .compile("name", &TypeEnvironmentConfig::new().accessor_strategy(strategy))
            .unwrap();
        assert_eq!(expr.execute(&root, &mut Variables::new()).unwrap(), Value::str("Ada"));
        let [site] = expr.call_sites() else {
            panic!("expected one call site");
        };
        assert_eq!(site.strategy(), Some(strategy));
        assert_eq!(site.binding().map(|(_, kind)| kind), Some(kind));
    }
}

#[test]
fn global_default() {
    let previous = get_default_accessor_strategy();
    let engine = engine();
    let root = Value::Object(new_person("Ada", 36));

    set_default_accessor_strategy("reflective").unwrap();
    let early = engine.compile("name", &TypeEnvironmentConfig::new()).unwrap();
    early.execute(&root, &mut Variables::new()).unwrap();

    set_default_accessor_strategy("ASM").unwrap();
    let late = engine.compile("name", &TypeEnvironmentConfig::new()).unwrap();
    late.execute(&root, &mut Variables::new()).unwrap();
    early.execute(&root, &mut Variables::new()).unwrap();

    assert_eq!(early.call_sites()[0].strategy(), Some(AccessorStrategy::Universal));
    assert_eq!(late.call_sites()[0].strategy(), Some(AccessorStrategy::Specialized));

    assert!(matches!(set_default_accessor_strategy("jit"), Err(Error::Api(_))));
    assert_eq!(get_default_accessor_strategy(), AccessorStrategy::Specialized);

    set_default_accessor_strategy(previous.name()).unwrap();
}
