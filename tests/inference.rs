//! Analysis results: inputs, variables, inferred and egress types.

mod common;

use brisk::types::builtins;
use brisk::{CompileErrorKind, Error, TypeDescriptor, TypeEnvironmentConfig, Value, Variables};
use common::{FIXTURES, engine, new_person};
use pretty_assertions::assert_eq;

fn strong() -> TypeEnvironmentConfig {
    TypeEnvironmentConfig::new().strong_typing(true)
}

#[test]
fn declarations_and_inline_array() {
    let engine = engine();
    let source = "int x = 5; int y = 2; int[] pair = {x, y};";

    let env = engine.analyze(source, &TypeEnvironmentConfig::new()).unwrap();
    assert_eq!(env.inputs().len(), 0);
    assert_eq!(env.variable_type("x"), Some(&TypeDescriptor::integer()));
    assert_eq!(env.variable_type("y"), Some(&TypeDescriptor::integer()));

    let expr = engine.compile(source, &TypeEnvironmentConfig::new()).unwrap();
    let mut vars = Variables::new();
    let result = expr.execute(&Value::Null, &mut vars).unwrap();
    assert_eq!(
        result,
        Value::array(TypeDescriptor::integer(), vec![Value::Int(5), Value::Int(2)])
    );
    assert_eq!(vars.get("pair"), Some(&result));
}

#[test]
fn inputs_and_variables() {
    let env = engine()
        .analyze(
            "test != foo && bo.addSomething(trouble) && 1 + 2 / 3 == 1; String bleh = foo; twa = bleh;",
            &TypeEnvironmentConfig::new(),
        )
        .unwrap();

    let mut inputs: Vec<&str> = env.inputs().keys().map(|k| k.as_str()).collect();
    inputs.sort();
    assert_eq!(inputs, vec!["bo", "foo", "test", "trouble"]);

    let variables: Vec<&str> = env.variables().keys().map(|k| k.as_str()).collect();
    assert_eq!(variables, vec!["bleh", "twa"]);
    assert_eq!(env.variable_type("bleh"), Some(&TypeDescriptor::string()));
    assert_eq!(env.variable_type("twa"), Some(&TypeDescriptor::string()));
}

#[test]
fn index_keys_are_not_inputs() {
    let env = engine()
        .analyze("addresses['home'].street", &TypeEnvironmentConfig::new())
        .unwrap();
    assert!(env.inputs().contains_key("addresses"));
    assert!(!env.inputs().contains_key("home"));
    assert!(!env.inputs().contains_key("street"));
}

#[test]
fn provided_inputs_stay_inputs() {
    let config = TypeEnvironmentConfig::new().input("list", TypeDescriptor::of(builtins::list()));
    let env = engine()
        .analyze(
            "String nodeName = list[0]; nodeName = list[1]; nodeName",
            &config,
        )
        .unwrap();
    assert_eq!(env.inputs().len(), 1);
    assert_eq!(env.input_type("list"), Some(&TypeDescriptor::of(builtins::list())));
    assert_eq!(env.variables().len(), 1);
    assert_eq!(env.variable_type("nodeName"), Some(&TypeDescriptor::string()));
}

#[test]
fn generic_inference_through_collections() {
    let engine = engine();
    let config = strong().input("person", TypeDescriptor::of(&FIXTURES.person));

    let env = engine
        .analyze("$result = person.footributes[0].name", &config)
        .unwrap();
    assert_eq!(env.variable_type("$result"), Some(&TypeDescriptor::string()));

    let env = engine
        .analyze("$result = person.maptributes['fooey'].name", &config)
        .unwrap();
    assert_eq!(env.variable_type("$result"), Some(&TypeDescriptor::string()));

    let expr = engine
        .compile("$result = person.footributes[0].name", &config)
        .unwrap();
    let mut vars = Variables::new();
    vars.insert("person".into(), Value::Object(new_person("Ada", 36)));
    assert_eq!(expr.execute(&Value::Null, &mut vars).unwrap(), Value::str("dog"));
    assert_eq!(vars.get("$result"), Some(&Value::str("dog")));
}

#[test]
fn last_type_parameters() {
    let engine = engine();
    let expr = engine
        .compile(
            "java.util.HashMap<String, Long> totals = new HashMap(); totals",
            &TypeEnvironmentConfig::new(),
        )
        .unwrap();
    assert_eq!(
        expr.last_type_parameters(),
        &[TypeDescriptor::string(), TypeDescriptor::long()]
    );
}

#[test]
fn egress_types() {
    let engine = engine();
    let cases = [
        ("1 + 2", TypeDescriptor::integer()),
        ("1 + 2L", TypeDescriptor::long()),
        ("2 * 1.5", TypeDescriptor::double()),
        ("'total: ' + 3", TypeDescriptor::string()),
        ("if (true) { return 1; } 2", TypeDescriptor::integer()),
        ("new Person()", TypeDescriptor::of(&FIXTURES.person)),
        ("['a', 'b']", TypeDescriptor::list_of(TypeDescriptor::string())),
        ("unknown.member", TypeDescriptor::object()),
    ];
    for (source, expected) in cases {
        let expr = engine.compile(source, &TypeEnvironmentConfig::new()).unwrap();
        assert_eq!(expr.known_egress_type(), &expected, "{source}");
    }
}

#[test]
fn strong_typing_errors() {
    let engine = engine();
    let err = engine.compile("foo.bar", &strong()).unwrap_err();
    let Error::Compile(compile) = &err else {
        panic!("expected a compile error, got {err:?}");
    };
    assert_eq!(compile.subject(), Some("foo"));
    assert!(matches!(compile.kind, CompileErrorKind::UnresolvedSymbol { .. }));
    assert_eq!(err.diagnostics().len(), 1);

    let config = strong().input("p", TypeDescriptor::of(&FIXTURES.person));
    let err = engine.compile("p.salary", &config).unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(ref e) if matches!(e.kind, CompileErrorKind::UnresolvedMember { .. })
    ));

    let err = engine.compile("p.greet(1, 2)", &config).unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(ref e) if matches!(e.kind, CompileErrorKind::NoSuchMethod { .. })
    ));
}

#[test]
fn strict_enforcement_on_dynamic_receivers() {
    let engine = engine();
    let config = strong().input("anything", TypeDescriptor::object());
    assert!(engine.compile("anything.size()", &config).is_ok());

    let config = config.strict_type_enforcement(true);
    assert!(engine.compile("anything.size()", &config).is_err());
}

#[test]
fn verify_only() {
    let engine = engine();
    let config = TypeEnvironmentConfig::new().verify_only(true);
    assert!(matches!(engine.compile("a + b", &config), Err(Error::Api(_))));

    let env = engine.analyze("a + b", &TypeEnvironmentConfig::new()).unwrap();
    assert_eq!(env.inputs().len(), 2);
}

#[test]
fn imports() {
    let engine = engine();
    let env = engine
        .analyze(
            "import org.brisk.tests.Cheese; Cheese c = new Cheese(); c",
            &strong(),
        )
        .unwrap();
    assert!(env.import("Cheese").is_some());
    assert_eq!(env.variable_type("c"), Some(&TypeDescriptor::of(&FIXTURES.cheese)));

    let config = TypeEnvironmentConfig::new().import_class_as("Fromage", &FIXTURES.cheese);
    let expr = engine
        .compile("f = new Fromage(); f.type = 'brie'; f.type", &config)
        .unwrap();
    assert_eq!(
        expr.execute(&Value::Null, &mut Variables::new()).unwrap(),
        Value::str("brie")
    );
}
