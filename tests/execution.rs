//! End-to-end evaluation against host objects and functions.

mod common;

use brisk::{
    Error, ExecutionOptions, ResourceExceededError, RuntimeError, TypeDescriptor,
    TypeEnvironmentConfig, Value, Variables,
};
use common::{FIXTURES, engine, new_foo, new_person};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn eval(source: &str, root: &Value, vars: &mut Variables) -> Result<Value, Error> {
    engine()
        .compile(source, &TypeEnvironmentConfig::new())?
        .execute(root, vars)
}

#[test]
fn map_lookup_against_binding() {
    let mut vars = Variables::new();
    vars.insert(
        "map".into(),
        Value::map([
            (Value::str("KEY1"), Value::str("hello")),
            (Value::str("KEY2"), Value::str("world")),
        ]),
    );
    vars.insert("$msg".into(), Value::str("hello"));
    assert_eq!(
        eval("map['KEY1'] == $msg", &Value::Null, &mut vars).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval("map['KEY2'] == $msg", &Value::Null, &mut vars).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn root_object_members() {
    let root = Value::Object(new_foo());
    let mut vars = Variables::new();
    assert_eq!(
        eval("name + ':' + countTest", &root, &mut vars).unwrap(),
        Value::str("dog:12")
    );
    assert_eq!(
        eval("bar.woof && bar.testList[0] == -1", &root, &mut vars).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval("this.getCountTest() * 2", &root, &mut vars).unwrap(),
        Value::Int(24)
    );
}

#[test]
fn host_functions() {
    let mut vars = Variables::new();
    vars.insert("a".into(), Value::Int(3));
    assert_eq!(
        eval("max(a, 9) + max(a, -1)", &Value::Null, &mut vars).unwrap(),
        Value::Int(12)
    );
    assert_eq!(
        eval("max('4', a)", &Value::Null, &mut vars).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn constructors_and_methods() {
    let mut vars = Variables::new();
    assert_eq!(
        eval("new Person('Ada', 36).age + 1", &Value::Null, &mut vars).unwrap(),
        Value::Int(37)
    );
    assert_eq!(
        eval("p = new Person('Ada', 36); p.greet('Hello')", &Value::Null, &mut vars).unwrap(),
        Value::str("Hello, Ada")
    );
    let Some(Value::Object(person)) = vars.get("p") else {
        panic!("expected p to be written back, got {:?}", vars.get("p"));
    };
    assert_eq!(person.class().id(), FIXTURES.person.id());
    assert_eq!(
        eval("new Person().age", &Value::Null, &mut vars).unwrap(),
        Value::Int(0)
    );
}

#[test]
fn statement_sequences() {
    let source = indoc! {"
        total = 0;
        for (foo : person.footributes) {
            total += foo.countTest;
        }
        int i = 0;
        while (i < 3) { i++; }
        if (total > 10) {
            return total + i;
        }
        -1
    "};
    let mut vars = Variables::new();
    vars.insert("person".into(), Value::Object(new_person("Ada", 36)));
    assert_eq!(eval(source, &Value::Null, &mut vars).unwrap(), Value::Int(15));
    assert_eq!(vars.get("total"), Some(&Value::Int(12)));
    assert_eq!(vars.get("i"), Some(&Value::Int(3)));
}

#[test]
fn explicit_conversion() {
    let mut vars = Variables::new();
    assert_eq!(
        eval("convert('42', Integer) + 1", &Value::Null, &mut vars).unwrap(),
        Value::Int(43)
    );
    let err = eval("convert('many', Integer)", &Value::Null, &mut vars).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)), "{err:?}");
}

#[test]
fn typed_results() {
    let engine = engine();
    let config = TypeEnvironmentConfig::new()
        .strong_typing(true)
        .input("foo", TypeDescriptor::of(&FIXTURES.foo));
    let expr = engine.compile("foo.bar.woof == 'true'", &config).unwrap();
    assert_eq!(expr.known_egress_type(), &TypeDescriptor::boolean());

    let mut vars = Variables::new();
    vars.insert("foo".into(), Value::Object(new_foo()));
    assert_eq!(expr.execute(&Value::Null, &mut vars).unwrap(), Value::Bool(true));
}

#[test]
fn runtime_failures() {
    let mut vars = Variables::new();
    vars.insert("person".into(), Value::Object(new_person("Ada", 36)));
    assert!(matches!(
        eval("person.footributes[3]", &Value::Null, &mut vars),
        Err(Error::Runtime(RuntimeError::IndexOutOfBounds { index: 3, len: 1 }))
    ));
    assert!(matches!(
        eval("person.nickname", &Value::Null, &mut vars),
        Err(Error::Runtime(RuntimeError::NoSuchMember { .. }))
    ));
    assert!(matches!(
        eval("missing.name", &Value::Null, &mut vars),
        Err(Error::Runtime(RuntimeError::UnboundInput { .. }))
    ));
}

#[test]
fn execution_limits() {
    let expr = engine()
        .compile("while (true) { 1 }", &TypeEnvironmentConfig::new())
        .unwrap();
    let options = ExecutionOptions {
        max_iterations: Some(50),
        ..ExecutionOptions::default()
    };
    let err = expr
        .execute_with(&Value::Null, &mut Variables::new(), &options)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ResourceExceeded(ResourceExceededError::IterationLimit { max: 50 })
    ));
}
