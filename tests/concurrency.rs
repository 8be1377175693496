//! One compiled expression shared by many threads.

mod common;

use std::sync::Arc;

use brisk::{TypeEnvironmentConfig, Value, Variables};
use common::{engine, new_foo, new_person};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[test]
fn shared_expression_across_threads() {
    let expr = Arc::new(
        engine()
            .compile("n = name + '#' + k; n", &TypeEnvironmentConfig::new())
            .unwrap(),
    );
    let results = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for thread in 0..8 {
            let expr = expr.clone();
            let results = &results;
            scope.spawn(move || {
                for k in 0..100 {
                    let (root, expected) = if (thread + k) % 2 == 0 {
                        (Value::Object(new_person("Ada", 36)), format!("Ada#{k}"))
                    } else {
                        (Value::Object(new_foo()), format!("dog#{k}"))
                    };
                    let mut vars = Variables::new();
                    vars.insert("k".into(), Value::Int(k));
                    let value = expr.execute(&root, &mut vars).unwrap();
                    assert_eq!(value, Value::str(expected.as_str()));
                    assert_eq!(vars.get("n"), Some(&value));
                    results.lock().push(value);
                }
            });
        }
    });

    assert_eq!(results.lock().len(), 800);
}
