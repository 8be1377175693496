//! Tests for call-site accessor binding.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::evaluator::RuntimeError;
use crate::types::{Class, ClassBuilder, TypeDescriptor, TypeRef, builtins};
use crate::values::{Object, Value};

fn account() -> Arc<Class> {
    ClassBuilder::new("Account")
        .field("owner", builtins::string())
        .field_with_default("balance", builtins::integer(), Value::Int(0))
        .method("deposit", vec![TypeRef::of(builtins::integer())], builtins::integer(), |this, args| {
            let Value::Object(object) = this else {
                return Ok(Value::Null);
            };
            let balance = object.get("balance").and_then(|v| v.as_i64()).unwrap_or(0);
            let amount = args[0].as_i64().unwrap_or(0);
            let total = Value::Int((balance + amount) as i32);
            object.set("balance", total.clone());
            Ok(total)
        })
        .build()
}

/// Same shape as `account`, unrelated class.
fn wallet() -> Arc<Class> {
    ClassBuilder::new("Wallet")
        .field_with_default("balance", builtins::integer(), Value::Int(0))
        .field("owner", builtins::string())
        .method("getLabel", vec![], builtins::string(), |_, _| Ok(Value::str("wallet")))
        .build()
}

fn formatter() -> Arc<Class> {
    ClassBuilder::new("Formatter")
        .method("format", vec![TypeRef::of(builtins::integer())], builtins::string(), |_, _| {
            Ok(Value::str("int"))
        })
        .method("format", vec![TypeRef::of(builtins::string())], builtins::string(), |_, _| {
            Ok(Value::str("string"))
        })
        .build()
}

fn account_of(class: &Arc<Class>, owner: &str, balance: i32) -> Value {
    Value::Object(
        Object::new(class)
            .with("owner", owner)
            .with("balance", balance),
    )
}

fn property(name: &str, strategy: AccessorStrategy) -> CallSite {
    CallSite::new(Member::Property(name.into()), Some(strategy))
}

#[test]
fn test_specialized_binding() {
    let account = account();
    let site = property("owner", AccessorStrategy::Specialized);
    assert_eq!(site.binding(), None);
    assert_eq!(site.strategy(), None);

    let value = site.get(&account_of(&account, "ada", 5)).unwrap();
    assert_eq!(value, Value::str("ada"));
    assert_eq!(site.binding(), Some((account.id(), AccessorKind::Slot)));
    assert_eq!(site.strategy(), Some(AccessorStrategy::Specialized));
}

#[test]
fn test_universal_binding() {
    let account = account();
    let site = property("owner", AccessorStrategy::Universal);
    assert_eq!(site.get(&account_of(&account, "ada", 5)).unwrap(), Value::str("ada"));
    assert_eq!(site.binding(), Some((account.id(), AccessorKind::Universal)));
}

#[test]
fn test_rebinding_on_new_receiver_class() {
    crate::test_utils::init_test_logging();
    let account = account();
    let wallet = wallet();
    let site = property("balance", AccessorStrategy::Specialized);

    assert_eq!(site.get(&account_of(&account, "a", 1)).unwrap(), Value::Int(1));
    assert_eq!(site.binding().map(|(class, _)| class), Some(account.id()));

    // Same member name, different class and slot layout.
    assert_eq!(site.get(&account_of(&wallet, "w", 2)).unwrap(), Value::Int(2));
    assert_eq!(site.binding().map(|(class, _)| class), Some(wallet.id()));

    assert_eq!(site.get(&account_of(&account, "a", 3)).unwrap(), Value::Int(3));
    assert_eq!(site.binding().map(|(class, _)| class), Some(account.id()));
}

#[test]
fn test_strategies_agree() {
    let account = account();
    let wallet = wallet();
    let receivers = [
        account_of(&account, "a", 1),
        account_of(&wallet, "w", 2),
        account_of(&account, "b", 3),
        Value::map([(Value::str("owner"), Value::str("m"))]),
    ];
    let specialized = property("owner", AccessorStrategy::Specialized);
    let universal = property("owner", AccessorStrategy::Universal);
    for receiver in &receivers {
        assert_eq!(
            specialized.get(receiver).unwrap(),
            universal.get(receiver).unwrap(),
            "receiver {receiver:?}"
        );
    }
}

#[test]
fn test_getter_method_as_property() {
    let wallet = wallet();
    let site = property("label", AccessorStrategy::Specialized);
    let value = site.get(&account_of(&wallet, "w", 0)).unwrap();
    assert_eq!(value, Value::str("wallet"));
    assert_eq!(site.binding(), Some((wallet.id(), AccessorKind::GetterMethod)));
}

#[test]
fn test_map_key_binding() {
    let site = property("city", AccessorStrategy::Specialized);
    let map = Value::map([(Value::str("city"), Value::str("Lisbon"))]);
    assert_eq!(site.get(&map).unwrap(), Value::str("Lisbon"));
    assert_eq!(site.binding().map(|(_, kind)| kind), Some(AccessorKind::MapKey));

    site.set(&map, Value::str("Porto")).unwrap();
    assert_eq!(site.get(&map).unwrap(), Value::str("Porto"));

    let other = Value::map([(Value::str("zip"), Value::str("1000"))]);
    assert_eq!(site.get(&other).unwrap(), Value::Null);
}

#[test]
fn test_store_converts_to_declared_type() {
    let account = account();
    let receiver = account_of(&account, "a", 0);
    for strategy in [AccessorStrategy::Specialized, AccessorStrategy::Universal] {
        let site = property("balance", strategy);
        site.set(&receiver, Value::str("42")).unwrap();
        assert_eq!(site.get(&receiver).unwrap(), Value::Int(42));

        let err = site.set(&receiver, Value::str("lots")).unwrap_err();
        assert!(matches!(err, RuntimeError::Conversion(_)), "{strategy}: {err}");
    }
}

#[test]
fn test_method_binding() {
    let account = account();
    let receiver = account_of(&account, "a", 10);
    let site = CallSite::new(
        Member::Method {
            name: "deposit".into(),
            arity: 1,
        },
        Some(AccessorStrategy::Specialized),
    );
    assert_eq!(site.invoke(&receiver, vec![Value::Int(5)]).unwrap(), Value::Int(15));
    assert_eq!(site.binding(), Some((account.id(), AccessorKind::Method)));

    // Arguments that do not fit the bound signature go through conversion.
    assert_eq!(site.invoke(&receiver, vec![Value::str("5")]).unwrap(), Value::Int(20));
}

#[test]
fn test_overloads_fall_back_to_universal() {
    let formatter = formatter();
    let receiver = Value::Object(Object::new(&formatter));
    let site = CallSite::new(
        Member::Method {
            name: "format".into(),
            arity: 1,
        },
        Some(AccessorStrategy::Specialized),
    );
    assert_eq!(site.invoke(&receiver, vec![Value::Int(1)]).unwrap(), Value::str("int"));
    assert_eq!(site.binding(), Some((formatter.id(), AccessorKind::Universal)));
    // The strategy stays specialized; only this binding fell back.
    assert_eq!(site.strategy(), Some(AccessorStrategy::Specialized));

    assert_eq!(site.invoke(&receiver, vec![Value::str("x")]).unwrap(), Value::str("string"));
}

#[test]
fn test_missing_member_falls_back() {
    let account = account();
    let site = property("nickname", AccessorStrategy::Specialized);
    let err = site.get(&account_of(&account, "a", 0)).unwrap_err();
    assert!(matches!(err, RuntimeError::NoSuchMember { .. }));
    assert_eq!(site.binding(), Some((account.id(), AccessorKind::Universal)));
}

#[test]
fn test_index_binding() {
    let site = CallSite::new(Member::Index, Some(AccessorStrategy::Specialized));
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(site.get_index(&list, &Value::Int(1)).unwrap(), Value::Int(2));
    assert_eq!(site.binding().map(|(_, kind)| kind), Some(AccessorKind::ListIndex));

    site.set_index(&list, Value::Int(0), Value::str("a")).unwrap();
    assert_eq!(site.get_index(&list, &Value::Int(0)).unwrap(), Value::str("a"));
    assert!(matches!(
        site.get_index(&list, &Value::Int(5)),
        Err(RuntimeError::IndexOutOfBounds { index: 5, len: 2 })
    ));

    let array = Value::array(TypeDescriptor::integer(), vec![Value::Int(7)]);
    assert_eq!(site.get_index(&array, &Value::Long(0)).unwrap(), Value::Int(7));
    assert_eq!(site.binding().map(|(_, kind)| kind), Some(AccessorKind::ArrayIndex));

    let text = Value::str("abc");
    assert!(matches!(
        site.get_index(&text, &Value::Int(0)),
        Err(RuntimeError::NotIndexable { .. })
    ));
}

#[test]
fn test_null_receiver() {
    let site = property("owner", AccessorStrategy::Specialized);
    assert!(matches!(
        site.get(&Value::Null),
        Err(RuntimeError::NullReceiver { .. })
    ));
    assert_eq!(site.binding(), None);
}

#[test]
fn test_static_members_are_not_cached() {
    let config = ClassBuilder::new("Limits")
        .static_field("MAX", TypeDescriptor::integer(), Value::Int(99))
        .build();
    let site = property("MAX", AccessorStrategy::Specialized);
    assert_eq!(site.get(&Value::Class(config)).unwrap(), Value::Int(99));
    assert_eq!(site.binding(), None);
}

#[test]
fn test_strategy_names() {
    assert_eq!("universal".parse::<AccessorStrategy>().unwrap(), AccessorStrategy::Universal);
    assert_eq!("Reflective".parse::<AccessorStrategy>().unwrap(), AccessorStrategy::Universal);
    assert_eq!(" ASM ".parse::<AccessorStrategy>().unwrap(), AccessorStrategy::Specialized);
    assert_eq!(AccessorStrategy::Specialized.to_string(), "specialized");
    assert!(matches!(
        "jit".parse::<AccessorStrategy>(),
        Err(crate::api::Error::Api(_))
    ));
}

#[test]
fn test_default_strategy_pins_on_first_resolution() {
    let account = account();
    let receiver = account_of(&account, "a", 0);
    let previous = get_default_accessor_strategy();

    set_default_accessor_strategy("universal").unwrap();
    let resolved = CallSite::new(Member::Property("owner".into()), None);
    resolved.get(&receiver).unwrap();
    let pending = CallSite::new(Member::Property("owner".into()), None);

    set_default_accessor_strategy("specialized").unwrap();
    assert_eq!(get_default_accessor_strategy(), AccessorStrategy::Specialized);

    // Already resolved: keeps its strategy, even after a cache miss.
    resolved
        .get(&Value::map([(Value::str("owner"), Value::str("m"))]))
        .unwrap();
    assert_eq!(resolved.strategy(), Some(AccessorStrategy::Universal));
    assert_eq!(resolved.binding().map(|(_, kind)| kind), Some(AccessorKind::Universal));

    pending.get(&receiver).unwrap();
    assert_eq!(pending.strategy(), Some(AccessorStrategy::Specialized));
    assert_eq!(pending.binding(), Some((account.id(), AccessorKind::Slot)));

    assert!(set_default_accessor_strategy("bytecode").is_err());
    assert_eq!(get_default_accessor_strategy(), AccessorStrategy::Specialized);

    set_default_accessor_strategy(previous.name()).unwrap();
}

#[test]
fn test_concurrent_resolution() {
    let account = account();
    let wallet = wallet();
    let site = Arc::new(property("balance", AccessorStrategy::Specialized));

    std::thread::scope(|scope| {
        for thread in 0..8 {
            let site = site.clone();
            let class = if thread % 2 == 0 { &account } else { &wallet };
            scope.spawn(move || {
                for n in 0..200 {
                    let receiver = account_of(class, "x", n);
                    assert_eq!(site.get(&receiver).unwrap(), Value::Int(n));
                }
            });
        }
    });
    assert!(site.binding().is_some());
}
