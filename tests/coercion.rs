//! Host-registered conversion handlers take part in typed assignments.

use std::sync::{Arc, Once};

use brisk::coercion::{self, ConversionError, ConversionHandler};
use brisk::types::{ClassBuilder, builtins};
use brisk::values::Object;
use brisk::{Class, Engine, EngineOptions, Error, TypeDescriptor, TypeEnvironmentConfig, Value, Variables};
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;

static DAY: Lazy<Arc<Class>> = Lazy::new(|| {
    ClassBuilder::new("Day")
        .package("org.brisk.tests")
        .field("year", builtins::integer())
        .field("month", builtins::integer())
        .field("day", builtins::integer())
        .build()
});

static TICKET: Lazy<Arc<Class>> = Lazy::new(|| {
    ClassBuilder::new("Ticket")
        .package("org.brisk.tests")
        .field("holder", builtins::string())
        .field("validUntil", &*DAY)
        .field_constructor(&[])
        .build()
});

/// Parses `yyyy-mm-dd` strings.
struct DayHandler;

impl ConversionHandler for DayHandler {
    fn can_convert_from(&self, source: &Class) -> bool {
        source.id() == builtins::string().id()
    }

    fn convert_from(&self, value: &Value) -> Result<Value, ConversionError> {
        let text = value.as_str().unwrap_or_default();
        let parts: Vec<i32> = text
            .split('-')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| ConversionError::new(value, "Day").with_detail("expected yyyy-mm-dd"))?;
        let [year, month, day] = parts[..] else {
            return Err(ConversionError::new(value, "Day").with_detail("expected yyyy-mm-dd"));
        };
        Ok(Value::Object(
            Object::new(&DAY)
                .with("year", year)
                .with("month", month)
                .with("day", day),
        ))
    }
}

fn engine() -> Engine {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        coercion::registry().register_handler(&DAY, Arc::new(DayHandler));
    });
    Engine::new(EngineOptions::default(), |env| {
        env.register_class(DAY.clone()).register_class(TICKET.clone());
    })
}

#[test]
fn handler_applies_in_strict_mode() {
    let config = TypeEnvironmentConfig::new()
        .strong_typing(true)
        .strict_type_enforcement(true);
    let expr = engine()
        .compile(
            "t = new Ticket(); t.validUntil = '1974-07-10'; t.validUntil.month",
            &config,
        )
        .unwrap();
    assert_eq!(expr.known_egress_type(), &TypeDescriptor::integer());

    let mut vars = Variables::new();
    assert_eq!(expr.execute(&Value::Null, &mut vars).unwrap(), Value::Int(7));
    let Some(Value::Object(ticket)) = vars.get("t") else {
        panic!("ticket not written back");
    };
    let Some(Value::Object(day)) = ticket.get("validUntil") else {
        panic!("validUntil not converted");
    };
    assert_eq!(day.class().id(), DAY.id());
    assert_eq!(day.get("year"), Some(Value::Int(1974)));
}

#[test]
fn handler_errors_surface_as_conversion_errors() {
    let expr = engine()
        .compile(
            "t = new Ticket(); t.validUntil = when",
            &TypeEnvironmentConfig::new(),
        )
        .unwrap();
    let mut vars = Variables::new();
    vars.insert("when".into(), Value::str("next tuesday"));
    let err = expr.execute(&Value::Null, &mut vars).unwrap_err();
    let Error::Conversion(err) = err else {
        panic!("expected a conversion error, got {err:?}");
    };
    assert_eq!(err.to.as_str(), "Day");
    assert_eq!(err.detail.as_deref(), Some("expected yyyy-mm-dd"));
}

#[test]
fn unregistered_pairs_are_rejected_statically() {
    let config = TypeEnvironmentConfig::new().strong_typing(true);
    let err = engine()
        .compile("t = new Ticket(); t.validUntil = 19740710", &config)
        .unwrap_err();
    assert!(matches!(err, Error::Compile(_)), "{err:?}");
}

#[test]
fn explicit_convert_uses_handler() {
    let expr = engine()
        .compile("convert('2001-02-03', Day).day", &TypeEnvironmentConfig::new())
        .unwrap();
    assert_eq!(
        expr.execute(&Value::Null, &mut Variables::new()).unwrap(),
        Value::Int(3)
    );
}
