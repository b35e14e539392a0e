// transcript-embed - Embedding API tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use transcript_embed::{Engine, Error, Value};

#[test]
fn test_eval_returns_last_value() {
    let engine = Engine::new().unwrap();
    let v = engine.eval("def x = 40; x + 2;").unwrap();
    assert_eq!(v.to_int().unwrap(), 42);
}

#[test]
fn test_get_and_get_as() {
    let engine = Engine::new().unwrap();
    engine.eval("def n = 7; def s = \"hi\";").unwrap();
    assert_eq!(engine.get_as::<i64>("n"), Some(7));
    assert_eq!(engine.get_as::<String>("s"), Some("hi".to_string()));
    assert_eq!(engine.get("missing"), None);
    assert_eq!(engine.get_as::<i64>("s"), None);
}

#[test]
fn test_set_from_rust() {
    let engine = Engine::new().unwrap();
    engine.set("speed", 88i64);
    engine.set("label", "flux");
    assert_eq!(engine.eval("speed + 1").unwrap().to_int().unwrap(), 89);
    assert_eq!(engine.eval("label + \"!\"").unwrap().to_str().unwrap(), "flux!");
}

#[test]
fn test_register_native() {
    let engine = Engine::new().unwrap();
    engine.register_native("double", |args| {
        let n = args
            .first()
            .ok_or(Error::ArityError(0))?
            .to_int()?;
        Ok(Value::int(n * 2))
    });
    assert_eq!(engine.eval("double(21)").unwrap().to_int().unwrap(), 42);
}

#[test]
fn test_call_defined_function() {
    let engine = Engine::new().unwrap();
    engine.eval("def add(a, b) return a + b; end;").unwrap();
    let v = engine
        .call("add", &[Value::int(2), Value::int(3)])
        .unwrap();
    assert_eq!(v.to_int().unwrap(), 5);
}

#[test]
fn test_vector_conversion() {
    let engine = Engine::new().unwrap();
    engine.set("items", vec![1i64, 2, 3]);
    assert_eq!(engine.eval("items.size").unwrap().to_int().unwrap(), 3);
    engine.eval("def doubled = [items[0] * 2, items[1] * 2];").unwrap();
    assert_eq!(engine.get_as::<Vec<i64>>("doubled"), Some(vec![2, 4]));
}

#[test]
fn test_errors_surface() {
    let engine = Engine::new().unwrap();
    assert!(engine.eval("1 +").is_err());
    assert!(engine.eval("undefinedName").is_err());
    assert!(engine.call("missingFn", &[]).is_err());
}

#[test]
fn test_thrown_values_surface_as_errors() {
    let engine = Engine::new().unwrap();
    let e = engine.eval("throw(\"boom\")").unwrap_err();
    assert!(e.to_string().contains("boom"), "got: {e}");
}

#[test]
fn test_import_through_engine() {
    let engine = Engine::new().unwrap();
    let pkg = engine.import("math").unwrap();
    assert!(!pkg.is_nil());
    assert_eq!(
        engine
            .eval("import math; math.floor(3.7)")
            .unwrap()
            .to_float()
            .unwrap(),
        3.0
    );
}
