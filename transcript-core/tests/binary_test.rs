// transcript-core - Binary unit format tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Save/load round-trips preserve semantics; malformed streams are
//! reported without touching interpreter state.

use std::rc::Rc;

use proptest::prelude::*;

use transcript_core::{Interpreter, LoadError, Payload, Unit};

fn compile(src: &str) -> Unit {
    let interp = Interpreter::new().unwrap();
    interp.compile(src, "test").unwrap()
}

#[test]
fn test_roundtrip_preserves_execution() {
    let src = "
        def fib(n)
            if n < 2 then
                return n;
            else
                return fib(n - 1) + fib(n - 2);
            end;
        end;
        def answer = fib(10);
        answer;
    ";
    let unit = compile(src);
    let bytes = unit.save();
    let loaded = Unit::load(&bytes).expect("load");

    let i1 = Interpreter::new().unwrap();
    let v1 = i1.exec(&Rc::new(unit)).unwrap();
    let i2 = Interpreter::new().unwrap();
    let v2 = i2.exec(&Rc::new(loaded)).unwrap();
    assert_eq!(v1.to_int().unwrap(), 55);
    assert_eq!(v2.to_int().unwrap(), 55);
    // global state matches as well
    assert_eq!(
        i1.get("answer").unwrap().to_int().unwrap(),
        i2.get("answer").unwrap().to_int().unwrap()
    );
}

#[test]
fn test_roundtrip_preserves_classes() {
    let src = "
        class Point()
            def x, y;
            def create(x, y) this.x = x; this.y = y; end;
            def sum() return this.x + this.y; end;
        end;
        Point(2, 3).sum();
    ";
    let unit = compile(src);
    let loaded = Unit::load(&unit.save()).expect("load");
    let interp = Interpreter::new().unwrap();
    let v = interp.exec(&Rc::new(loaded)).unwrap();
    assert_eq!(v.to_int().unwrap(), 5);
}

#[test]
fn test_roundtrip_preserves_tables() {
    let src = "def a = 1; def b = \"two\"; def c = 3.5;";
    let unit = compile(src);
    let loaded = Unit::load(&unit.save()).expect("load");
    assert_eq!(unit.global_names(), loaded.global_names());
    assert_eq!(unit.accessor_names(), loaded.accessor_names());
    assert_eq!(unit.block_count(), loaded.block_count());
    assert_eq!(unit.const_count(), loaded.const_count());
    for i in 0..unit.block_count() {
        assert_eq!(*unit.block(i).unwrap(), *loaded.block(i).unwrap());
    }
}

#[test]
fn test_not_a_unit_is_distinguished() {
    assert!(matches!(
        Unit::load(b"def x = 1;\n"),
        Err(LoadError::NotAUnit)
    ));
    assert!(matches!(Unit::load(b""), Err(LoadError::NotAUnit)));
}

#[test]
fn test_truncated_stream_is_rejected() {
    // past the header, every truncation point must read as damage rather
    // than as foreign data
    let bytes = compile("def x = 42;").save();
    for cut in [30, bytes.len() / 2, bytes.len() - 1] {
        match Unit::load(&bytes[..cut]) {
            Ok(_) => panic!("truncation at {cut} accepted"),
            Err(e) => assert_ne!(
                e,
                LoadError::NotAUnit,
                "truncation at {cut} misread as foreign data"
            ),
        }
    }
}

#[test]
fn test_load_does_not_require_linking() {
    // a freshly loaded unit is unlinked; execution after linking works,
    // and loading alone touches no interpreter state
    let unit = compile("def probe = 1;");
    let loaded = Unit::load(&unit.save()).unwrap();
    let interp = Interpreter::new().unwrap();
    assert!(!interp.defined("probe"));
    interp.exec(&Rc::new(loaded)).unwrap();
    assert!(interp.defined("probe"));
}

proptest! {
    // The constant pool survives a round trip for arbitrary payloads.
    #[test]
    fn prop_constant_pool_roundtrip(
        ints in proptest::collection::vec(any::<i64>(), 0..20),
        floats in proptest::collection::vec(any::<f64>(), 0..20),
        strings in proptest::collection::vec("[a-zA-Z0-9 _.]{0,24}", 0..20),
    ) {
        let unit = Unit::new();
        for i in &ints {
            unit.get_const(transcript_core::Value::int(*i));
        }
        for f in &floats {
            unit.get_const(transcript_core::Value::float(*f));
        }
        for s in &strings {
            unit.get_const(transcript_core::Value::str(s.clone()));
        }
        let loaded = Unit::load(&unit.save()).expect("roundtrip load");
        prop_assert_eq!(unit.const_count(), loaded.const_count());
        for i in 0..unit.const_count() {
            let a = unit.const_value(i).unwrap();
            let b = loaded.const_value(i).unwrap();
            let same = match (a.payload(), b.payload()) {
                (Payload::Int(x), Payload::Int(y)) => x == y,
                (Payload::Float(x), Payload::Float(y)) => x.to_bits() == y.to_bits(),
                (Payload::Str(x), Payload::Str(y)) => x == y,
                _ => a == b,
            };
            prop_assert!(same, "constant {} diverged", i);
        }
    }

    // Loading arbitrary bytes never panics: it loads or reports an error.
    #[test]
    fn prop_load_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = Unit::load(&bytes);
    }
}
