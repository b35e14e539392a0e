// transcript-core - Class and accessor tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Host-side class construction and the installation invariants: offsets
//! survive overriding, shadowing is rejected, private slots stay out of
//! accessor tables.

use transcript_core::classes::with_classes;
use transcript_core::primitives::{fslot, mslot, nat0, pslot};
use transcript_core::{Interpreter, SlotKind, Value, dispatch};

fn constant(n: i64) -> Value {
    nat0(move |_| Ok(Value::int(n)))
}

#[test]
fn test_host_class_extension() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", 0, vec![mslot("m", constant(1))])
        .unwrap();
    let inst = dispatch::class_new_instance(&a, &[]).unwrap();
    let m = interp.accessor("m");
    let v = dispatch::call_via_accessor(&inst, &m, &[]).unwrap();
    assert_eq!(v.to_int().unwrap(), 1);
}

#[test]
fn test_override_preserves_offset() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", 0, vec![mslot("m", constant(1))])
        .unwrap();
    let b = interp
        .extend_class(&a, "B", 0, vec![mslot("m", constant(2))])
        .unwrap();

    let a_slot = a.slot(0).unwrap();
    let b_slot = b.slot(0).unwrap();
    assert_eq!(a_slot.offset, b_slot.offset, "override keeps the offset");
    // the declaring class of the override is still the ancestor
    assert!(std::rc::Rc::ptr_eq(b_slot.owner.as_ref().unwrap(), &a));

    // callers compiled against A reach B's implementation on a B receiver,
    // while A's own table is untouched
    let bi = dispatch::class_new_instance(&b, &[]).unwrap();
    let v = dispatch::class_call_slot(&a, &bi, 0, &[]).unwrap();
    assert_eq!(v.to_int().unwrap(), 2);
    let ai = dispatch::class_new_instance(&a, &[]).unwrap();
    let v = dispatch::class_call_slot(&a, &ai, 0, &[]).unwrap();
    assert_eq!(v.to_int().unwrap(), 1);
}

#[test]
fn test_kind_mismatch_is_shadowing() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", 0, vec![mslot("m", constant(1))])
        .unwrap();
    let err = interp
        .extend_class(&a, "B", 0, vec![fslot("m", Value::nil())])
        .unwrap_err();
    assert!(err.to_string().contains("shadow"), "got: {err}");
}

#[test]
fn test_private_redefinition_is_shadowing() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", 0, vec![fslot("f", Value::nil())])
        .unwrap();
    let err = interp
        .extend_class(&a, "B", 0, vec![pslot("f", Value::nil())])
        .unwrap_err();
    assert!(err.to_string().contains("shadow"), "got: {err}");
}

#[test]
fn test_private_slots_not_in_accessor() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(
            &object,
            "A",
            0,
            vec![pslot("hidden", Value::int(1)), fslot("open", Value::int(2))],
        )
        .unwrap();
    let inst = dispatch::class_new_instance(&a, &[]).unwrap();

    let hidden = interp.accessor("hidden");
    assert!(hidden.lookup(&inst).is_none(), "private slot published");
    let open = interp.accessor("open");
    let e = open.lookup(&inst).expect("public slot missing");
    assert_eq!(e.kind, SlotKind::Field);

    // private slots remain reachable by slot index from the host
    let v = dispatch::class_get_slot(&a, &inst, 0).unwrap();
    assert_eq!(v.to_int().unwrap(), 1);
}

#[test]
fn test_accessor_miss_hits_failure_hook() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let inst = dispatch::class_new_instance(&object, &[]).unwrap();
    let a = interp.accessor("neverDeclared");
    assert!(a.lookup(&inst).is_none());
    let err = dispatch::object_get(&inst, Some(&a), None).unwrap_err();
    assert!(err.to_string().contains("neverDeclared"), "got: {err}");
}

#[test]
fn test_fields_get_template_defaults() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", 0, vec![fslot("x", Value::int(7))])
        .unwrap();
    let i1 = dispatch::class_new_instance(&a, &[]).unwrap();
    let i2 = dispatch::class_new_instance(&a, &[]).unwrap();
    dispatch::class_set_slot(&a, &i1, 0, Value::int(9)).unwrap();
    // instances do not share field storage
    assert_eq!(dispatch::class_get_slot(&a, &i2, 0).unwrap().to_int().unwrap(), 7);
}

#[test]
fn test_user_data_flag_propagates() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp
        .extend_class(&object, "A", transcript_core::USER_DATA, vec![])
        .unwrap();
    let b = interp.extend_class(&a, "B", 0, vec![]).unwrap();
    assert!(b.flags() & transcript_core::USER_DATA != 0);
    let inst = dispatch::class_new_instance(&b, &[]).unwrap();
    inst.set_user_data(std::rc::Rc::new(42i64)).unwrap();
    let d = inst.user_data().unwrap().downcast::<i64>().unwrap();
    assert_eq!(*d, 42);
}

#[test]
fn test_primitive_class_rejects_instantiation() {
    let interp = Interpreter::new().unwrap();
    let string = with_classes(|c| c.string.clone());
    let err = dispatch::class_new_instance(&string, &[]).unwrap_err();
    assert!(err.to_string().contains("primitive"), "got: {err}");
    drop(interp);
}

#[test]
fn test_instance_of_walks_ancestry() {
    let interp = Interpreter::new().unwrap();
    let object = with_classes(|c| c.object.clone());
    let a = interp.extend_class(&object, "A", 0, vec![]).unwrap();
    let b = interp.extend_class(&a, "B", 0, vec![]).unwrap();
    let inst = dispatch::class_new_instance(&b, &[]).unwrap();
    assert!(inst.is_instance_of(&b));
    assert!(inst.is_instance_of(&a));
    assert!(inst.is_instance_of(&object));
    assert!(!dispatch::class_new_instance(&a, &[])
        .unwrap()
        .is_instance_of(&b));
}
