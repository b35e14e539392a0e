// transcript-core - Root classes for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Slots of the root classes: Object, Class, Function, Accessor, the
//! booleans, and Nil.
//!
//! The order of the first ten Object slots is load-bearing: the `OBJ_*`
//! constants index them directly.

use crate::class::{Slot, SlotKind};
use crate::dispatch;
use crate::error::{Error, Result};
use crate::primitives::{OBJ_CREATE, OBJ_EQ, fslot, mslot, nat0, nat1, nat2, natv, prop_slot};
use crate::value::{Payload, Value};

pub fn object_slots() -> Vec<Slot> {
    vec![
        mslot(
            "__new__",
            natv(|o, args| {
                dispatch::call_slot_on_object_class(o, OBJ_CREATE, args)?;
                Ok(o.clone())
            }),
        ),
        mslot("create", nat0(|_| Ok(Value::nil()))),
        mslot("__eq__", nat1(|o, x| Ok(Value::bool_of(o == x)))),
        mslot("__call__", natv(|o, _| Err(Error::wrong_type(o)))),
        mslot(
            "__getFailed__",
            nat1(|o, a| {
                Err(Error::UndefinedSlot {
                    class: o.class_name(),
                    name: a.to_accessor()?.name().to_string(),
                })
            }),
        ),
        mslot(
            "__setFailed__",
            nat2(|o, a, _x| {
                Err(Error::UndefinedSlot {
                    class: o.class_name(),
                    name: a.to_accessor()?.name().to_string(),
                })
            }),
        ),
        mslot(
            "__callFailed__",
            natv(|o, args| {
                let a = args.first().ok_or_else(|| Error::arity(args.len()))?;
                Err(Error::UndefinedSlot {
                    class: o.class_name(),
                    name: a.to_accessor()?.name().to_string(),
                })
            }),
        ),
        mslot(
            "toString",
            nat0(|o| Ok(Value::str(format!("#<{}>", o.class_name())))),
        ),
        mslot(
            "equals",
            nat1(|o, x| dispatch::call_slot_on_object_class(o, OBJ_EQ, &[x.clone()])),
        ),
        mslot("__key__", nat0(|o| Ok(o.clone()))),
        mslot(
            "copy",
            nat0(|o| Ok(Value::raw(o.class(), Payload::None, o.fields().clone()))),
        ),
        mslot(
            "apply",
            nat1(|o, args| {
                let args = args.to_array()?.clone();
                dispatch::call_value(o, &args)
            }),
        ),
        mslot(
            "is",
            nat1(|o, d| Ok(Value::bool_of(o.is_instance_of(&*d.to_class()?)))),
        ),
        mslot(
            "__neq__",
            nat1(|o, x| {
                let eq = dispatch::call_slot_on_object_class(o, OBJ_EQ, &[x.clone()])?;
                Ok(Value::bool_of(eq.is_false()))
            }),
        ),
        mslot("__inv__", nat0(|_| Ok(Value::bool_of(false)))),
        mslot(
            "slotNames",
            natv(|o, args| {
                let (hook, deep) = parse_names_flags(args)?;
                let names = class_names(&o.class(), hook, deep);
                Ok(Value::array(names.into_iter().map(Value::str).collect()))
            }),
        ),
    ]
}

pub fn function_slots() -> Vec<Slot> {
    vec![
        fslot("help", Value::bool_of(false)),
        mslot("copy", nat0(|o| Ok(o.clone()))),
        mslot("__call__", natv(|o, args| dispatch::call_value(o, args))),
    ]
}

pub fn class_slots() -> Vec<Slot> {
    vec![
        fslot("help", Value::bool_of(false)),
        mslot(
            "__call__",
            natv(|o, args| dispatch::class_new_instance(&o.to_class()?, args)),
        ),
        mslot("copy", nat0(|o| Ok(o.clone()))),
        prop_slot(
            "name",
            nat0(|o| Ok(Value::str(o.to_class()?.name()))),
            Value::nil(),
        ),
        prop_slot(
            "ancestor",
            nat0(|o| match o.to_class()?.ancestor() {
                Some(a) => Ok(a.object()),
                None => Ok(Value::nil()),
            }),
            Value::nil(),
        ),
        mslot(
            "instanceSlots",
            natv(|o, args| {
                let (hook, deep) = parse_names_flags(args)?;
                let names = class_names(&o.to_class()?, hook, deep);
                Ok(Value::array(names.into_iter().map(Value::str).collect()))
            }),
        ),
        mslot(
            "info",
            nat0(|o| {
                let c = o.to_class()?;
                println!("{}", c.name());
                println!("-----");
                for i in 0..c.slot_count() {
                    let e = c.slot(i).expect("slot in range");
                    let mut nm = e.name.clone();
                    if let Some(owner) = &e.owner {
                        if !std::ptr::eq(&**owner, &*c) {
                            nm = format!("{}.{}", owner.name(), nm);
                        }
                    }
                    match e.kind {
                        SlotKind::Method => println!("{} {} {}()", i, e.offset, nm),
                        SlotKind::Field => {
                            println!("{} {} {} {}", i, e.offset, nm, e.value.describe())
                        }
                        SlotKind::Property => println!("{} {} {}", i, e.offset, nm),
                        SlotKind::Marker => println!("{} --> {} {}", i, e.next, nm),
                    }
                }
                Ok(Value::nil())
            }),
        ),
    ]
}

pub fn accessor_slots() -> Vec<Slot> {
    vec![
        mslot("copy", nat0(|o| Ok(o.clone()))),
        prop_slot(
            "name",
            nat0(|a| Ok(Value::str(a.to_accessor()?.name().to_string()))),
            Value::nil(),
        ),
        mslot(
            "on",
            nat1(|a, o| Ok(Value::bool_of(a.to_accessor()?.lookup(o).is_some()))),
        ),
        mslot(
            "property",
            nat1(|a, o| match a.to_accessor()?.lookup(o) {
                None => Ok(Value::bool_of(false)),
                Some(e) => Ok(Value::bool_of(matches!(
                    e.kind,
                    SlotKind::Field | SlotKind::Property
                ))),
            }),
        ),
        mslot(
            "method",
            nat1(|a, o| match a.to_accessor()?.lookup(o) {
                None => Ok(Value::bool_of(false)),
                Some(e) => Ok(Value::bool_of(e.kind == SlotKind::Method)),
            }),
        ),
        mslot(
            "get",
            nat1(|a, o| dispatch::object_get(o, Some(&a.to_accessor()?), None)),
        ),
        mslot(
            "set",
            nat2(|a, o, x| {
                dispatch::object_set(o, Some(&a.to_accessor()?), None, x.clone())?;
                Ok(Value::nil())
            }),
        ),
        mslot(
            "call",
            natv(|a, args| {
                let o = args.first().ok_or_else(|| Error::arity(args.len()))?;
                dispatch::call_via_accessor(o, &a.to_accessor()?, &args[1..])
            }),
        ),
        mslot(
            "is",
            nat1(|o, c| {
                let cc = c.to_class()?;
                let accessor_class = crate::classes::with_classes(|cs| cs.accessor.clone());
                if cc.is(&accessor_class) && o.class().is(&accessor_class) {
                    return Ok(Value::bool_of(true));
                }
                Ok(Value::bool_of(o.is_instance_of(&cc)))
            }),
        ),
        mslot(
            "info",
            nat0(|o| {
                let a = o.to_accessor()?;
                println!("{}", a.name());
                println!("-----");
                for e in a.entries() {
                    let mut nm = e.name.clone();
                    if e.kind == SlotKind::Method {
                        nm.push_str("()");
                    }
                    let owner = e.owner.as_ref().map(|c| c.name()).unwrap_or_default();
                    println!("{} {} {}", e.offset, owner, nm);
                }
                Ok(Value::nil())
            }),
        ),
        mslot(
            "__eq__",
            nat1(|a, b| match (a.to_accessor(), b.to_accessor()) {
                (Ok(x), Ok(y)) => Ok(Value::bool_of(x == y)),
                _ => Ok(Value::bool_of(false)),
            }),
        ),
        mslot(
            "toString",
            nat0(|a| Ok(Value::str(format!("@{}", a.to_accessor()?.name())))),
        ),
    ]
}

pub fn boolean_slots() -> Vec<Slot> {
    vec![mslot("copy", nat0(|o| Ok(o.clone())))]
}

pub fn true_slots() -> Vec<Slot> {
    vec![mslot("toString", nat0(|_| Ok(Value::str("true"))))]
}

pub fn false_slots() -> Vec<Slot> {
    vec![
        mslot("toString", nat0(|_| Ok(Value::str("false")))),
        mslot("__inv__", nat0(|_| Ok(Value::bool_of(true)))),
    ]
}

pub fn nil_slots() -> Vec<Slot> {
    vec![
        mslot("copy", nat0(|o| Ok(o.clone()))),
        mslot("toString", nat0(|_| Ok(Value::str("nil")))),
    ]
}

// ============================================================================
// Introspection helpers
// ============================================================================

/// Parse the optional flags argument of `slotNames`/`instanceSlots`:
/// `+` includes `__hook__` names, `*` walks the ancestor chain.
fn parse_names_flags(args: &[Value]) -> Result<(bool, bool)> {
    match args.len() {
        0 => Ok((false, false)),
        1 => {
            let s = args[0].to_str()?;
            Ok((s.contains('+'), s.contains('*')))
        }
        n => Err(Error::arity(n)),
    }
}

fn class_names(c: &std::rc::Rc<crate::class::Class>, hook: bool, deep: bool) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = Some(c.clone());
    while let Some(class) = cur {
        for i in 0..class.slot_count() {
            let e = class.slot(i).expect("slot in range");
            if !hook && e.name.starts_with("__") && e.name.ends_with("__") {
                continue;
            }
            if e.vis == crate::class::SlotVis::Public && !out.contains(&e.name) {
                out.push(e.name.clone());
            }
        }
        if !deep {
            break;
        }
        cur = class.ancestor();
    }
    out
}
