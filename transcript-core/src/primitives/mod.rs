// transcript-core - Primitive class library for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The primitive class library.
//!
//! Declares the slots of every built-in class and installs them into an
//! interpreter. The first ten Object slots have fixed indices (the
//! `OBJ_*` constants) because the runtime calls them directly.

pub mod array;
pub mod buffer;
pub mod collection;
pub mod error;
pub mod globals;
pub mod hash;
pub mod number;
pub mod object;
pub mod string;

use std::rc::Rc;

use crate::class::{Class, FINAL, Slot, SlotKind, SlotVis};
use crate::classes::with_classes;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::value::Value;

// Slots defined on every object, by index.
pub const OBJ_NEW: usize = 0;
pub const OBJ_CREATE: usize = 1;
pub const OBJ_EQ: usize = 2;
pub const OBJ_CALL: usize = 3;
pub const OBJ_GET_FAILED: usize = 4;
pub const OBJ_SET_FAILED: usize = 5;
pub const OBJ_CALL_FAILED: usize = 6;
pub const OBJ_TO_STRING: usize = 7;
pub const OBJ_EQUALS: usize = 8;
pub const OBJ_KEY: usize = 9;

// ============================================================================
// Native wrappers
// ============================================================================

/// Wrap a variadic native: receiver plus argument slice.
pub fn natv(f: impl Fn(&Value, &[Value]) -> Result<Value> + 'static) -> Value {
    Value::raw_native(move |p| {
        p.enter_native()?;
        let this = p.this();
        let args = p.args().to_vec();
        let v = f(&this, &args)?;
        p.ret(v)
    })
}

/// Wrap a native taking no arguments.
pub fn nat0(f: impl Fn(&Value) -> Result<Value> + 'static) -> Value {
    natv(move |o, args| {
        check_arity(args, 0)?;
        f(o)
    })
}

/// Wrap a native taking one argument.
pub fn nat1(f: impl Fn(&Value, &Value) -> Result<Value> + 'static) -> Value {
    natv(move |o, args| {
        check_arity(args, 1)?;
        f(o, &args[0])
    })
}

/// Wrap a native taking two arguments.
pub fn nat2(f: impl Fn(&Value, &Value, &Value) -> Result<Value> + 'static) -> Value {
    natv(move |o, args| {
        check_arity(args, 2)?;
        f(o, &args[0], &args[1])
    })
}

/// Wrap a native taking three arguments.
pub fn nat3(f: impl Fn(&Value, &Value, &Value, &Value) -> Result<Value> + 'static) -> Value {
    natv(move |o, args| {
        check_arity(args, 3)?;
        f(o, &args[0], &args[1], &args[2])
    })
}

pub fn check_arity(args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::arity(args.len()));
    }
    Ok(())
}

// ============================================================================
// Slot constructors
// ============================================================================

/// Public field slot.
pub fn fslot(name: &str, v: Value) -> Slot {
    Slot::new(name, SlotKind::Field, SlotVis::Public, v)
}

/// Private field slot.
pub fn pslot(name: &str, v: Value) -> Slot {
    Slot::new(name, SlotKind::Field, SlotVis::Private, v)
}

/// Public method slot.
pub fn mslot(name: &str, f: Value) -> Slot {
    Slot::new(name, SlotKind::Method, SlotVis::Public, f)
}

/// Public property slot.
pub fn prop_slot(name: &str, get: Value, set: Value) -> Slot {
    let mut s = Slot::new(name, SlotKind::Property, SlotVis::Public, get);
    s.setter = set;
    s
}

/// A method descendant classes ought to implement.
pub fn abstract_method(name: &str) -> Slot {
    let name_owned = name.to_string();
    mslot(
        name,
        natv(move |o, _| {
            Err(Error::AbstractMethod {
                class: o.class_name(),
                name: name_owned.clone(),
            })
        }),
    )
}

// ============================================================================
// Installation
// ============================================================================

/// Declare and install every built-in class into an interpreter, defining
/// the named ones as globals.
pub fn install(interp: &Interpreter) -> Result<()> {
    with_classes(|c| -> Result<()> {
        c.object.set_slots(object::object_slots());
        c.class.set_slots(object::class_slots());
        c.function.set_slots(object::function_slots());
        c.accessor.set_slots(object::accessor_slots());
        c.boolean.set_slots(object::boolean_slots());
        c.true_class.set_slots(object::true_slots());
        c.false_class.set_slots(object::false_slots());
        c.nil_class.set_slots(object::nil_slots());
        c.number.set_slots(number::number_slots());
        c.int.set_slots(number::int_slots());
        c.float.set_slots(number::float_slots());
        c.collection.set_slots(collection::collection_slots());
        c.sequence.set_slots(collection::sequence_slots());
        c.iterator.set_slots(collection::iterator_slots());
        c.sequence_iterator
            .set_slots(collection::sequence_iterator_slots());
        c.string.set_slots(string::string_slots());
        c.array.set_slots(array::array_slots());
        c.hash.set_slots(hash::hash_slots());
        c.buffer.set_slots(buffer::buffer_slots());
        c.pair.set_slots(buffer::pair_slots());
        c.error.set_slots(error::error_slots());
        c.package.set_slots(Vec::new());

        // The accessor class is momentarily unnamed so that the global
        // `Accessor` can be its constructible subclass instead.
        c.accessor.set_name("");
        let install_order: [&Rc<Class>; 22] = [
            &c.object,
            &c.class,
            &c.function,
            &c.accessor,
            &c.boolean,
            &c.true_class,
            &c.false_class,
            &c.nil_class,
            &c.number,
            &c.int,
            &c.float,
            &c.collection,
            &c.sequence,
            &c.iterator,
            &c.sequence_iterator,
            &c.string,
            &c.array,
            &c.hash,
            &c.buffer,
            &c.pair,
            &c.error,
            &c.package,
        ];
        for class in install_order {
            class.reset_installed();
            interp.add_class(class)?;
            let name = class.name();
            if !name.is_empty() {
                interp.define(&name, class.object());
            }
        }
        c.accessor.set_name("Accessor");

        // The constructible Accessor subclass: Accessor("x") interns @x.
        let weak = interp.downgrade();
        let acc_class = c.accessor.extend("Accessor", FINAL, Vec::new())?;
        let acc_for_new = acc_class.clone();
        acc_class.set_slots(vec![mslot(
            "__new__",
            nat1(move |_, name| {
                let name = name.to_str()?;
                if name.is_empty() {
                    return Err(Error::Other("bad name".into()));
                }
                let interp = weak.upgrade()?;
                let res = Value::accessor_obj(interp.accessor(name));
                res.set_class(acc_for_new.clone());
                Ok(res)
            }),
        )]);
        interp.add_class(&acc_class)?;
        interp.define("Accessor", acc_class.object());

        globals::install(interp)?;
        Ok(())
    })
}
