// transcript-core - Object dispatch for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Slot dispatch: property get/set and method lookup.
//!
//! Dispatch resolves a slot either from a static hint (already looked up
//! against the compile-time class chain) or from the accessor's public
//! table, and falls back to the `__getFailed__` / `__setFailed__` /
//! `__callFailed__` hooks on the receiver when nothing matches. Methods
//! reached through a property get are bound to their receiver; `GetM`
//! returns them raw because the call site has already staged the receiver.
//!
//! Invoking TranScript code from the host (or from a native) spins up a
//! fresh process; calls within one process reuse its frame stack.

use std::rc::Rc;

use crate::accessor::Accessor;
use crate::class::{Class, Slot, SlotKind};
use crate::error::{Error, Result};
use crate::primitives::{OBJ_CALL_FAILED, OBJ_GET_FAILED, OBJ_NEW, OBJ_SET_FAILED, OBJ_TO_STRING};
use crate::process::Process;
use crate::value::Value;

// ============================================================================
// Calling
// ============================================================================

/// Call a function-like value with an explicit receiver.
pub fn call_function(this: &Value, f: &Value, args: &[Value]) -> Result<Value> {
    let mut p = Process::new();
    p.begin_call(this, f, args)?;
    p.run()?;
    Ok(p.value().clone())
}

/// Call a value as a function (the value itself is the receiver).
pub fn call_value(f: &Value, args: &[Value]) -> Result<Value> {
    call_function(f, f, args)
}

/// Call the method named by `a` on `o`.
pub fn call_via_accessor(o: &Value, a: &Accessor, args: &[Value]) -> Result<Value> {
    let m = object_get_method(o, Some(a), None)?;
    call_function(o, &m, args)
}

/// Call slot `i` of class `c` on `o` (virtual: the receiver's override at
/// the declared offset wins).
pub fn class_call_slot(c: &Rc<Class>, o: &Value, i: usize, args: &[Value]) -> Result<Value> {
    check_class(o, o.is_instance_of(c))?;
    let e = c
        .slot(i)
        .ok_or_else(|| Error::Internal(format!("bad slot index {i}")))?;
    let m = object_get_method(o, None, Some(e))?;
    call_function(o, &m, args)
}

/// Call slot `i` of the root Object class on `o`.
pub fn call_slot_on_object_class(o: &Value, i: usize, args: &[Value]) -> Result<Value> {
    let object = crate::classes::with_classes(|c| c.object.clone());
    class_call_slot(&object, o, i, args)
}

/// Read field or property slot `i` of class `c` on `o`.
pub fn class_get_slot(c: &Rc<Class>, o: &Value, i: usize) -> Result<Value> {
    check_class(o, o.is_instance_of(c))?;
    let e = c
        .slot(i)
        .ok_or_else(|| Error::Internal(format!("bad slot index {i}")))?;
    object_get(o, None, Some(e))
}

/// Write field or property slot `i` of class `c` on `o`.
pub fn class_set_slot(c: &Rc<Class>, o: &Value, i: usize, x: Value) -> Result<()> {
    check_class(o, o.is_instance_of(c))?;
    let e = c
        .slot(i)
        .ok_or_else(|| Error::Internal(format!("bad slot index {i}")))?;
    object_set(o, None, Some(e), x)
}

/// Instantiate a class: allocate, then run `__new__` (which runs `create`
/// and returns the instance).
pub fn class_new_instance(c: &Rc<Class>, args: &[Value]) -> Result<Value> {
    let o = c.alloc()?;
    if OBJ_NEW >= c.method_count() {
        return Err(Error::Internal(format!("class not installed: {}", c.name())));
    }
    let m = c.method(OBJ_NEW);
    call_function(&o, &m, args)
}

/// Render a value through its `toString` method.
pub fn to_string_obj(o: &Value) -> Result<String> {
    let s = call_slot_on_object_class(o, OBJ_TO_STRING, &[])?;
    Ok(s.to_str()?.to_string())
}

fn check_class(o: &Value, pass: bool) -> Result<()> {
    if pass {
        Ok(())
    } else {
        Err(Error::wrong_type(o))
    }
}

/// The receiver's method-table entry at a resolved offset. An
/// out-of-range offset means the receiver's class was never installed.
fn method_of(o: &Value, offset: usize) -> Result<Value> {
    let c = o.class();
    if offset >= c.method_count() {
        return Err(Error::wrong_type(o));
    }
    Ok(c.method(offset))
}

fn field_of(o: &Value, offset: usize) -> Result<Value> {
    o.fields()
        .get(offset)
        .cloned()
        .ok_or_else(|| Error::wrong_type(o))
}

// ============================================================================
// Slot access
// ============================================================================

/// Property get. `e` carries static slot information when the compiler had
/// any; otherwise the accessor's public table decides.
pub fn object_get(o: &Value, a: Option<&Accessor>, e: Option<Slot>) -> Result<Value> {
    let e = match e.or_else(|| a.and_then(|a| a.lookup(o))) {
        Some(e) => e,
        None => {
            let ao = Value::accessor_obj(a.cloned().unwrap_or_else(|| Accessor::new("")));
            return call_slot_on_object_class(o, OBJ_GET_FAILED, &[ao]);
        }
    };
    match e.kind {
        SlotKind::Field => field_of(o, e.offset as usize),
        SlotKind::Method => Ok(bind_method(o, &method_of(o, e.offset as usize)?)),
        SlotKind::Property => get_property(o, &e),
        SlotKind::Marker => Err(Error::NotReadable),
    }
}

/// Property set.
pub fn object_set(o: &Value, a: Option<&Accessor>, e: Option<Slot>, x: Value) -> Result<()> {
    let e = match e.or_else(|| a.and_then(|a| a.lookup(o))) {
        Some(e) => e,
        None => {
            let ao = Value::accessor_obj(a.cloned().unwrap_or_else(|| Accessor::new("")));
            call_slot_on_object_class(o, OBJ_SET_FAILED, &[ao, x])?;
            return Ok(());
        }
    };
    match e.kind {
        SlotKind::Field => {
            let offset = e.offset as usize;
            if offset >= o.fields().len() {
                return Err(Error::wrong_type(o));
            }
            o.set_field(offset, x);
            Ok(())
        }
        SlotKind::Property => set_property(o, &e, x),
        _ => Err(Error::NotWritable),
    }
}

/// Method get: like `object_get` but methods come back unbound, because the
/// call site has already staged the receiver.
pub fn object_get_method(o: &Value, a: Option<&Accessor>, e: Option<Slot>) -> Result<Value> {
    let e = match e.or_else(|| a.and_then(|a| a.lookup(o))) {
        Some(e) => e,
        None => return Ok(method_missing(a)),
    };
    match e.kind {
        SlotKind::Field => field_of(o, e.offset as usize),
        SlotKind::Method => method_of(o, e.offset as usize),
        SlotKind::Property => get_property(o, &e),
        SlotKind::Marker => Err(Error::NotCallable),
    }
}

/// A function that reinstates `o` as the receiver before running `m`.
pub fn bind_method(o: &Value, m: &Value) -> Value {
    let o = o.clone();
    let m = m.clone();
    Value::raw_native(move |p| {
        p.set_this(o.clone());
        p.invoke(&m)
    })
}

/// The stand-in returned when a method lookup misses: calling it re-routes
/// to the receiver's `__callFailed__` hook with the accessor prepended.
fn method_missing(a: Option<&Accessor>) -> Value {
    let ao = Value::accessor_obj(a.cloned().unwrap_or_else(|| Accessor::new("")));
    Value::raw_native(move |p| {
        p.enter_native()?;
        let this = p.this();
        let mut args = vec![ao.clone()];
        args.extend_from_slice(p.args());
        let v = call_slot_on_object_class(&this, OBJ_CALL_FAILED, &args)?;
        p.ret(v)
    })
}

fn get_property(o: &Value, e: &Slot) -> Result<Value> {
    let m = method_of(o, e.offset as usize)?;
    if m.is_nil() {
        return Err(Error::NotReadable);
    }
    call_function(o, &m, &[])
}

fn set_property(o: &Value, e: &Slot, x: Value) -> Result<()> {
    let m = method_of(o, e.offset as usize + 1)?;
    if m.is_nil() {
        return Err(Error::NotWritable);
    }
    call_function(o, &m, &[x])?;
    Ok(())
}
