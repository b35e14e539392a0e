// transcript-core - Array class for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Array class: a growable, mutable sequence.
//!
//! The set operations (`subset`, `union`, `difference`, `intersection`)
//! compare elements through `__eq__`, so user classes participate by
//! overriding it.

use crate::class::Slot;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::primitives::{OBJ_EQ, check_arity, mslot, nat0, nat1, nat2, natv, prop_slot};
use crate::value::Value;

fn index_into(len: usize, i: i64) -> Result<usize> {
    if i < 0 || i as usize >= len {
        return Err(Error::IndexOutOfRange(i));
    }
    Ok(i as usize)
}

/// Partition `a` and `b` by `__eq__`: elements only in `a`, only in `b`,
/// and in both.
fn set_op(a: &[Value], b: &[Value]) -> Result<(Vec<Value>, Vec<Value>, Vec<Value>)> {
    let mut b: Vec<Value> = b.to_vec();
    let mut ina = Vec::new();
    let mut inboth = Vec::new();
    'outer: for x in a {
        for i in 0..b.len() {
            let eq = dispatch::call_slot_on_object_class(x, OBJ_EQ, &[b[i].clone()])?;
            if !eq.is_false() {
                inboth.push(x.clone());
                b.remove(i);
                continue 'outer;
            }
        }
        ina.push(x.clone());
    }
    Ok((ina, b, inboth))
}

/// The `from`/`to` range of a `slice` call.
fn slice_range(args: &[Value], len: usize) -> Result<(usize, usize)> {
    let (from, to) = match args.len() {
        0 => (0, len as i64),
        1 => (args[0].to_int()?, len as i64),
        2 => (args[0].to_int()?, args[1].to_int()?),
        n => return Err(Error::arity(n)),
    };
    if from < 0 || to < from || to as usize > len {
        return Err(Error::IndexOutOfRange(to));
    }
    Ok((from as usize, to as usize))
}

pub fn array_slots() -> Vec<Slot> {
    vec![
        mslot("copy", nat0(|o| Ok(Value::array(o.to_array()?.clone())))),
        mslot(
            "join",
            natv(|o, args| {
                let sep = match args.len() {
                    0 => String::new(),
                    1 => args[0].to_str()?.to_string(),
                    n => return Err(Error::arity(n)),
                };
                let items = o.to_array()?.clone();
                let mut parts = Vec::with_capacity(items.len());
                for x in &items {
                    parts.push(dispatch::to_string_obj(x)?);
                }
                Ok(Value::str(parts.join(&sep)))
            }),
        ),
        mslot(
            "add",
            natv(|o, args| {
                o.to_array_mut()?.extend_from_slice(args);
                Ok(Value::nil())
            }),
        ),
        mslot(
            "__new__",
            nat1(|_, c| {
                let n = c.to_int()?;
                if n < 0 {
                    return Err(Error::IndexOutOfRange(n));
                }
                Ok(Value::array(vec![Value::nil(); n as usize]))
            }),
        ),
        mslot(
            "toString",
            nat0(|o| {
                let items = o.to_array()?.clone();
                let mut s = String::from("[");
                for (i, x) in items.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&dispatch::to_string_obj(x)?);
                }
                s.push(']');
                Ok(Value::str(s))
            }),
        ),
        prop_slot(
            "size",
            nat0(|o| Ok(Value::int(o.to_array()?.len() as i64))),
            Value::nil(),
        ),
        mslot(
            "remove",
            nat1(|o, x| {
                let mut i = 0;
                loop {
                    let elem = {
                        let a = o.to_array()?;
                        match a.get(i) {
                            Some(e) => e.clone(),
                            None => break,
                        }
                    };
                    let eq = dispatch::call_slot_on_object_class(x, OBJ_EQ, &[elem])?;
                    if !eq.is_false() {
                        o.to_array_mut()?.remove(i);
                    } else {
                        i += 1;
                    }
                }
                Ok(Value::nil())
            }),
        ),
        mslot(
            "insert",
            nat2(|o, i, x| {
                let mut a = o.to_array_mut()?;
                let i = i.to_int()?;
                if i < 0 || i as usize > a.len() {
                    return Err(Error::IndexOutOfRange(i));
                }
                a.insert(i as usize, x.clone());
                Ok(Value::nil())
            }),
        ),
        mslot(
            "delete",
            nat1(|o, i| {
                let mut a = o.to_array_mut()?;
                let i = index_into(a.len(), i.to_int()?)?;
                a.remove(i);
                Ok(Value::nil())
            }),
        ),
        mslot(
            "push",
            nat1(|o, x| {
                o.to_array_mut()?.push(x.clone());
                Ok(Value::nil())
            }),
        ),
        mslot(
            "pop",
            nat0(|o| {
                o.to_array_mut()?
                    .pop()
                    .ok_or(Error::IndexOutOfRange(-1))
            }),
        ),
        mslot(
            "slice",
            natv(|o, args| {
                let a = o.to_array()?;
                let (from, to) = slice_range(args, a.len())?;
                Ok(Value::array(a[from..to].to_vec()))
            }),
        ),
        mslot(
            "indexOf",
            nat1(|o, x| {
                let items = o.to_array()?.clone();
                for (i, y) in items.iter().enumerate() {
                    let eq = dispatch::call_slot_on_object_class(x, OBJ_EQ, &[y.clone()])?;
                    if !eq.is_false() {
                        return Ok(Value::int(i as i64));
                    }
                }
                Ok(Value::bool_of(false))
            }),
        ),
        mslot(
            "subset",
            nat1(|o, x| {
                let (only_a, _, _) = set_op(&o.to_array()?.clone(), &x.to_array()?.clone())?;
                Ok(Value::bool_of(only_a.is_empty()))
            }),
        ),
        mslot(
            "union",
            nat1(|o, x| {
                let (mut a, b, both) = set_op(&o.to_array()?.clone(), &x.to_array()?.clone())?;
                a.extend(b);
                a.extend(both);
                Ok(Value::array(a))
            }),
        ),
        mslot(
            "difference",
            nat1(|o, x| {
                let (a, _, _) = set_op(&o.to_array()?.clone(), &x.to_array()?.clone())?;
                Ok(Value::array(a))
            }),
        ),
        mslot(
            "intersection",
            nat1(|o, x| {
                let (_, _, both) = set_op(&o.to_array()?.clone(), &x.to_array()?.clone())?;
                Ok(Value::array(both))
            }),
        ),
        mslot(
            "__aget__",
            natv(|o, args| {
                check_arity(args, 1)?;
                let a = o.to_array()?;
                let i = index_into(a.len(), args[0].to_int()?)?;
                Ok(a[i].clone())
            }),
        ),
        mslot(
            "__aset__",
            natv(|o, args| {
                check_arity(args, 2)?;
                let mut a = o.to_array_mut()?;
                let i = index_into(a.len(), args[0].to_int()?)?;
                a[i] = args[1].clone();
                Ok(Value::nil())
            }),
        ),
        mslot(
            "__add__",
            nat1(|o, x| {
                let mut res = o.to_array()?.clone();
                res.extend_from_slice(&x.to_array()?);
                Ok(Value::array(res))
            }),
        ),
    ]
}
