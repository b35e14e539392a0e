// transcript-core - Buffer and Pair classes for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Buffer (a mutable byte sequence) and Pair.

use crate::class::Slot;
use crate::dispatch;
use crate::error::Error;
use crate::primitives::{check_arity, mslot, nat0, nat1, nat2, natv, prop_slot};
use crate::value::Value;

pub fn buffer_slots() -> Vec<Slot> {
    vec![
        mslot(
            "__new__",
            nat1(|_, s| {
                let n = s.to_int()?;
                if n < 0 {
                    return Err(Error::IndexOutOfRange(n));
                }
                Ok(Value::buffer(vec![0; n as usize]))
            }),
        ),
        prop_slot(
            "size",
            nat0(|o| Ok(Value::int(o.to_buffer()?.len() as i64))),
            Value::nil(),
        ),
        mslot(
            "slice",
            natv(|o, args| {
                let b = o.to_buffer()?;
                let (from, to) = match args.len() {
                    0 => (0, b.len() as i64),
                    1 => (args[0].to_int()?, b.len() as i64),
                    2 => (args[0].to_int()?, args[1].to_int()?),
                    n => return Err(Error::arity(n)),
                };
                if from < 0 || to < from || to as usize > b.len() {
                    return Err(Error::IndexOutOfRange(to));
                }
                Ok(Value::buffer(b[from as usize..to as usize].to_vec()))
            }),
        ),
        mslot(
            "copy",
            nat1(|a, b| {
                let src = b.to_buffer()?.clone();
                let mut dst = a.to_buffer_mut()?;
                let n = src.len().min(dst.len());
                dst[..n].copy_from_slice(&src[..n]);
                Ok(Value::nil())
            }),
        ),
        mslot(
            "toString",
            nat0(|o| Ok(Value::str(
                String::from_utf8_lossy(&o.to_buffer()?).into_owned(),
            ))),
        ),
        mslot(
            "__aget__",
            natv(|o, args| {
                check_arity(args, 1)?;
                let b = o.to_buffer()?;
                let i = args[0].to_int()?;
                if i < 0 || i as usize >= b.len() {
                    return Err(Error::IndexOutOfRange(i));
                }
                Ok(Value::int(b[i as usize] as i64))
            }),
        ),
        mslot(
            "__aset__",
            natv(|o, args| {
                check_arity(args, 2)?;
                let mut b = o.to_buffer_mut()?;
                let i = args[0].to_int()?;
                if i < 0 || i as usize >= b.len() {
                    return Err(Error::IndexOutOfRange(i));
                }
                b[i as usize] = args[1].to_int()? as u8;
                Ok(Value::nil())
            }),
        ),
        mslot(
            "__add__",
            nat1(|a, b| {
                let mut res = a.to_buffer()?.clone();
                res.extend_from_slice(&b.to_buffer()?);
                Ok(Value::buffer(res))
            }),
        ),
    ]
}

pub fn pair_slots() -> Vec<Slot> {
    vec![
        prop_slot("left", nat0(|o| Ok(o.field(0))), Value::nil()),
        prop_slot("right", nat0(|o| Ok(o.field(1))), Value::nil()),
        mslot(
            "create",
            nat2(|o, left, right| {
                *o.fields_mut() = vec![left.clone(), right.clone()];
                Ok(Value::nil())
            }),
        ),
        mslot(
            "toString",
            nat0(|o| {
                let l = dispatch::to_string_obj(&o.field(0))?;
                let r = dispatch::to_string_obj(&o.field(1))?;
                Ok(Value::str(format!("{l}:{r}")))
            }),
        ),
    ]
}
