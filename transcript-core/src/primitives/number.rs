// transcript-core - Numeric classes for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Number, Integer, and Float.
//!
//! Arithmetic stays in i64 when both operands are integers (division
//! excepted: `/` always produces a float); otherwise both sides promote to
//! f64. Comparison predicates answer false for non-numeric operands rather
//! than faulting, so `1 == "x"` is simply false.

use crate::class::Slot;
use crate::error::{Error, Result};
use crate::primitives::{abstract_method, mslot, nat0, nat1};
use crate::value::{Payload, Value, format_float};

fn as_f64(v: &Value) -> Result<f64> {
    match v.payload() {
        Payload::Int(i) => Ok(*i as f64),
        Payload::Float(f) => Ok(*f),
        _ => Err(Error::wrong_type(v)),
    }
}

fn as_f64_opt(v: &Value) -> Option<f64> {
    match v.payload() {
        Payload::Int(i) => Some(*i as f64),
        Payload::Float(f) => Some(*f),
        _ => None,
    }
}

/// A binary operation: integer kernel where both sides are integers (none
/// means "always float"), float kernel otherwise.
fn num_op(fi: Option<fn(i64, i64) -> i64>, ff: fn(f64, f64) -> f64) -> Value {
    nat1(move |o, b| {
        if let (Payload::Int(x), Payload::Int(y)) = (o.payload(), b.payload()) {
            if let Some(fi) = fi {
                return Ok(Value::int(fi(*x, *y)));
            }
            return Ok(Value::float(ff(*x as f64, *y as f64)));
        }
        Ok(Value::float(ff(as_f64(o)?, as_f64(b)?)))
    })
}

/// A comparison: false for non-numeric operands.
fn num_pred(fi: fn(i64, i64) -> bool, ff: fn(f64, f64) -> bool) -> Value {
    nat1(move |o, b| {
        if let (Payload::Int(x), Payload::Int(y)) = (o.payload(), b.payload()) {
            return Ok(Value::bool_of(fi(*x, *y)));
        }
        match (as_f64_opt(o), as_f64_opt(b)) {
            (Some(x), Some(y)) => Ok(Value::bool_of(ff(x, y))),
            _ => Ok(Value::bool_of(false)),
        }
    })
}

pub fn number_slots() -> Vec<Slot> {
    vec![
        abstract_method("toInt"),
        abstract_method("toFloat"),
        mslot("copy", nat0(|o| Ok(o.clone()))),
        mslot("__add__", num_op(Some(i64::wrapping_add), |a, b| a + b)),
        mslot("__sub__", num_op(Some(i64::wrapping_sub), |a, b| a - b)),
        mslot("__mul__", num_op(Some(i64::wrapping_mul), |a, b| a * b)),
        mslot("__div__", num_op(None, |a, b| a / b)),
        mslot("__eq__", num_pred(|a, b| a == b, |a, b| a == b)),
        mslot("__lt__", num_pred(|a, b| a < b, |a, b| a < b)),
        mslot("__lte__", num_pred(|a, b| a <= b, |a, b| a <= b)),
        mslot("__gt__", num_pred(|a, b| a > b, |a, b| a > b)),
        mslot("__gte__", num_pred(|a, b| a >= b, |a, b| a >= b)),
    ]
}

pub fn int_slots() -> Vec<Slot> {
    vec![
        mslot("toString", nat0(|o| Ok(Value::str(o.to_int()?.to_string())))),
        mslot(
            "toChar",
            nat0(|o| {
                let i = o.to_int()?;
                let c = u32::try_from(i)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::Other(format!("bad character code: {i}")))?;
                Ok(Value::str(c.to_string()))
            }),
        ),
        mslot("toInt", nat0(|o| Ok(o.clone()))),
        mslot("toFloat", nat0(|o| Ok(Value::float(o.to_int()? as f64)))),
        mslot("__neg__", nat0(|o| Ok(Value::int(o.to_int()?.wrapping_neg())))),
        mslot(
            "quotient",
            nat1(|o, x| {
                let (a, b) = (o.to_int()?, x.to_int()?);
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::int(a.wrapping_div(b)))
            }),
        ),
        mslot(
            "modulo",
            nat1(|o, x| {
                let (a, b) = (o.to_int()?, x.to_int()?);
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::int(a.wrapping_rem(b)))
            }),
        ),
    ]
}

pub fn float_slots() -> Vec<Slot> {
    vec![
        mslot(
            "toString",
            nat0(|o| Ok(Value::str(format_float(o.to_float()?)))),
        ),
        mslot("toInt", nat0(|o| Ok(Value::int(o.to_float()? as i64)))),
        mslot("toFloat", nat0(|o| Ok(o.clone()))),
        mslot("__neg__", nat0(|o| Ok(Value::float(-o.to_float()?)))),
    ]
}
