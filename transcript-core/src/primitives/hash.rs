// transcript-core - Hash class for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Hash class.
//!
//! Key identity is the pair (key's class, `__key__` result): strings and
//! numbers reduce by value, pairs recurse, everything else compares by
//! object identity. Two keys of different classes never collide even if
//! their `__key__` results match.

use std::collections::HashMap;

use crate::class::Slot;
use crate::classes::with_classes;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::primitives::{check_arity, mslot, nat0, nat1, natv, prop_slot};
use crate::value::{HashItem, HashKey, Value};

pub fn hash_slots() -> Vec<Slot> {
    vec![
        mslot(
            "keys",
            nat0(|o| {
                let keys: Vec<Value> = o.to_hash()?.values().map(|it| it.key.clone()).collect();
                Ok(Value::array(keys))
            }),
        ),
        mslot(
            "__new__",
            natv(|_, args| {
                let pair_class = with_classes(|c| c.pair.clone());
                let mut map = HashMap::new();
                for x in args {
                    if !std::rc::Rc::ptr_eq(&x.class(), &pair_class) {
                        return Err(Error::wrong_type(x));
                    }
                    let (k, v) = (x.field(0), x.field(1));
                    map.insert(HashKey::of(&k)?, HashItem { key: k, val: v });
                }
                Ok(Value::hash(map))
            }),
        ),
        mslot(
            "__iter__",
            nat0(|o| {
                let keys: Vec<Value> = o.to_hash()?.values().map(|it| it.key.clone()).collect();
                let it = with_classes(|c| c.sequence_iterator.clone());
                dispatch::class_new_instance(&it, &[Value::array(keys)])
            }),
        ),
        mslot(
            "toString",
            nat0(|o| {
                let items: Vec<HashItem> = o.to_hash()?.values().cloned().collect();
                let mut s = String::from("{");
                for (i, it) in items.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&dispatch::to_string_obj(&it.key)?);
                    s.push_str(": ");
                    s.push_str(&dispatch::to_string_obj(&it.val)?);
                }
                s.push('}');
                Ok(Value::str(s))
            }),
        ),
        mslot(
            "__aget__",
            natv(|o, args| {
                check_arity(args, 1)?;
                let k = HashKey::of(&args[0])?;
                match o.to_hash()?.get(&k) {
                    Some(it) => Ok(it.val.clone()),
                    None => Err(Error::MissingKey(args[0].to_display_string())),
                }
            }),
        ),
        mslot(
            "__aset__",
            natv(|o, args| {
                check_arity(args, 2)?;
                let k = HashKey::of(&args[0])?;
                o.to_hash_mut()?.insert(
                    k,
                    HashItem {
                        key: args[0].clone(),
                        val: args[1].clone(),
                    },
                );
                Ok(Value::nil())
            }),
        ),
        prop_slot(
            "size",
            nat0(|o| Ok(Value::int(o.to_hash()?.len() as i64))),
            Value::nil(),
        ),
        mslot(
            "contains",
            nat1(|o, k| {
                let k = HashKey::of(k)?;
                Ok(Value::bool_of(o.to_hash()?.contains_key(&k)))
            }),
        ),
    ]
}

/// Build a hash value from host pairs (used by extensions).
pub fn hash_from_pairs(pairs: Vec<(Value, Value)>) -> Result<Value> {
    let mut map = HashMap::new();
    for (k, v) in pairs {
        map.insert(HashKey::of(&k)?, HashItem { key: k, val: v });
    }
    Ok(Value::hash(map))
}
