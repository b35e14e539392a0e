// transcript-core - Collection protocol for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collection, Sequence, Iterator, and the shared sequence iterator.
//!
//! The slot order of Collection matters to the iterator: `__aget__` is
//! slot 0 and `size` is slot 3, and the sequence iterator drives any
//! sequence through those two.

use crate::class::Slot;
use crate::classes::with_classes;
use crate::dispatch;
use crate::primitives::{abstract_method, mslot, nat0, nat1, pslot, prop_slot};
use crate::value::Value;

/// Collection slot indices used by the iterator.
pub const COLL_AGET: usize = 0;
pub const COLL_SIZE: usize = 3;

pub fn collection_slots() -> Vec<Slot> {
    vec![
        abstract_method("__aget__"),
        abstract_method("__aset__"),
        abstract_method("__iter__"),
        prop_slot("size", Value::nil(), Value::nil()),
    ]
}

pub fn iterator_slots() -> Vec<Slot> {
    vec![
        abstract_method("next"),
        mslot("__iter__", nat0(|o| Ok(o.clone()))),
    ]
}

pub fn sequence_slots() -> Vec<Slot> {
    vec![mslot(
        "__iter__",
        nat0(|o| {
            let it = with_classes(|c| c.sequence_iterator.clone());
            dispatch::class_new_instance(&it, &[o.clone()])
        }),
    )]
}

pub fn sequence_iterator_slots() -> Vec<Slot> {
    vec![
        pslot("seq", Value::nil()),
        pslot("idx", Value::nil()),
        mslot(
            "create",
            nat1(|o, seq| {
                let it = with_classes(|c| c.sequence_iterator.clone());
                dispatch::class_set_slot(&it, o, 0, seq.clone())?;
                dispatch::class_set_slot(&it, o, 1, Value::int(0))?;
                Ok(Value::nil())
            }),
        ),
        mslot(
            "next",
            nat0(|o| {
                let (it, coll, done) = with_classes(|c| {
                    (
                        c.sequence_iterator.clone(),
                        c.collection.clone(),
                        c.done.clone(),
                    )
                });
                let seq = dispatch::class_get_slot(&it, o, 0)?;
                let idx_obj = dispatch::class_get_slot(&it, o, 1)?;
                let idx = idx_obj.to_int()?;
                let len = dispatch::class_get_slot(&coll, &seq, COLL_SIZE)?.to_int()?;
                if idx < len {
                    dispatch::class_set_slot(&it, o, 1, Value::int(idx + 1))?;
                    return dispatch::class_call_slot(&coll, &seq, COLL_AGET, &[idx_obj]);
                }
                Ok(done)
            }),
        ),
    ]
}
