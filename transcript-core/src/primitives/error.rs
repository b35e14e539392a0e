// transcript-core - Error class for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The language-level Error class: message, source file, line, and an
//! optional trace. The VM fills the file and line fields when it wraps a
//! fault.

use crate::class::Slot;
use crate::classes::with_classes;
use crate::dispatch;
use crate::primitives::{fslot, mslot, nat0, nat1};
use crate::value::Value;

/// Field offsets within an Error instance.
pub const ERR_MSG: usize = 0;
pub const ERR_FILE: usize = 1;
pub const ERR_LINE: usize = 2;
pub const ERR_TRACE: usize = 3;

pub fn error_slots() -> Vec<Slot> {
    vec![
        fslot("msg", Value::nil()),
        fslot("file", Value::nil()),
        fslot("line", Value::nil()),
        fslot("trace", Value::nil()),
        mslot(
            "toString",
            nat0(|o| {
                let msg = o.field(ERR_MSG);
                let file = o.field(ERR_FILE);
                let line = o.field(ERR_LINE).to_int().unwrap_or(0);
                if line == 0 {
                    return Ok(Value::str(dispatch::to_string_obj(&msg)?));
                }
                Ok(Value::str(format!(
                    "{}({}): {}",
                    dispatch::to_string_obj(&file)?,
                    line,
                    dispatch::to_string_obj(&msg)?
                )))
            }),
        ),
        mslot(
            "create",
            nat1(|o, msg| {
                o.set_field(ERR_MSG, msg.clone());
                o.set_field(ERR_FILE, Value::str(""));
                o.set_field(ERR_LINE, Value::int(0));
                o.set_field(ERR_TRACE, Value::array(Vec::new()));
                Ok(Value::nil())
            }),
        ),
    ]
}

/// Build an Error instance from a host-side message.
pub fn error_object(msg: impl Into<String>) -> Value {
    let eo = with_classes(|c| c.error.alloc());
    match eo {
        Ok(eo) => {
            if eo.fields().len() >= 4 {
                eo.set_field(ERR_MSG, Value::str(msg.into()));
                eo.set_field(ERR_FILE, Value::str(""));
                eo.set_field(ERR_LINE, Value::int(0));
                eo.set_field(ERR_TRACE, Value::array(Vec::new()));
            }
            eo
        }
        Err(_) => Value::str(msg.into()),
    }
}
