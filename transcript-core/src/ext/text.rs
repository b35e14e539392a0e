// transcript-core - text extension package for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The `text` package: UTF-8 codec helpers over byte streams.
//!
//! Works against any object implementing `readByte` / `writeByte`, so it
//! composes with the `system` streams and with user classes alike.

use crate::dispatch;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::primitives::{nat1, nat2};
use crate::value::Value;

pub fn register(interp: &Interpreter) {
    interp.register_extension("text", |interp| {
        let read_a = interp.accessor("readByte");
        let write_a = interp.accessor("writeByte");

        let read_byte = {
            let read_a = read_a.clone();
            move |s: &Value| -> Result<Option<u8>> {
                let b = dispatch::call_via_accessor(s, &read_a, &[])?;
                if b.is_false() {
                    return Ok(None);
                }
                Ok(Some(b.to_int()? as u8))
            }
        };
        let write_byte = {
            let write_a = write_a.clone();
            move |s: &Value, b: u8| -> Result<()> {
                dispatch::call_via_accessor(s, &write_a, &[Value::int(b as i64)])?;
                Ok(())
            }
        };

        Ok(vec![
            // One UTF-8 character from a byte source; false at end of
            // input.
            (
                "read8".to_string(),
                nat1(move |_, s| {
                    let Some(first) = read_byte(s)? else {
                        return Ok(Value::bool_of(false));
                    };
                    let extra = match first {
                        0x00..=0x7f => 0,
                        0xc0..=0xdf => 1,
                        0xe0..=0xef => 2,
                        0xf0..=0xf7 => 3,
                        _ => return Err(Error::Other("bad character".into())),
                    };
                    let mut bytes = vec![first];
                    for _ in 0..extra {
                        let b = read_byte(s)?
                            .ok_or_else(|| Error::Other("bad character".into()))?;
                        bytes.push(b);
                    }
                    let s = std::str::from_utf8(&bytes)
                        .map_err(|_| Error::Other("bad character".into()))?;
                    Ok(Value::str(s))
                }),
            ),
            // One character code as UTF-8 bytes into a byte sink.
            (
                "write8".to_string(),
                nat2(move |_, s, c| {
                    let code = u32::try_from(c.to_int()?)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| Error::Other("bad character".into()))?;
                    let mut buf = [0u8; 4];
                    for b in code.encode_utf8(&mut buf).as_bytes() {
                        write_byte(s, *b)?;
                    }
                    Ok(Value::nil())
                }),
            ),
        ])
    });
}
