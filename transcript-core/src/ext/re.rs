// transcript-core - re extension package for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The `re` package: a Regex class over Rust regex syntax.
//!
//! Note: Rust regexes differ from PCRE: no lookaround or backreferences,
//! and named groups spell `(?P<name>...)`.

use std::rc::Rc;

use regex::Regex;

use crate::classes::with_classes;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::primitives::{mslot, nat1, nat2};
use crate::value::Value;

fn regex_of(o: &Value) -> Result<Rc<Regex>> {
    o.user_data()?
        .downcast::<Regex>()
        .map_err(|_| Error::wrong_type(o))
}

pub fn register(interp: &Interpreter) {
    interp.register_extension("re", |interp| {
        let object = with_classes(|c| c.object.clone());
        let regex_class = interp.extend_class(
            &object,
            "Regex",
            crate::class::USER_DATA,
            vec![
                mslot(
                    "create",
                    nat1(|o, expr| {
                        let re = Regex::new(expr.to_str()?)
                            .map_err(|e| Error::Other(format!("bad pattern: {e}")))?;
                        o.set_user_data(Rc::new(re))?;
                        Ok(Value::nil())
                    }),
                ),
                // Submatch byte offsets of the first match, as
                // [start, end, group1-start, group1-end, ...]; false when
                // the pattern does not match.
                mslot(
                    "match",
                    nat1(|o, src| {
                        let re = regex_of(o)?;
                        match re.captures(src.to_str()?) {
                            None => Ok(Value::bool_of(false)),
                            Some(caps) => {
                                let mut out = Vec::new();
                                for g in caps.iter() {
                                    match g {
                                        Some(m) => {
                                            out.push(Value::int(m.start() as i64));
                                            out.push(Value::int(m.end() as i64));
                                        }
                                        None => {
                                            out.push(Value::int(-1));
                                            out.push(Value::int(-1));
                                        }
                                    }
                                }
                                Ok(Value::array(out))
                            }
                        }
                    }),
                ),
                mslot(
                    "find",
                    nat1(|o, src| {
                        let re = regex_of(o)?;
                        match re.find(src.to_str()?) {
                            None => Ok(Value::bool_of(false)),
                            Some(m) => Ok(Value::str(m.as_str())),
                        }
                    }),
                ),
                mslot(
                    "replace",
                    nat2(|o, src, rep| {
                        let re = regex_of(o)?;
                        Ok(Value::str(
                            re.replace_all(src.to_str()?, rep.to_str()?).into_owned(),
                        ))
                    }),
                ),
                mslot(
                    "split",
                    nat1(|o, src| {
                        let re = regex_of(o)?;
                        Ok(Value::array(
                            re.split(src.to_str()?).map(Value::str).collect(),
                        ))
                    }),
                ),
            ],
        )?;
        Ok(vec![("Regex".to_string(), regex_class.object())])
    });
}
