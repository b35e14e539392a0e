// transcript-core - String class for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The String class. Strings are immutable; indexing is by character.

use crate::class::Slot;
use crate::error::{Error, Result};
use crate::primitives::{check_arity, mslot, nat0, nat1, nat2, natv, prop_slot};
use crate::value::Value;

fn trim_set(args: &[Value]) -> Result<String> {
    match args.len() {
        0 => Ok(" \n\t".to_string()),
        1 => Ok(args[0].to_str()?.to_string()),
        n => Err(Error::arity(n)),
    }
}

pub fn string_slots() -> Vec<Slot> {
    vec![
        mslot("copy", nat0(|o| Ok(o.clone()))),
        mslot(
            "split",
            natv(|o, args| {
                let s = o.to_str()?;
                let parts: Vec<Value> = match args.len() {
                    0 => s.chars().map(|c| Value::str(c.to_string())).collect(),
                    1 => {
                        let sep = args[0].to_str()?;
                        if sep.is_empty() {
                            s.chars().map(|c| Value::str(c.to_string())).collect()
                        } else {
                            s.split(sep).map(Value::str).collect()
                        }
                    }
                    n => return Err(Error::arity(n)),
                };
                Ok(Value::array(parts))
            }),
        ),
        mslot("toString", nat0(|o| Ok(o.clone()))),
        mslot(
            "toInt",
            nat0(|o| {
                let s = o.to_str()?;
                s.parse::<i64>()
                    .map(Value::int)
                    .map_err(|_| Error::Other(format!("bad integer: {s}")))
            }),
        ),
        mslot(
            "toFloat",
            nat0(|o| {
                let s = o.to_str()?;
                s.parse::<f64>()
                    .map(Value::float)
                    .map_err(|_| Error::Other(format!("bad number: {s}")))
            }),
        ),
        mslot(
            "toNumber",
            nat0(|o| {
                let s = o.to_str()?;
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Value::int(i));
                }
                s.parse::<f64>()
                    .map(Value::float)
                    .map_err(|_| Error::Other(format!("bad number: {s}")))
            }),
        ),
        mslot(
            "toBuffer",
            nat0(|o| Ok(Value::buffer(o.to_str()?.as_bytes().to_vec()))),
        ),
        mslot(
            "startsWith",
            nat1(|o, s| Ok(Value::bool_of(o.to_str()?.starts_with(s.to_str()?)))),
        ),
        mslot(
            "endsWith",
            nat1(|o, s| Ok(Value::bool_of(o.to_str()?.ends_with(s.to_str()?)))),
        ),
        mslot(
            "contains",
            nat1(|o, s| Ok(Value::bool_of(o.to_str()?.contains(s.to_str()?)))),
        ),
        mslot(
            "matches",
            nat1(|o, s| {
                let re = regex::Regex::new(s.to_str()?)
                    .map_err(|e| Error::Other(format!("bad pattern: {e}")))?;
                Ok(Value::bool_of(re.is_match(o.to_str()?)))
            }),
        ),
        mslot(
            "subst",
            natv(|o, args| {
                let mut res = String::new();
                let mut i = 0;
                let mut in_subst = false;
                for c in o.to_str()?.chars() {
                    if c == '%' {
                        if in_subst {
                            res.push('%');
                            in_subst = false;
                        } else {
                            in_subst = true;
                        }
                    } else {
                        if in_subst {
                            let arg = args.get(i).ok_or_else(|| Error::arity(args.len()))?;
                            res.push_str(&arg.to_display_string());
                            i += 1;
                            in_subst = false;
                        }
                        res.push(c);
                    }
                }
                if in_subst {
                    let arg = args.get(i).ok_or_else(|| Error::arity(args.len()))?;
                    res.push_str(&arg.to_display_string());
                }
                Ok(Value::str(res))
            }),
        ),
        mslot(
            "replace",
            nat2(|o, from, to| {
                Ok(Value::str(o.to_str()?.replace(from.to_str()?, to.to_str()?)))
            }),
        ),
        prop_slot(
            "size",
            nat0(|o| Ok(Value::int(o.to_str()?.chars().count() as i64))),
            Value::nil(),
        ),
        mslot(
            "trim",
            natv(|o, args| {
                let set = trim_set(args)?;
                Ok(Value::str(
                    o.to_str()?.trim_matches(|c| set.contains(c)).to_string(),
                ))
            }),
        ),
        mslot(
            "trimLeft",
            natv(|o, args| {
                let set = trim_set(args)?;
                Ok(Value::str(
                    o.to_str()?
                        .trim_start_matches(|c| set.contains(c))
                        .to_string(),
                ))
            }),
        ),
        mslot(
            "trimRight",
            natv(|o, args| {
                let set = trim_set(args)?;
                Ok(Value::str(
                    o.to_str()?
                        .trim_end_matches(|c| set.contains(c))
                        .to_string(),
                ))
            }),
        ),
        mslot("quote", nat0(|o| Ok(Value::str(format!("{:?}", o.to_str()?))))),
        mslot(
            "unquote",
            nat0(|o| {
                let s = o.to_str()?;
                unquote(s).map(Value::str)
            }),
        ),
        mslot(
            "charCode",
            nat0(|o| {
                let c = o
                    .to_str()?
                    .chars()
                    .next()
                    .ok_or_else(|| Error::Other("malformed string".into()))?;
                Ok(Value::int(c as i64))
            }),
        ),
        mslot(
            "__add__",
            nat1(|o, s| Ok(Value::str(format!("{}{}", o.to_str()?, s.to_str()?)))),
        ),
        mslot(
            "__eq__",
            nat1(|o, s| match s.to_str() {
                Ok(t) => Ok(Value::bool_of(o.to_str()? == t)),
                Err(_) => Ok(Value::bool_of(false)),
            }),
        ),
        mslot("__lt__", str_cmp(|a, b| a < b)),
        mslot("__lte__", str_cmp(|a, b| a <= b)),
        mslot("__gt__", str_cmp(|a, b| a > b)),
        mslot("__gte__", str_cmp(|a, b| a >= b)),
        mslot(
            "__aget__",
            natv(|o, args| {
                check_arity(args, 1)?;
                let idx = args[0].to_int()?;
                if idx < 0 {
                    return Err(Error::IndexOutOfRange(idx));
                }
                match o.to_str()?.chars().nth(idx as usize) {
                    Some(c) => Ok(Value::str(c.to_string())),
                    None => Err(Error::IndexOutOfRange(idx)),
                }
            }),
        ),
    ]
}

fn str_cmp(f: fn(&str, &str) -> bool) -> Value {
    nat1(move |o, s| Ok(Value::bool_of(f(o.to_str()?, s.to_str()?))))
}

/// Decode a quoted string literal: the inverse of `quote`.
fn unquote(s: &str) -> Result<String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| Error::Other("bad quoted string".into()))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('u') => {
                // accept both \u{...} and \uXXXX
                let mut hex = String::new();
                let mut peeked = chars.clone();
                if peeked.next() == Some('{') {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                } else {
                    hex = chars.by_ref().take(4).collect();
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| Error::Other("bad quoted string".into()))?;
                out.push(char::from_u32(code).ok_or_else(|| Error::Other("bad quoted string".into()))?);
            }
            _ => return Err(Error::Other("bad quoted string".into())),
        }
    }
    Ok(out)
}
