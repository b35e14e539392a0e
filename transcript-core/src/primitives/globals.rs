// transcript-core - Global functions for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The global function environment: printing, error trapping, evaluation,
//! and the accessor-driven sort.

use std::io::BufRead;

use crate::classes::with_classes;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::primitives::{check_arity, error, natv};
use crate::value::Value;

pub fn install(interp: &Interpreter) -> Result<()> {
    let weak = interp.downgrade();

    interp.define(
        "print",
        natv(|_, args| {
            let mut parts = Vec::with_capacity(args.len());
            for x in args {
                parts.push(x.to_display_string());
            }
            println!("{}", parts.join(" "));
            Ok(Value::nil())
        }),
    );

    interp.define(
        "exit",
        natv(|_, args| {
            let code = match args.len() {
                0 => 0,
                1 => args[0].to_int()? as i32,
                n => return Err(Error::arity(n)),
            };
            std::process::exit(code);
        }),
    );

    interp.define(
        "throw",
        natv(|_, args| {
            check_arity(args, 1)?;
            Err(Error::Thrown(args[0].clone()))
        }),
    );

    // Runs the thunk; a fault comes back as the wrapped Error object, a
    // normal completion as the canonical false.
    interp.define(
        "catch",
        natv(|_, args| {
            check_arity(args, 1)?;
            match dispatch::call_value(&args[0], &[]) {
                Ok(_) => Ok(Value::bool_of(false)),
                Err(Error::Thrown(v)) => Ok(v),
                Err(e) => Ok(error::error_object(e.to_string())),
            }
        }),
    );

    interp.define("done", with_classes(|c| c.done.clone()));

    interp.define(
        "read",
        natv(|_, args| {
            check_arity(args, 0)?;
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| Error::io("read", None, e))?;
            Ok(Value::str(line))
        }),
    );

    let w = weak.clone();
    interp.define(
        "names",
        natv(move |_, args| {
            check_arity(args, 0)?;
            let interp = w.upgrade()?;
            let names = interp.list_defined();
            Ok(Value::array(names.into_iter().map(Value::str).collect()))
        }),
    );

    let w = weak.clone();
    interp.define(
        "eval",
        natv(move |_, args| {
            check_arity(args, 1)?;
            let interp = w.upgrade()?;
            interp.eval(args[0].to_str()?)
        }),
    );

    let w = weak.clone();
    interp.define(
        "load",
        natv(move |_, args| {
            check_arity(args, 1)?;
            let interp = w.upgrade()?;
            interp.load(args[0].to_str()?)?;
            Ok(Value::nil())
        }),
    );

    let w = weak.clone();
    interp.define(
        "loadExtension",
        natv(move |_, args| {
            check_arity(args, 1)?;
            let interp = w.upgrade()?;
            interp.load_extension(args[0].to_str()?)
        }),
    );

    // Insertion sort over the collection protocol: any object providing
    // size, __aget__, __aset__, and elements ordered by __lt__ sorts.
    let size_a = interp.accessor("size");
    let aget_a = interp.accessor("__aget__");
    let aset_a = interp.accessor("__aset__");
    let lt_a = interp.accessor("__lt__");
    interp.define(
        "sort",
        natv(move |_, args| {
            check_arity(args, 1)?;
            let coll = &args[0];
            let len = dispatch::object_get(coll, Some(&size_a), None)?.to_int()?;
            let at = |i: i64| -> Result<Value> {
                dispatch::call_via_accessor(coll, &aget_a, &[Value::int(i)])
            };
            let put = |i: i64, v: Value| -> Result<()> {
                dispatch::call_via_accessor(coll, &aset_a, &[Value::int(i), v])?;
                Ok(())
            };
            for i in 1..len {
                let x = at(i)?;
                let mut j = i;
                while j > 0 {
                    let y = at(j - 1)?;
                    let less = dispatch::call_via_accessor(&x, &lt_a, &[y.clone()])?;
                    if less.is_false() {
                        break;
                    }
                    put(j, y)?;
                    j -= 1;
                }
                put(j, x)?;
            }
            Ok(Value::nil())
        }),
    );

    Ok(())
}
