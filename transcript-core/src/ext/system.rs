// transcript-core - system extension package for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The `system` package: files, byte streams, command-line arguments, and
//! the process environment.
//!
//! `File.read`, `File.write`, and `File.append` wrap the resource's use in
//! a thunk and guarantee the file is closed on all exit paths, faults
//! included; they return whatever the thunk returns.

use std::cell::RefCell;
use std::fs;
use std::io::{Read, Write};
use std::rc::Rc;

use crate::class::{Class, USER_DATA};
use crate::classes::with_classes;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::primitives::{fslot, hash, mslot, nat0, nat1};
use crate::value::Value;

/// What a stream object wraps.
enum StreamIo {
    File(Option<fs::File>),
    Stdin,
    Stdout,
}

fn stream_of(o: &Value) -> Result<Rc<RefCell<StreamIo>>> {
    o.user_data()?
        .downcast::<RefCell<StreamIo>>()
        .map_err(|_| Error::wrong_type(o))
}

fn new_stream(class: &Rc<Class>, io: StreamIo) -> Result<Value> {
    let s = dispatch::class_new_instance(class, &[])?;
    s.set_user_data(Rc::new(RefCell::new(io)))?;
    Ok(s)
}

// The File path lives in field 0 (File's first and only field).
fn file_path(o: &Value) -> Result<String> {
    Ok(o.field(0).to_str()?.to_string())
}

pub fn register(interp: &Interpreter) {
    interp.register_extension("system", |interp| {
        let object = with_classes(|c| c.object.clone());

        let stream_class = interp.extend_class(
            &object,
            "Stream",
            USER_DATA,
            vec![
                // Fill a buffer; the byte count read, or false at end of
                // input.
                mslot(
                    "readBuffer",
                    nat1(|o, b| {
                        let io = stream_of(o)?;
                        let mut buf = b.to_buffer_mut()?;
                        let n = match &mut *io.borrow_mut() {
                            StreamIo::File(Some(f)) => {
                                f.read(&mut buf).map_err(|e| Error::io("read", None, e))?
                            }
                            StreamIo::Stdin => std::io::stdin()
                                .read(&mut buf)
                                .map_err(|e| Error::io("read", None, e))?,
                            StreamIo::File(None) => {
                                return Err(Error::Other("stream is closed".into()));
                            }
                            StreamIo::Stdout => {
                                return Err(Error::Other("wrong stream direction".into()));
                            }
                        };
                        if n == 0 && !buf.is_empty() {
                            return Ok(Value::bool_of(false));
                        }
                        Ok(Value::int(n as i64))
                    }),
                ),
                mslot(
                    "writeBuffer",
                    nat1(|o, b| {
                        let io = stream_of(o)?;
                        let buf = b.to_buffer()?;
                        let n = match &mut *io.borrow_mut() {
                            StreamIo::File(Some(f)) => {
                                f.write(&buf).map_err(|e| Error::io("write", None, e))?
                            }
                            StreamIo::Stdout => std::io::stdout()
                                .write(&buf)
                                .map_err(|e| Error::io("write", None, e))?,
                            StreamIo::File(None) => {
                                return Err(Error::Other("stream is closed".into()));
                            }
                            StreamIo::Stdin => {
                                return Err(Error::Other("wrong stream direction".into()));
                            }
                        };
                        Ok(Value::int(n as i64))
                    }),
                ),
                // One byte as an integer, or false at end of input.
                mslot(
                    "readByte",
                    nat0(|o| {
                        let io = stream_of(o)?;
                        let mut byte = [0u8; 1];
                        let n = match &mut *io.borrow_mut() {
                            StreamIo::File(Some(f)) => {
                                f.read(&mut byte).map_err(|e| Error::io("read", None, e))?
                            }
                            StreamIo::Stdin => std::io::stdin()
                                .read(&mut byte)
                                .map_err(|e| Error::io("read", None, e))?,
                            _ => return Err(Error::Other("wrong stream direction".into())),
                        };
                        if n == 0 {
                            return Ok(Value::bool_of(false));
                        }
                        Ok(Value::int(byte[0] as i64))
                    }),
                ),
                mslot(
                    "writeByte",
                    nat1(|o, b| {
                        let io = stream_of(o)?;
                        let byte = [b.to_int()? as u8];
                        match &mut *io.borrow_mut() {
                            StreamIo::File(Some(f)) => f
                                .write_all(&byte)
                                .map_err(|e| Error::io("write", None, e))?,
                            StreamIo::Stdout => std::io::stdout()
                                .write_all(&byte)
                                .map_err(|e| Error::io("write", None, e))?,
                            _ => return Err(Error::Other("wrong stream direction".into())),
                        }
                        Ok(Value::nil())
                    }),
                ),
                mslot(
                    "close",
                    nat0(|o| {
                        let io = stream_of(o)?;
                        if let StreamIo::File(f) = &mut *io.borrow_mut() {
                            *f = None;
                        }
                        Ok(Value::nil())
                    }),
                ),
            ],
        )?;

        let sc_read = stream_class.clone();
        let sc_write = stream_class.clone();
        let sc_append = stream_class.clone();
        let sc_open = stream_class.clone();

        let file_class = interp.extend_class(
            &object,
            "File",
            0,
            vec![
                fslot("path", Value::nil()),
                mslot(
                    "create",
                    nat1(|o, p| {
                        o.set_field(0, p.clone());
                        Ok(Value::nil())
                    }),
                ),
                mslot(
                    "exists",
                    nat0(|o| Ok(Value::bool_of(fs::metadata(file_path(o)?).is_ok()))),
                ),
                mslot(
                    "read",
                    nat1(move |o, f| {
                        let path = file_path(o)?;
                        let file =
                            fs::File::open(&path).map_err(|e| Error::io("open", Some(path), e))?;
                        run_with_stream(&sc_read, StreamIo::File(Some(file)), f)
                    }),
                ),
                mslot(
                    "write",
                    nat1(move |o, f| {
                        let path = file_path(o)?;
                        let file = fs::File::create(&path)
                            .map_err(|e| Error::io("create", Some(path), e))?;
                        run_with_stream(&sc_write, StreamIo::File(Some(file)), f)
                    }),
                ),
                mslot(
                    "append",
                    nat1(move |o, f| {
                        let path = file_path(o)?;
                        let file = fs::OpenOptions::new()
                            .append(true)
                            .create(true)
                            .open(&path)
                            .map_err(|e| Error::io("append", Some(path), e))?;
                        run_with_stream(&sc_append, StreamIo::File(Some(file)), f)
                    }),
                ),
                mslot(
                    "open",
                    nat0(move |o| {
                        let path = file_path(o)?;
                        let file =
                            fs::File::open(&path).map_err(|e| Error::io("open", Some(path), e))?;
                        new_stream(&sc_open, StreamIo::File(Some(file)))
                    }),
                ),
                mslot(
                    "text",
                    nat0(|o| {
                        let path = file_path(o)?;
                        let text = fs::read_to_string(&path)
                            .map_err(|e| Error::io("read", Some(path), e))?;
                        Ok(Value::str(text))
                    }),
                ),
            ],
        )?;

        let env_pairs: Vec<(Value, Value)> = std::env::vars()
            .map(|(k, v)| (Value::str(k), Value::str(v)))
            .collect();

        let weak = interp.downgrade();
        Ok(vec![
            (
                "input".to_string(),
                new_stream(&stream_class, StreamIo::Stdin)?,
            ),
            (
                "output".to_string(),
                new_stream(&stream_class, StreamIo::Stdout)?,
            ),
            ("File".to_string(), file_class.object()),
            (
                "args".to_string(),
                Value::array(std::env::args().map(Value::str).collect()),
            ),
            ("env".to_string(), hash::hash_from_pairs(env_pairs)?),
            (
                "eval".to_string(),
                nat1(move |_, expr| {
                    let interp = weak.upgrade()?;
                    interp.eval(expr.to_str()?)
                }),
            ),
        ])
    });
}

/// Run the thunk with a fresh stream over `io`, closing the stream on
/// every exit path.
fn run_with_stream(stream_class: &Rc<Class>, io: StreamIo, thunk: &Value) -> Result<Value> {
    let s = new_stream(stream_class, io)?;
    let result = dispatch::call_value(thunk, &[s.clone()]);
    if let Ok(data) = stream_of(&s) {
        if let StreamIo::File(f) = &mut *data.borrow_mut() {
            *f = None;
        }
    }
    result
}
