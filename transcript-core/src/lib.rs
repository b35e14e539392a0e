// transcript-core - Compiler, VM, and object runtime for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The TranScript execution engine.
//!
//! TranScript is a small dynamic object-oriented language: first-class
//! functions, classes with single inheritance, properties, private slots,
//! proper tail calls, and closures with mutable captures. This crate
//! contains everything between source text and effects: the bytecode
//! compiler, the compiled-unit model with its binary format, the stack VM,
//! the class/accessor dispatch runtime, the primitive class library, and
//! the `Interpreter` host interface.
//!
//! ```rust
//! use transcript_core::Interpreter;
//!
//! let interp = Interpreter::new().unwrap();
//! let v = interp.eval("1 + 2").unwrap();
//! assert_eq!(v.to_int().unwrap(), 3);
//! ```
//!
//! The crate is single-threaded by design: values are `Rc`-shared and an
//! interpreter must stay on the thread that created it.

pub mod accessor;
pub mod binary;
pub mod class;
pub mod classes;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod ext;
pub mod interpreter;
pub mod opcode;
pub mod primitives;
pub mod process;
pub mod unit;
pub mod value;

pub use accessor::Accessor;
pub use binary::LoadError;
pub use class::{Class, FINAL, PRIMITIVE, Skeleton, Slot, SlotKind, SlotVis, USER_DATA};
pub use error::{Error, Result};
pub use interpreter::{ExtensionFn, Interpreter, WeakInterpreter};
pub use opcode::{Op, SLOT_UNKNOWN};
pub use process::{Frame, Process};
pub use unit::Unit;
pub use value::{Closure, FuncData, HashItem, HashKey, Payload, Value};
