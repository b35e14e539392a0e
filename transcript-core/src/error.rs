// transcript-core - Error types for the TranScript runtime
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error types for compilation and execution.
//!
//! Faults raised inside the VM are plain `Error` values until they cross a
//! frame boundary, at which point the process wraps them into an instance of
//! the language-level `Error` class annotated with the current source file
//! and line, and carries that object in `Error::Thrown`. `catch` converts a
//! `Thrown` back into the carried object.

use std::fmt;

use transcript_parser::ParseError;

use crate::value::Value;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during compilation or execution.
#[derive(Debug, Clone)]
pub enum Error {
    /// Read or write of an undefined variable.
    UndefinedVariable(String),
    /// Accessor lookup failed and the failure hook re-raised.
    UndefinedSlot { class: String, name: String },
    /// Wrong number of arguments to a function.
    ArityError(usize),
    /// A primitive entry point was handed the wrong class of value.
    WrongType(String),
    /// Read of a write-only or non-readable slot.
    NotReadable,
    /// Write of a read-only or non-writable slot.
    NotWritable,
    /// Call of a slot that cannot be called.
    NotCallable,
    /// A class declaration would incompatibly redefine an inherited slot.
    CannotShadow { class: String, name: String },
    /// Extension of a final class.
    FinalClass(String),
    /// Instantiation of a primitive class.
    PrimitiveClass(String),
    /// Invocation of a method a descendant was supposed to provide.
    AbstractMethod { class: String, name: String },
    /// `super` used without a static slot hint.
    SuperWithoutOverride,
    /// `super` on a slot the ancestor does not define.
    SuperMissing { class: String, name: String },
    /// Hash lookup of an absent key.
    MissingKey(String),
    /// Subscript out of range.
    IndexOutOfRange(i64),
    /// Compile-time error (annotated with position where available).
    Compile(String),
    /// Parse error from `transcript-parser`.
    Parse(String),
    /// Malformed compiled-unit stream.
    BadUnit(String),
    /// A user-thrown value, or a VM fault already wrapped into a
    /// language-level `Error` object.
    Thrown(Value),
    /// I/O failure.
    Io {
        operation: &'static str,
        path: Option<String>,
        message: String,
    },
    /// Division by zero in integer arithmetic.
    DivisionByZero,
    /// Any other runtime failure.
    Other(String),
    /// Invariant violation inside the runtime.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UndefinedVariable(name) => write!(f, "undefined variable: {name}"),
            Error::UndefinedSlot { class, name } => write!(f, "undefined: {class}.{name}"),
            Error::ArityError(got) => write!(f, "wrong number of arguments {got}"),
            Error::WrongType(class) => write!(f, "wrong type: {class}"),
            Error::NotReadable => write!(f, "invalid location for reading"),
            Error::NotWritable => write!(f, "invalid location for writing"),
            Error::NotCallable => write!(f, "invalid location for calling"),
            Error::CannotShadow { class, name } => write!(f, "cannot shadow {class}.{name}"),
            Error::FinalClass(name) => write!(f, "class is final: {name}"),
            Error::PrimitiveClass(name) => write!(f, "class is primitive: {name}"),
            Error::AbstractMethod { class, name } => write!(f, "abstract method: {class}.{name}"),
            Error::SuperWithoutOverride => {
                write!(f, "only use super with methods you have overridden")
            }
            Error::SuperMissing { class, name } => {
                write!(f, "not present on ancestor: {class}.{name}")
            }
            Error::MissingKey(key) => write!(f, "missing value: {key}"),
            Error::IndexOutOfRange(i) => write!(f, "index out of range: {i}"),
            Error::Compile(msg) => write!(f, "{msg}"),
            Error::Parse(msg) => write!(f, "{msg}"),
            Error::BadUnit(msg) => write!(f, "{msg}"),
            Error::Thrown(v) => write!(f, "{}", v.describe()),
            Error::Io {
                operation,
                path,
                message,
            } => match path {
                Some(p) => write!(f, "{operation} '{p}': {message}"),
                None => write!(f, "{operation}: {message}"),
            },
            Error::DivisionByZero => write!(f, "division by zero"),
            Error::Other(msg) => write!(f, "{msg}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<crate::binary::LoadError> for Error {
    fn from(e: crate::binary::LoadError) -> Self {
        Error::BadUnit(e.to_string())
    }
}

impl Error {
    /// Create a wrong-argument-count error.
    pub fn arity(got: usize) -> Self {
        Error::ArityError(got)
    }

    /// Create a wrong-type error naming the offending value's class.
    pub fn wrong_type(v: &Value) -> Self {
        Error::WrongType(v.class_name())
    }

    /// Create an I/O error from a `std::io::Error`.
    pub fn io(operation: &'static str, path: Option<String>, error: std::io::Error) -> Self {
        Error::Io {
            operation,
            path,
            message: error.to_string(),
        }
    }

    /// Create a compile error annotated with a source position.
    pub fn compile_at(pos: &transcript_parser::Pos, message: impl fmt::Display) -> Self {
        Error::Compile(format!("{pos}: {message}"))
    }
}
