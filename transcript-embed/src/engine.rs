// transcript-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding TranScript.

use std::path::Path;

use transcript_core::{Error, Interpreter, Result, Value};

use crate::convert::{FromValue, IntoValue};

/// The TranScript scripting engine.
///
/// `Engine` provides a high-level interface for evaluating TranScript
/// code, registering Rust functions, and reading global state.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** Values are `Rc`-shared internally. Do
/// not move an `Engine` between threads; create one per thread instead.
///
/// # Example
///
/// ```rust
/// use transcript_embed::Engine;
///
/// let engine = Engine::new().unwrap();
/// let result = engine.eval("1 + 2 * 3").unwrap();
/// assert_eq!(result.to_int().unwrap(), 7);
/// ```
pub struct Engine {
    interp: Interpreter,
}

impl Engine {
    /// Create a new Engine with the default environment.
    pub fn new() -> Result<Self> {
        Ok(Engine {
            interp: Interpreter::new()?,
        })
    }

    /// The underlying interpreter, for host code that needs the full
    /// surface (accessors, class extension, unit execution).
    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// Evaluate a string of TranScript code and return the last value.
    ///
    /// # Errors
    ///
    /// Returns an error if the code fails to parse or compile, if
    /// evaluation faults, or if a thrown value is never caught.
    ///
    /// # Example
    ///
    /// ```rust
    /// use transcript_embed::Engine;
    ///
    /// let engine = Engine::new().unwrap();
    /// let result = engine.eval("def x = 21; x + x;").unwrap();
    /// assert_eq!(result.to_int().unwrap(), 42);
    /// ```
    pub fn eval(&self, code: &str) -> Result<Value> {
        self.interp.eval(code)
    }

    /// Evaluate a file of TranScript code (source or compiled unit).
    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        self.interp.load(path)
    }

    /// Get a global's value. `None` if the name is not defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.interp.get(name).ok()
    }

    /// Get a typed global. `None` if undefined or not convertible.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Define a global from a Rust value.
    pub fn set(&self, name: &str, v: impl IntoValue) {
        self.interp.define(name, v.into_value());
    }

    /// Register a native function under a global name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use transcript_embed::{Engine, Value};
    ///
    /// let engine = Engine::new().unwrap();
    /// engine.register_native("double", |args| {
    ///     let n = args
    ///         .first()
    ///         .ok_or_else(|| transcript_embed::Error::ArityError(0))?
    ///         .to_int()?;
    ///     Ok(Value::int(n * 2))
    /// });
    /// let result = engine.eval("double(21)").unwrap();
    /// assert_eq!(result.to_int().unwrap(), 42);
    /// ```
    pub fn register_native(
        &self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) {
        let v = transcript_core::primitives::natv(move |_, args| f(args));
        self.interp.define(name, v);
    }

    /// Call a defined global function with Rust-side arguments.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .interp
            .get(name)
            .map_err(|_| Error::UndefinedVariable(name.to_string()))?;
        transcript_core::dispatch::call_value(&f, args)
    }

    /// Import a package and return it.
    pub fn import(&self, name: &str) -> Result<Value> {
        self.interp.import(name)
    }
}
