// transcript-embed - Embedding API for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # transcript-embed
//!
//! A high-level embedding API for the TranScript programming language.
//!
//! This crate provides a simple, ergonomic interface for embedding
//! TranScript in Rust applications. It handles environment setup, type
//! conversion, and native-function registration.
//!
//! ## Quick Start
//!
//! ```rust
//! use transcript_embed::Engine;
//!
//! let engine = Engine::new().unwrap();
//! let result = engine.eval("1 + 2 + 3").unwrap();
//! assert_eq!(result.to_int().unwrap(), 6);
//! ```
//!
//! ## Registering Native Functions
//!
//! ```rust
//! use transcript_embed::{Engine, Value};
//!
//! let engine = Engine::new().unwrap();
//! engine.register_native("greet", |args| {
//!     let name = args.first().map(|v| v.to_display_string()).unwrap_or_default();
//!     Ok(Value::str(format!("hello, {name}")))
//! });
//! let result = engine.eval("greet(\"world\")").unwrap();
//! assert_eq!(result.to_str().unwrap(), "hello, world");
//! ```

mod convert;
mod engine;

pub use convert::{FromValue, IntoValue, from_value, to_value};
pub use engine::Engine;

// Re-export core types for convenience
pub use transcript_core::{Error, Result, Value};
