// transcript-core - Compiler for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The bytecode compiler: scope analysis plus code generation.

pub mod analysis;
pub mod codegen;

pub use codegen::compile_program;
