// transcript-core - Extension packages for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Native extension packages, importable by name: `math`, `re`, `system`,
//! and `text`. Each registers a builder that the package table invokes on
//! first import.

pub mod math;
pub mod re;
pub mod system;
pub mod text;

use crate::interpreter::Interpreter;

/// Register the standard extension packages.
pub fn register_std(interp: &Interpreter) {
    math::register(interp);
    re::register(interp);
    system::register(interp);
    text::register(interp);
}
