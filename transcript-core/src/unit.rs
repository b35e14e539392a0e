// transcript-core - Compiled units for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiled units.
//!
//! A unit owns code blocks (block 0 is the top level, later blocks are
//! function bodies), a constant pool (`nil`, `true`, `false` always occupy
//! indices 0..2), a global-name table, and an accessor-name table. Before
//! execution the unit is linked against an interpreter, resolving each
//! global name to its box and each accessor name to the shared accessor.

use std::cell::RefCell;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::value::{Payload, Value};

/// A compiled unit.
pub struct Unit {
    blocks: RefCell<Vec<Rc<Vec<u16>>>>,
    consts: RefCell<Vec<Value>>,
    global_names: RefCell<Vec<String>>,
    accessor_names: RefCell<Vec<String>>,
    // Link tables, filled by `link`.
    globals: RefCell<Vec<Value>>,
    accessors: RefCell<Vec<Accessor>>,
}

impl Unit {
    /// Create an empty unit: one empty top-level block and the three
    /// canonical constants.
    pub fn new() -> Unit {
        Unit {
            blocks: RefCell::new(vec![Rc::new(Vec::new())]),
            consts: RefCell::new(vec![
                Value::nil(),
                Value::bool_of(true),
                Value::bool_of(false),
            ]),
            global_names: RefCell::new(Vec::new()),
            accessor_names: RefCell::new(Vec::new()),
            globals: RefCell::new(Vec::new()),
            accessors: RefCell::new(Vec::new()),
        }
    }

    // ========================================================================
    // Compiler interface
    // ========================================================================

    /// Index of the named global, creating the table entry if needed.
    pub fn get_global(&self, name: &str) -> u16 {
        let mut names = self.global_names.borrow_mut();
        if let Some(i) = names.iter().position(|n| n == name) {
            return i as u16;
        }
        names.push(name.to_string());
        names.len() as u16 - 1
    }

    /// Index of the named accessor, creating the table entry if needed.
    /// The empty name is never deduplicated: each anonymous-class site gets
    /// its own memo accessor.
    pub fn get_accessor(&self, name: &str) -> u16 {
        let mut names = self.accessor_names.borrow_mut();
        if !name.is_empty() {
            if let Some(i) = names.iter().position(|n| n == name) {
                return i as u16;
            }
        }
        names.push(name.to_string());
        names.len() as u16 - 1
    }

    /// Index of a constant, deduplicating primitives by value.
    pub fn get_const(&self, v: Value) -> u16 {
        let mut consts = self.consts.borrow_mut();
        if let Some(i) = consts.iter().position(|x| const_eq(x, &v)) {
            return i as u16;
        }
        consts.push(v);
        consts.len() as u16 - 1
    }

    /// Append a function body block, returning its index.
    pub fn add_block(&self, code: Vec<u16>) -> usize {
        let mut blocks = self.blocks.borrow_mut();
        blocks.push(Rc::new(code));
        blocks.len() - 1
    }

    /// Append code to the top-level block.
    pub fn extend_toplevel(&self, code: &[u16]) {
        let mut blocks = self.blocks.borrow_mut();
        let mut top = (*blocks[0]).clone();
        top.extend_from_slice(code);
        blocks[0] = Rc::new(top);
    }

    /// Length of the top-level block (the offset for incremental
    /// compilation).
    pub fn toplevel_len(&self) -> usize {
        self.blocks.borrow()[0].len()
    }

    // ========================================================================
    // Execution interface
    // ========================================================================

    /// A code block by index.
    pub fn block(&self, i: usize) -> Result<Rc<Vec<u16>>> {
        self.blocks
            .borrow()
            .get(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("bad code block {i}")))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.borrow().len()
    }

    /// A constant by index.
    pub fn const_value(&self, i: usize) -> Result<Value> {
        self.consts
            .borrow()
            .get(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("bad constant index {i}")))
    }

    pub fn const_count(&self) -> usize {
        self.consts.borrow().len()
    }

    /// A linked global box by index.
    pub fn global(&self, i: usize) -> Result<Value> {
        self.globals
            .borrow()
            .get(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("unit not linked (global {i})")))
    }

    /// A linked accessor by index.
    pub fn accessor(&self, i: usize) -> Result<Accessor> {
        self.accessors
            .borrow()
            .get(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("unit not linked (accessor {i})")))
    }

    /// Snapshot of the linked accessor table (class installation).
    pub fn accessors_snapshot(&self) -> Vec<Accessor> {
        self.accessors.borrow().clone()
    }

    /// Resolve the name tables against an interpreter. Safe to repeat; the
    /// last link wins.
    pub fn link(&self, interp: &Interpreter) {
        let globals = self
            .global_names
            .borrow()
            .iter()
            .map(|n| interp.lookup(n))
            .collect();
        *self.globals.borrow_mut() = globals;
        let accessors = self
            .accessor_names
            .borrow()
            .iter()
            .map(|n| interp.accessor(n))
            .collect();
        *self.accessors.borrow_mut() = accessors;
    }

    /// Copy the unit with fresh link tables. Use copies to run one unit
    /// against several interpreters.
    pub fn copy(&self) -> Unit {
        Unit {
            blocks: RefCell::new(self.blocks.borrow().clone()),
            consts: RefCell::new(self.consts.borrow().clone()),
            global_names: RefCell::new(self.global_names.borrow().clone()),
            accessor_names: RefCell::new(self.accessor_names.borrow().clone()),
            globals: RefCell::new(Vec::new()),
            accessors: RefCell::new(Vec::new()),
        }
    }

    // Table snapshots for the binary writer.

    pub fn global_names(&self) -> Vec<String> {
        self.global_names.borrow().clone()
    }

    pub fn accessor_names(&self) -> Vec<String> {
        self.accessor_names.borrow().clone()
    }

    pub fn blocks_snapshot(&self) -> Vec<Rc<Vec<u16>>> {
        self.blocks.borrow().clone()
    }

    pub fn consts_snapshot(&self) -> Vec<Value> {
        self.consts.borrow().clone()
    }

    /// Rebuild a unit from loaded parts (the binary reader).
    pub(crate) fn from_parts(
        blocks: Vec<Vec<u16>>,
        consts: Vec<Value>,
        global_names: Vec<String>,
        accessor_names: Vec<String>,
    ) -> Unit {
        Unit {
            blocks: RefCell::new(blocks.into_iter().map(Rc::new).collect()),
            consts: RefCell::new(consts),
            global_names: RefCell::new(global_names),
            accessor_names: RefCell::new(accessor_names),
            globals: RefCell::new(Vec::new()),
            accessors: RefCell::new(Vec::new()),
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::new()
    }
}

/// Structural equality for constant-pool deduplication. Strings, ints and
/// floats compare by value; everything else by identity (skeletons are
/// always distinct).
fn const_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a.payload(), b.payload()) {
        (Payload::Int(x), Payload::Int(y)) => x == y,
        (Payload::Float(x), Payload::Float(y)) => x.to_bits() == y.to_bits(),
        (Payload::Str(x), Payload::Str(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_constants() {
        let u = Unit::new();
        assert_eq!(u.const_count(), 3);
        assert!(u.const_value(0).unwrap().is_nil());
        assert!(u.const_value(2).unwrap().is_false());
    }

    #[test]
    fn test_constants_deduplicate_by_value() {
        let u = Unit::new();
        let a = u.get_const(Value::int(9000));
        let b = u.get_const(Value::int(9000));
        assert_eq!(a, b);
        let s1 = u.get_const(Value::str("x"));
        let s2 = u.get_const(Value::str("x"));
        assert_eq!(s1, s2);
        assert_ne!(u.get_const(Value::int(1)), u.get_const(Value::float(1.0)));
    }

    #[test]
    fn test_global_and_accessor_tables() {
        let u = Unit::new();
        assert_eq!(u.get_global("a"), 0);
        assert_eq!(u.get_global("b"), 1);
        assert_eq!(u.get_global("a"), 0);
        assert_eq!(u.get_accessor("m"), 0);
        assert_eq!(u.get_accessor("m"), 0);
        // anonymous accessors never deduplicate
        let a1 = u.get_accessor("");
        let a2 = u.get_accessor("");
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_blocks() {
        let u = Unit::new();
        assert_eq!(u.block_count(), 1);
        let ix = u.add_block(vec![1, 2, 3]);
        assert_eq!(ix, 1);
        u.extend_toplevel(&[7, 8]);
        assert_eq!(u.toplevel_len(), 2);
        assert_eq!(*u.block(1).unwrap(), vec![1, 2, 3]);
    }
}
