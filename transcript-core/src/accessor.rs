// transcript-core - Accessors for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Accessors: interned member names used for dynamic dispatch.
//!
//! An accessor carries a list of (declaring class, slot) entries, more
//! specific classes first. Lookup is a linear scan with first match win;
//! tables are small (one entry per class declaring the name), so a scan
//! beats any index.

use std::cell::RefCell;
use std::rc::Rc;

use crate::class::{Class, Slot};
use crate::value::Value;

struct AccessorData {
    name: String,
    entries: RefCell<Vec<Slot>>,
}

/// A shared, interned member name. Clone is cheap; equality is identity.
#[derive(Clone)]
pub struct Accessor(Rc<AccessorData>);

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Accessor {
    /// Create an accessor. Interning is the interpreter's job; an accessor
    /// created here is not shared with anything.
    pub fn new(name: impl Into<String>) -> Accessor {
        Accessor(Rc::new(AccessorData {
            name: name.into(),
            entries: RefCell::new(Vec::new()),
        }))
    }

    /// The accessor's name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Find the entry for a receiver: the first entry whose declaring class
    /// is an ancestor of (or is) the receiver's class.
    pub fn lookup(&self, receiver: &Value) -> Option<Slot> {
        let class = receiver.class();
        self.lookup_declared(&class)
    }

    /// Find the entry a class would dispatch to.
    pub fn lookup_declared(&self, class: &Rc<Class>) -> Option<Slot> {
        let entries = self.0.entries.borrow();
        for e in entries.iter() {
            if let Some(owner) = &e.owner {
                if class.is(owner) {
                    return Some(e.clone());
                }
            }
        }
        None
    }

    /// For anonymous-class memoisation: the class previously materialised
    /// under this accessor for the exact ancestor `c`, if any.
    pub fn lookup_memo(&self, c: &Rc<Class>) -> Option<Rc<Class>> {
        let entries = self.0.entries.borrow();
        for e in entries.iter() {
            if let Some(owner) = &e.owner {
                if Rc::ptr_eq(owner, c) {
                    return e.value.to_class().ok();
                }
            }
        }
        None
    }

    /// Record a memoised anonymous class for the ancestor `c`.
    pub fn push_memo(&self, c: &Rc<Class>, class_obj: Value) {
        let mut slot = Slot::new("", crate::class::SlotKind::Field, crate::class::SlotVis::Private, class_obj);
        slot.owner = Some(c.clone());
        self.0.entries.borrow_mut().push(slot);
    }

    /// Append a public slot entry (installation only).
    pub fn push(&self, slot: Slot) {
        self.0.entries.borrow_mut().push(slot);
    }

    /// Number of entries (used by introspection).
    pub fn entry_count(&self) -> usize {
        self.0.entries.borrow().len()
    }

    /// A snapshot of the entries (used by introspection).
    pub fn entries(&self) -> Vec<Slot> {
        self.0.entries.borrow().clone()
    }
}
