// transcript-core - Classes and slots for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Classes, slots, and class installation.
//!
//! A class owns a declared slot list, a resolved method table, and a field
//! template. Installation walks the ancestor chain once, copies the
//! ancestor's tables, and merges the declared slots: overriding updates an
//! inherited offset in place (so code compiled against the ancestor keeps
//! working), incompatible redefinition is rejected, and only public slots
//! are published to the accessor. Installation is serialised by a
//! process-wide lock.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Mutex;

use crate::accessor::Accessor;
use crate::classes::with_classes;
use crate::error::{Error, Result};
use crate::value::{Payload, Value};

/// Class flags.
pub const FINAL: u32 = 1;
/// The class cannot be instantiated or extended normally.
pub const PRIMITIVE: u32 = 1 << 1;
/// Instances carry opaque host data.
pub const USER_DATA: u32 = 1 << 2;

/// What a slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Field,
    Method,
    Property,
    /// A lexical-parent link for inner-class scoping; consumes no offset.
    Marker,
}

impl SlotKind {
    pub fn from_u16(v: u16) -> Option<SlotKind> {
        Some(match v {
            0 => SlotKind::Field,
            1 => SlotKind::Method,
            2 => SlotKind::Property,
            3 => SlotKind::Marker,
            _ => return None,
        })
    }

    pub fn to_u16(self) -> u16 {
        match self {
            SlotKind::Field => 0,
            SlotKind::Method => 1,
            SlotKind::Property => 2,
            SlotKind::Marker => 3,
        }
    }
}

/// Slot visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotVis {
    Private,
    Public,
}

impl SlotVis {
    pub fn from_u16(v: u16) -> Option<SlotVis> {
        Some(match v {
            0 => SlotVis::Private,
            1 => SlotVis::Public,
            _ => return None,
        })
    }

    pub fn to_u16(self) -> u16 {
        match self {
            SlotVis::Private => 0,
            SlotVis::Public => 1,
        }
    }
}

/// One class member. `owner` and `offset` are resolved at installation.
#[derive(Clone)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
    pub vis: SlotVis,
    /// Field default, method body, or property getter.
    pub value: Value,
    /// Property setter; `nil` otherwise.
    pub setter: Value,
    /// The class that first declared this slot (fills in at installation).
    pub owner: Option<Rc<Class>>,
    /// Offset into the owning class's field or method table.
    pub offset: u16,
    /// Index into the installing unit's accessor table.
    pub access: u16,
    /// For markers, the slot index in the lexical parent; for other slots,
    /// the static-hint chain continuation in the enclosing class.
    pub next: u16,
}

impl Slot {
    /// A slot with everything defaulted except name, kind, and visibility.
    pub fn new(name: impl Into<String>, kind: SlotKind, vis: SlotVis, value: Value) -> Slot {
        Slot {
            name: name.into(),
            kind,
            vis,
            value,
            setter: Value::nil(),
            owner: None,
            offset: 0,
            access: 0,
            next: crate::opcode::SLOT_UNKNOWN,
        }
    }
}

/// The compile-time description of one skeleton slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotSpec {
    pub kind: SlotKind,
    pub vis: SlotVis,
    pub access: u16,
    pub next: u16,
}

/// A frozen description of a class body, carried in a unit's constant pool
/// and materialised into a class when the `class` expression evaluates.
#[derive(Clone)]
pub struct Skeleton {
    pub name: String,
    pub slots: Vec<SlotSpec>,
}

/// A class: name, single-inheritance ancestor, declared slots, resolved
/// tables, and a companion object representing it as a value.
pub struct Class {
    this: Weak<Class>,
    name: RefCell<String>,
    ancestor: Option<Rc<Class>>,
    lexical_parent: RefCell<Option<Rc<Class>>>,
    flags: Cell<u32>,
    installed: Cell<bool>,
    slots: RefCell<Vec<Slot>>,
    methods: RefCell<Vec<Value>>,
    field_defaults: RefCell<Vec<Value>>,
    companion: RefCell<Option<Value>>,
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name.borrow())
            .finish()
    }
}

static CLASS_LOCK: Mutex<()> = Mutex::new(());

impl Class {
    /// Create a bare class. Used by the bootstrap and by `extend`.
    pub fn bare(name: impl Into<String>, ancestor: Option<Rc<Class>>, flags: u32) -> Rc<Class> {
        Rc::new_cyclic(|this| Class {
            this: this.clone(),
            name: RefCell::new(name.into()),
            ancestor,
            lexical_parent: RefCell::new(None),
            flags: Cell::new(flags),
            installed: Cell::new(false),
            slots: RefCell::new(Vec::new()),
            methods: RefCell::new(Vec::new()),
            field_defaults: RefCell::new(Vec::new()),
            companion: RefCell::new(None),
        })
    }

    /// The shared handle to this class.
    pub fn rc(&self) -> Rc<Class> {
        self.this.upgrade().expect("class is reachable")
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    pub fn ancestor(&self) -> Option<Rc<Class>> {
        self.ancestor.clone()
    }

    pub fn lexical_parent(&self) -> Option<Rc<Class>> {
        self.lexical_parent.borrow().clone()
    }

    pub fn set_lexical_parent(&self, p: Option<Rc<Class>>) {
        *self.lexical_parent.borrow_mut() = p;
    }

    pub fn flags(&self) -> u32 {
        self.flags.get()
    }

    pub fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    pub fn installed(&self) -> bool {
        self.installed.get()
    }

    /// Reset the installed flag so the class can be re-installed into a
    /// fresh interpreter's accessor tables.
    pub fn reset_installed(&self) {
        self.installed.set(false);
    }

    /// The class's companion object.
    pub fn object(&self) -> Value {
        self.companion
            .borrow()
            .clone()
            .expect("class companion not initialised")
    }

    pub fn set_companion(&self, v: Value) {
        *self.companion.borrow_mut() = Some(v);
    }

    /// Check whether this class is `d` or one of `d`'s descendants.
    pub fn is(&self, d: &Class) -> bool {
        let mut cur: Option<&Class> = Some(self);
        while let Some(c) = cur {
            if std::ptr::eq(c, d) {
                return true;
            }
            cur = c.ancestor.as_deref();
        }
        false
    }

    /// Number of declared slots.
    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// A declared slot by index.
    pub fn slot(&self, i: usize) -> Option<Slot> {
        self.slots.borrow().get(i).cloned()
    }

    /// Replace the declared slot list. Only sensible before installation.
    pub fn set_slots(&self, slots: Vec<Slot>) {
        *self.slots.borrow_mut() = slots;
    }

    /// Mutate one declared slot in place (class finishing).
    pub fn update_slot(&self, i: usize, f: impl FnOnce(&mut Slot)) {
        f(&mut self.slots.borrow_mut()[i]);
    }

    /// A resolved method-table entry.
    pub fn method(&self, offset: usize) -> Value {
        self.methods.borrow()[offset].clone()
    }

    pub fn method_count(&self) -> usize {
        self.methods.borrow().len()
    }

    pub fn field_default_count(&self) -> usize {
        self.field_defaults.borrow().len()
    }

    /// Create a descendant with the given name, flags, and slots. The class
    /// is not installed; use `Interpreter::add_class` or unit installation.
    pub fn extend(&self, name: impl Into<String>, flags: u32, slots: Vec<Slot>) -> Result<Rc<Class>> {
        if self.flags.get() & FINAL != 0 {
            return Err(Error::FinalClass(self.name()));
        }
        let mut flags = flags;
        if self.flags.get() & USER_DATA != 0 {
            flags |= USER_DATA;
        }
        let c = Class::bare(name, Some(self.rc()), flags);
        c.set_slots(slots);
        let companion = with_classes(|cs| {
            Value::raw(
                cs.class.clone(),
                Payload::Class(c.clone()),
                vec![cs.false_value.clone()],
            )
        });
        c.set_companion(companion);
        Ok(c)
    }

    /// Allocate an uninitialised instance: fresh fields from the template.
    pub fn alloc(&self) -> Result<Value> {
        if self.flags.get() & PRIMITIVE != 0 {
            return Err(Error::PrimitiveClass(self.name()));
        }
        let fields = self.field_defaults.borrow().clone();
        let payload = if self.flags.get() & USER_DATA != 0 {
            Payload::User(RefCell::new(None))
        } else {
            Payload::None
        };
        Ok(Value::raw(self.rc(), payload, fields))
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Install a class (and any uninstalled ancestors), resolving slot offsets
/// against the given accessor table. Serialised by the class lock.
pub fn install(c: &Rc<Class>, accessors: &[Accessor]) -> Result<()> {
    let _guard = CLASS_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    install_inner(c, accessors)
}

fn install_inner(c: &Rc<Class>, accessors: &[Accessor]) -> Result<()> {
    if c.installed.get() {
        return Ok(());
    }
    c.installed.set(true);
    // Start the resolved tables from the ancestor's; a re-installed root
    // starts empty again.
    match &c.ancestor {
        Some(a) => {
            install_inner(a, accessors)?;
            *c.methods.borrow_mut() = a.methods.borrow().clone();
            *c.field_defaults.borrow_mut() = a.field_defaults.borrow().clone();
        }
        None => {
            c.methods.borrow_mut().clear();
            c.field_defaults.borrow_mut().clear();
        }
    }
    let count = c.slots.borrow().len();
    for i in 0..count {
        add_slot(c, i, accessors)?;
    }
    Ok(())
}

fn add_slot(c: &Rc<Class>, index: usize, accessors: &[Accessor]) -> Result<()> {
    let (kind, vis, access) = {
        let slots = c.slots.borrow();
        let e = &slots[index];
        (e.kind, e.vis, e.access)
    };
    if kind == SlotKind::Marker {
        c.slots.borrow_mut()[index].owner = c.lexical_parent();
        return Ok(());
    }
    let a = accessors
        .get(access as usize)
        .ok_or_else(|| Error::Internal(format!("bad accessor index {access}")))?;

    // An inherited definition with the same name either gets overridden in
    // place (same kind, public) or rejects the new slot as shadowing.
    if let Some(f) = a.lookup_declared(c) {
        if kind != f.kind || vis == SlotVis::Private {
            let owner = f.owner.as_ref().map(|o| o.name()).unwrap_or_default();
            let name = {
                let slots = c.slots.borrow();
                slots[index].name.clone()
            };
            let name = if name.is_empty() { a.name().to_string() } else { name };
            return Err(Error::CannotShadow { class: owner, name });
        }
        let (value, setter) = {
            let slots = c.slots.borrow();
            (slots[index].value.clone(), slots[index].setter.clone())
        };
        let table = if kind == SlotKind::Field {
            &c.field_defaults
        } else {
            &c.methods
        };
        {
            let mut table = table.borrow_mut();
            table[f.offset as usize] = value;
            if kind == SlotKind::Property {
                table[f.offset as usize + 1] = setter;
            }
        }
        let mut slots = c.slots.borrow_mut();
        slots[index].offset = f.offset;
        slots[index].owner = f.owner.clone();
        return Ok(());
    }

    // No previous definition: append a new entry.
    let (value, setter) = {
        let slots = c.slots.borrow();
        (slots[index].value.clone(), slots[index].setter.clone())
    };
    let table = if kind == SlotKind::Field {
        &c.field_defaults
    } else {
        &c.methods
    };
    let offset = {
        let mut table = table.borrow_mut();
        let offset = table.len() as u16;
        table.push(value);
        if kind == SlotKind::Property {
            table.push(setter);
        }
        offset
    };
    {
        let mut slots = c.slots.borrow_mut();
        slots[index].offset = offset;
        slots[index].owner = Some(c.clone());
    }
    // Only public definitions go in the accessor.
    if vis == SlotVis::Public {
        let entry = c.slots.borrow()[index].clone();
        a.push(entry);
    }
    Ok(())
}

impl Skeleton {
    /// Materialise the skeleton into declared slots for a fresh class.
    /// Names are filled in at `FINISH` from the unit's accessor table.
    pub fn to_slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .map(|s| {
                let mut slot = Slot::new("", s.kind, s.vis, Value::nil());
                slot.access = s.access;
                slot.next = s.next;
                slot
            })
            .collect()
    }
}
