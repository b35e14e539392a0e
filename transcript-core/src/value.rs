// transcript-core - Value universe for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Everything the runtime sees is an object: a class pointer plus a field
//! vector. Primitive values additionally carry a payload (integer, string,
//! function, box cell, ...) alongside the fields. `Value` is a shared handle
//! (`Rc`); object identity is handle identity.
//!
//! A box's defined/undefined state is its class pointer (`Box` vs
//! `Undefined`), so the class slot is interior-mutable.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::class::{Class, Skeleton};
use crate::classes::with_classes;
use crate::error::{Error, Result};
use crate::process::Process;
use crate::unit::Unit;

/// A native function shim. It receives the process with the arguments
/// pushed and the argument count set, and must finish the call by invoking
/// `Process::ret` (the wrapper helpers in `primitives` do this).
pub type NativeHandler = Rc<dyn Fn(&mut Process) -> Result<()>>;

/// The callable payload of a function object.
#[derive(Clone)]
pub enum FuncData {
    /// Host-provided behaviour.
    Native(NativeHandler),
    /// Compiled behaviour: a code block plus everything it closed over.
    Closure(Rc<Closure>),
}

/// A compiled closure: code block, captured environment, captured receiver
/// (absent for method bodies, which take the receiver from the call site),
/// captured static class, and the owning unit.
pub struct Closure {
    pub block: usize,
    pub env: Rc<Vec<Value>>,
    pub this: Option<Value>,
    pub static_class: Option<Rc<Class>>,
    pub unit: Rc<Unit>,
}

/// Primitive data carried by an object alongside its fields.
pub enum Payload {
    None,
    Int(i64),
    Float(f64),
    Str(String),
    Array(RefCell<Vec<Value>>),
    Hash(RefCell<HashMap<HashKey, HashItem>>),
    Buffer(RefCell<Vec<u8>>),
    Func(FuncData),
    Class(Rc<Class>),
    Accessor(Accessor),
    Box(RefCell<Value>),
    Skeleton(Rc<Skeleton>),
    /// Opaque host data for user-data classes (e.g. compiled regexes).
    User(RefCell<Option<Rc<dyn Any>>>),
}

/// An object: class pointer, field vector, optional primitive payload.
pub struct Object {
    class: RefCell<Rc<Class>>,
    fields: RefCell<Vec<Value>>,
    data: Payload,
}

/// A shared handle to an object. Clone is cheap; equality is identity.
#[derive(Clone)]
pub struct Value(Rc<Object>);

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::ops::Deref for Value {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.describe())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

// ============================================================================
// Construction
// ============================================================================

thread_local! {
    static INT_CACHE: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
    static CHAR_CACHE: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

const INT_CACHE_SIZE: i64 = 1024;

impl Value {
    /// Create an object with an explicit class and payload.
    pub fn raw(class: Rc<Class>, data: Payload, fields: Vec<Value>) -> Value {
        Value(Rc::new(Object {
            class: RefCell::new(class),
            fields: RefCell::new(fields),
            data,
        }))
    }

    /// The `nil` singleton.
    pub fn nil() -> Value {
        with_classes(|c| c.nil_value.clone())
    }

    /// The canonical `true` / `false` singletons.
    pub fn bool_of(b: bool) -> Value {
        with_classes(|c| {
            if b {
                c.true_value.clone()
            } else {
                c.false_value.clone()
            }
        })
    }

    /// Wrap an integer. Small non-negative values are cached.
    pub fn int(i: i64) -> Value {
        if (0..INT_CACHE_SIZE).contains(&i) {
            return INT_CACHE.with(|cache| {
                let mut cache = cache.borrow_mut();
                if cache.is_empty() {
                    cache.extend((0..INT_CACHE_SIZE).map(|n| {
                        with_classes(|c| Value::raw(c.int.clone(), Payload::Int(n), vec![]))
                    }));
                }
                cache[i as usize].clone()
            });
        }
        with_classes(|c| Value::raw(c.int.clone(), Payload::Int(i), vec![]))
    }

    /// Wrap a float.
    pub fn float(f: f64) -> Value {
        with_classes(|c| Value::raw(c.float.clone(), Payload::Float(f), vec![]))
    }

    /// Wrap a string. Single-byte strings are cached.
    pub fn str(s: impl Into<String>) -> Value {
        let s = s.into();
        if s.len() == 1 {
            let b = s.as_bytes()[0];
            if b < 128 {
                return CHAR_CACHE.with(|cache| {
                    let mut cache = cache.borrow_mut();
                    if cache.is_empty() {
                        cache.extend((0u8..128).map(|n| {
                            let t = (n as char).to_string();
                            with_classes(|c| Value::raw(c.string.clone(), Payload::Str(t), vec![]))
                        }));
                    }
                    cache[b as usize].clone()
                });
            }
        }
        with_classes(|c| Value::raw(c.string.clone(), Payload::Str(s), vec![]))
    }

    /// Wrap a vector of values as an array.
    pub fn array(items: Vec<Value>) -> Value {
        with_classes(|c| Value::raw(c.array.clone(), Payload::Array(RefCell::new(items)), vec![]))
    }

    /// Create an empty hash.
    pub fn hash(map: HashMap<HashKey, HashItem>) -> Value {
        with_classes(|c| Value::raw(c.hash.clone(), Payload::Hash(RefCell::new(map)), vec![]))
    }

    /// Wrap a byte vector as a buffer.
    pub fn buffer(bytes: Vec<u8>) -> Value {
        with_classes(|c| Value::raw(c.buffer.clone(), Payload::Buffer(RefCell::new(bytes)), vec![]))
    }

    /// Create a pair.
    pub fn pair(left: Value, right: Value) -> Value {
        with_classes(|c| Value::raw(c.pair.clone(), Payload::None, vec![left, right]))
    }

    /// Wrap a native handler as a function object.
    pub fn raw_native(f: impl Fn(&mut Process) -> Result<()> + 'static) -> Value {
        with_classes(|c| {
            Value::raw(
                c.function.clone(),
                Payload::Func(FuncData::Native(Rc::new(f))),
                vec![c.false_value.clone()],
            )
        })
    }

    /// Wrap a compiled closure as a function object.
    pub fn closure(c: Closure) -> Value {
        with_classes(|cs| {
            Value::raw(
                cs.function.clone(),
                Payload::Func(FuncData::Closure(Rc::new(c))),
                vec![cs.false_value.clone()],
            )
        })
    }

    /// Wrap an accessor as an object.
    pub fn accessor_obj(a: Accessor) -> Value {
        with_classes(|c| Value::raw(c.accessor.clone(), Payload::Accessor(a), vec![]))
    }

    /// Create a defined box holding `v`.
    pub fn boxed(v: Value) -> Value {
        with_classes(|c| Value::raw(c.box_.clone(), Payload::Box(RefCell::new(v)), vec![]))
    }

    /// Create an undefined box. The content (conventionally the binding's
    /// name) is reported when an undefined read faults.
    pub fn undefined_box(v: Value) -> Value {
        with_classes(|c| Value::raw(c.undefined.clone(), Payload::Box(RefCell::new(v)), vec![]))
    }

    /// Wrap a class-body skeleton.
    pub fn skeleton(sk: Rc<Skeleton>) -> Value {
        with_classes(|c| Value::raw(c.skeleton.clone(), Payload::Skeleton(sk), vec![]))
    }
}

// ============================================================================
// Inspection
// ============================================================================

impl Object {
    /// The object's class.
    pub fn class(&self) -> Rc<Class> {
        self.class.borrow().clone()
    }

    /// The object's class name.
    pub fn class_name(&self) -> String {
        self.class.borrow().name()
    }

    /// Replace the object's class (box define/undefine transitions and
    /// accessor construction use this).
    pub fn set_class(&self, c: Rc<Class>) {
        *self.class.borrow_mut() = c;
    }

    /// Instance-of check against a class and its descendants.
    pub fn is_instance_of(&self, c: &Class) -> bool {
        self.class.borrow().is(c)
    }

    /// The field vector.
    pub fn fields(&self) -> Ref<'_, Vec<Value>> {
        self.fields.borrow()
    }

    /// The field vector, mutably.
    pub fn fields_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.fields.borrow_mut()
    }

    /// Read one field.
    pub fn field(&self, i: usize) -> Value {
        self.fields.borrow()[i].clone()
    }

    /// Write one field.
    pub fn set_field(&self, i: usize, v: Value) {
        self.fields.borrow_mut()[i] = v;
    }

    /// The primitive payload.
    pub fn payload(&self) -> &Payload {
        &self.data
    }
}

impl Value {
    /// True if this is the canonical `false`.
    pub fn is_false(&self) -> bool {
        with_classes(|c| *self == c.false_value)
    }

    /// True if this is the `nil` singleton.
    pub fn is_nil(&self) -> bool {
        with_classes(|c| *self == c.nil_value)
    }

    // ========================================================================
    // Typed extraction
    // ========================================================================

    /// The integer payload. Faults if this is not an integer.
    pub fn to_int(&self) -> Result<i64> {
        match &self.data {
            Payload::Int(i) => Ok(*i),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The float payload. Faults if this is not a float.
    pub fn to_float(&self) -> Result<f64> {
        match &self.data {
            Payload::Float(f) => Ok(*f),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The string payload. Faults if this is not a string.
    pub fn to_str(&self) -> Result<&str> {
        match &self.data {
            Payload::Str(s) => Ok(s),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The array payload. Faults if this is not an array.
    pub fn to_array(&self) -> Result<Ref<'_, Vec<Value>>> {
        match &self.data {
            Payload::Array(a) => Ok(a.borrow()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The array payload, mutably.
    pub fn to_array_mut(&self) -> Result<RefMut<'_, Vec<Value>>> {
        match &self.data {
            Payload::Array(a) => Ok(a.borrow_mut()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The hash payload.
    pub fn to_hash(&self) -> Result<Ref<'_, HashMap<HashKey, HashItem>>> {
        match &self.data {
            Payload::Hash(h) => Ok(h.borrow()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The hash payload, mutably.
    pub fn to_hash_mut(&self) -> Result<RefMut<'_, HashMap<HashKey, HashItem>>> {
        match &self.data {
            Payload::Hash(h) => Ok(h.borrow_mut()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The buffer payload.
    pub fn to_buffer(&self) -> Result<Ref<'_, Vec<u8>>> {
        match &self.data {
            Payload::Buffer(b) => Ok(b.borrow()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The buffer payload, mutably.
    pub fn to_buffer_mut(&self) -> Result<RefMut<'_, Vec<u8>>> {
        match &self.data {
            Payload::Buffer(b) => Ok(b.borrow_mut()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The class payload (of a class's companion object).
    pub fn to_class(&self) -> Result<Rc<Class>> {
        match &self.data {
            Payload::Class(c) => Ok(c.clone()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The accessor payload.
    pub fn to_accessor(&self) -> Result<Accessor> {
        match &self.data {
            Payload::Accessor(a) => Ok(a.clone()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The skeleton payload.
    pub fn to_skeleton(&self) -> Result<Rc<Skeleton>> {
        match &self.data {
            Payload::Skeleton(s) => Ok(s.clone()),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// The callable payload.
    pub fn func_data(&self) -> Option<&FuncData> {
        match &self.data {
            Payload::Func(f) => Some(f),
            _ => None,
        }
    }

    /// Read a box's content. Faults if this is not a box, or if the box is
    /// still undefined (in which case the content names the binding).
    pub fn box_get(&self) -> Result<Value> {
        let content = match &self.data {
            Payload::Box(b) => b.borrow().clone(),
            _ => return Err(Error::wrong_type(self)),
        };
        if self.is_undefined_box() {
            let name = content.to_str().unwrap_or("?").to_string();
            return Err(Error::UndefinedVariable(name));
        }
        Ok(content)
    }

    /// Write a box's content without touching its defined state.
    pub fn box_set(&self, v: Value) -> Result<()> {
        match &self.data {
            Payload::Box(b) => {
                *b.borrow_mut() = v;
                Ok(())
            }
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// True if this is a box in the undefined state.
    pub fn is_undefined_box(&self) -> bool {
        with_classes(|c| Rc::ptr_eq(&self.class.borrow(), &c.undefined))
    }

    /// True if this is a box (defined or undefined).
    pub fn is_box(&self) -> bool {
        matches!(self.data, Payload::Box(_))
    }

    /// The opaque host data of a user-data object.
    pub fn user_data(&self) -> Result<Rc<dyn Any>> {
        match &self.data {
            Payload::User(u) => u
                .borrow()
                .clone()
                .ok_or_else(|| Error::wrong_type(self)),
            _ => Err(Error::wrong_type(self)),
        }
    }

    /// Store opaque host data on a user-data object.
    pub fn set_user_data(&self, data: Rc<dyn Any>) -> Result<()> {
        match &self.data {
            Payload::User(u) => {
                *u.borrow_mut() = Some(data);
                Ok(())
            }
            _ => Err(Error::wrong_type(self)),
        }
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Render through the object's `toString` method, falling back to
    /// `describe` if dispatch faults.
    pub fn to_display_string(&self) -> String {
        match crate::dispatch::to_string_obj(self) {
            Ok(s) => s,
            Err(_) => self.describe(),
        }
    }

    /// A non-dispatching rendering, safe to call from error paths.
    pub fn describe(&self) -> String {
        match &self.data {
            Payload::Int(i) => i.to_string(),
            Payload::Float(f) => format_float(*f),
            Payload::Str(s) => s.clone(),
            Payload::Class(c) => format!("#<class {}>", c.name()),
            Payload::Accessor(a) => format!("@{}", a.name()),
            _ => {
                if self.is_nil() {
                    return "nil".into();
                }
                with_classes(|c| {
                    if *self == c.true_value {
                        return "true".into();
                    }
                    if *self == c.false_value {
                        return "false".into();
                    }
                    if self.is_instance_of(&c.error) && self.fields().len() >= 3 {
                        let msg = self.field(0).describe();
                        let file = self.field(1).describe();
                        let line = self.field(2).to_int().unwrap_or(0);
                        if line == 0 {
                            return msg;
                        }
                        return format!("{file}({line}): {msg}");
                    }
                    format!("#<{}>", self.class_name())
                })
            }
        }
    }
}

/// Render a float the way the language prints numbers: integral values keep
/// a trailing `.0` so they read back as floats.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f == f.trunc() && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

// ============================================================================
// Hash keys
// ============================================================================

/// A stored hash entry: the original key object plus its value.
#[derive(Clone)]
pub struct HashItem {
    pub key: Value,
    pub val: Value,
}

/// Hash key identity: the receiver's class paired with the structural
/// reduction of its `__key__` result. Strings and numbers reduce by value,
/// pairs recurse, everything else is compared by object identity.
#[derive(Clone)]
pub struct HashKey {
    class: Rc<Class>,
    repr: KeyRepr,
}

#[derive(Clone)]
enum KeyRepr {
    Int(i64),
    Float(u64),
    Str(String),
    Pair(Box<HashKey>, Box<HashKey>),
    Identity(Value),
}

impl HashKey {
    /// Reduce a key object, calling its `__key__` method.
    pub fn of(key: &Value) -> Result<HashKey> {
        let class = key.class();
        let k = crate::dispatch::call_slot_on_object_class(key, crate::primitives::OBJ_KEY, &[])?;
        Ok(HashKey {
            class,
            repr: KeyRepr::reduce(&k)?,
        })
    }
}

impl KeyRepr {
    fn reduce(k: &Value) -> Result<KeyRepr> {
        Ok(match k.payload() {
            Payload::Int(i) => KeyRepr::Int(*i),
            Payload::Float(f) => KeyRepr::Float(f.to_bits()),
            Payload::Str(s) => KeyRepr::Str(s.clone()),
            _ => {
                let is_pair = with_classes(|c| std::ptr::eq(&*k.class(), &*c.pair));
                if is_pair {
                    let left = HashKey::of(&k.field(0))?;
                    let right = HashKey::of(&k.field(1))?;
                    KeyRepr::Pair(Box::new(left), Box::new(right))
                } else {
                    KeyRepr::Identity(k.clone())
                }
            }
        })
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.class, &other.class) && self.repr == other.repr
    }
}

impl Eq for HashKey {}

impl PartialEq for KeyRepr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyRepr::Int(a), KeyRepr::Int(b)) => a == b,
            (KeyRepr::Float(a), KeyRepr::Float(b)) => a == b,
            (KeyRepr::Str(a), KeyRepr::Str(b)) => a == b,
            (KeyRepr::Pair(a1, a2), KeyRepr::Pair(b1, b2)) => a1 == b1 && a2 == b2,
            (KeyRepr::Identity(a), KeyRepr::Identity(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyRepr {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.class) as usize).hash(state);
        self.repr.hash(state);
    }
}

impl Hash for KeyRepr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            KeyRepr::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            KeyRepr::Float(f) => {
                1u8.hash(state);
                f.hash(state);
            }
            KeyRepr::Str(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            KeyRepr::Pair(a, b) => {
                3u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            KeyRepr::Identity(v) => {
                4u8.hash(state);
                (Rc::as_ptr(&v.0) as *const () as usize).hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = Value::str("same");
        let b = Value::str("same");
        // distinct objects with equal payloads are distinct values
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_small_ints_are_cached() {
        assert_eq!(Value::int(5), Value::int(5));
        assert_ne!(Value::int(100_000), Value::int(100_000));
    }

    #[test]
    fn test_singletons() {
        assert!(Value::nil().is_nil());
        assert!(Value::bool_of(false).is_false());
        assert!(!Value::bool_of(true).is_false());
        assert_eq!(Value::nil(), Value::nil());
    }

    #[test]
    fn test_typed_extraction_faults() {
        assert!(Value::int(1).to_str().is_err());
        assert!(Value::str("x").to_int().is_err());
        assert_eq!(Value::int(7).to_int().unwrap(), 7);
    }

    #[test]
    fn test_box_states() {
        let b = Value::undefined_box(Value::str("name"));
        assert!(b.is_undefined_box());
        let e = b.box_get().unwrap_err();
        assert!(e.to_string().contains("name"));

        let d = Value::boxed(Value::int(1));
        assert!(!d.is_undefined_box());
        assert_eq!(d.box_get().unwrap().to_int().unwrap(), 1);
        d.box_set(Value::int(2)).unwrap();
        assert_eq!(d.box_get().unwrap().to_int().unwrap(), 2);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(4.0), "4.0");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }
}
