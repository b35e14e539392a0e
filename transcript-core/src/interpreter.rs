// transcript-core - Interpreter host interface for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The interpreter: a global environment plus entry points to compile,
//! load, and run code.
//!
//! Globals are boxes created lazily in the undefined state, so mutually
//! recursive top-level definitions link without ordering constraints;
//! reads fault until `def` runs. Accessors are interned here; the empty
//! name is special and always yields a fresh accessor (anonymous-class
//! memo keys).
//!
//! `Interpreter` is a cheap cloneable handle. It is not thread-safe; create
//! one per thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use transcript_parser::Parser;

use crate::accessor::Accessor;
use crate::binary::LoadError;
use crate::class::{self, Class, Slot};
use crate::classes::with_classes;
use crate::compiler::compile_program;
use crate::error::{Error, Result};
use crate::primitives::{self, fslot, mslot, natv};
use crate::process::Process;
use crate::unit::Unit;
use crate::value::Value;

/// A native extension package: hands back the package's bindings.
pub type ExtensionFn = Rc<dyn Fn(&Interpreter) -> Result<Vec<(String, Value)>>>;

const DEFAULT_ROOT: &str = "/usr/local/lib/transcript";

struct Inner {
    globals: RefCell<HashMap<String, Value>>,
    accessors: RefCell<HashMap<String, Accessor>>,
    extensions: RefCell<HashMap<String, ExtensionFn>>,
    packages: RefCell<HashMap<String, Value>>,
}

/// An interpreter handle.
#[derive(Clone)]
pub struct Interpreter {
    inner: Rc<Inner>,
}

/// A non-owning interpreter handle for natives that live inside it.
#[derive(Clone)]
pub struct WeakInterpreter {
    inner: Weak<Inner>,
}

impl WeakInterpreter {
    pub fn upgrade(&self) -> Result<Interpreter> {
        self.inner
            .upgrade()
            .map(|inner| Interpreter { inner })
            .ok_or_else(|| Error::Internal("interpreter dropped".into()))
    }
}

impl Interpreter {
    /// Create an interpreter with the default environment.
    pub fn new() -> Result<Interpreter> {
        let interp = Interpreter {
            inner: Rc::new(Inner {
                globals: RefCell::new(HashMap::new()),
                accessors: RefCell::new(HashMap::new()),
                extensions: RefCell::new(HashMap::new()),
                packages: RefCell::new(HashMap::new()),
            }),
        };
        primitives::install(&interp)?;
        crate::ext::register_std(&interp);
        interp.install_packages_table()?;
        Ok(interp)
    }

    pub fn downgrade(&self) -> WeakInterpreter {
        WeakInterpreter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Find a global's box, creating it in the undefined state if needed.
    pub fn lookup(&self, name: &str) -> Value {
        let mut globals = self.inner.globals.borrow_mut();
        globals
            .entry(name.to_string())
            .or_insert_with(|| Value::undefined_box(Value::str(name)))
            .clone()
    }

    /// Define a global.
    pub fn define(&self, name: &str, v: Value) {
        let b = self.lookup(name);
        b.set_class(with_classes(|c| c.box_.clone()));
        b.box_set(v).expect("global binding is a box");
    }

    /// Whether a global is defined.
    pub fn defined(&self, name: &str) -> bool {
        self.inner
            .globals
            .borrow()
            .get(name)
            .is_some_and(|b| !b.is_undefined_box())
    }

    /// Read a global; faults if undefined.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.lookup(name).box_get()
    }

    /// Update a defined global; faults if undefined.
    pub fn set(&self, name: &str, v: Value) -> Result<()> {
        let b = self.lookup(name);
        if b.is_undefined_box() {
            return Err(Error::UndefinedVariable(name.to_string()));
        }
        b.box_set(v)
    }

    /// The defined global names (tab completion).
    pub fn list_defined(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .globals
            .borrow()
            .iter()
            .filter(|(_, b)| !b.is_undefined_box())
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    // ========================================================================
    // Accessors and classes
    // ========================================================================

    /// Retrieve the interned accessor for a name. The empty name always
    /// yields a fresh accessor.
    pub fn accessor(&self, name: &str) -> Accessor {
        if name.is_empty() {
            return Accessor::new("");
        }
        let mut accessors = self.inner.accessors.borrow_mut();
        accessors
            .entry(name.to_string())
            .or_insert_with(|| Accessor::new(name))
            .clone()
    }

    /// Install a class whose slots were declared host-side, resolving each
    /// slot's accessor by its name. Ancestors must already be installed.
    pub fn add_class(&self, c: &Rc<Class>) -> Result<()> {
        let mut accessors = Vec::with_capacity(c.slot_count());
        for i in 0..c.slot_count() {
            let name = c.slot(i).expect("slot in range").name.clone();
            let idx = accessors.len() as u16;
            c.update_slot(i, |e| e.access = idx);
            accessors.push(self.accessor(&name));
        }
        class::install(c, &accessors)
    }

    /// Extend a class host-side and install the result.
    pub fn extend_class(
        &self,
        ancestor: &Rc<Class>,
        name: &str,
        flags: u32,
        slots: Vec<Slot>,
    ) -> Result<Rc<Class>> {
        let c = ancestor.extend(name, flags, slots)?;
        self.add_class(&c)?;
        Ok(c)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Compile source text into a fresh unit.
    pub fn compile(&self, src: &str, file: &str) -> Result<Unit> {
        let stmts = Parser::parse_str(src, file)?;
        let unit = Unit::new();
        compile_program(&unit, &stmts)?;
        Ok(unit)
    }

    /// Link and run a unit's top level, returning the last value.
    pub fn exec(&self, unit: &Rc<Unit>) -> Result<Value> {
        unit.link(self);
        let mut p = Process::new();
        p.frame.code = unit.block(0)?;
        p.frame.unit = Some(unit.clone());
        p.run()?;
        Ok(p.value().clone())
    }

    /// Compile and run one expression or statement.
    pub fn eval(&self, src: &str) -> Result<Value> {
        let trimmed = src.trim();
        let owned;
        let src = if trimmed.ends_with(';') {
            trimmed
        } else {
            owned = format!("{trimmed};");
            &owned
        };
        let unit = Rc::new(self.compile(src, "eval")?);
        self.exec(&unit)
    }

    /// Load a code file, compiled or source.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io("load", Some(path.display().to_string()), e))?;
        match Unit::load(&bytes) {
            Ok(unit) => self.exec(&Rc::new(unit)),
            Err(LoadError::NotAUnit) => {
                let src = String::from_utf8_lossy(&bytes);
                let unit = Rc::new(self.compile(&src, &path.display().to_string())?);
                self.exec(&unit)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Import a package by name, returning the package object.
    pub fn import(&self, name: &str) -> Result<Value> {
        let packages = self.get("packages")?;
        let aget = self.accessor("__aget__");
        crate::dispatch::call_via_accessor(&packages, &aget, &[Value::str(name)])
    }

    // ========================================================================
    // Extensions and packages
    // ========================================================================

    /// Register a native extension package.
    pub fn register_extension(
        &self,
        name: &str,
        f: impl Fn(&Interpreter) -> Result<Vec<(String, Value)>> + 'static,
    ) {
        self.inner
            .extensions
            .borrow_mut()
            .insert(name.to_string(), Rc::new(f));
    }

    /// Materialise a registered extension as a Package instance.
    pub fn load_extension(&self, name: &str) -> Result<Value> {
        let f = self
            .inner
            .extensions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Other(format!("undefined extension: {name}")))?;
        let bindings = f(self)?;
        let slots: Vec<Slot> = bindings
            .into_iter()
            .map(|(n, v)| fslot(&n, v))
            .collect();
        let package = with_classes(|c| c.package.clone());
        let pc = self.extend_class(&package, name, 0, slots)?;
        crate::dispatch::class_new_instance(&pc, &[])
    }

    /// The package search roots: `TSROOT` (colon-separated), with a
    /// built-in default.
    pub fn package_roots(&self) -> Vec<PathBuf> {
        match std::env::var("TSROOT") {
            Ok(v) if !v.is_empty() => v.split(':').map(PathBuf::from).collect(),
            _ => vec![PathBuf::from(DEFAULT_ROOT)],
        }
    }

    /// Resolve a package by name: the load cache, then registered
    /// extensions, then `TSROOT`-relative files (compiled before source).
    fn resolve_package(&self, name: &str) -> Result<Value> {
        if let Some(p) = self.inner.packages.borrow().get(name) {
            return Ok(p.clone());
        }
        if self.inner.extensions.borrow().contains_key(name) {
            let p = self.load_extension(name)?;
            self.inner
                .packages
                .borrow_mut()
                .insert(name.to_string(), p.clone());
            return Ok(p);
        }
        let rel = name.replace('.', "/");
        for root in self.package_roots() {
            for ext in ["tsc", "ts"] {
                let path = root.join(format!("{rel}.{ext}"));
                if path.exists() {
                    self.load(&path)?;
                    // a `package` statement in the file stores itself
                    if let Some(p) = self.inner.packages.borrow().get(name) {
                        return Ok(p.clone());
                    }
                    return Err(Error::Other(format!(
                        "{} does not define package {name}",
                        path.display()
                    )));
                }
            }
        }
        Err(Error::Other(format!("undefined package: {name}")))
    }

    /// Define the `packages` global: a table object whose subscript
    /// operations load and cache packages.
    fn install_packages_table(&self) -> Result<()> {
        let object = with_classes(|c| c.object.clone());
        let w_get = self.downgrade();
        let w_set = self.downgrade();
        let slots = vec![
            mslot(
                "__aget__",
                natv(move |_, args| {
                    primitives::check_arity(args, 1)?;
                    let interp = w_get.upgrade()?;
                    interp.resolve_package(args[0].to_str()?)
                }),
            ),
            mslot(
                "__aset__",
                natv(move |_, args| {
                    primitives::check_arity(args, 2)?;
                    let interp = w_set.upgrade()?;
                    interp
                        .inner
                        .packages
                        .borrow_mut()
                        .insert(args[0].to_str()?.to_string(), args[1].clone());
                    Ok(Value::nil())
                }),
            ),
        ];
        let pt = self.extend_class(&object, "PackageTable", 0, slots)?;
        let table = crate::dispatch::class_new_instance(&pt, &[])?;
        self.define("packages", table);
        Ok(())
    }
}
