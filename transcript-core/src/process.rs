// transcript-core - Stack virtual machine for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The stack-based virtual machine.
//!
//! A process owns an operand stack, an explicit frame stack, the current
//! frame, a value register, and the current source position. Tail calls
//! relocate their arguments over the caller's stack region (`Shuffle`) and
//! enter the callee without saving a frame, so tail recursion runs at
//! constant frame depth.
//!
//! A fault inside an instruction is wrapped into a language-level `Error`
//! object annotated with the current file and line before it unwinds; an
//! already-wrapped error passes through untouched.

use std::rc::Rc;

use crate::class::{self, Class, Skeleton, Slot, SlotKind};
use crate::classes::with_classes;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::opcode::{Op, SLOT_UNKNOWN};
use crate::unit::Unit;
use crate::value::{Closure, Value};

/// An activation record.
#[derive(Clone)]
pub struct Frame {
    /// The receiver ("this").
    pub this: Value,
    /// Compile-time class, for private slots and `super`.
    pub static_class: Option<Rc<Class>>,
    /// Captured environment.
    pub env: Rc<Vec<Value>>,
    /// Code block being executed.
    pub code: Rc<Vec<u16>>,
    /// Instruction pointer.
    pub ip: usize,
    /// Argument count of the pending or current call.
    pub arg_count: usize,
    /// Base index into the operand stack.
    pub base: usize,
    /// Owning unit.
    pub unit: Option<Rc<Unit>>,
}

impl Frame {
    /// An empty frame; `run` halts when it becomes current.
    pub fn root() -> Frame {
        Frame {
            this: Value::nil(),
            static_class: None,
            env: Rc::new(Vec::new()),
            code: Rc::new(Vec::new()),
            ip: 0,
            arg_count: 0,
            base: 0,
            unit: None,
        }
    }
}

/// A running computation.
pub struct Process {
    pub(crate) frame: Frame,
    value: Value,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    file: Value,
    line: u32,
}

impl Process {
    /// Create an idle process.
    pub fn new() -> Process {
        Process {
            frame: Frame::root(),
            value: Value::nil(),
            stack: Vec::new(),
            frames: Vec::new(),
            file: Value::nil(),
            line: 0,
        }
    }

    /// The value register.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, v: Value) {
        self.value = v;
    }

    /// The receiver of the current call.
    pub fn this(&self) -> Value {
        self.frame.this.clone()
    }

    pub fn set_this(&mut self, v: Value) {
        self.frame.this = v;
    }

    /// Argument count of the call in flight.
    pub fn arg_count(&self) -> usize {
        self.frame.arg_count
    }

    pub fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::Internal("stack underflow".into()))
    }

    /// Set the frame base to the start of the pushed arguments. Native
    /// shims call this before reading `args`.
    pub fn enter_native(&mut self) -> Result<()> {
        let n = self.frame.arg_count;
        if n > self.stack.len() {
            return Err(Error::Internal("stack underflow".into()));
        }
        self.frame.base = self.stack.len() - n;
        Ok(())
    }

    /// The arguments of the current call.
    pub fn args(&self) -> &[Value] {
        &self.stack[self.frame.base..]
    }

    /// Save the current frame with the given return address.
    pub fn push_frame(&mut self, return_ip: usize) {
        let mut saved = self.frame.clone();
        saved.ip = return_ip;
        self.frames.push(saved);
    }

    /// Return `x` to the caller: release this call's stack region and
    /// restore the saved frame.
    pub fn ret(&mut self, x: Value) -> Result<()> {
        self.stack.truncate(self.frame.base);
        self.frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::Internal("return without frame".into()))?;
        self.value = x;
        Ok(())
    }

    /// Begin a call on this process: push a halt frame, the arguments, and
    /// the receiver, then enter the callable.
    pub fn begin_call(&mut self, this: &Value, f: &Value, args: &[Value]) -> Result<()> {
        self.push_frame(0);
        for a in args {
            self.stack.push(a.clone());
        }
        self.frame.arg_count = args.len();
        self.frame.this = this.clone();
        self.invoke(f)
    }

    /// Enter a callable: a native shim runs immediately; a closure becomes
    /// the current frame's code. A non-function dispatches through its
    /// class's `__call__`.
    pub fn invoke(&mut self, callee: &Value) -> Result<()> {
        let mut callee = callee.clone();
        loop {
            match callee.func_data() {
                Some(crate::value::FuncData::Native(f)) => {
                    let f = f.clone();
                    return f(self);
                }
                Some(crate::value::FuncData::Closure(c)) => {
                    let c = c.clone();
                    self.frame.code = c.unit.block(c.block)?;
                    self.frame.ip = 0;
                    self.frame.unit = Some(c.unit.clone());
                    self.frame.env = c.env.clone();
                    self.frame.static_class = c.static_class.clone();
                    if let Some(t) = &c.this {
                        self.frame.this = t.clone();
                    }
                    return Ok(());
                }
                None => {
                    let class = callee.class();
                    if crate::primitives::OBJ_CALL >= class.method_count() {
                        return Err(Error::wrong_type(&callee));
                    }
                    let m = class.method(crate::primitives::OBJ_CALL);
                    self.frame.this = callee;
                    callee = m;
                }
            }
        }
    }

    /// Run until the current frame's code is exhausted.
    pub fn run(&mut self) -> Result<()> {
        while self.frame.ip < self.frame.code.len() {
            if let Err(e) = self.step() {
                return Err(self.wrap_error(e));
            }
        }
        Ok(())
    }

    /// Wrap a fault into a language-level `Error` object annotated with the
    /// current source position. Already-wrapped errors pass through.
    pub fn wrap_error(&self, e: Error) -> Error {
        if self.line == 0 {
            return e;
        }
        if let Error::Thrown(v) = &e {
            let is_wrapped = with_classes(|c| Rc::ptr_eq(&v.class(), &c.error));
            if is_wrapped {
                return e;
            }
        }
        let msg = match e {
            Error::Thrown(v) => v,
            other => Value::str(other.to_string()),
        };
        let eo = with_classes(|c| c.error.alloc());
        let eo = match eo {
            Ok(eo) => eo,
            // The error class is not installed; surface the raw fault.
            Err(_) => return Error::Thrown(msg),
        };
        if eo.fields().len() >= 4 {
            eo.set_field(0, msg);
            eo.set_field(1, self.file.clone());
            eo.set_field(2, Value::int(self.line as i64));
            eo.set_field(3, Value::array(Vec::new()));
        }
        Error::Thrown(eo)
    }

    // ========================================================================
    // Instruction dispatch
    // ========================================================================

    fn next(&mut self) -> Result<u16> {
        let w = self
            .frame
            .code
            .get(self.frame.ip)
            .copied()
            .ok_or_else(|| Error::Internal("truncated code block".into()))?;
        self.frame.ip += 1;
        Ok(w)
    }

    fn unit(&self) -> Result<Rc<Unit>> {
        self.frame
            .unit
            .clone()
            .ok_or_else(|| Error::Internal("no unit in frame".into()))
    }

    fn step(&mut self) -> Result<()> {
        let word = self.next()?;
        let op = Op::from_u16(word)
            .ok_or_else(|| Error::Internal(format!("unrecognised opcode: {word}")))?;
        match op {
            Op::Nop => {}

            Op::Jump => {
                let n = self.next()?;
                self.frame.ip = n as usize;
            }

            Op::Branch => {
                let n = self.next()?;
                if self.value.is_false() {
                    self.frame.ip = n as usize;
                }
            }

            Op::Value => {
                let n = self.next()?;
                self.value = self.unit()?.const_value(n as usize)?;
            }

            Op::Bound => {
                let n = self.next()?;
                self.value = self.slot_at(n)?;
            }

            Op::Free => {
                let n = self.next()?;
                self.value = self
                    .frame
                    .env
                    .get(n as usize)
                    .cloned()
                    .ok_or_else(|| Error::Internal(format!("bad capture index {n}")))?;
            }

            Op::Global => {
                let n = self.next()?;
                self.value = self.unit()?.global(n as usize)?;
            }

            Op::Box => {
                let n = self.next()?;
                let l = self.frame.base + n as usize;
                let old = self.slot_at(n)?;
                self.stack[l] = Value::boxed(old);
            }

            Op::Undefine => {
                let n = self.next()?;
                let l = self.frame.base + n as usize;
                let old = self.slot_at(n)?;
                self.stack[l] = Value::undefined_box(old);
            }

            Op::Unbox => {
                self.value = self.value.box_get()?;
            }

            Op::Update => {
                if self.value.is_undefined_box() {
                    // box_get reports the binding name
                    self.value.box_get()?;
                }
                let x = self.pop()?;
                self.value.box_set(x)?;
                self.value = Value::nil();
            }

            Op::Define => {
                if !self.value.is_box() {
                    return Err(Error::wrong_type(&self.value));
                }
                self.value.set_class(with_classes(|c| c.box_.clone()));
            }

            Op::Push => {
                let v = self.value.clone();
                self.stack.push(v);
            }

            Op::Frame => {
                let n = self.next()?;
                self.push_frame(n as usize);
            }

            Op::Shuffle => {
                let n = self.next()? as usize;
                let l = self.stack.len();
                if n > l || self.frame.base > l - n {
                    return Err(Error::Internal("bad shuffle".into()));
                }
                let b = self.frame.base;
                for i in 0..n {
                    self.stack[b + i] = self.stack[l - n + i].clone();
                }
                self.stack.truncate(b + n);
            }

            Op::Return => {
                let v = self.value.clone();
                self.ret(v)?;
            }

            Op::Retract => {
                let n = self.next()? as usize;
                let l = self.stack.len();
                if n > l {
                    return Err(Error::Internal("bad retract".into()));
                }
                self.stack.truncate(l - n);
            }

            Op::Call => {
                let n = self.next()?;
                self.frame.arg_count = n as usize;
                let f = self.value.clone();
                self.invoke(&f)?;
            }

            Op::Close => {
                let block = self.next()? as usize;
                let n = self.next()? as usize;
                self.close(block, n, true)?;
            }

            Op::CloseM => {
                let block = self.next()? as usize;
                let n = self.next()? as usize;
                self.close(block, n, false)?;
            }

            Op::Prolog => {
                let n = self.next()? as usize;
                if self.frame.arg_count != n {
                    return Err(Error::arity(self.frame.arg_count));
                }
                if n > self.stack.len() {
                    return Err(Error::Internal("stack underflow".into()));
                }
                self.frame.base = self.stack.len() - n;
            }

            Op::PrologOpt => {
                let n = self.next()? as usize;
                let m = self.next()? as usize;
                self.prolog(n, m, false)?;
            }

            Op::PrologRest => {
                let n = self.next()? as usize;
                let m = self.next()? as usize;
                self.prolog(n, m, true)?;
            }

            Op::Extend => {
                self.extend_class(None)?;
            }

            Op::ExtendA => {
                let n = self.next()?;
                let a = self.unit()?.accessor(n as usize)?;
                self.extend_class(Some(a))?;
            }

            Op::Finish => {
                let n = self.next()? as usize;
                self.finish(n)?;
            }

            Op::New => {
                let c = self.value.to_class()?;
                self.frame.this = c.alloc()?;
                if crate::primitives::OBJ_NEW >= c.method_count() {
                    return Err(Error::Internal("class not installed".into()));
                }
                self.value = c.method(crate::primitives::OBJ_NEW);
            }

            Op::Get => {
                let n = self.next()?;
                let m = self.next()?;
                let a = self.unit()?.accessor(n as usize)?;
                let hint = self.lookup_static(m);
                self.value = dispatch::object_get(&self.value, Some(&a), hint)?;
            }

            Op::GetM => {
                let n = self.next()?;
                let m = self.next()?;
                let a = self.unit()?.accessor(n as usize)?;
                let hint = self.lookup_static(m);
                self.value = dispatch::object_get_method(&self.value, Some(&a), hint)?;
            }

            Op::Set => {
                let n = self.next()?;
                let m = self.next()?;
                let a = self.unit()?.accessor(n as usize)?;
                let hint = self.lookup_static(m);
                let x = self.pop()?;
                dispatch::object_set(&self.value, Some(&a), hint, x)?;
                self.value = Value::nil();
            }

            Op::This => {
                self.value = self.frame.this.clone();
            }

            Op::LThis => {
                self.frame.this = self.value.clone();
            }

            Op::Super => {
                let n = self.next()?;
                if n == SLOT_UNKNOWN {
                    return Err(Error::SuperWithoutOverride);
                }
                let sc = self
                    .frame
                    .static_class
                    .clone()
                    .ok_or(Error::SuperWithoutOverride)?;
                let e = sc
                    .slot(n as usize)
                    .ok_or_else(|| Error::Internal(format!("bad slot hint {n}")))?;
                let missing = Error::SuperMissing {
                    class: sc.name(),
                    name: e.name.clone(),
                };
                let Some(anc) = sc.ancestor() else {
                    return Err(missing);
                };
                if e.offset as usize >= anc.method_count() {
                    return Err(missing);
                }
                self.value = anc.method(e.offset as usize);
            }

            Op::Source => {
                let n = self.next()?;
                let m = self.next()?;
                if n != 0 {
                    self.file = self.unit()?.const_value(n as usize)?;
                }
                self.line = m as u32;
            }
        }
        Ok(())
    }

    fn slot_at(&self, n: u16) -> Result<Value> {
        self.stack
            .get(self.frame.base + n as usize)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("bad stack slot {n}")))
    }

    /// Fill optional arguments and collect the rest array, then set the
    /// frame base. `n` required, `m` total (not counting the rest array).
    fn prolog(&mut self, n: usize, m: usize, rest: bool) -> Result<()> {
        let argc = self.frame.arg_count;
        if argc < n {
            return Err(Error::arity(argc));
        }
        if !rest && argc > m {
            return Err(Error::arity(argc));
        }
        if argc > self.stack.len() {
            return Err(Error::Internal("stack underflow".into()));
        }
        for _ in argc..m {
            self.stack.push(Value::bool_of(false));
        }
        let mut total = m;
        if rest {
            if argc <= m {
                self.stack.push(Value::array(Vec::new()));
            } else {
                let rc = argc - m;
                let sp = self.stack.len() - rc;
                let extras: Vec<Value> = self.stack.drain(sp..).collect();
                self.stack.push(Value::array(extras));
            }
            total += 1;
        }
        self.frame.base = self.stack.len() - total;
        Ok(())
    }

    /// Capture the top `n` stack entries into a closure over `block`.
    fn close(&mut self, block: usize, n: usize, capture_this: bool) -> Result<()> {
        let l = self.stack.len();
        if n > l {
            return Err(Error::Internal("bad closure capture".into()));
        }
        let env: Vec<Value> = self.stack.drain(l - n..).collect();
        let unit = self.unit()?;
        self.value = Value::closure(Closure {
            block,
            env: Rc::new(env),
            this: capture_this.then(|| self.frame.this.clone()),
            static_class: self.frame.static_class.clone(),
            unit,
        });
        Ok(())
    }

    /// Open a class: pop the skeleton, take the ancestor from the value
    /// register, and make the new class the static class. With a memo
    /// accessor, the same lexical site re-yields the one installed class.
    fn extend_class(&mut self, acc: Option<crate::accessor::Accessor>) -> Result<()> {
        let s = self.pop()?;
        let skel: Rc<Skeleton> = s.to_skeleton()?;
        let ancestor = self.value.to_class()?;
        if let Some(a) = &acc {
            if let Some(memo) = a.lookup_memo(&ancestor) {
                self.frame.static_class = Some(memo);
                return Ok(());
            }
        }
        let name = if skel.name.is_empty() {
            ancestor.name()
        } else {
            skel.name.clone()
        };
        let c = ancestor.extend(name, 0, skel.to_slots())?;
        c.set_lexical_parent(self.frame.static_class.clone());
        if let Some(a) = &acc {
            a.push_memo(&ancestor, c.object());
        }
        self.frame.static_class = Some(c);
        Ok(())
    }

    /// Close a class body: consume the evaluated slot values, install the
    /// class, and load its companion. A memoised, already-installed class
    /// discards the re-evaluated values.
    fn finish(&mut self, n: usize) -> Result<()> {
        let l = self.stack.len();
        if n > l {
            return Err(Error::Internal("bad class finish".into()));
        }
        let spec: Vec<Value> = self.stack.drain(l - n..).collect();
        let c = self
            .frame
            .static_class
            .clone()
            .ok_or_else(|| Error::Internal("no class under construction".into()))?;
        if !c.installed() {
            let unit = self.unit()?;
            let mut j = 0;
            for i in 0..c.slot_count() {
                let (kind, access) = {
                    let e = c.slot(i).expect("slot index in range");
                    (e.kind, e.access)
                };
                let name = unit.accessor(access as usize)?.name().to_string();
                match kind {
                    SlotKind::Marker => {
                        c.update_slot(i, |e| e.name = name);
                    }
                    SlotKind::Property => {
                        let value = spec[j].clone();
                        let setter = spec[j + 1].clone();
                        j += 2;
                        c.update_slot(i, |e| {
                            e.name = name;
                            e.value = value;
                            e.setter = setter;
                        });
                    }
                    _ => {
                        let value = spec[j].clone();
                        j += 1;
                        c.update_slot(i, |e| {
                            e.name = name;
                            e.value = value;
                        });
                    }
                }
            }
            class::install(&c, &unit.accessors_snapshot())?;
        }
        self.value = c.object();
        self.frame.static_class = c.lexical_parent();
        Ok(())
    }

    /// Resolve a static slot hint against the lexical-parent chain. The
    /// receiver is in the value register. Only a chain entry whose class
    /// the receiver belongs to resolves; markers and mismatches continue
    /// outward.
    fn lookup_static(&self, hint: u16) -> Option<Slot> {
        let mut m = hint;
        let mut cur = self.frame.static_class.clone();
        while let Some(c) = cur {
            if m == SLOT_UNKNOWN {
                break;
            }
            let e = c.slot(m as usize)?;
            if e.kind != SlotKind::Marker && self.value.is_instance_of(&c) {
                return Some(e);
            }
            m = e.next;
            cur = c.lexical_parent();
        }
        None
    }
}

impl Default for Process {
    fn default() -> Self {
        Process::new()
    }
}
