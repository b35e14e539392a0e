// transcript-core - Code generation for the TranScript compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: syntax tree to bytecode.
//!
//! Each top-level statement compiles into the unit's block 0 with a fresh
//! scope; function bodies get their own blocks. Calls in tail position emit
//! `Shuffle` + `Call` with no saved frame, so the callee reuses the
//! caller's stack region. Block-local bindings are hoisted into undefined
//! boxes so mutually recursive definitions compile without ordering
//! constraints; reads fault until the definition runs.

use std::rc::Rc;

use transcript_parser::{
    ClassExpr, Declarator, Expr, FnExpr, Literal, MemberKind, Pos, Stmt, Visibility,
};

use crate::class::{Skeleton, SlotKind, SlotSpec, SlotVis};
use crate::compiler::analysis::{boxed_vars, check_uniq, closed_vars};
use crate::error::{Error, Result};
use crate::opcode::{Op, SLOT_UNKNOWN};
use crate::unit::Unit;
use crate::value::Value;

/// Compile a program into the unit's top-level block.
pub fn compile_program(unit: &Unit, stmts: &[Stmt]) -> Result<()> {
    let mut c = Compiler {
        unit,
        cur_file: None,
        cur_line: 0,
    };
    for s in stmts {
        let mut sc = Scope::default();
        let mut em = Emitter::new(unit.toplevel_len());
        c.compile_stmt(s, &mut sc, &mut em, true)?;
        unit.extend_toplevel(&em.code);
    }
    Ok(())
}

/// Name environment for one compilation context.
#[derive(Clone, Default)]
struct Scope {
    /// Stack-slot names, innermost last. Shadowed entries are blanked.
    bound: Vec<String>,
    /// Captured names, indexing the closure environment.
    free: Vec<String>,
    /// Names whose bindings live in boxes.
    boxed: Vec<String>,
    /// Slot names of the class under compilation (static-hint table).
    class: Vec<String>,
    /// Inside a class body (makes `this` legal).
    in_class: bool,
    /// Function nesting depth (makes `return` legal).
    fn_depth: usize,
}

impl Scope {
    /// A name reads through a box if it was boxed here or is a global.
    fn is_boxed(&self, name: &str) -> bool {
        self.boxed.iter().any(|n| n == name)
            || (!self.bound.iter().any(|n| n == name) && !self.free.iter().any(|n| n == name))
    }

    /// The static slot hint for a member name.
    fn static_hint(&self, name: &str) -> u16 {
        match self.class.iter().position(|n| n == name) {
            Some(i) => i as u16,
            None => SLOT_UNKNOWN,
        }
    }
}

/// An append-only code buffer. Jump targets are absolute within the final
/// block, so the buffer knows its offset.
struct Emitter {
    code: Vec<u16>,
    offset: usize,
}

impl Emitter {
    fn new(offset: usize) -> Emitter {
        Emitter {
            code: Vec::new(),
            offset,
        }
    }

    /// Emit an instruction, returning its buffer position for patching.
    fn write(&mut self, op: Op, args: &[u16]) -> usize {
        let sym = self.code.len();
        self.code.push(op as u16);
        self.code.extend_from_slice(args);
        sym
    }

    /// Point the patched instruction's first immediate at the current
    /// position.
    fn place(&mut self, sym: usize) {
        self.code[sym + 1] = (self.code.len() + self.offset) as u16;
    }
}

struct Compiler<'a> {
    unit: &'a Unit,
    cur_file: Option<Rc<str>>,
    cur_line: u32,
}

impl<'a> Compiler<'a> {
    // ========================================================================
    // Source positions
    // ========================================================================

    fn emit_src(&mut self, pos: &Pos, em: &mut Emitter) {
        if self.cur_line != pos.line || self.cur_file.as_deref() != Some(&pos.file) {
            self.write_src(pos, em);
        }
    }

    fn write_src(&mut self, pos: &Pos, em: &mut Emitter) {
        self.cur_file = Some(Rc::clone(&pos.file));
        self.cur_line = pos.line;
        let k = self.unit.get_const(Value::str(pos.file.to_string()));
        em.write(Op::Source, &[k, pos.line as u16]);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_stmt(
        &mut self,
        s: &Stmt,
        sc: &mut Scope,
        em: &mut Emitter,
        toplevel: bool,
    ) -> Result<()> {
        self.emit_src(s.pos(), em);
        match s {
            Stmt::Expr(e) => self.compile_expr(e, sc, em, false),
            Stmt::Def(ds) => self.compile_def(ds, sc, em, toplevel),
            Stmt::Assign { target, value, pos } => self.compile_assign(target, value, pos, sc, em),
            Stmt::Return(e, pos) => {
                if sc.fn_depth == 0 {
                    return Err(Error::compile_at(pos, "unexpected return"));
                }
                self.compile_expr(e, sc, em, true)?;
                em.write(Op::Return, &[]);
                Ok(())
            }
            Stmt::If {
                cond, then, els, ..
            } => {
                self.compile_expr(cond, sc, em, false)?;
                let bpos = em.write(Op::Branch, &[0]);
                self.compile_block(then, sc, em)?;
                em.write(Op::Value, &[0]);
                let jpos = em.write(Op::Jump, &[0]);
                em.place(bpos);
                self.compile_block(els, sc, em)?;
                em.write(Op::Value, &[0]);
                em.place(jpos);
                Ok(())
            }
        }
    }

    fn compile_def(
        &mut self,
        ds: &[Declarator],
        sc: &mut Scope,
        em: &mut Emitter,
        toplevel: bool,
    ) -> Result<()> {
        for d in ds {
            match &d.init {
                None => {
                    em.write(Op::Value, &[0]);
                }
                Some(e) => self.compile_expr(e, sc, em, false)?,
            }
            em.write(Op::Push, &[]);
            if toplevel {
                let g = self.unit.get_global(&d.name);
                em.write(Op::Global, &[g]);
            } else {
                let i = sc
                    .bound
                    .iter()
                    .position(|n| n == &d.name)
                    .ok_or_else(|| Error::compile_at(&d.pos, "definition outside a block"))?;
                em.write(Op::Bound, &[i as u16]);
            }
            em.write(Op::Define, &[]);
            em.write(Op::Update, &[]);
        }
        Ok(())
    }

    fn compile_assign(
        &mut self,
        target: &Expr,
        value: &Expr,
        pos: &Pos,
        sc: &mut Scope,
        em: &mut Emitter,
    ) -> Result<()> {
        match target {
            Expr::Index { obj, args, .. } => {
                let mut full: Vec<&Expr> = args.iter().collect();
                full.push(value);
                self.compile_method_call(obj, "__aset__", &full, sc, em, false)
            }
            Expr::Look { obj, name, .. } => {
                self.compile_expr(value, sc, em, false)?;
                em.write(Op::Push, &[]);
                self.compile_expr(obj, sc, em, false)?;
                let acc = self.unit.get_accessor(name);
                em.write(Op::Set, &[acc, sc.static_hint(name)]);
                Ok(())
            }
            Expr::Var(name, _) => {
                self.compile_expr(value, sc, em, false)?;
                em.write(Op::Push, &[]);
                self.compile_lookup(name, sc, em);
                em.write(Op::Update, &[]);
                Ok(())
            }
            _ => Err(Error::compile_at(pos, "invalid location for writing")),
        }
    }

    /// A block: hoist its `def` names into undefined boxes, compile the
    /// statements, then retract the bindings.
    fn compile_block(&mut self, stmts: &[Stmt], sc: &Scope, em: &mut Emitter) -> Result<()> {
        let l = sc.bound.len();
        let mut outer = sc.bound.clone();
        let mut bound = Vec::new();
        for s in stmts {
            if let Stmt::Def(ds) = s {
                for d in ds {
                    if let Some(p) = outer.iter().position(|n| n == &d.name) {
                        outer[p] = String::new();
                    }
                    bound.push(d.name.clone());
                }
            }
        }
        check_uniq(&bound)?;
        for (i, name) in bound.iter().enumerate() {
            let k = self.unit.get_const(Value::str(name.clone()));
            em.write(Op::Value, &[k]);
            em.write(Op::Push, &[]);
            em.write(Op::Undefine, &[(l + i) as u16]);
        }
        let mut inner = sc.clone();
        inner.bound = outer;
        inner.bound.extend(bound.iter().cloned());
        inner.boxed.extend(bound.iter().cloned());
        for s in stmts {
            self.compile_stmt(s, &mut inner, em, false)?;
        }
        em.write(Op::Retract, &[bound.len() as u16]);
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expr(
        &mut self,
        e: &Expr,
        sc: &mut Scope,
        em: &mut Emitter,
        tail: bool,
    ) -> Result<()> {
        self.emit_src(e.pos(), em);
        match e {
            Expr::Literal(lit, _) => {
                let k = match lit {
                    Literal::Nil => 0,
                    Literal::True => 1,
                    Literal::False => 2,
                    Literal::Int(i) => self.unit.get_const(Value::int(*i)),
                    Literal::Float(f) => self.unit.get_const(Value::float(*f)),
                    Literal::Str(s) => self.unit.get_const(Value::str(s.clone())),
                };
                em.write(Op::Value, &[k]);
                Ok(())
            }
            Expr::Var(name, _) => {
                self.compile_lookup(name, sc, em);
                if sc.is_boxed(name) {
                    em.write(Op::Unbox, &[]);
                }
                Ok(())
            }
            Expr::This(pos) => {
                if !sc.in_class {
                    return Err(Error::compile_at(pos, "unexpected this"));
                }
                em.write(Op::This, &[]);
                Ok(())
            }
            Expr::Super(pos) => Err(Error::compile_at(pos, "unexpected super")),
            Expr::Look { obj, name, pos } => {
                if matches!(**obj, Expr::Super(_)) {
                    return Err(Error::compile_at(pos, "unexpected super"));
                }
                self.compile_expr(obj, sc, em, false)?;
                let acc = self.unit.get_accessor(name);
                em.write(Op::Get, &[acc, sc.static_hint(name)]);
                Ok(())
            }
            Expr::Index { obj, args, .. } => {
                let refs: Vec<&Expr> = args.iter().collect();
                self.compile_method_call(obj, "__aget__", &refs, sc, em, tail)
            }
            Expr::Call { func, args, .. } => {
                let refs: Vec<&Expr> = args.iter().collect();
                self.compile_call(func, &refs, sc, em, tail)
            }
            Expr::Log {
                and, left, right, ..
            } => {
                self.compile_expr(left, sc, em, false)?;
                let bpos = em.write(Op::Branch, &[0]);
                if *and {
                    self.compile_expr(right, sc, em, false)?;
                }
                let jpos = em.write(Op::Jump, &[0]);
                em.place(bpos);
                if !*and {
                    self.compile_expr(right, sc, em, false)?;
                }
                em.place(jpos);
                Ok(())
            }
            Expr::Fn(f) => self.compile_fn(f, sc, em),
            Expr::Class(c) => self.compile_class(c, sc, em),
        }
    }

    fn compile_lookup(&mut self, name: &str, sc: &Scope, em: &mut Emitter) {
        if let Some(i) = sc.bound.iter().position(|n| n == name) {
            em.write(Op::Bound, &[i as u16]);
        } else if let Some(i) = sc.free.iter().position(|n| n == name) {
            em.write(Op::Free, &[i as u16]);
        } else {
            let g = self.unit.get_global(name);
            em.write(Op::Global, &[g]);
        }
    }

    fn compile_call(
        &mut self,
        func: &Expr,
        args: &[&Expr],
        sc: &mut Scope,
        em: &mut Emitter,
        tail: bool,
    ) -> Result<()> {
        let fpos = if tail {
            None
        } else {
            Some(em.write(Op::Frame, &[0]))
        };
        for a in args {
            self.compile_expr(a, sc, em, false)?;
            em.write(Op::Push, &[]);
        }
        match func {
            Expr::Look { obj, name, .. } if matches!(**obj, Expr::Super(_)) => {
                em.write(Op::Super, &[sc.static_hint(name)]);
            }
            Expr::Look { obj, name, .. } => {
                self.compile_expr(obj, sc, em, false)?;
                em.write(Op::LThis, &[]);
                let acc = self.unit.get_accessor(name);
                em.write(Op::GetM, &[acc, sc.static_hint(name)]);
            }
            _ => self.compile_expr(func, sc, em, false)?,
        }
        if tail {
            em.write(Op::Shuffle, &[args.len() as u16]);
        }
        em.write(Op::Call, &[args.len() as u16]);
        if let Some(f) = fpos {
            em.place(f);
        }
        Ok(())
    }

    /// A call through a named method: subscript access and operator
    /// desugarings use this.
    fn compile_method_call(
        &mut self,
        obj: &Expr,
        name: &str,
        args: &[&Expr],
        sc: &mut Scope,
        em: &mut Emitter,
        tail: bool,
    ) -> Result<()> {
        let fpos = if tail {
            None
        } else {
            Some(em.write(Op::Frame, &[0]))
        };
        for a in args {
            self.compile_expr(a, sc, em, false)?;
            em.write(Op::Push, &[]);
        }
        self.compile_expr(obj, sc, em, false)?;
        em.write(Op::LThis, &[]);
        let acc = self.unit.get_accessor(name);
        em.write(Op::GetM, &[acc, sc.static_hint(name)]);
        if tail {
            em.write(Op::Shuffle, &[args.len() as u16]);
        }
        em.write(Op::Call, &[args.len() as u16]);
        if let Some(f) = fpos {
            em.place(f);
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn compile_fn(&mut self, f: &FnExpr, sc: &mut Scope, em: &mut Emitter) -> Result<()> {
        let bound = f.params.clone();
        check_uniq(&bound)?;
        let free = closed_vars(&f.body, &sc.bound, &sc.free);
        let boxed = boxed_vars(&f.body, &bound, &sc.boxed);
        let fs = Scope {
            bound,
            free: free.clone(),
            boxed,
            class: sc.class.clone(),
            in_class: sc.in_class,
            fn_depth: sc.fn_depth + 1,
        };
        let mut fe = Emitter::new(0);

        // prologue
        let total = fs.bound.len();
        if f.rest {
            fe.write(
                Op::PrologRest,
                &[(total - f.opt_count - 1) as u16, (total - 1) as u16],
            );
        } else if f.opt_count > 0 {
            fe.write(Op::PrologOpt, &[(total - f.opt_count) as u16, total as u16]);
        } else {
            fe.write(Op::Prolog, &[total as u16]);
        }
        for i in 0..fs.bound.len() {
            if fs.is_boxed(&fs.bound[i]) {
                fe.write(Op::Box, &[i as u16]);
            }
        }
        if let Some(first) = f.body.first() {
            self.write_src(first.pos(), &mut fe);
        }

        // body
        self.compile_block(&f.body, &fs, &mut fe)?;
        fe.write(Op::Value, &[0]);
        fe.write(Op::Return, &[]);

        // store the block, then emit the capture sequence
        let ix = self.unit.add_block(fe.code);
        for x in &free {
            self.compile_lookup(x, sc, em);
            em.write(Op::Push, &[]);
        }
        em.write(Op::Close, &[ix as u16, free.len() as u16]);
        Ok(())
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn compile_class(&mut self, c: &ClassExpr, sc: &mut Scope, em: &mut Emitter) -> Result<()> {
        // Build the skeleton: one spec per member, then a marker per
        // enclosing-class slot name so inner classes can reach outward.
        let mut names: Vec<String> = Vec::new();
        let mut specs: Vec<SlotSpec> = Vec::new();
        for m in &c.members {
            let kind = match &m.kind {
                MemberKind::Field(_) => SlotKind::Field,
                MemberKind::Method(_) => SlotKind::Method,
                MemberKind::Property { .. } => SlotKind::Property,
            };
            let vis = match m.vis {
                Visibility::Private => SlotVis::Private,
                Visibility::Public => SlotVis::Public,
            };
            specs.push(SlotSpec {
                kind,
                vis,
                access: self.unit.get_accessor(&m.name),
                next: sc.static_hint(&m.name),
            });
            names.push(m.name.clone());
        }
        check_uniq(&names)?;
        for (i, x) in sc.class.iter().enumerate() {
            specs.push(SlotSpec {
                kind: SlotKind::Marker,
                vis: SlotVis::Private,
                access: self.unit.get_accessor(x),
                next: i as u16,
            });
            names.push(x.clone());
        }
        let skel = Rc::new(Skeleton {
            name: c.name.clone().unwrap_or_default(),
            slots: specs,
        });

        let mut cs = sc.clone();
        cs.class = names;
        cs.in_class = true;

        let k = self.unit.get_const(Value::skeleton(skel));
        em.write(Op::Value, &[k]);
        em.write(Op::Push, &[]);
        match &c.ancestor {
            None => {
                let g = self.unit.get_global("Object");
                em.write(Op::Global, &[g]);
                em.write(Op::Unbox, &[]);
            }
            Some(a) => self.compile_expr(a, &mut cs, em, false)?,
        }
        em.write(Op::ExtendA, &[self.unit.get_accessor("")]);

        // Slot values in declaration order. Method and property bodies are
        // rewritten to CloseM so they take the receiver from the call site.
        let mut count: u16 = 0;
        for m in &c.members {
            match &m.kind {
                MemberKind::Field(None) => {
                    em.write(Op::Value, &[0]);
                    em.write(Op::Push, &[]);
                    count += 1;
                }
                MemberKind::Field(Some(e)) => {
                    self.compile_expr(e, &mut cs, em, false)?;
                    em.write(Op::Push, &[]);
                    count += 1;
                }
                MemberKind::Method(f) => {
                    self.compile_fn(f, &mut cs, em)?;
                    rewrite_close_m(em);
                    em.write(Op::Push, &[]);
                    count += 1;
                }
                MemberKind::Property { get, set } => {
                    for half in [get, set] {
                        match half {
                            None => {
                                em.write(Op::Value, &[0]);
                            }
                            Some(f) => {
                                self.compile_fn(f, &mut cs, em)?;
                                rewrite_close_m(em);
                            }
                        }
                        em.write(Op::Push, &[]);
                        count += 1;
                    }
                }
            }
        }
        em.write(Op::Finish, &[count]);
        Ok(())
    }
}

/// Rewrite the just-emitted `Close` into `CloseM`.
fn rewrite_close_m(em: &mut Emitter) {
    let l = em.code.len();
    debug_assert_eq!(em.code[l - 3], Op::Close as u16);
    em.code[l - 3] = Op::CloseM as u16;
}
