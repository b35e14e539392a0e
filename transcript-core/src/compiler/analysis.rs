// transcript-core - Scope analysis for the TranScript compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scope analysis for function compilation.
//!
//! `closed_vars` finds the enclosing-scope bindings a function body
//! references, in first-appearance order; these become the closure's
//! captured environment. `boxed_vars` finds the freshly-bound names that
//! are written anywhere in the body (including inside nested closures);
//! those bindings are allocated as boxes at prologue time so that writes
//! are shared by reference rather than lost in a copy.

use transcript_parser::{Declarator, Expr, FnExpr, MemberKind, Stmt};

use crate::error::{Error, Result};

/// Enclosing-scope names referenced by the body.
pub fn closed_vars(body: &[Stmt], bound: &[String], free: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    for_each_expr(body, &mut |e| {
        if let Expr::Var(name, _) = e {
            if (bound.contains(name) || free.contains(name)) && !found.contains(name) {
                found.push(name.clone());
            }
        }
    });
    found
}

/// The boxed-name set for a scope that freshly binds `new_bound`: the outer
/// boxed names minus the shadowed ones, plus every fresh name the body
/// writes to.
pub fn boxed_vars(body: &[Stmt], new_bound: &[String], outer_boxed: &[String]) -> Vec<String> {
    let mut boxed: Vec<String> = outer_boxed
        .iter()
        .filter(|n| !new_bound.contains(n))
        .cloned()
        .collect();
    for_each_stmt(body, &mut |s| {
        if let Stmt::Assign {
            target: Expr::Var(name, _),
            ..
        } = s
        {
            if new_bound.contains(name) && !boxed.contains(name) {
                boxed.push(name.clone());
            }
        }
    });
    boxed
}

/// Reject duplicate names in one binding context.
pub fn check_uniq(names: &[String]) -> Result<()> {
    for (i, n) in names.iter().enumerate() {
        if names[..i].contains(n) {
            return Err(Error::Compile(format!(
                "{n} defined twice in the same context"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Tree walking
// ============================================================================

/// Visit every statement in the body, including those nested in function
/// literals and class members.
fn for_each_stmt(body: &[Stmt], f: &mut impl FnMut(&Stmt)) {
    for s in body {
        walk_stmt(s, f);
    }
}

fn walk_stmt(s: &Stmt, f: &mut impl FnMut(&Stmt)) {
    f(s);
    match s {
        Stmt::Expr(e) => walk_stmt_in_expr(e, f),
        Stmt::Def(ds) => {
            for Declarator { init, .. } in ds {
                if let Some(e) = init {
                    walk_stmt_in_expr(e, f);
                }
            }
        }
        Stmt::Assign { target, value, .. } => {
            walk_stmt_in_expr(target, f);
            walk_stmt_in_expr(value, f);
        }
        Stmt::Return(e, _) => walk_stmt_in_expr(e, f),
        Stmt::If {
            cond, then, els, ..
        } => {
            walk_stmt_in_expr(cond, f);
            for s in then {
                walk_stmt(s, f);
            }
            for s in els {
                walk_stmt(s, f);
            }
        }
    }
}

fn walk_stmt_in_expr(e: &Expr, f: &mut impl FnMut(&Stmt)) {
    walk_expr(e, &mut |_| {}, &mut |body| {
        for s in body {
            walk_stmt(s, f);
        }
    });
}

/// Visit every expression in the body, including those nested in function
/// literals and class members.
fn for_each_expr(body: &[Stmt], f: &mut impl FnMut(&Expr)) {
    for s in body {
        walk_exprs_in_stmt(s, f);
    }
}

fn walk_exprs_in_stmt(s: &Stmt, f: &mut impl FnMut(&Expr)) {
    match s {
        Stmt::Expr(e) => walk_expr_deep(e, f),
        Stmt::Def(ds) => {
            for Declarator { init, .. } in ds {
                if let Some(e) = init {
                    walk_expr_deep(e, f);
                }
            }
        }
        Stmt::Assign { target, value, .. } => {
            walk_expr_deep(target, f);
            walk_expr_deep(value, f);
        }
        Stmt::Return(e, _) => walk_expr_deep(e, f),
        Stmt::If {
            cond, then, els, ..
        } => {
            walk_expr_deep(cond, f);
            for s in then {
                walk_exprs_in_stmt(s, f);
            }
            for s in els {
                walk_exprs_in_stmt(s, f);
            }
        }
    }
}

fn walk_expr_deep(e: &Expr, f: &mut impl FnMut(&Expr)) {
    let mut bodies: Vec<&[Stmt]> = Vec::new();
    walk_expr(e, f, &mut |body| bodies.push(body));
    for body in bodies {
        for s in body {
            walk_exprs_in_stmt(s, f);
        }
    }
}

/// Visit one expression tree: `f` sees every node, `g` sees every nested
/// statement body (function literals, class member bodies).
fn walk_expr<'a>(e: &'a Expr, f: &mut impl FnMut(&Expr), g: &mut impl FnMut(&'a [Stmt])) {
    f(e);
    match e {
        Expr::Literal(..) | Expr::Var(..) | Expr::This(_) | Expr::Super(_) => {}
        Expr::Look { obj, .. } => walk_expr(obj, f, g),
        Expr::Index { obj, args, .. } => {
            walk_expr(obj, f, g);
            for a in args {
                walk_expr(a, f, g);
            }
        }
        Expr::Call { func, args, .. } => {
            walk_expr(func, f, g);
            for a in args {
                walk_expr(a, f, g);
            }
        }
        Expr::Log { left, right, .. } => {
            walk_expr(left, f, g);
            walk_expr(right, f, g);
        }
        Expr::Fn(FnExpr { body, .. }) => g(body),
        Expr::Class(c) => {
            if let Some(a) = &c.ancestor {
                walk_expr(a, f, g);
            }
            for m in &c.members {
                match &m.kind {
                    MemberKind::Field(Some(e)) => walk_expr(e, f, g),
                    MemberKind::Field(None) => {}
                    MemberKind::Method(fe) => g(&fe.body),
                    MemberKind::Property { get, set } => {
                        if let Some(fe) = get {
                            g(&fe.body);
                        }
                        if let Some(fe) = set {
                            g(&fe.body);
                        }
                    }
                }
            }
        }
    }
}
