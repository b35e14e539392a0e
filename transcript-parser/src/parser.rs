// transcript-parser - Parser for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pratt (operator precedence) parser for TranScript source code.
//!
//! Binary operators desugar to method calls on their left operand, array and
//! hash literals to immediately-invoked construction functions, `import` to
//! definitions reading the `packages` table, and `package` bodies to a class
//! whose properties thread access to the package's local bindings.

use std::fmt;
use std::rc::Rc;

use crate::ast::*;
use crate::lexer::{LexError, Lexer, Token, TokenKind};

/// Parse error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub file: Rc<str>,
    pub line: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.file, self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            file: e.file,
            line: e.line,
        }
    }
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Reserved words that may not name variables or members.
pub const KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "true", "false", "nil", "def", "fn", "return", "end", "class",
    "this", "super", "private", "public", "package", "export", "import",
];

// Precedence levels, highest binds tightest.
const PREC_LOOK: i32 = 120;
const PREC_INDEX: i32 = 110;
const PREC_CALL: i32 = 100;
const PREC_UNARY: i32 = 60;
const PREC_MUL: i32 = 60;
const PREC_ADD: i32 = 50;
const PREC_CMP: i32 = 40;
const PREC_EQ: i32 = 30;
const PREC_LOG: i32 = 20;

/// The parser converts tokens into statements.
pub struct Parser {
    lexer: Lexer,
}

/// One declarator as it appears in a `def`, before it is specialised for
/// statement or class-member context.
enum RawDecl {
    Field(Option<Expr>),
    Method(FnExpr),
    Property {
        get: Option<FnExpr>,
        set: Option<FnExpr>,
    },
}

impl Parser {
    /// Create a new parser for the given source code.
    pub fn new(source: &str, file: &str) -> Self {
        Parser {
            lexer: Lexer::new(source, file),
        }
    }

    /// Parse a single top-level statement, consuming the terminating `;`.
    /// Returns `None` at end of input.
    pub fn parse_toplevel(&mut self) -> Result<Option<Stmt>> {
        let la = self.lexer.lookahead()?;
        if la.kind == TokenKind::Eof {
            return Ok(None);
        }
        let stmt = if la.is("package") {
            let t = self.next()?;
            self.parse_package(&t)?
        } else {
            self.parse_stmt()?
        };
        self.expect(";")?;
        Ok(Some(stmt))
    }

    /// Parse all statements from the source.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while let Some(s) = self.parse_toplevel()? {
            stmts.push(s);
        }
        Ok(stmts)
    }

    /// Convenience: parse a whole source string.
    pub fn parse_str(source: &str, file: &str) -> Result<Vec<Stmt>> {
        Parser::new(source, file).parse_program()
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    fn next(&mut self) -> Result<Token> {
        Ok(self.lexer.next_token()?)
    }

    fn peek_is(&mut self, text: &str) -> Result<bool> {
        Ok(self.lexer.lookahead()?.is(text))
    }

    fn expect(&mut self, text: &str) -> Result<Token> {
        let t = self.next()?;
        if !t.is(text) {
            return Err(expected(text, &t));
        }
        Ok(t)
    }

    fn parse_name(&mut self) -> Result<Token> {
        let t = self.next()?;
        if t.kind != TokenKind::Ident {
            return Err(expected("identifier", &t));
        }
        Ok(t)
    }

    fn parse_var_name(&mut self) -> Result<Token> {
        let t = self.parse_name()?;
        check_keyword(&t)?;
        Ok(t)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Parse a statement (not consuming the terminating `;`).
    fn parse_stmt(&mut self) -> Result<Stmt> {
        let t = self.next()?;
        if t.kind == TokenKind::Ident {
            match t.text.as_str() {
                "def" => return self.parse_def_stmt(&t),
                "class" => return self.parse_class_stmt(&t),
                "if" => return self.parse_if(&t),
                "return" => return self.parse_return(&t),
                "import" => return self.parse_import(&t),
                _ => {}
            }
        }
        // Expression statement, possibly an assignment.
        let expr = self.parse_expr_with(0, t)?;
        if self.peek_is("=")? {
            let eq = self.next()?;
            let value = self.parse_expr(0)?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
                pos: pos_of(&eq),
            });
        }
        Ok(Stmt::Expr(expr))
    }

    fn parse_def_stmt(&mut self, t: &Token) -> Result<Stmt> {
        let decls = self.parse_declarators()?;
        let mut out = Vec::new();
        for (name, raw, pos) in decls {
            let init = match raw {
                RawDecl::Field(init) => init,
                RawDecl::Method(f) => Some(Expr::Fn(f)),
                RawDecl::Property { .. } => {
                    return Err(error_at(t, "property definition outside a class"));
                }
            };
            out.push(Declarator { name, init, pos });
        }
        Ok(Stmt::Def(out))
    }

    /// `class Name(Ancestor) ... end` as a statement defines the name.
    fn parse_class_stmt(&mut self, t: &Token) -> Result<Stmt> {
        let nm = self.parse_var_name()?;
        let class = self.parse_class_body(Some(nm.text.clone()), &nm)?;
        Ok(Stmt::Def(vec![Declarator {
            name: nm.text,
            init: Some(Expr::Class(class)),
            pos: pos_of(t),
        }]))
    }

    fn parse_if(&mut self, t: &Token) -> Result<Stmt> {
        let cond = self.parse_expr(0)?;
        self.expect("then")?;
        let mut then = Vec::new();
        let mut els = Vec::new();
        loop {
            let la = self.lexer.lookahead()?;
            if la.is("end") {
                self.next()?;
                break;
            } else if la.is("else") {
                self.next()?;
                self.parse_block(&mut els)?;
                break;
            } else if la.is("elif") {
                let et = self.next()?;
                els.push(self.parse_if(&et)?);
                break;
            }
            then.push(self.parse_stmt()?);
            self.expect(";")?;
        }
        Ok(Stmt::If {
            cond,
            then,
            els,
            pos: pos_of(t),
        })
    }

    fn parse_return(&mut self, t: &Token) -> Result<Stmt> {
        let pos = pos_of(t);
        let value = if self.peek_is(";")? {
            Expr::Literal(Literal::Nil, pos.clone())
        } else {
            self.parse_expr(0)?
        };
        Ok(Stmt::Return(value, pos))
    }

    /// `import a, b.c;` defines each trailing name from the packages table.
    fn parse_import(&mut self, t: &Token) -> Result<Stmt> {
        let pos = pos_of(t);
        let mut decls = Vec::new();
        loop {
            let (last, dotted) = self.parse_dotted()?;
            decls.push(Declarator {
                name: last,
                init: Some(Expr::Index {
                    obj: Box::new(Expr::Var("packages".into(), pos.clone())),
                    args: vec![Expr::Literal(Literal::Str(dotted), pos.clone())],
                    pos: pos.clone(),
                }),
                pos: pos.clone(),
            });
            if self.peek_is(",")? {
                self.next()?;
            } else {
                break;
            }
        }
        Ok(Stmt::Def(decls))
    }

    fn parse_dotted(&mut self) -> Result<(String, String)> {
        let first = self.parse_var_name()?;
        let mut last = first.text.clone();
        let mut dotted = first.text;
        while self.peek_is(".")? {
            self.next()?;
            let n = self.parse_var_name()?;
            last = n.text.clone();
            dotted.push('.');
            dotted.push_str(&n.text);
        }
        Ok((last, dotted))
    }

    /// Statements until `end`, each terminated by `;`.
    fn parse_block(&mut self, out: &mut Vec<Stmt>) -> Result<()> {
        loop {
            if self.peek_is("end")? {
                self.next()?;
                return Ok(());
            }
            out.push(self.parse_stmt()?);
            self.expect(";")?;
        }
    }

    // ========================================================================
    // Declarators
    // ========================================================================

    /// The comma-separated declarator list after `def`.
    fn parse_declarators(&mut self) -> Result<Vec<(String, RawDecl, Pos)>> {
        let mut out = Vec::new();
        loop {
            let nm = self.parse_var_name()?;
            let pos = pos_of(&nm);
            let la = self.lexer.lookahead()?;
            let raw = if la.is("=") {
                self.next()?;
                RawDecl::Field(Some(self.parse_expr(0)?))
            } else if la.is("(") {
                self.next()?;
                RawDecl::Method(self.parse_fn(&nm)?)
            } else if la.is("get") || la.is("set") {
                self.parse_property()?
            } else if la.is(",") {
                self.next()?;
                out.push((nm.text, RawDecl::Field(None), pos));
                continue;
            } else {
                out.push((nm.text, RawDecl::Field(None), pos));
                break;
            };
            out.push((nm.text, raw, pos));
            if self.peek_is(",")? {
                self.next()?;
            } else {
                break;
            }
        }
        Ok(out)
    }

    fn parse_property(&mut self) -> Result<RawDecl> {
        let mut get = None;
        let mut set = None;
        loop {
            let la = self.lexer.lookahead()?;
            if la.is("get") {
                if get.is_some() {
                    let t = self.next()?;
                    return Err(unexpected(&t));
                }
                let t = self.next()?;
                self.expect("(")?;
                get = Some(self.parse_fn(&t)?);
            } else if la.is("set") {
                if set.is_some() {
                    let t = self.next()?;
                    return Err(unexpected(&t));
                }
                let t = self.next()?;
                self.expect("(")?;
                set = Some(self.parse_fn(&t)?);
            } else {
                break;
            }
        }
        Ok(RawDecl::Property { get, set })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Parse a function after its opening `(`: parameters, then either
    /// `= expr` or a block terminated by `end`.
    fn parse_fn(&mut self, t: &Token) -> Result<FnExpr> {
        let mut params = Vec::new();
        let mut opt_count = 0;
        let mut rest = false;
        if !self.peek_is(")")? {
            loop {
                if rest {
                    return Err(error_at(t, "bad function syntax"));
                }
                let nm = self.parse_var_name()?;
                params.push(nm.text);
                if self.peek_is("*")? {
                    self.next()?;
                    rest = true;
                } else if self.peek_is("?")? {
                    self.next()?;
                    opt_count += 1;
                } else if opt_count > 0 {
                    return Err(error_at(t, "bad function syntax"));
                }
                if self.peek_is(",")? {
                    self.next()?;
                } else {
                    break;
                }
            }
        }
        self.expect(")")?;
        let mut body = Vec::new();
        if self.peek_is("=")? {
            let eq = self.next()?;
            let expr = self.parse_expr(0)?;
            body.push(Stmt::Return(expr, pos_of(&eq)));
        } else {
            self.parse_block(&mut body)?;
        }
        Ok(FnExpr {
            params,
            opt_count,
            rest,
            body,
            pos: pos_of(t),
        })
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Parse a class body after the name (if any): `(Ancestor?) members end`.
    fn parse_class_body(&mut self, name: Option<String>, t: &Token) -> Result<ClassExpr> {
        self.expect("(")?;
        let ancestor = if self.peek_is(")")? {
            None
        } else {
            Some(Box::new(self.parse_expr(0)?))
        };
        self.expect(")")?;
        let mut members = Vec::new();
        let mut vis = Visibility::Public;
        loop {
            let t = self.next()?;
            if t.is("private") {
                vis = Visibility::Private;
            } else if t.is("public") {
                vis = Visibility::Public;
            } else if t.is("def") {
                for (name, raw, pos) in self.parse_declarators()? {
                    let kind = match raw {
                        RawDecl::Field(init) => MemberKind::Field(init),
                        RawDecl::Method(f) => MemberKind::Method(f),
                        RawDecl::Property { get, set } => MemberKind::Property { get, set },
                    };
                    members.push(Member {
                        vis,
                        name,
                        kind,
                        pos,
                    });
                }
                self.expect(";")?;
            } else if t.is("end") {
                break;
            } else {
                return Err(expected("def", &t));
            }
        }
        Ok(ClassExpr {
            name,
            ancestor,
            members,
            pos: pos_of(t),
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expr(&mut self, prec: i32) -> Result<Expr> {
        let t = self.next()?;
        self.parse_expr_with(prec, t)
    }

    fn parse_expr_with(&mut self, prec: i32, t: Token) -> Result<Expr> {
        let mut left = self.parse_prefix(t)?;
        loop {
            let la = self.lexer.lookahead()?;
            let Some(p) = infix_precedence(la) else {
                break;
            };
            if p <= prec {
                break;
            }
            let t = self.next()?;
            left = self.parse_infix(left, t, p)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self, t: Token) -> Result<Expr> {
        let pos = pos_of(&t);
        match t.kind {
            TokenKind::Eof => Err(error_at(&t, "unexpected end of input")),
            TokenKind::Str => Ok(Expr::Literal(Literal::Str(unquote(&t)?), pos)),
            TokenKind::Int => match t.text.parse::<i64>() {
                Ok(i) => Ok(Expr::Literal(Literal::Int(i), pos)),
                Err(_) => Err(error_at(&t, format!("bad integer literal: {}", t.text))),
            },
            TokenKind::Float => match t.text.parse::<f64>() {
                Ok(f) => Ok(Expr::Literal(Literal::Float(f), pos)),
                Err(_) => Err(error_at(&t, format!("bad float literal: {}", t.text))),
            },
            TokenKind::Ident => match t.text.as_str() {
                "true" => Ok(Expr::Literal(Literal::True, pos)),
                "false" => Ok(Expr::Literal(Literal::False, pos)),
                "nil" => Ok(Expr::Literal(Literal::Nil, pos)),
                "this" => Ok(Expr::This(pos)),
                "super" => Ok(Expr::Super(pos)),
                "fn" => {
                    self.expect("(")?;
                    Ok(Expr::Fn(self.parse_fn(&t)?))
                }
                "class" => Ok(Expr::Class(self.parse_class_body(None, &t)?)),
                _ => {
                    check_keyword(&t)?;
                    Ok(Expr::Var(t.text, pos))
                }
            },
            TokenKind::Punct => match t.text.as_str() {
                "(" => {
                    let e = self.parse_expr(0)?;
                    self.expect(")")?;
                    Ok(e)
                }
                "[" => self.parse_array_literal(&t),
                "{" => self.parse_hash_literal(&t),
                _ => Err(unexpected(&t)),
            },
            TokenKind::Op => match t.text.as_str() {
                "!" => self.parse_unary(&t, "__inv__"),
                "-" => self.parse_unary(&t, "__neg__"),
                _ => Err(unexpected(&t)),
            },
        }
    }

    fn parse_unary(&mut self, t: &Token, method: &str) -> Result<Expr> {
        let pos = pos_of(t);
        let operand = self.parse_expr(PREC_UNARY)?;
        Ok(method_call(operand, method, vec![], pos))
    }

    fn parse_infix(&mut self, left: Expr, t: Token, prec: i32) -> Result<Expr> {
        let pos = pos_of(&t);
        match t.text.as_str() {
            "." => {
                let nm = self.parse_var_name()?;
                let nm_pos = pos_of(&nm);
                Ok(Expr::Look {
                    obj: Box::new(left),
                    name: nm.text,
                    pos: nm_pos,
                })
            }
            "[" => {
                let args = self.parse_args("]")?;
                Ok(Expr::Index {
                    obj: Box::new(left),
                    args,
                    pos,
                })
            }
            "(" => {
                let args = self.parse_args(")")?;
                Ok(Expr::Call {
                    func: Box::new(left),
                    args,
                    pos,
                })
            }
            "&&" | "||" => {
                let right = self.parse_expr(prec - 1)?;
                Ok(Expr::Log {
                    and: t.is("&&"),
                    left: Box::new(left),
                    right: Box::new(right),
                    pos,
                })
            }
            op => {
                let method = binary_method(op).expect("infix operator without method");
                let right = self.parse_expr(prec)?;
                Ok(method_call(left, method, vec![right], pos))
            }
        }
    }

    /// Comma-separated expressions up to (but consuming) the closing token.
    fn parse_args(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.peek_is(close)? {
            loop {
                args.push(self.parse_expr(0)?);
                let la = self.lexer.lookahead()?;
                if la.is(",") {
                    self.next()?;
                } else if la.is(close) {
                    break;
                } else {
                    return Err(expected(&format!(", or {close}"), la));
                }
            }
        }
        self.expect(close)?;
        Ok(args)
    }

    /// `[a, b, c]` desugars to an immediately-invoked function that builds
    /// an array through `Array(0)` and `add`.
    fn parse_array_literal(&mut self, t: &Token) -> Result<Expr> {
        let pos = pos_of(t);
        let elems = self.parse_args("]")?;
        let tmp = || Expr::Var("@tmp".into(), pos.clone());
        let mut body = vec![Stmt::Def(vec![Declarator {
            name: "@tmp".into(),
            init: Some(Expr::Call {
                func: Box::new(Expr::Var("Array".into(), pos.clone())),
                args: vec![Expr::Literal(Literal::Int(0), pos.clone())],
                pos: pos.clone(),
            }),
            pos: pos.clone(),
        }])];
        if !elems.is_empty() {
            body.push(Stmt::Expr(method_call(tmp(), "add", elems, pos.clone())));
        }
        body.push(Stmt::Return(tmp(), pos.clone()));
        Ok(invoke_thunk(body, pos))
    }

    /// `{k: v, ...}` desugars to an immediately-invoked function that builds
    /// a hash through `Hash()` and subscript assignment.
    fn parse_hash_literal(&mut self, t: &Token) -> Result<Expr> {
        let pos = pos_of(t);
        let mut pairs = Vec::new();
        if !self.peek_is("}")? {
            loop {
                let k = self.parse_expr(0)?;
                self.expect(":")?;
                let v = self.parse_expr(0)?;
                pairs.push((k, v));
                let la = self.lexer.lookahead()?;
                if la.is(",") {
                    self.next()?;
                } else if la.is("}") {
                    break;
                } else {
                    return Err(expected(", or }", la));
                }
            }
        }
        self.expect("}")?;
        let tmp = || Expr::Var("@tmp".into(), pos.clone());
        let mut body = vec![Stmt::Def(vec![Declarator {
            name: "@tmp".into(),
            init: Some(Expr::Call {
                func: Box::new(Expr::Var("Hash".into(), pos.clone())),
                args: vec![],
                pos: pos.clone(),
            }),
            pos: pos.clone(),
        }])];
        for (k, v) in pairs {
            body.push(Stmt::Assign {
                target: Expr::Index {
                    obj: Box::new(tmp()),
                    args: vec![k],
                    pos: pos.clone(),
                },
                value: v,
                pos: pos.clone(),
            });
        }
        body.push(Stmt::Return(tmp(), pos.clone()));
        Ok(invoke_thunk(body, pos))
    }

    // ========================================================================
    // Packages
    // ========================================================================

    /// `package a.b ... export x, y; ... end` assigns to `packages["a.b"]`
    /// the result of running the body and instantiating a class whose
    /// properties expose the exported bindings.
    fn parse_package(&mut self, t: &Token) -> Result<Stmt> {
        let pos = pos_of(t);
        let (last, dotted) = self.parse_dotted()?;
        let mut body = Vec::new();
        let mut exports: Vec<(String, Pos)> = Vec::new();
        loop {
            let la = self.lexer.lookahead()?;
            if la.is("export") {
                self.next()?;
                loop {
                    let nm = self.parse_var_name()?;
                    let nm_pos = pos_of(&nm);
                    exports.push((nm.text, nm_pos));
                    if self.peek_is(",")? {
                        self.next()?;
                    } else {
                        break;
                    }
                }
            } else if la.is("end") {
                self.next()?;
                break;
            } else {
                body.push(self.parse_stmt()?);
            }
            self.expect(";")?;
        }

        // Exported names become get/set property pairs on the package class,
        // so package-level mutations remain visible after export.
        let members = exports
            .into_iter()
            .map(|(name, npos)| {
                let get = FnExpr {
                    params: vec![],
                    opt_count: 0,
                    rest: false,
                    body: vec![Stmt::Return(Expr::Var(name.clone(), npos.clone()), npos.clone())],
                    pos: npos.clone(),
                };
                let set = FnExpr {
                    params: vec!["@x".into()],
                    opt_count: 0,
                    rest: false,
                    body: vec![Stmt::Assign {
                        target: Expr::Var(name.clone(), npos.clone()),
                        value: Expr::Var("@x".into(), npos.clone()),
                        pos: npos.clone(),
                    }],
                    pos: npos.clone(),
                };
                Member {
                    vis: Visibility::Public,
                    name,
                    kind: MemberKind::Property {
                        get: Some(get),
                        set: Some(set),
                    },
                    pos: npos,
                }
            })
            .collect();

        let class = Expr::Class(ClassExpr {
            name: Some(last),
            ancestor: Some(Box::new(Expr::Var("Package".into(), pos.clone()))),
            members,
            pos: pos.clone(),
        });
        body.push(Stmt::Return(
            Expr::Call {
                func: Box::new(class),
                args: vec![],
                pos: pos.clone(),
            },
            pos.clone(),
        ));

        Ok(Stmt::Assign {
            target: Expr::Index {
                obj: Box::new(Expr::Var("packages".into(), pos.clone())),
                args: vec![Expr::Literal(Literal::Str(dotted), pos.clone())],
                pos: pos.clone(),
            },
            value: invoke_thunk(body, pos.clone()),
            pos,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn pos_of(t: &Token) -> Pos {
    Pos {
        file: Rc::clone(&t.file),
        line: t.line,
    }
}

fn error_at(t: &Token, message: impl Into<String>) -> ParseError {
    ParseError {
        message: message.into(),
        file: Rc::clone(&t.file),
        line: t.line,
    }
}

fn expected(what: &str, t: &Token) -> ParseError {
    error_at(t, format!("expected {what}, got {t}"))
}

fn unexpected(t: &Token) -> ParseError {
    error_at(t, format!("unexpected {t}"))
}

fn check_keyword(t: &Token) -> Result<()> {
    if KEYWORDS.contains(&t.text.as_str()) {
        return Err(unexpected(t));
    }
    Ok(())
}

/// The infix precedence of a token, or `None` if it cannot appear infix.
fn infix_precedence(t: &Token) -> Option<i32> {
    match t.kind {
        TokenKind::Punct => match t.text.as_str() {
            "." => Some(PREC_LOOK),
            "[" => Some(PREC_INDEX),
            "(" => Some(PREC_CALL),
            _ => None,
        },
        TokenKind::Op => match t.text.as_str() {
            "*" | "/" => Some(PREC_MUL),
            "+" | "-" => Some(PREC_ADD),
            "<" | "<=" | ">" | ">=" => Some(PREC_CMP),
            "==" | "!=" => Some(PREC_EQ),
            "&&" | "||" => Some(PREC_LOG),
            _ => None,
        },
        _ => None,
    }
}

fn binary_method(op: &str) -> Option<&'static str> {
    Some(match op {
        "*" => "__mul__",
        "/" => "__div__",
        "+" => "__add__",
        "-" => "__sub__",
        "<" => "__lt__",
        "<=" => "__lte__",
        ">" => "__gt__",
        ">=" => "__gte__",
        "==" => "__eq__",
        "!=" => "__neq__",
        _ => return None,
    })
}

fn method_call(obj: Expr, name: &str, args: Vec<Expr>, pos: Pos) -> Expr {
    Expr::Call {
        func: Box::new(Expr::Look {
            obj: Box::new(obj),
            name: name.into(),
            pos: pos.clone(),
        }),
        args,
        pos,
    }
}

/// Wrap statements in a zero-argument function and call it immediately.
fn invoke_thunk(body: Vec<Stmt>, pos: Pos) -> Expr {
    Expr::Call {
        func: Box::new(Expr::Fn(FnExpr {
            params: vec![],
            opt_count: 0,
            rest: false,
            body,
            pos: pos.clone(),
        })),
        args: vec![],
        pos,
    }
}

/// Decode a string literal, including its surrounding quotes.
fn unquote(t: &Token) -> Result<String> {
    let raw = &t.text;
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(error_at(t, "bad escape sequence"));
                };
                let code = u32::from_str_radix(&format!("{hi}{lo}"), 16)
                    .map_err(|_| error_at(t, "bad escape sequence"))?;
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => return Err(error_at(t, "bad escape sequence")),
                }
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(error_at(t, "bad escape sequence"));
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| error_at(t, "bad escape sequence"))?;
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => return Err(error_at(t, "bad escape sequence")),
                }
            }
            _ => return Err(error_at(t, "bad escape sequence")),
        }
    }
    Ok(out)
}
