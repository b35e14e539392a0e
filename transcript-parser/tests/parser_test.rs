// transcript-parser - Parser tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use transcript_parser::{Expr, Literal, MemberKind, Parser, Stmt, Visibility};

fn parse(src: &str) -> Vec<Stmt> {
    Parser::parse_str(src, "test").expect("parse error")
}

fn parse_one(src: &str) -> Stmt {
    let mut stmts = parse(src);
    assert_eq!(stmts.len(), 1, "expected one statement");
    stmts.remove(0)
}

fn parse_expr(src: &str) -> Expr {
    match parse_one(&format!("{src};")) {
        Stmt::Expr(e) => e,
        other => panic!("expected expression, got {other:?}"),
    }
}

#[test]
fn test_literals() {
    assert_eq!(parse_expr("42"), Expr::Literal(Literal::Int(42), pos()));
    assert!(matches!(
        parse_expr("14.72"),
        Expr::Literal(Literal::Float(f), _) if (f - 14.72).abs() < 1e-9
    ));
    assert!(matches!(parse_expr("nil"), Expr::Literal(Literal::Nil, _)));
    assert!(matches!(parse_expr("true"), Expr::Literal(Literal::True, _)));
    assert!(matches!(
        parse_expr(r#""a\nb""#),
        Expr::Literal(Literal::Str(s), _) if s == "a\nb"
    ));
}

fn pos() -> transcript_parser::Pos {
    transcript_parser::Pos {
        file: std::rc::Rc::from("test"),
        line: 1,
    }
}

#[test]
fn test_binary_operators_desugar_to_method_calls() {
    // 1 + 2 becomes 1.__add__(2)
    let Expr::Call { func, args, .. } = parse_expr("1 + 2") else {
        panic!("expected call");
    };
    let Expr::Look { name, .. } = *func else {
        panic!("expected member access");
    };
    assert_eq!(name, "__add__");
    assert_eq!(args.len(), 1);
}

#[test]
fn test_precedence() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let Expr::Call { func, args, .. } = parse_expr("1 + 2 * 3") else {
        panic!("expected call");
    };
    let Expr::Look { name, obj, .. } = *func else {
        panic!("expected member access");
    };
    assert_eq!(name, "__add__");
    assert!(matches!(*obj, Expr::Literal(Literal::Int(1), _)));
    let Expr::Call { func, .. } = &args[0] else {
        panic!("expected nested call");
    };
    let Expr::Look { name, .. } = &**func else {
        panic!("expected member access");
    };
    assert_eq!(name, "__mul__");
}

#[test]
fn test_left_associativity() {
    // 10 - 2 - 3 parses as (10 - 2) - 3
    let Expr::Call { func, .. } = parse_expr("10 - 2 - 3") else {
        panic!("expected call");
    };
    let Expr::Look { obj, .. } = *func else {
        panic!("expected member access");
    };
    assert!(matches!(*obj, Expr::Call { .. }));
}

#[test]
fn test_logical_operators() {
    assert!(matches!(parse_expr("a && b"), Expr::Log { and: true, .. }));
    assert!(matches!(parse_expr("a || b"), Expr::Log { and: false, .. }));
}

#[test]
fn test_member_access_and_calls() {
    let Expr::Call { func, args, .. } = parse_expr("a.b(1, 2)") else {
        panic!("expected call");
    };
    assert!(matches!(*func, Expr::Look { .. }));
    assert_eq!(args.len(), 2);
}

#[test]
fn test_index_access() {
    assert!(matches!(parse_expr("a[0]"), Expr::Index { .. }));
}

#[test]
fn test_array_literal_desugars_to_thunk() {
    // [1, 2] is an immediately-invoked construction function
    let Expr::Call { func, args, .. } = parse_expr("[1, 2]") else {
        panic!("expected call");
    };
    assert!(args.is_empty());
    assert!(matches!(*func, Expr::Fn(_)));
}

#[test]
fn test_def_forms() {
    let Stmt::Def(ds) = parse_one("def a = 1, b, c = 2;") else {
        panic!("expected def");
    };
    assert_eq!(ds.len(), 3);
    assert_eq!(ds[0].name, "a");
    assert!(ds[1].init.is_none());
    assert_eq!(ds[2].name, "c");
}

#[test]
fn test_function_definition() {
    let Stmt::Def(ds) = parse_one("def f(x, y) return x; end;") else {
        panic!("expected def");
    };
    let Some(Expr::Fn(f)) = &ds[0].init else {
        panic!("expected function initialiser");
    };
    assert_eq!(f.params, vec!["x", "y"]);
    assert_eq!(f.opt_count, 0);
    assert!(!f.rest);
}

#[test]
fn test_shorthand_function_body() {
    // fn(x) = e is fn(x) return e; end
    let Expr::Fn(f) = parse_expr("fn(x) = x") else {
        panic!("expected function");
    };
    assert_eq!(f.body.len(), 1);
    assert!(matches!(f.body[0], Stmt::Return(..)));
}

#[test]
fn test_optional_and_rest_parameters() {
    let Expr::Fn(f) = parse_expr("fn(a, b?, c*) = a") else {
        panic!("expected function");
    };
    assert_eq!(f.params, vec!["a", "b", "c"]);
    assert_eq!(f.opt_count, 1);
    assert!(f.rest);
}

#[test]
fn test_required_after_optional_rejected() {
    assert!(Parser::parse_str("def f(a?, b) = a;", "test").is_err());
}

#[test]
fn test_assignment_targets() {
    assert!(matches!(
        parse_one("a = 1;"),
        Stmt::Assign {
            target: Expr::Var(..),
            ..
        }
    ));
    assert!(matches!(
        parse_one("a.b = 1;"),
        Stmt::Assign {
            target: Expr::Look { .. },
            ..
        }
    ));
    assert!(matches!(
        parse_one("a[0] = 1;"),
        Stmt::Assign {
            target: Expr::Index { .. },
            ..
        }
    ));
}

#[test]
fn test_if_elif_else() {
    let Stmt::If { then, els, .. } = parse_one("if a then b; elif c then d; else e; end;") else {
        panic!("expected if");
    };
    assert_eq!(then.len(), 1);
    // the elif nests as a single if statement in the else branch
    assert_eq!(els.len(), 1);
    assert!(matches!(els[0], Stmt::If { .. }));
}

#[test]
fn test_class_statement_defines_name() {
    let Stmt::Def(ds) = parse_one(
        "class Vector() def x, y; def length() return 1; end; end;",
    ) else {
        panic!("expected def");
    };
    assert_eq!(ds[0].name, "Vector");
    let Some(Expr::Class(c)) = &ds[0].init else {
        panic!("expected class initialiser");
    };
    assert_eq!(c.name.as_deref(), Some("Vector"));
    assert!(c.ancestor.is_none());
    assert_eq!(c.members.len(), 3);
    assert!(matches!(c.members[0].kind, MemberKind::Field(None)));
    assert!(matches!(c.members[2].kind, MemberKind::Method(_)));
}

#[test]
fn test_class_visibility_sections() {
    let Stmt::Def(ds) = parse_one("class C() private def a; public def b; end;") else {
        panic!("expected def");
    };
    let Some(Expr::Class(c)) = &ds[0].init else {
        panic!("expected class");
    };
    assert_eq!(c.members[0].vis, Visibility::Private);
    assert_eq!(c.members[1].vis, Visibility::Public);
}

#[test]
fn test_property_declaration() {
    let Stmt::Def(ds) =
        parse_one("class C() def p get() return 1; end set(v) a = v; end; end;")
    else {
        panic!("expected def");
    };
    let Some(Expr::Class(c)) = &ds[0].init else {
        panic!("expected class");
    };
    let MemberKind::Property { get, set } = &c.members[0].kind else {
        panic!("expected property");
    };
    assert!(get.is_some());
    assert!(set.is_some());
}

#[test]
fn test_property_outside_class_rejected() {
    assert!(Parser::parse_str("def p get() return 1; end;", "test").is_err());
}

#[test]
fn test_import_desugars_to_defs() {
    let Stmt::Def(ds) = parse_one("import a, b.c;") else {
        panic!("expected def");
    };
    assert_eq!(ds.len(), 2);
    assert_eq!(ds[0].name, "a");
    // dotted imports bind the trailing name
    assert_eq!(ds[1].name, "c");
}

#[test]
fn test_keywords_rejected_as_names() {
    assert!(Parser::parse_str("def class = 1;", "test").is_err());
    assert!(Parser::parse_str("return = 1;", "test").is_err());
}

#[test]
fn test_package_desugars_to_assignment() {
    let stmt = parse_one("package p def x = 1; export x; end;");
    let Stmt::Assign { target, .. } = stmt else {
        panic!("expected packages assignment");
    };
    assert!(matches!(target, Expr::Index { .. }));
}

#[test]
fn test_missing_semicolon_rejected() {
    assert!(Parser::parse_str("def a = 1", "test").is_err());
}
