use bumpalo::Bump;
use indoc::indoc;
use pretty_assertions::assert_eq;

use super::parser::{parse, parse_with_max_depth};
use crate::parser::{
    AssignOp, BinaryOp, Declarator, Expr, Literal, ParseErrorKind, Span, StepOp, Stmt, TypeExpr,
};

fn body<'a>(arena: &'a Bump, source: &'a str) -> &'a [Stmt<'a>] {
    parse(arena, source)
        .unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"))
        .body
}

fn single_expr<'a>(arena: &'a Bump, source: &'a str) -> &'a Expr<'a> {
    match body(arena, source) {
        [Stmt::Expr(expr)] => expr,
        other => panic!("expected one expression statement, got {other:?}"),
    }
}

#[test]
fn test_literals() {
    let arena = Bump::new();
    assert_eq!(single_expr(&arena, "42"), &Expr::Literal(Literal::Int(42)));
    assert_eq!(single_expr(&arena, "42L"), &Expr::Literal(Literal::Long(42)));
    assert_eq!(
        single_expr(&arena, "3000000000"),
        &Expr::Literal(Literal::Long(3_000_000_000))
    );
    assert_eq!(
        single_expr(&arena, "-2147483648"),
        &Expr::Literal(Literal::Int(i32::MIN))
    );
    assert_eq!(single_expr(&arena, "2.5"), &Expr::Literal(Literal::Double(2.5)));
    assert_eq!(single_expr(&arena, "1e3"), &Expr::Literal(Literal::Double(1000.0)));
    assert_eq!(
        single_expr(&arena, r#"'it\'s\n'"#),
        &Expr::Literal(Literal::Str("it's\n"))
    );
    assert_eq!(
        single_expr(&arena, r#""A""#),
        &Expr::Literal(Literal::Str("A"))
    );
    assert_eq!(single_expr(&arena, "null"), &Expr::Literal(Literal::Null));
}

#[test]
fn test_member_chain() {
    let arena = Bump::new();
    let expr = single_expr(&arena, "foo.bar.woof");
    assert_eq!(expr.dotted_path().as_deref(), Some("foo.bar.woof"));

    let Expr::MethodCall {
        receiver,
        method,
        args,
    } = single_expr(&arena, "a.b.substring(1, 2)")
    else {
        panic!("expected a method call");
    };
    assert_eq!(*method, "substring");
    assert_eq!(args.len(), 2);
    assert_eq!(receiver.dotted_path().as_deref(), Some("a.b"));
}

#[test]
fn test_spans_are_recorded() {
    let arena = Bump::new();
    let source = "x + foo.bar";
    let parsed = parse(&arena, source).unwrap();
    let [Stmt::Expr(expr)] = parsed.body else {
        panic!("expected one statement");
    };
    assert_eq!(parsed.span_of(expr), Span(0..11));
    let Expr::Binary { right, .. } = expr else {
        panic!("expected binary");
    };
    assert_eq!(parsed.span_of(right).str_of(source), "foo.bar");
}

#[test]
fn test_multi_declaration() {
    let arena = Bump::new();
    let stmts = body(&arena, "int a = 1, b; var c = 'x'");
    let [
        Stmt::Declare {
            ty: Some(TypeExpr { path: "int", .. }),
            declarators,
        },
        Stmt::Declare { ty: None, declarators: var_decls },
    ] = stmts
    else {
        panic!("unexpected statements: {stmts:?}");
    };
    let names: Vec<_> = declarators.iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(declarators[1].init.is_none());
    assert!(matches!(
        var_decls,
        [Declarator {
            name: "c",
            init: Some(Expr::Literal(Literal::Str("x"))),
            ..
        }]
    ));
}

#[test]
fn test_generic_and_array_types() {
    let arena = Bump::new();
    let stmts = body(&arena, "java.util.List<String>[] xs");
    let [Stmt::Declare { ty: Some(ty), .. }] = stmts else {
        panic!("unexpected statements: {stmts:?}");
    };
    assert_eq!(ty.path, "java.util.List");
    assert_eq!(ty.dims, 1);
    assert_eq!(ty.args.len(), 1);
    assert_eq!(ty.args[0].path, "String");
}

#[test]
fn test_compound_assignment_and_steps() {
    let arena = Bump::new();
    let stmts = body(&arena, "x += 2; i++");
    assert!(matches!(
        stmts,
        [
            Stmt::Expr(Expr::Assign {
                op: AssignOp::Compound(BinaryOp::Add),
                ..
            }),
            Stmt::Expr(Expr::Step {
                op: StepOp::Incr,
                ..
            }),
        ]
    ));
}

#[test]
fn test_control_flow() {
    let arena = Bump::new();
    let source = indoc! {"
        int total = 0;
        for (int i = 0; i < 3; i++) {
            if (i % 2 == 0) total += i; else { total -= 1 }
        }
        for (String s : names) total++;
        while (total > 10) total--;
        return total
    "};
    let stmts = body(&arena, source);
    assert_eq!(stmts.len(), 5);
    let Stmt::For {
        init: Some(Stmt::Declare { .. }),
        cond: Some(_),
        update,
        body: for_body,
    } = &stmts[1]
    else {
        panic!("expected a for loop, got {:?}", stmts[1]);
    };
    assert_eq!(update.len(), 1);
    assert!(matches!(
        for_body,
        [Stmt::If {
            else_branch: Some(_),
            ..
        }]
    ));
    assert!(matches!(
        &stmts[2],
        Stmt::ForEach {
            ty: Some(TypeExpr { path: "String", .. }),
            var: "s",
            ..
        }
    ));
    assert!(matches!(&stmts[3], Stmt::While { .. }));
    assert!(matches!(&stmts[4], Stmt::Return(Some(Expr::Ident("total")))));
}

#[test]
fn test_imports() {
    let arena = Bump::new();
    let stmts = body(&arena, "import java.util.ArrayList; import java.util.*;");
    assert!(matches!(
        stmts,
        [
            Stmt::Import {
                path: "java.util.ArrayList",
                wildcard: false,
                ..
            },
            Stmt::Import {
                path: "java.util",
                wildcard: true,
                ..
            },
        ]
    ));
}

#[test]
fn test_constructors_and_inline_collections() {
    let arena = Bump::new();
    assert!(matches!(
        single_expr(&arena, "new int[] {x, y}"),
        Expr::NewArray { ty: TypeExpr { path: "int", dims: 1, .. }, items } if items.len() == 2
    ));
    assert!(matches!(
        single_expr(&arena, "new int[4]"),
        Expr::NewSizedArray { ty: TypeExpr { path: "int", dims: 0, .. }, .. }
    ));
    assert!(matches!(
        single_expr(&arena, "new Cheese('brie', 3)"),
        Expr::New { ty: TypeExpr { path: "Cheese", .. }, args } if args.len() == 2
    ));
    assert!(matches!(single_expr(&arena, "{1, 2}"), Expr::InlineArray(items) if items.len() == 2));
    assert!(matches!(single_expr(&arena, "[1, 2, 3]"), Expr::InlineList(items) if items.len() == 3));
    assert!(matches!(single_expr(&arena, "['a': 1]"), Expr::InlineMap(entries) if entries.len() == 1));
    assert!(matches!(single_expr(&arena, "[:]"), Expr::InlineMap([])));
}

#[test]
fn test_parenthesized_assignment() {
    let arena = Bump::new();
    let stmts = body(&arena, "(list = new java.util.ArrayList()).add(5); list");
    let [Stmt::Expr(Expr::MethodCall { receiver, .. }), Stmt::Expr(Expr::Ident("list"))] = stmts
    else {
        panic!("unexpected statements: {stmts:?}");
    };
    assert!(matches!(receiver, Expr::Assign { .. }));
}

#[test]
fn test_comments_and_trailing_semicolons() {
    let arena = Bump::new();
    let stmts = body(&arena, "a; /* block */ b; // line\n;;");
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_syntax_error_location() {
    let arena = Bump::new();
    let err = parse(&arena, "a + * b").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    assert_eq!(err.span.0.start, 4);
}

#[test]
fn test_invalid_escape() {
    let arena = Bump::new();
    let err = parse(&arena, r"'\q'").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::InvalidLiteral {
            message: "invalid escape sequence '\\q'".to_string()
        }
    );
}

#[test]
fn test_max_depth() {
    let arena = Bump::new();
    let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
    let source = arena.alloc_str(&source);
    let err = parse_with_max_depth(&arena, source, 10).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MaxDepthExceeded { max_depth: 10 });
    assert!(parse_with_max_depth(&arena, source, 100).is_ok());
}
