//! Parser tests for the build DSL

use crate::ast::{CodeBlock, Expr};
use crate::lexer::tokenize;
use crate::parser::parse;

/// Helper to parse a program and return the AST
fn parse_program(source: &str) -> crate::Result<CodeBlock> {
    let tokens = tokenize(source)?;
    parse(source, tokens)
}

/// Helper to parse and expect success
fn parse_ok(source: &str) -> CodeBlock {
    parse_program(source).expect("parse should succeed")
}

/// Helper to check that parsing fails
fn parse_fails(source: &str) -> bool {
    parse_program(source).is_err()
}

fn first_expr(block: &CodeBlock) -> &Expr {
    &block.statements[0].expr
}

// ============================================
// Literals
// ============================================

#[test]
fn test_parse_string() {
    let block = parse_ok("'foo'");
    assert_eq!(block.statements.len(), 1);
    assert!(matches!(first_expr(&block), Expr::String(s) if s == "foo"));
    assert_eq!(block.as_string(), "'foo'");
}

#[test]
fn test_parse_decimal_number() {
    let block = parse_ok("77");
    assert_eq!(block.statements.len(), 1);
    assert!(matches!(first_expr(&block), Expr::Number(77)));
    assert_eq!(block.as_string(), "77");
}

#[test]
fn test_parse_octal_number() {
    let block = parse_ok("0o10");
    assert!(matches!(first_expr(&block), Expr::Number(8)));
    assert_eq!(block.as_string(), "8");
}

#[test]
fn test_parse_hex_number() {
    let block = parse_ok("0xf");
    assert!(matches!(first_expr(&block), Expr::Number(15)));
    assert_eq!(block.as_string(), "15");
}

#[test]
fn test_parse_identifier() {
    let block = parse_ok("foo");
    assert!(matches!(first_expr(&block), Expr::Identifier(s) if s == "foo"));
    assert_eq!(block.as_string(), "foo");
}

#[test]
fn test_parse_booleans() {
    assert!(matches!(first_expr(&parse_ok("true")), Expr::Boolean(true)));
    assert!(matches!(
        first_expr(&parse_ok("false")),
        Expr::Boolean(false)
    ));
}

// ============================================
// Arithmetic
// ============================================

#[test]
fn test_parse_multiplication() {
    let block = parse_ok("5  * 4 ");
    assert!(matches!(first_expr(&block), Expr::Multiplicative { .. }));
    assert_eq!(block.as_string(), "5 * 4");
}

#[test]
fn test_parse_division() {
    let block = parse_ok("5 / 4 ");
    assert!(matches!(first_expr(&block), Expr::Multiplicative { .. }));
    assert_eq!(block.as_string(), "5 / 4");
}

#[test]
fn test_parse_addition() {
    let block = parse_ok("5 + 4 ");
    assert!(matches!(first_expr(&block), Expr::Additive { .. }));
    assert_eq!(block.as_string(), "5 + 4");
}

#[test]
fn test_parse_subtraction() {
    let block = parse_ok("5 - 4 ");
    assert!(matches!(first_expr(&block), Expr::Additive { .. }));
    assert_eq!(block.as_string(), "5 - 4");
}

#[test]
fn test_parse_mod() {
    let block = parse_ok("5 % 4 ");
    assert!(matches!(first_expr(&block), Expr::Multiplicative { .. }));
    assert_eq!(block.as_string(), "5 % 4");
}

#[test]
fn test_parse_unary_negate() {
    let block = parse_ok("- 5");
    assert!(matches!(first_expr(&block), Expr::Unary { .. }));
    assert_eq!(block.as_string(), "-5");
}

#[test]
fn test_precedence_mul_over_add() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    let block = parse_ok("1 + 2 * 3");
    match first_expr(&block) {
        Expr::Additive { rhs, .. } => {
            assert!(matches!(rhs.as_ref(), Expr::Multiplicative { .. }));
        }
        other => panic!("expected Additive, got {other:?}"),
    }
}

#[test]
fn test_subexpression() {
    let block = parse_ok("(4 * (5 + 3))");
    assert!(matches!(first_expr(&block), Expr::Multiplicative { .. }));
}

// ============================================
// Assignment and subscript
// ============================================

#[test]
fn test_parse_assignment() {
    let block = parse_ok("x = 5 + 3");
    assert!(matches!(first_expr(&block), Expr::Assignment { .. }));
    assert_eq!(block.as_string(), "x = 5 + 3");
}

#[test]
fn test_assignment_requires_identifier_target() {
    assert!(parse_fails("5 = 3"));
    assert!(parse_fails("'s' = 3"));
}

#[test]
fn test_parse_subscript() {
    let block = parse_ok("foo[bar + 1]");
    assert!(matches!(first_expr(&block), Expr::Subscript { .. }));
    assert_eq!(block.as_string(), "foo[bar + 1]");
}

// ============================================
// Relational operators
// ============================================

#[test]
fn test_parse_relational() {
    let cases = [
        ("4<3", "4 < 3"),
        ("4>3", "4 > 3"),
        ("0 == true", "0 == true"),
        ("0 != true", "0 != true"),
        ("x or y", "x or y"),
        ("x and y", "x and y"),
        ("x in y", "x in y"),
        ("x not in y", "x not in y"),
    ];
    for (input, expected) in cases {
        let block = parse_ok(input);
        assert_eq!(block.statements.len(), 1, "input: {input}");
        assert!(
            matches!(first_expr(&block), Expr::Relational { .. }),
            "input: {input}"
        );
        assert_eq!(block.as_string(), expected, "input: {input}");
    }
}

// ============================================
// Calls
// ============================================

#[test]
fn test_parse_function_calls() {
    let cases = [
        ("func(  )", "func()"),
        ("func(a)", "func(a)"),
        ("func(a,b, c)", "func(a, b, c)"),
        ("func(x : 'f')", "func(x : 'f')"),
        ("func(x : 'f', y : 1)", "func(x : 'f', y : 1)"),
        ("func(a, b, x : 'f')", "func(a, b, x : 'f')"),
    ];
    for (input, expected) in cases {
        let block = parse_ok(input);
        assert!(
            matches!(first_expr(&block), Expr::FunctionCall { .. }),
            "input: {input}"
        );
        assert_eq!(block.as_string(), expected, "input: {input}");
    }
}

#[test]
fn test_parse_method_calls() {
    let cases = [
        ("o.m()", "o.m()"),
        ("meson.get_compiler ( 'cpp' )", "meson.get_compiler('cpp')"),
        (
            "meson.get_compiler ( 'cpp', 'c' )",
            "meson.get_compiler('cpp', 'c')",
        ),
        ("o.method(x : y, z : 1)", "o.method(x : y, z : 1)"),
        ("o.method(a, b, x : y, z : 1)", "o.method(a, b, x : y, z : 1)"),
    ];
    for (input, expected) in cases {
        let block = parse_ok(input);
        assert!(
            matches!(first_expr(&block), Expr::MethodCall { .. }),
            "input: {input}"
        );
        assert_eq!(block.as_string(), expected, "input: {input}");
    }
}

#[test]
fn test_bare_attribute_is_empty_method_call() {
    // Attribute access without parentheses parses as a no-argument method call
    let block = parse_ok("host_machine.cpu_family");
    match first_expr(&block) {
        Expr::MethodCall {
            receiver,
            name,
            args,
        } => {
            assert!(matches!(receiver.as_ref(), Expr::Identifier(s) if s == "host_machine"));
            assert_eq!(name, "cpu_family");
            assert!(args.positional.is_empty() && args.keyword.is_empty());
        }
        other => panic!("expected MethodCall, got {other:?}"),
    }
    assert_eq!(block.as_string(), "host_machine.cpu_family()");
}

#[test]
fn test_positional_after_keyword_fails() {
    assert!(parse_fails("func(x : 1, a)"));
}

// ============================================
// Containers
// ============================================

#[test]
fn test_parse_array() {
    let block = parse_ok("[1, 2, 3, a, 'b']");
    assert!(matches!(first_expr(&block), Expr::Array(_)));
    assert_eq!(block.as_string(), "[1, 2, 3, a, 'b']");
}

#[test]
fn test_parse_nested_array() {
    let block = parse_ok("['a', ['b', 'c']]");
    assert_eq!(block.as_string(), "['a', ['b', 'c']]");
}

#[test]
fn test_parse_multiline_array() {
    let block = parse_ok("[\n  'a',\n  'b',\n]");
    assert_eq!(block.as_string(), "['a', 'b']");
}

#[test]
fn test_parse_dict() {
    let block = parse_ok("{'k' : 1, 'j' : 'v'}");
    assert!(matches!(first_expr(&block), Expr::Dict(_)));
    assert_eq!(block.as_string(), "{'k' : 1, 'j' : 'v'}");
}

// ============================================
// Statements and conditionals
// ============================================

#[test]
fn test_multiple_statements() {
    let block = parse_ok("x = 1\ny = 2\n\nz = x");
    assert_eq!(block.statements.len(), 3);
}

#[test]
fn test_if_desugars_to_condition_call() {
    let block = parse_ok("if x == 1\n  y = 2\nendif");
    assert_eq!(block.statements.len(), 1);
    match first_expr(&block) {
        Expr::FunctionCall { callee, args } => {
            assert!(matches!(callee.as_ref(), Expr::Identifier(s) if s == super::CONDITION_FN));
            assert_eq!(args.positional.len(), 3);
            assert!(matches!(&args.positional[0], Expr::Relational { .. }));
            assert!(matches!(&args.positional[1], Expr::Array(body) if body.len() == 1));
            assert!(matches!(&args.positional[2], Expr::Array(body) if body.is_empty()));
        }
        other => panic!("expected FunctionCall, got {other:?}"),
    }
}

#[test]
fn test_if_else() {
    let block = parse_ok("if x\n  a = 1\nelse\n  a = 2\nendif");
    match first_expr(&block) {
        Expr::FunctionCall { args, .. } => {
            assert!(matches!(&args.positional[2], Expr::Array(body) if body.len() == 1));
        }
        other => panic!("expected FunctionCall, got {other:?}"),
    }
}

#[test]
fn test_if_elif_nests_in_else_arm() {
    let block = parse_ok("if x\n  a = 1\nelif y\n  a = 2\nelse\n  a = 3\nendif");
    match first_expr(&block) {
        Expr::FunctionCall { args, .. } => match &args.positional[2] {
            Expr::Array(body) => {
                assert_eq!(body.len(), 1);
                assert!(matches!(&body[0], Expr::FunctionCall { .. }));
            }
            other => panic!("expected Array, got {other:?}"),
        },
        other => panic!("expected FunctionCall, got {other:?}"),
    }
}

#[test]
fn test_unterminated_if_fails() {
    assert!(parse_fails("if x\n  a = 1\n"));
    assert!(parse_fails("if x\n  a = 1\nelse\n  a = 2\n"));
}

// ============================================
// Round trips
// ============================================

#[test]
fn test_parse_render_round_trip() {
    let inputs = [
        "'foo'",
        "77",
        "x = 5 + 3",
        "0 != true",
        "foo[bar + 1]",
        "func(a, b, x : 'f')",
        "meson.get_compiler('cpp')",
        "[1, 2, 3, a, 'b']",
        "{'k' : 1}",
        "x not in y",
        "-5 * 4",
        "executable('prog', ['a.cpp', 'b.cpp'])",
    ];
    for input in inputs {
        let first = parse_ok(input);
        let rendered = first.as_string();
        let second = parse_ok(&rendered);
        assert_eq!(first, second, "round trip failed for: {input}");
    }
}

#[test]
fn test_parse_errors_carry_position() {
    let err = parse_program("x = ").unwrap_err();
    match err {
        crate::CompileError::Parser { line, .. } => assert_eq!(line, 1),
        other => panic!("expected Parser error, got {other:?}"),
    }
}
