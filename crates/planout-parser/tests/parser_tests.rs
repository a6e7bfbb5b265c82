//! Parser tests: statement grammar, precedence, lowerings, and error
//! reporting.

use planout_lexer::Lexer;
use planout_parser::{ParseResult, Parser};
use planout_types::ast::*;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    Parser::new(Lexer::new(source)).parse_program()
}

fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    if result.errors.has_errors() {
        panic!("unexpected parse errors:\n{}", result.errors);
    }
    result.program
}

fn errors(source: &str) -> Vec<(u32, String)> {
    parse(source)
        .errors
        .errors
        .into_iter()
        .map(|e| (e.line, e.message))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_assignment_both_operators() {
    let prog = parse_ok("x = 5; y <- 6;");
    assert_eq!(prog.seq.len(), 2);
    assert_eq!(
        prog.seq[0],
        Stmt::Assign {
            var: "x".into(),
            value: Expr::Int(5)
        }
    );
    assert_eq!(
        prog.seq[1],
        Stmt::Assign {
            var: "y".into(),
            value: Expr::Int(6)
        }
    );
}

#[test]
fn test_semicolons_are_optional_between_block_statements() {
    let prog = parse_ok("if (x == 5) { return y; } if (z == 7) { x = 9; }");
    assert_eq!(prog.seq.len(), 2);
}

#[test]
fn test_if_else_chain_appends_true_case() {
    let prog = parse_ok("if (x > 5) { return y; } else { z = 9; }");
    match &prog.seq[0] {
        Stmt::Cond { cases } => {
            assert_eq!(cases.len(), 2);
            assert_eq!(cases[1].condition, Expr::Bool(true));
        }
        other => panic!("expected a cond statement, got {other:?}"),
    }
}

#[test]
fn test_empty_switch_is_legal() {
    let prog = parse_ok("switch {}");
    assert_eq!(prog.seq[0], Stmt::Switch { cases: vec![] });
}

#[test]
fn test_switch_case_results_are_statements() {
    let prog = parse_ok("switch { x < 5 => if (true) { y = 6; }; x > 5 => return z; }");
    match &prog.seq[0] {
        Stmt::Switch { cases } => {
            assert_eq!(cases.len(), 2);
            assert!(matches!(*cases[0].result, Stmt::Cond { .. }));
            assert!(matches!(*cases[1].result, Stmt::Return { .. }));
        }
        other => panic!("expected a switch statement, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Expressions and lowerings
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unary_minus_folds_into_literal() {
    let prog = parse_ok("x = -5.5; y = -3;");
    assert!(matches!(
        prog.seq[0],
        Stmt::Assign { ref value, .. } if *value == Expr::Float(-5.5)
    ));
    assert!(matches!(
        prog.seq[1],
        Stmt::Assign { ref value, .. } if *value == Expr::Int(-3)
    ));
}

#[test]
fn test_unary_minus_on_identifier_becomes_negative() {
    let prog = parse_ok("z = -y;");
    assert!(matches!(
        prog.seq[0],
        Stmt::Assign { ref value, .. }
            if matches!(value, Expr::Negative(inner) if **inner == Expr::Get("y".into()))
    ));
}

#[test]
fn test_prefix_minus_binds_looser_than_product() {
    // -a * b parses as negative(a * b)
    let prog = parse_ok("return -a * b;");
    match &prog.seq[0] {
        Stmt::Return { value: Expr::Negative(inner) } => {
            assert!(matches!(**inner, Expr::Values { op: ValuesOp::Product, .. }));
        }
        other => panic!("expected negative(product), got {other:?}"),
    }
}

#[test]
fn test_subtraction_lowers_without_folding() {
    let prog = parse_ok("x = 5 - 5;");
    match &prog.seq[0] {
        Stmt::Assign { value: Expr::Values { op: ValuesOp::Sum, values }, .. } => {
            assert_eq!(values[0], Expr::Int(5));
            assert!(matches!(&values[1], Expr::Negative(inner) if **inner == Expr::Int(5)));
        }
        other => panic!("expected sum(5, negative(5)), got {other:?}"),
    }
}

#[test]
fn test_not_equal_lowers_to_not_equals() {
    let prog = parse_ok("return a != b;");
    match &prog.seq[0] {
        Stmt::Return { value: Expr::Not(inner) } => {
            assert!(matches!(
                **inner,
                Expr::LeftRight { op: LeftRightOp::Equals, .. }
            ));
        }
        other => panic!("expected not(equals), got {other:?}"),
    }
}

#[test]
fn test_comparison_is_left_associative() {
    // ((5 > 4) == 3) < 4
    let prog = parse_ok("return 5 > 4 == 3 < 4;");
    match &prog.seq[0] {
        Stmt::Return { value: Expr::LeftRight { op: LeftRightOp::Less, left, .. } } => {
            assert!(matches!(
                **left,
                Expr::LeftRight { op: LeftRightOp::Equals, .. }
            ));
        }
        other => panic!("expected nested comparisons, got {other:?}"),
    }
}

#[test]
fn test_grouping_overrides_precedence() {
    let prog = parse_ok("x = (5 - 5) * 10;");
    assert!(matches!(
        prog.seq[0],
        Stmt::Assign { ref value, .. }
            if matches!(value, Expr::Values { op: ValuesOp::Product, .. })
    ));
}

#[test]
fn test_call_argument_shapes() {
    let prog = parse_ok("a = f(); b = f(3); c = f(1, 2); d = f(x = 1, y = 2);");
    let arg_of = |stmt: &Stmt| match stmt {
        Stmt::Assign { value: Expr::Call { args, .. }, .. } => args.clone(),
        other => panic!("expected a call, got {other:?}"),
    };
    assert_eq!(arg_of(&prog.seq[0]), CallArgs::None);
    assert!(matches!(arg_of(&prog.seq[1]), CallArgs::One(_)));
    assert!(matches!(arg_of(&prog.seq[2]), CallArgs::Many(ref v) if v.len() == 2));
    assert!(matches!(arg_of(&prog.seq[3]), CallArgs::Named(ref v) if v.len() == 2));
}

#[test]
fn test_index_binds_tighter_than_call_args() {
    let prog = parse_ok("x = [1, 2, 3][0];");
    assert!(matches!(
        prog.seq[0],
        Stmt::Assign { ref value, .. } if matches!(value, Expr::Index { .. })
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_call_on_non_identifier_is_an_error() {
    let errs = errors("x = [1, 2](0);");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].1.contains("non-identifier"));
}

#[test]
fn test_eof_inside_block_is_an_error() {
    let errs = errors("if (x) { y = 1;");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].1.contains("EOF"));
}

#[test]
fn test_lexer_error_carries_its_line() {
    let errs = errors("x = 1;\ny = 'oops\n");
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].0, 2);
    assert!(errs[0].1.contains("string"));
}

#[test]
fn test_statement_must_start_with_known_token() {
    let errs = errors("5 = x;");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].1.contains("expected a statement"));
}

#[test]
fn test_missing_paren_after_if() {
    let errs = errors("if x > 5 { return y; }");
    assert_eq!(errs.len(), 1);
    assert!(errs[0].1.contains("expecting '('"));
}
