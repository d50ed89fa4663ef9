use zarac::analyzer::{ScopeError, SemanticErrorKind, Ty};
use zarac::codegen::Instruction;
use zarac::error::CompileError;
use zarac::lexer::{Lexer, Position, TokenKind};
use zarac::parser::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tac(input: &str) -> Vec<String> {
    init_logger();
    zarac::compile(input)
        .unwrap()
        .code
        .iter()
        .map(|i| i.to_string())
        .collect()
}

fn semantic_error(input: &str) -> SemanticErrorKind {
    init_logger();
    match zarac::compile(input) {
        Err(CompileError::Semantic(e)) => e.kind,
        other => panic!("expected a semantic error, got {:?}", other),
    }
}

#[test]
fn test_precedence_end_to_end() {
    let compilation = zarac::compile("x = 2 + 3 * 4;").unwrap();
    let Stmt::Assign(assignment) = &compilation.program.program.0[0] else {
        panic!();
    };
    assert_eq!(assignment.expr.to_string(), "(+ 2 (* 3 4))");
    assert_eq!(compilation.code.len(), 3);
}

#[test]
fn test_token_stream() {
    let compilation = zarac::compile("def f(a) { return a * 2; }").unwrap();
    let kinds: Vec<_> = compilation.tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Def,
            TokenKind::Ident,
            TokenKind::OpenParen,
            TokenKind::Ident,
            TokenKind::CloseParen,
            TokenKind::OpenCurlyBrace,
            TokenKind::Return,
            TokenKind::Ident,
            TokenKind::Star,
            TokenKind::Number,
            TokenKind::SemiColon,
            TokenKind::CloseCurlyBrace,
        ]
    );
}

#[test]
fn test_if_else_ordering() {
    assert_eq!(
        tac("a = 1; b = 1; if (a == b) { y = 1; } else { y = 2; }")[2..],
        [
            "t0 = a == b",
            "if t0 goto L0",
            "y = 2",
            "goto L1",
            "L0:",
            "y = 1",
            "L1:",
        ]
    );
}

#[test]
fn test_full_program() {
    let input = "
def sum(n) {
    total = 0;
    for (i = 0; i <= n; i = i + 1) {
        total = total + i;
    }
    return total;
}

values: array<int>;
s: stack<int>;
k = 0;
do {
    values[k] = sum(k);
    s.push(values[k]);
    k = k + 1;
} while (k < 5);
top = s.pop();
";
    let code = tac(input);
    assert_eq!(code.first().map(String::as_str), Some("FUNC sum"));
    assert!(code.contains(&"END_FUNC sum".to_string()));
    assert!(code.contains(&"RETURN total".to_string()));
    assert!(code.contains(&"call push, 2".to_string()));
    assert_eq!(code.last().map(String::as_str), Some("top = t7"));

    let labels = code.iter().filter(|l| l.ends_with(':')).count();
    assert_eq!(labels, 3);
}

#[test]
fn test_symbols() {
    let compilation = zarac::compile("def f(a: float) { return a; } x = f(1.5);").unwrap();
    let symbols: Vec<_> = compilation
        .program
        .declarations
        .iter()
        .map(|s| format!("{}: {} @{}", s.name, s.ty, s.depth))
        .collect();
    assert_eq!(
        symbols,
        vec!["a: float @1", "f: fn(float) -> float @0", "x: float @0"]
    );
}

#[test]
fn test_array_index_must_be_int() {
    assert_eq!(
        semantic_error("arr: array<int>; x = arr[1.5];"),
        SemanticErrorKind::TypeMismatch {
            left: Ty::Integer,
            right: Ty::Float,
            operator: "[]".to_string(),
        }
    );
}

#[test]
fn test_arity_mismatch() {
    assert_eq!(
        semantic_error("def f(a, b) { return a; } y = f(1);"),
        SemanticErrorKind::ArityMismatch {
            name: "f".to_string(),
            expected: 2,
            actual: 1,
        }
    );
}

#[test]
fn test_undeclared_variable() {
    assert_eq!(
        semantic_error("y = x;"),
        SemanticErrorKind::Scope(ScopeError::UndeclaredVariable {
            name: "x".to_string()
        })
    );
}

#[test]
fn test_errors_short_circuit() {
    // A lexical error hides the syntax error after it.
    let err = zarac::compile("x = 1 # 2\ny = ;").unwrap_err();
    let CompileError::Lex(e) = err else {
        panic!("{:?}", err);
    };
    assert_eq!(e.pos, Position::new(1, 7));

    // A syntax error hides the undeclared variable before it.
    let err = zarac::compile("y = x;\nz = (1;").unwrap_err();
    let CompileError::Syntax(e) = err else {
        panic!("{:?}", err);
    };
    assert_eq!(e.expected, Expected::Kind(TokenKind::CloseParen));
    assert_eq!(e.pos, Position::new(2, 7));
}

#[test]
fn test_error_messages_carry_positions() {
    let err = zarac::compile("x = 1;\nx = \"s\";").unwrap_err();
    assert_eq!(
        err.to_string(),
        "semantic error at 2:3: type mismatch for '=': int vs string"
    );
}

#[test]
fn test_counters_reset_between_compilations() {
    let input = "x = 1; while (x < 3) { x = x + 1; }";
    assert_eq!(tac(input), tac(input));
    assert_eq!(tac(input)[1..3], ["L0:", "t0 = x < 3"]);
}

#[test]
fn test_stage_by_stage() {
    let tokens = Lexer::tokenize("s: stack<string>; s.push(\"a\"); v = s.pop();").unwrap();
    let program = Parser::new(tokens).parse().unwrap();
    assert_eq!(program.0.len(), 3);
    let Stmt::Assign(Assignment { expr, .. }) = &program.0[2] else {
        panic!();
    };
    assert_eq!(expr.to_string(), "s.pop()");

    let compilation =
        zarac::compile("s: stack<string>; s.push(\"a\"); v = s.pop();").unwrap();
    assert_eq!(
        compilation.code[2],
        Instruction::Call {
            dest: None,
            name: "push".to_string(),
            argc: 2,
        }
    );
}
