//! End-to-end language tests driving the `Engine`.

use heir_core::{DiagnosticCode, Engine, Value, VmOptions};

/// Evaluates `source` in a fresh engine and renders the result.
fn run(source: &str) -> String {
    let mut engine = Engine::new();
    let result = engine.eval(source);
    assert!(
        !result.has_errors(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        result.diagnostics
    );
    result.value.to_string()
}

fn codes(source: &str) -> Vec<DiagnosticCode> {
    Engine::new()
        .eval(source)
        .diagnostics
        .into_iter()
        .map(|d| d.code)
        .collect()
}

#[test]
fn test_literals() {
    assert_eq!(run("69"), "69");
    assert_eq!(run("69.420"), "69.42");
    assert_eq!(run("0b1101"), "13");
    assert_eq!(run("0o420"), "272");
    assert_eq!(run("0x03E"), "62");
    assert_eq!(run("1_000_000"), "1000000");
    assert_eq!(run("'h'"), "h");
    assert_eq!(run("\"tab\\there\""), "tab\there");
    assert_eq!(run("none"), "none");
}

#[test]
fn test_equality() {
    assert_eq!(run("1 == 1"), "true");
    assert_eq!(run("1 == 2"), "false");
    assert_eq!(run("\"a\" == \"a\""), "true");
}

#[test]
fn test_arithmetic() {
    assert_eq!(run("1 + 2"), "3");
    assert_eq!(run("7 // 3"), "2");
    assert_eq!(run("1 / 4"), "0.25");
    assert_eq!(run("2 + 3 * 4"), "14");
    assert_eq!(run("(2 + 3) * 4"), "20");
    assert_eq!(run("2 ^ 3 ^ 2"), "512");
}

#[test]
fn test_comparison() {
    assert_eq!(run("2 > 1"), "true");
    assert_eq!(run("2 < 1"), "false");
    assert_eq!(run("2 >= 2"), "true");
    assert_eq!(run("3 <= 2"), "false");
}

#[test]
fn test_compound_assignment() {
    assert_eq!(run("let mut a = 1; a += 1; a"), "2");
    assert_eq!(run("let mut a = 10; a -= 4; a *= 2; a"), "12");
    assert_eq!(run("let mut a = 7; a //= 2; a"), "3");
    assert_eq!(run("let mut a = 1; a <<= 3; a"), "8");
    assert_eq!(run("let mut s = \"ab\"; s += \"cd\"; s"), "abcd");
}

#[test]
fn test_object_literal() {
    assert_eq!(run("{ a: true }"), "{\n  [a]: true\n}");
    assert_eq!(
        run("let o = { name: \"heir\", nested: { depth: 2 } }; o"),
        "{\n  [name]: heir,\n  [nested]: {\n    [depth]: 2\n  }\n}"
    );
    assert_eq!(run("let o = { nested: { depth: 2 } }; o.nested.depth"), "2");
}

#[test]
fn test_if_chain() {
    let source = |x: i64| {
        format!(
            "let x = {}; let mut r = 0; if x == 1 r = 10; else if x == 2 r = 20; else r = 50; r",
            x
        )
    };
    assert_eq!(run(&source(1)), "10");
    assert_eq!(run(&source(2)), "20");
    assert_eq!(run(&source(7)), "50");
}

#[test]
fn test_block_scoping() {
    let mut engine = Engine::new();
    let result = engine.eval("{ let hidden = 1; }");
    assert!(!result.has_errors());

    let result = engine.eval("hidden");
    assert_eq!(result.value, Value::None);
    assert!(!engine.scope().is_declared("hidden"));
}

#[test]
fn test_repeated_execution_is_pure() {
    let engine = Engine::new();
    let bytecode = engine.compile("let mut a = 2; a *= 3; { let b = a; b + 1 }");

    let first = heir_core::VirtualMachine::new(&bytecode, heir_core::Scope::new()).evaluate();
    let second = heir_core::VirtualMachine::new(&bytecode, heir_core::Scope::new()).evaluate();

    assert_eq!(first, Value::Float(7.0));
    assert_eq!(first, second);
}

#[test]
fn test_functions() {
    assert_eq!(run("fn add(a: int, b: int) -> a + b; add(2, 3)"), "5");
    assert_eq!(run("fn greet(name: string): string -> \"hi \" + name; greet(\"bob\")"), "hi bob");
    assert_eq!(
        run("fn fib(n) { if n < 2 return n; return fib(n - 1) + fib(n - 2); } fib(10)"),
        "55"
    );
}

#[test]
fn test_closures() {
    assert_eq!(run("let mut total = 0; fn add(n) -> total += n; add(5); add(6); total"), "11");
    assert_eq!(run("let mut base = 1; fn get -> base; base = 42; get()"), "42");
}

#[test]
fn test_call_depth_limit() {
    let mut engine = Engine::with_options(VmOptions {
        max_call_depth: 32,
        step_limit: None,
    });
    let result = engine.eval("fn down(n) -> down(n + 1); down(0)");

    assert_eq!(result.value, Value::None);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::CallDepthExceeded));
}

#[test]
fn test_step_limit() {
    let mut engine = Engine::with_options(VmOptions {
        max_call_depth: 32,
        step_limit: Some(10),
    });
    let result = engine.eval("let mut a = 0; a += 1; a += 1; a += 1; a += 1; a");

    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::StepLimitExceeded));
}

#[test]
fn test_lexer_diagnostics() {
    assert!(codes("1 $ 2").contains(&DiagnosticCode::UnexpectedCharacter));
    assert!(codes("\"open").contains(&DiagnosticCode::UnterminatedString));
    assert!(codes("1.2.3").contains(&DiagnosticCode::MalformedNumber));
}

#[test]
fn test_binder_diagnostics() {
    assert!(codes("let a = 1; a = 2").contains(&DiagnosticCode::InvalidAssignment));
    assert!(codes("let a: int = \"s\"").contains(&DiagnosticCode::TypeMismatch));
    assert!(codes("missing").contains(&DiagnosticCode::UnresolvedName));
    assert!(codes("fn f(a) -> a; f(1, 2)").contains(&DiagnosticCode::ArgumentCount));
    assert!(codes("true - 1").contains(&DiagnosticCode::NoMatchingOperator));
}

#[test]
fn test_unsupported_operator_does_not_abort() {
    let mut engine = Engine::new();
    let result = engine.eval("true - 1; 5");

    assert_eq!(result.value, Value::Int(5));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::UnsupportedOperator));
}

#[test]
fn test_runtime_diagnostics() {
    assert!(codes("let n = 1; n()").contains(&DiagnosticCode::NotCallable));
    assert!(codes("let n = 1; n.field").contains(&DiagnosticCode::NotIndexable));
}

#[test]
fn test_eval_file() {
    let path = std::env::temp_dir().join(format!("heir-eval-file-{}.heir", std::process::id()));
    std::fs::write(&path, "# comment\nlet answer = 6 * 7;\nanswer\n").expect("write temp file");

    let result = Engine::new().eval_file(&path).expect("file is readable");
    std::fs::remove_file(&path).ok();

    assert_eq!(result.value.to_string(), "42");
}
