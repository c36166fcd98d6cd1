use super::BytecodeGenerator;
use crate::binder::{Binder, BoundTree};
use crate::compiler::bytecode::{Bytecode, OpCode, Operand};
use crate::diagnostics::{DiagnosticBag, DiagnosticCode};
use crate::parser::Parser;
use crate::runtime::value::Value;

fn compile(source: &str) -> Bytecode {
    let diagnostics = DiagnosticBag::new();
    let tree = Parser::new(source, diagnostics.clone()).parse();
    let bound = Binder::new().bind(&tree, diagnostics.clone());
    BytecodeGenerator::new(&bound, diagnostics).generate(&tree)
}

fn opcodes(bytecode: &Bytecode) -> Vec<OpCode> {
    bytecode.iter().map(|i| i.opcode).collect()
}

fn pushed(bytecode: &Bytecode, index: usize) -> Option<&Value> {
    match &bytecode[index].operand {
        Some(Operand::Value(value)) => Some(value),
        _ => None,
    }
}

#[test]
fn test_literals() {
    let bytecode = compile("1; 2.5; 'c'; \"s\"; true; none;");
    assert_eq!(
        opcodes(&bytecode),
        vec![
            OpCode::Push,
            OpCode::Push,
            OpCode::Push,
            OpCode::Push,
            OpCode::Push,
            OpCode::PushNone,
            OpCode::Exit,
        ]
    );
    assert_eq!(pushed(&bytecode, 0), Some(&Value::Int(1)));
    assert_eq!(pushed(&bytecode, 1), Some(&Value::Float(2.5)));
    assert_eq!(pushed(&bytecode, 2), Some(&Value::Char('c')));
    assert_eq!(pushed(&bytecode, 3), Some(&Value::String("s".into())));
    assert_eq!(pushed(&bytecode, 4), Some(&Value::Bool(true)));
}

#[test]
fn test_empty_program_is_exit() {
    let bytecode = compile("");
    assert_eq!(opcodes(&bytecode), vec![OpCode::Exit]);
}

#[test]
fn test_binary_operands_then_operator() {
    let bytecode = compile("1 + 2");
    assert_eq!(
        opcodes(&bytecode),
        vec![OpCode::Push, OpCode::Push, OpCode::Add, OpCode::Exit]
    );
}

#[test]
fn test_inverted_comparisons() {
    assert_eq!(
        opcodes(&compile("2 > 1")),
        vec![OpCode::Push, OpCode::Push, OpCode::Lte, OpCode::Not, OpCode::Exit]
    );
    assert_eq!(
        opcodes(&compile("2 >= 1")),
        vec![OpCode::Push, OpCode::Push, OpCode::Lt, OpCode::Not, OpCode::Exit]
    );
    assert_eq!(
        opcodes(&compile("2 != 1")),
        vec![OpCode::Push, OpCode::Push, OpCode::Eq, OpCode::Not, OpCode::Exit]
    );
}

#[test]
fn test_string_plus_is_concat() {
    let bytecode = compile("\"a\" + \"b\"");
    assert_eq!(bytecode[2].opcode, OpCode::Concat);
}

#[test]
fn test_variable_declaration() {
    let bytecode = compile("let x = 1;");
    assert_eq!(
        opcodes(&bytecode),
        vec![OpCode::Push, OpCode::Push, OpCode::Store, OpCode::Exit]
    );
    assert_eq!(pushed(&bytecode, 0), Some(&Value::String("x".into())));
    assert_eq!(bytecode[2].operand, Some(Operand::Flag(false)));
}

#[test]
fn test_declaration_without_initializer() {
    let bytecode = compile("let mut x: int;");
    assert_eq!(
        opcodes(&bytecode),
        vec![OpCode::Push, OpCode::PushNone, OpCode::Store, OpCode::Exit]
    );
}

#[test]
fn test_assignment_keeps_value() {
    let bytecode = compile("let mut x = 1; x = 2");
    assert_eq!(
        &opcodes(&bytecode)[3..],
        &[OpCode::Push, OpCode::Push, OpCode::Store, OpCode::Exit]
    );
    assert_eq!(bytecode[5].operand, Some(Operand::Flag(true)));
}

#[test]
fn test_compound_assignment() {
    let bytecode = compile("let mut a = 1; a += 2");
    assert_eq!(
        &opcodes(&bytecode)[3..],
        &[
            OpCode::Push,
            OpCode::Push,
            OpCode::Load,
            OpCode::Push,
            OpCode::Add,
            OpCode::Store,
            OpCode::Exit,
        ]
    );
}

#[test]
fn test_increment_leaves_previous_value() {
    let bytecode = compile("let mut a = 1; ++a");
    assert_eq!(
        &opcodes(&bytecode)[3..],
        &[
            OpCode::Push,
            OpCode::Push,
            OpCode::Load,
            OpCode::Push,
            OpCode::Add,
            OpCode::Store,
            OpCode::Push,
            OpCode::Sub,
            OpCode::Exit,
        ]
    );
    assert_eq!(bytecode[8].operand, Some(Operand::Flag(true)));
}

#[test]
fn test_identifier_is_push_load() {
    let bytecode = compile("let x = 1; x");
    assert_eq!(&opcodes(&bytecode)[3..], &[OpCode::Push, OpCode::Load, OpCode::Exit]);
}

#[test]
fn test_block_scope_markers() {
    let bytecode = compile("{ let x = 1; }");
    assert_eq!(
        opcodes(&bytecode),
        vec![
            OpCode::BeginScope,
            OpCode::Push,
            OpCode::Push,
            OpCode::Store,
            OpCode::EndScope,
            OpCode::Exit,
        ]
    );
}

#[test]
fn test_if_else_chain_targets() {
    let bytecode = compile("if x == 1 x + 1; else if x == 2 x + 2; else x * 5;");

    assert_eq!(bytecode.len(), 25);
    assert_eq!(bytecode[4].opcode, OpCode::Jnz);
    assert_eq!(bytecode[4].target(), Some(20));
    assert_eq!(bytecode[9].opcode, OpCode::Jnz);
    assert_eq!(bytecode[9].target(), Some(15));
    assert_eq!(bytecode[13].opcode, OpCode::Mul);
    assert_eq!(bytecode[14].opcode, OpCode::Jmp);
    assert_eq!(bytecode[14].target(), Some(19));
    assert_eq!(bytecode[19].opcode, OpCode::Jmp);
    assert_eq!(bytecode[19].target(), Some(24));
    assert_eq!(bytecode[24].opcode, OpCode::Exit);
    assert!(bytecode.validate_jumps().is_empty());
}

#[test]
fn test_if_without_else() {
    let bytecode = compile("if true 1;");
    assert_eq!(
        opcodes(&bytecode),
        vec![OpCode::Push, OpCode::Jnz, OpCode::Jmp, OpCode::Push, OpCode::Exit]
    );
    assert_eq!(bytecode[1].target(), Some(3));
    assert_eq!(bytecode[2].target(), Some(4));
}

#[test]
fn test_function_declaration() {
    let bytecode = compile("fn add(a: int, b: int): int -> a + b");
    assert_eq!(
        opcodes(&bytecode),
        vec![OpCode::Push, OpCode::Proc, OpCode::Store, OpCode::Exit]
    );

    let Some(Operand::Proc(proc)) = &bytecode[1].operand else {
        panic!("expected a PROC operand");
    };
    assert_eq!(proc.name, "add");
    assert_eq!(proc.parameters, vec!["a".to_string(), "b".to_string()]);
    let body: Vec<OpCode> = proc.body.iter().map(|i| i.opcode).collect();
    assert_eq!(
        body,
        vec![
            OpCode::Push,
            OpCode::Load,
            OpCode::Push,
            OpCode::Load,
            OpCode::Add,
            OpCode::Return,
            OpCode::Exit,
        ]
    );
}

#[test]
fn test_invocation_counts_argument_instructions() {
    let bytecode = compile("fn f(a, b) -> a; f(1, 2 + 3)");
    let call = bytecode
        .iter()
        .position(|i| i.opcode == OpCode::Call)
        .expect("CALL emitted");

    let Some(Operand::Call(descriptor)) = &bytecode[call].operand else {
        panic!("expected a CALL operand");
    };
    assert_eq!(descriptor.instruction_count, 4);
    assert_eq!(descriptor.parameter_names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(bytecode[call - 1].opcode, OpCode::Load);
    assert_eq!(bytecode[call + 4].opcode, OpCode::Add);
    assert_eq!(bytecode[call + 5].opcode, OpCode::Exit);
}

#[test]
fn test_member_and_element_index() {
    let bytecode = compile("let o = { a: 1 }; o.a; o[\"a\"]");
    assert_eq!(
        &opcodes(&bytecode)[3..],
        &[
            OpCode::Push,
            OpCode::Load,
            OpCode::Push,
            OpCode::Index,
            OpCode::Push,
            OpCode::Load,
            OpCode::Push,
            OpCode::Index,
            OpCode::Exit,
        ]
    );
    assert_eq!(pushed(&bytecode, 5), Some(&Value::String("a".into())));
}

#[test]
fn test_object_entries_compiled_separately() {
    let bytecode = compile("let o = { a: true, [1 + 1]: \"two\" };");
    let Some(Operand::Object(entries)) = &bytecode[1].operand else {
        panic!("expected an object operand");
    };

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key.len(), 1);
    assert_eq!(
        entries[0].key[0].operand,
        Some(Operand::Value(Value::String("a".into())))
    );
    let computed: Vec<OpCode> = entries[1].key.iter().map(|i| i.opcode).collect();
    assert_eq!(computed, vec![OpCode::Push, OpCode::Push, OpCode::Add]);
}

#[test]
fn test_return_without_value() {
    let bytecode = compile("fn f() { return; }");
    let Some(Operand::Proc(proc)) = &bytecode[1].operand else {
        panic!("expected a PROC operand");
    };
    let body: Vec<OpCode> = proc.body.iter().map(|i| i.opcode).collect();
    assert_eq!(body, vec![OpCode::PushNone, OpCode::Return, OpCode::Exit]);
}

#[test]
fn test_unbound_binary_becomes_noop() {
    let diagnostics = DiagnosticBag::new();
    let tree = Parser::new("1 + 2", diagnostics.clone()).parse();
    let bound = BoundTree::new();

    let bytecode = BytecodeGenerator::new(&bound, diagnostics.clone()).generate(&tree);

    assert_eq!(opcodes(&bytecode), vec![OpCode::NoOp, OpCode::Exit]);
    assert!(diagnostics.contains(DiagnosticCode::UnsupportedOperator));
}

#[test]
fn test_mismatched_operands_become_noop() {
    let bytecode = compile("true + 1");
    assert_eq!(opcodes(&bytecode), vec![OpCode::NoOp, OpCode::Exit]);
    assert!(bytecode.diagnostics().contains(DiagnosticCode::NoMatchingOperator));
    assert!(bytecode.diagnostics().contains(DiagnosticCode::UnsupportedOperator));
}
