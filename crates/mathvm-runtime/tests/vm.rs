//! Interpreter tests over hand-assembled bytecode
//!
//! Each test builds a [`Code`] registry directly, so instruction semantics
//! are pinned independently of the generator.

use mathvm_runtime::ast::Type;
use mathvm_runtime::bytecode::{Bytecode, Label, Opcode};
use mathvm_runtime::code::{BytecodeFunction, Code};
use mathvm_runtime::vm::{BytecodeInterpreter, RuntimeError};
use rstest::rstest;

fn function(
    name: &str,
    locals_count: u16,
    depth: u16,
    build: impl FnOnce(&mut Bytecode),
) -> BytecodeFunction {
    let mut bytecode = Bytecode::new();
    build(&mut bytecode);
    BytecodeFunction {
        id: 0,
        name: name.to_string(),
        return_type: Type::Void,
        params: Vec::new(),
        bytecode,
        locals_count,
        depth,
    }
}

fn run(code: Code) -> Result<String, RuntimeError> {
    let mut out = Vec::new();
    BytecodeInterpreter::new(code).run_with_writer(&mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn run_single(locals_count: u16, build: impl FnOnce(&mut Bytecode)) -> Result<String, RuntimeError> {
    let mut code = Code::new();
    code.add_function(function("<top>", locals_count, 0, build));
    run(code)
}

#[test]
fn test_print_int_literal() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(42);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "42");
}

#[test]
fn test_binop_order_is_lower_op_upper() {
    // 10 pushed first (lower), 4 on top (upper): ISUB yields 10 - 4.
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(10);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(4);
        bc.add_insn(Opcode::Isub);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "6");
}

#[test]
fn test_integer_arithmetic_wraps() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(i64::MAX);
        bc.add_insn(Opcode::Iload1);
        bc.add_insn(Opcode::Iadd);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, i64::MIN.to_string());
}

#[rstest]
#[case(1, 2, "-1")]
#[case(2, 2, "0")]
#[case(3, 2, "1")]
fn test_icmp_three_way(#[case] lower: i64, #[case] upper: i64, #[case] expected: &str) {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(lower);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(upper);
        bc.add_insn(Opcode::Icmp);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, expected);
}

#[rstest]
#[case(0.5, 1.5, "-1")]
#[case(1.5, 1.5, "0")]
#[case(2.5, 1.5, "1")]
fn test_dcmp_three_way(#[case] lower: f64, #[case] upper: f64, #[case] expected: &str) {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Dload);
        bc.add_double(lower);
        bc.add_insn(Opcode::Dload);
        bc.add_double(upper);
        bc.add_insn(Opcode::Dcmp);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_conditional_branch_taken() {
    let out = run_single(0, |bc| {
        let mut taken = Label::new();
        let mut end = Label::new();
        bc.add_insn(Opcode::Iload);
        bc.add_i64(1);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(2);
        bc.add_branch(Opcode::IficmpL, &mut taken); // 1 < 2
        bc.add_insn(Opcode::Iload0);
        bc.add_insn(Opcode::Iprint);
        bc.add_branch(Opcode::Ja, &mut end);
        bc.bind(&mut taken);
        bc.add_insn(Opcode::Iload1);
        bc.add_insn(Opcode::Iprint);
        bc.bind(&mut end);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "1");
}

#[test]
fn test_backward_jump_loops() {
    // Counts 3, 2, 1 in a local, printing each iteration marker.
    let out = run_single(1, |bc| {
        let mut top = Label::new();
        let mut end = Label::new();
        bc.add_insn(Opcode::Iload);
        bc.add_i64(3);
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.bind(&mut top);
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iload0);
        bc.add_branch(Opcode::IficmpE, &mut end); // counter == 0
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iload1);
        bc.add_insn(Opcode::Isub);
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.add_branch(Opcode::Ja, &mut top);
        bc.bind(&mut end);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "321");
}

#[test]
fn test_swap_and_pop() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(1);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(2);
        bc.add_insn(Opcode::Swap);
        bc.add_insn(Opcode::Iprint); // top is 1 after the swap
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(9);
        bc.add_insn(Opcode::Pop);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "12");
}

#[test]
fn test_numeric_conversions() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(3);
        bc.add_insn(Opcode::I2d);
        bc.add_insn(Opcode::Dprint);
        bc.add_insn(Opcode::Dload);
        bc.add_double(3.7);
        bc.add_insn(Opcode::D2i);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "33");
}

#[test]
fn test_string_print_uses_pool() {
    let mut code = Code::new();
    let id = code.intern_string("hello");
    code.add_function(function("<top>", 0, 0, |bc| {
        bc.add_insn(Opcode::Sload);
        bc.add_u16(id);
        bc.add_insn(Opcode::Sprint);
        bc.add_insn(Opcode::Stop);
    }));
    assert_eq!(run(code).unwrap(), "hello");
}

#[test]
fn test_call_passes_argument_and_returns_value() {
    let mut code = Code::new();
    code.add_function(function("<top>", 0, 0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(5);
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    }));
    // double(n) = n + n
    code.add_function(function("double", 1, 1, |bc| {
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iadd);
        bc.add_insn(Opcode::Return);
    }));
    assert_eq!(run(code).unwrap(), "10");
}

#[test]
fn test_ctx_load_reaches_enclosing_frame() {
    let mut code = Code::new();
    code.add_function(function("<top>", 1, 0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(7);
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    }));
    code.add_function(function("inner", 0, 1, |bc| {
        bc.add_insn(Opcode::LoadCtxIvar);
        bc.add_u16(1);
        bc.add_u16(0);
        bc.add_insn(Opcode::Return);
    }));
    assert_eq!(run(code).unwrap(), "7");
}

#[test]
fn test_recursive_call_inherits_parent_frame() {
    // outer local 0 = 9; rec(n) returns the outer local once n reaches 0.
    // The second-level recursive frame must still see the top-level frame
    // through one context hop, so its parent link has to be inherited from
    // the first rec frame rather than pointing at the caller.
    let mut code = Code::new();
    code.add_function(function("<top>", 1, 0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(9);
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iload);
        bc.add_i64(1);
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Iprint);
        bc.add_insn(Opcode::Stop);
    }));
    code.add_function(function("rec", 1, 1, |bc| {
        let mut base = Label::new();
        bc.add_insn(Opcode::StoreIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iload0);
        bc.add_branch(Opcode::IficmpE, &mut base); // n == 0
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(0);
        bc.add_insn(Opcode::Iload1);
        bc.add_insn(Opcode::Isub);
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Return);
        bc.bind(&mut base);
        bc.add_insn(Opcode::LoadCtxIvar);
        bc.add_u16(1);
        bc.add_u16(0);
        bc.add_insn(Opcode::Return);
    }));
    assert_eq!(run(code).unwrap(), "9");
}

#[test]
fn test_return_from_top_level_terminates() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Return);
    })
    .unwrap();
    assert_eq!(out, "");
}

#[rstest]
#[case(Opcode::Idiv)]
#[case(Opcode::Imod)]
fn test_integer_division_by_zero(#[case] op: Opcode) {
    let err = run_single(0, |bc| {
        bc.add_insn(Opcode::Iload);
        bc.add_i64(1);
        bc.add_insn(Opcode::Iload0);
        bc.add_insn(op);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::DivisionByZero));
}

#[test]
fn test_double_division_by_zero_is_native() {
    let out = run_single(0, |bc| {
        bc.add_insn(Opcode::Dload);
        bc.add_double(1.0);
        bc.add_insn(Opcode::Dload0);
        bc.add_insn(Opcode::Ddiv);
        bc.add_insn(Opcode::Dprint);
        bc.add_insn(Opcode::Stop);
    })
    .unwrap();
    assert_eq!(out, "inf");
}

#[test]
fn test_invalid_instruction_is_runtime_error() {
    let err = run_single(0, |bc| {
        bc.add_insn(Opcode::Invalid);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidBytecode(_)));
}

#[test]
fn test_native_call_is_unsupported() {
    let err = run_single(0, |bc| {
        bc.add_insn(Opcode::CallNative);
        bc.add_u16(0);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidBytecode(_)));
}

#[test]
fn test_truncated_stream_is_runtime_error() {
    // Running off the end of an empty stream must not panic.
    let err = run_single(0, |_| {}).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidBytecode(_)));
}

#[test]
fn test_operand_underflow_is_runtime_error() {
    let err = run_single(0, |bc| {
        bc.add_insn(Opcode::Iprint);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::StackUnderflow));
}

#[test]
fn test_variable_region_overflow() {
    // 100 locals need 800 bytes; the whole buffer is 256.
    let mut code = Code::new();
    code.add_function(function("<top>", 100, 0, |bc| {
        bc.add_insn(Opcode::Stop);
    }));
    let mut out = Vec::new();
    let err = BytecodeInterpreter::with_stack_size(code, 256)
        .run_with_writer(&mut out)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::StackOverflow));
}

#[test]
fn test_unbounded_recursion_exhausts_stack() {
    let mut code = Code::new();
    code.add_function(function("<top>", 0, 0, |bc| {
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Stop);
    }));
    code.add_function(function("loop", 0, 1, |bc| {
        bc.add_insn(Opcode::Call);
        bc.add_u16(1);
        bc.add_insn(Opcode::Return);
    }));
    let mut out = Vec::new();
    let err = BytecodeInterpreter::with_stack_size(code, 1024)
        .run_with_writer(&mut out)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::StackOverflow));
}

#[test]
fn test_bad_function_id() {
    let err = run_single(0, |bc| {
        bc.add_insn(Opcode::Call);
        bc.add_u16(42);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidBytecode(_)));
}

#[test]
fn test_local_id_out_of_range() {
    let err = run_single(1, |bc| {
        bc.add_insn(Opcode::LoadIvar);
        bc.add_u16(3);
    })
    .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidBytecode(_)));
}
