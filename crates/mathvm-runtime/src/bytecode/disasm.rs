//! Bytecode disassembler
//!
//! Converts translated code back to a human-readable assembly-like
//! listing. Used for debugging, tests, and `mvm --disasm` output.

use super::{Bytecode, Opcode};
use crate::code::Code;
use std::fmt::Write;

/// Disassemble every function of a [`Code`] registry
///
/// # Format
/// ```text
/// function 0 <top> (locals: 1, depth: 0)
///   0000  ILOAD 2
///   0009  STOREIVAR 0
///   0012  STOP
/// ```
pub fn disassemble(code: &Code) -> String {
    let mut output = String::new();
    for id in 0..code.functions_count() as u16 {
        let function = match code.function_by_id(id) {
            Some(f) => f,
            None => break,
        };
        writeln!(
            output,
            "function {} {} (locals: {}, depth: {})",
            function.id, function.name, function.locals_count, function.depth
        )
        .unwrap();

        let mut offset = 0;
        while offset < function.bytecode.len() {
            let line = disassemble_instruction(code, &function.bytecode, &mut offset);
            writeln!(output, "  {}", line).unwrap();
        }
        writeln!(output).unwrap();
    }
    output
}

/// Disassemble a single instruction, advancing `offset` past its operands
fn disassemble_instruction(code: &Code, bc: &Bytecode, offset: &mut usize) -> String {
    let start_offset = *offset;

    let byte = match bc.get_u8(*offset) {
        Some(b) => b,
        None => return format!("{:04}  <invalid offset>", start_offset),
    };
    *offset += 1;

    let opcode = match Opcode::from_byte(byte) {
        Some(op) => op,
        None => return format!("{:04}  <invalid opcode: {:#04x}>", start_offset, byte),
    };

    match opcode {
        Opcode::Iload => {
            let value = read_i64(bc, offset);
            format!("{:04}  {} {}", start_offset, opcode.mnemonic(), value)
        }
        Opcode::Dload => {
            let value = read_f64(bc, offset);
            format!("{:04}  {} {}", start_offset, opcode.mnemonic(), value)
        }
        Opcode::Sload => {
            let id = read_u16(bc, offset);
            match code.string_by_id(id) {
                Some(s) => format!(
                    "{:04}  {} {} ({:?})",
                    start_offset,
                    opcode.mnemonic(),
                    id,
                    s
                ),
                None => format!("{:04}  {} {}", start_offset, opcode.mnemonic(), id),
            }
        }

        Opcode::LoadIvar
        | Opcode::LoadDvar
        | Opcode::StoreIvar
        | Opcode::StoreDvar
        | Opcode::Call
        | Opcode::CallNative => {
            let operand = read_u16(bc, offset);
            format!("{:04}  {} {}", start_offset, opcode.mnemonic(), operand)
        }

        Opcode::LoadCtxIvar
        | Opcode::LoadCtxDvar
        | Opcode::StoreCtxIvar
        | Opcode::StoreCtxDvar => {
            let ctx = read_u16(bc, offset);
            let id = read_u16(bc, offset);
            format!(
                "{:04}  {} ctx={} id={}",
                start_offset,
                opcode.mnemonic(),
                ctx,
                id
            )
        }

        Opcode::Ja
        | Opcode::IficmpE
        | Opcode::IficmpNe
        | Opcode::IficmpG
        | Opcode::IficmpGe
        | Opcode::IficmpL
        | Opcode::IficmpLe => {
            let jump = read_i16(bc, offset);
            let target = (*offset as i64 + jump as i64).max(0) as usize;
            format!(
                "{:04}  {} {} (-> {:04})",
                start_offset,
                opcode.mnemonic(),
                jump,
                target
            )
        }

        _ => format!("{:04}  {}", start_offset, opcode.mnemonic()),
    }
}

fn read_u16(bc: &Bytecode, offset: &mut usize) -> u16 {
    let value = bc.get_u16(*offset).unwrap_or(0);
    *offset += 2;
    value
}

fn read_i16(bc: &Bytecode, offset: &mut usize) -> i16 {
    let value = bc.get_i16(*offset).unwrap_or(0);
    *offset += 2;
    value
}

fn read_i64(bc: &Bytecode, offset: &mut usize) -> i64 {
    let value = bc.get_i64(*offset).unwrap_or(0);
    *offset += 8;
    value
}

fn read_f64(bc: &Bytecode, offset: &mut usize) -> f64 {
    let value = bc.get_double(*offset).unwrap_or(0.0);
    *offset += 8;
    value
}
