//! Stack-based virtual machine
//!
//! Executes translated [`Code`] over one contiguous byte buffer: the
//! operand stack grows upward from the low end, the variable region grows
//! downward from the high end, and the two must never cross. Every slot is
//! a fixed 8 bytes regardless of the semantic type; correctness rests on
//! the generator emitting type-correct instruction pairs.
//!
//! Call frames live in a vector and link to their *lexically* enclosing
//! activation through `parent_frame`, a numeric index that stays valid as
//! the vector grows. That link, not the dynamic caller, is what the
//! CTX load/store instructions walk.

use crate::bytecode::Opcode;
use crate::code::Code;
use std::io::{self, Write};
use thiserror::Error;

/// Default size of the memory buffer shared by operands and variables
pub const DEFAULT_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Every stack slot and variable slot is 8 bytes
const SLOT_SIZE: usize = 8;

/// Runtime error raised by the interpreter
///
/// No recovery is attempted; execution stops at the first error.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Operand stack and variable region collided
    #[error("Stack overflow")]
    StackOverflow,
    /// An instruction consumed more operands than were pushed
    #[error("Operand stack underflow")]
    StackUnderflow,
    /// Integer division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,
    /// Unrecognized opcode, bad id, or truncated stream
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),
    /// Writing program output failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One function activation
///
/// `variables_offset` is the byte offset of this frame's variable region in
/// the shared buffer. `parent_frame` indexes the lexically enclosing
/// activation (self for the top-level frame).
#[derive(Debug, Clone, Copy)]
struct StackFrame {
    function_id: u16,
    return_ip: usize,
    parent_frame: usize,
    variables_offset: usize,
}

/// Executes a translated program
pub struct BytecodeInterpreter {
    code: Code,
    memory: Vec<u8>,
    /// Next free operand byte; grows upward
    operands_offset: usize,
    /// Start of the lowest allocated variable region; grows downward
    variables_offset: usize,
    frames: Vec<StackFrame>,
    /// Call-depth bound so zero-local recursion still exhausts cleanly
    max_frames: usize,
    ip: usize,
    function_id: u16,
}

impl BytecodeInterpreter {
    /// Create an interpreter with the default stack size
    pub fn new(code: Code) -> Self {
        Self::with_stack_size(code, DEFAULT_STACK_SIZE)
    }

    /// Create an interpreter with a custom stack size
    ///
    /// The buffer is allocated once here and holds both the operand stack
    /// and every frame's variables.
    pub fn with_stack_size(code: Code, stack_size: usize) -> Self {
        Self {
            code,
            memory: vec![0; stack_size],
            operands_offset: 0,
            variables_offset: stack_size,
            frames: Vec::new(),
            max_frames: stack_size / SLOT_SIZE,
            ip: 0,
            function_id: 0,
        }
    }

    /// Execute from the top-level function, printing to stdout
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.execute(&mut lock)
    }

    /// Execute from the top-level function, printing to `out`
    pub fn run_with_writer(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        self.execute(out)
    }

    fn execute(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        self.push_frame(0)?;

        loop {
            let byte = self.fetch_u8()?;
            let opcode = Opcode::from_byte(byte).ok_or_else(|| {
                RuntimeError::InvalidBytecode(format!("unrecognized opcode {:#04x}", byte))
            })?;

            match opcode {
                Opcode::Invalid => {
                    return Err(RuntimeError::InvalidBytecode(
                        "invalid instruction".to_string(),
                    ))
                }

                // ===== Literals =====
                Opcode::Iload => {
                    let value = self.fetch_i64()?;
                    self.push_i64(value)?;
                }
                Opcode::Dload => {
                    let value = self.fetch_f64()?;
                    self.push_f64(value)?;
                }
                Opcode::Sload => {
                    let id = self.fetch_u16()?;
                    self.push_i64(id as i64)?;
                }
                Opcode::Iload0 => self.push_i64(0)?,
                Opcode::Iload1 => self.push_i64(1)?,
                Opcode::IloadM1 => self.push_i64(-1)?,
                Opcode::Dload0 => self.push_f64(0.0)?,
                Opcode::Dload1 => self.push_f64(1.0)?,
                Opcode::DloadM1 => self.push_f64(-1.0)?,

                // ===== Integer arithmetic (two's-complement wrapping) =====
                Opcode::Iadd => self.int_binop(i64::wrapping_add)?,
                Opcode::Isub => self.int_binop(i64::wrapping_sub)?,
                Opcode::Imul => self.int_binop(i64::wrapping_mul)?,
                Opcode::Idiv => {
                    let upper = self.pop_i64()?;
                    let lower = self.pop_i64()?;
                    if upper == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    self.push_i64(lower.wrapping_div(upper))?;
                }
                Opcode::Imod => {
                    let upper = self.pop_i64()?;
                    let lower = self.pop_i64()?;
                    if upper == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    self.push_i64(lower.wrapping_rem(upper))?;
                }

                // ===== Double arithmetic =====
                Opcode::Dadd => self.double_binop(|lower, upper| lower + upper)?,
                Opcode::Dsub => self.double_binop(|lower, upper| lower - upper)?,
                Opcode::Dmul => self.double_binop(|lower, upper| lower * upper)?,
                Opcode::Ddiv => self.double_binop(|lower, upper| lower / upper)?,

                // ===== Bitwise =====
                Opcode::Iaor => self.int_binop(|lower, upper| lower | upper)?,
                Opcode::Iaand => self.int_binop(|lower, upper| lower & upper)?,
                Opcode::Iaxor => self.int_binop(|lower, upper| lower ^ upper)?,

                Opcode::Ineg => {
                    let value = self.pop_i64()?;
                    self.push_i64(value.wrapping_neg())?;
                }
                Opcode::Dneg => {
                    let value = self.pop_f64()?;
                    self.push_f64(-value)?;
                }

                Opcode::I2d => {
                    let value = self.pop_i64()?;
                    self.push_f64(value as f64)?;
                }
                Opcode::D2i => {
                    let value = self.pop_f64()?;
                    self.push_i64(value as i64)?;
                }

                // ===== Three-way compares =====
                Opcode::Icmp => {
                    let upper = self.pop_i64()?;
                    let lower = self.pop_i64()?;
                    self.push_i64(three_way(lower == upper, lower < upper))?;
                }
                Opcode::Dcmp => {
                    let upper = self.pop_f64()?;
                    let lower = self.pop_f64()?;
                    self.push_i64(three_way(lower == upper, lower < upper))?;
                }

                // ===== Printing =====
                Opcode::Iprint => {
                    let value = self.pop_i64()?;
                    write!(out, "{}", value)?;
                }
                Opcode::Dprint => {
                    let value = self.pop_f64()?;
                    write!(out, "{}", value)?;
                }
                Opcode::Sprint => {
                    let id = self.pop_i64()? as u16;
                    let s = self.code.string_by_id(id).ok_or_else(|| {
                        RuntimeError::InvalidBytecode(format!("bad string constant id {}", id))
                    })?;
                    write!(out, "{}", s)?;
                }

                // ===== Variables =====
                Opcode::LoadIvar | Opcode::LoadDvar => {
                    let id = self.fetch_u16()?;
                    let frame = self.frames.len() - 1;
                    let addr = self.local_addr(frame, id)?;
                    self.push_slot(addr)?;
                }
                Opcode::StoreIvar | Opcode::StoreDvar => {
                    let id = self.fetch_u16()?;
                    let frame = self.frames.len() - 1;
                    let addr = self.local_addr(frame, id)?;
                    self.pop_slot(addr)?;
                }
                Opcode::LoadCtxIvar | Opcode::LoadCtxDvar => {
                    let context = self.fetch_u16()?;
                    let id = self.fetch_u16()?;
                    let frame = self.frame_at_context(context);
                    let addr = self.local_addr(frame, id)?;
                    self.push_slot(addr)?;
                }
                Opcode::StoreCtxIvar | Opcode::StoreCtxDvar => {
                    let context = self.fetch_u16()?;
                    let id = self.fetch_u16()?;
                    let frame = self.frame_at_context(context);
                    let addr = self.local_addr(frame, id)?;
                    self.pop_slot(addr)?;
                }

                // ===== Control flow =====
                Opcode::Ja => {
                    let offset = self.fetch_i16()?;
                    self.jump(offset)?;
                }
                Opcode::IficmpE => self.branch_if(|lower, upper| lower == upper)?,
                Opcode::IficmpNe => self.branch_if(|lower, upper| lower != upper)?,
                Opcode::IficmpG => self.branch_if(|lower, upper| lower > upper)?,
                Opcode::IficmpGe => self.branch_if(|lower, upper| lower >= upper)?,
                Opcode::IficmpL => self.branch_if(|lower, upper| lower < upper)?,
                Opcode::IficmpLe => self.branch_if(|lower, upper| lower <= upper)?,

                Opcode::Call => {
                    let id = self.fetch_u16()?;
                    self.push_frame(id)?;
                }
                Opcode::CallNative => {
                    return Err(RuntimeError::InvalidBytecode(
                        "native calls are not supported".to_string(),
                    ))
                }
                Opcode::Return => {
                    if self.pop_frame() {
                        // The top-level frame was popped: the program is done.
                        return Ok(());
                    }
                }

                // ===== Stack housekeeping =====
                Opcode::Swap => {
                    let upper = self.pop_i64()?;
                    let lower = self.pop_i64()?;
                    self.push_i64(upper)?;
                    self.push_i64(lower)?;
                }
                Opcode::Pop => {
                    self.pop_i64()?;
                }
                Opcode::Stop => return Ok(()),
            }
        }
    }

    // ── Frames ───────────────────────────────────────────────────────────

    /// Allocate a frame for `id` and transfer control to it
    ///
    /// The parent link is the static (lexical) parent, not the caller:
    /// - the first frame parents itself,
    /// - a direct self-recursive call inherits the current frame's parent
    ///   (the recursion shares one lexical environment),
    /// - any other call parents the caller's frame.
    fn push_frame(&mut self, id: u16) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeError::StackOverflow);
        }
        let callee = self
            .code
            .function_by_id(id)
            .ok_or_else(|| RuntimeError::InvalidBytecode(format!("bad function id {}", id)))?;
        let locals_bytes = callee.locals_count as usize * SLOT_SIZE;

        let parent_frame = match self.frames.last() {
            None => 0,
            Some(top) if id != 0 && id == self.function_id => top.parent_frame,
            Some(_) => self.frames.len() - 1,
        };

        let variables_offset = self
            .variables_offset
            .checked_sub(locals_bytes)
            .filter(|&offset| offset >= self.operands_offset)
            .ok_or(RuntimeError::StackOverflow)?;
        self.memory[variables_offset..self.variables_offset].fill(0);

        self.frames.push(StackFrame {
            function_id: id,
            return_ip: self.ip,
            parent_frame,
            variables_offset,
        });
        self.variables_offset = variables_offset;
        self.function_id = id;
        self.ip = 0;
        Ok(())
    }

    /// Pop the current frame, returning `true` when it was the last one
    fn pop_frame(&mut self) -> bool {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return true,
        };
        self.ip = frame.return_ip;
        match self.frames.last() {
            Some(top) => {
                self.variables_offset = top.variables_offset;
                self.function_id = top.function_id;
                false
            }
            None => true,
        }
    }

    /// Walk `context` hops along the static chain from the current frame
    fn frame_at_context(&self, context: u16) -> usize {
        let mut index = self.frames.len() - 1;
        for _ in 0..context {
            index = self.frames[index].parent_frame;
        }
        index
    }

    /// Byte address of local slot `id` in the given frame
    fn local_addr(&self, frame: usize, id: u16) -> Result<usize, RuntimeError> {
        let frame = &self.frames[frame];
        let locals_count = self
            .code
            .function_by_id(frame.function_id)
            .map(|f| f.locals_count)
            .unwrap_or(0);
        if id >= locals_count {
            return Err(RuntimeError::InvalidBytecode(format!(
                "local id {} out of range for function {}",
                id, frame.function_id
            )));
        }
        Ok(frame.variables_offset + id as usize * SLOT_SIZE)
    }

    // ── Operand stack ────────────────────────────────────────────────────

    fn push_raw(&mut self, bytes: [u8; SLOT_SIZE]) -> Result<(), RuntimeError> {
        if self.operands_offset + SLOT_SIZE > self.variables_offset {
            return Err(RuntimeError::StackOverflow);
        }
        self.memory[self.operands_offset..self.operands_offset + SLOT_SIZE]
            .copy_from_slice(&bytes);
        self.operands_offset += SLOT_SIZE;
        Ok(())
    }

    fn pop_raw(&mut self) -> Result<[u8; SLOT_SIZE], RuntimeError> {
        if self.operands_offset < SLOT_SIZE {
            return Err(RuntimeError::StackUnderflow);
        }
        self.operands_offset -= SLOT_SIZE;
        let mut bytes = [0u8; SLOT_SIZE];
        bytes.copy_from_slice(&self.memory[self.operands_offset..self.operands_offset + SLOT_SIZE]);
        Ok(bytes)
    }

    fn push_i64(&mut self, value: i64) -> Result<(), RuntimeError> {
        self.push_raw(value.to_le_bytes())
    }

    fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        self.pop_raw().map(i64::from_le_bytes)
    }

    fn push_f64(&mut self, value: f64) -> Result<(), RuntimeError> {
        self.push_raw(value.to_le_bytes())
    }

    fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        self.pop_raw().map(f64::from_le_bytes)
    }

    /// Copy the slot at `addr` onto the operand stack
    fn push_slot(&mut self, addr: usize) -> Result<(), RuntimeError> {
        let mut bytes = [0u8; SLOT_SIZE];
        bytes.copy_from_slice(&self.memory[addr..addr + SLOT_SIZE]);
        self.push_raw(bytes)
    }

    /// Pop the top of the operand stack into the slot at `addr`
    fn pop_slot(&mut self, addr: usize) -> Result<(), RuntimeError> {
        let bytes = self.pop_raw()?;
        self.memory[addr..addr + SLOT_SIZE].copy_from_slice(&bytes);
        Ok(())
    }

    fn int_binop(&mut self, op: impl Fn(i64, i64) -> i64) -> Result<(), RuntimeError> {
        let upper = self.pop_i64()?;
        let lower = self.pop_i64()?;
        self.push_i64(op(lower, upper))
    }

    fn double_binop(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let upper = self.pop_f64()?;
        let lower = self.pop_f64()?;
        self.push_f64(op(lower, upper))
    }

    // ── Instruction stream ───────────────────────────────────────────────

    fn fetch_u8(&mut self) -> Result<u8, RuntimeError> {
        let value = self.current_bytecode()?.get_u8(self.ip).ok_or_else(|| {
            RuntimeError::InvalidBytecode("truncated instruction stream".to_string())
        })?;
        self.ip += 1;
        Ok(value)
    }

    fn fetch_u16(&mut self) -> Result<u16, RuntimeError> {
        let value = self.current_bytecode()?.get_u16(self.ip).ok_or_else(|| {
            RuntimeError::InvalidBytecode("truncated instruction stream".to_string())
        })?;
        self.ip += 2;
        Ok(value)
    }

    fn fetch_i16(&mut self) -> Result<i16, RuntimeError> {
        self.fetch_u16().map(|v| v as i16)
    }

    fn fetch_i64(&mut self) -> Result<i64, RuntimeError> {
        let value = self.current_bytecode()?.get_i64(self.ip).ok_or_else(|| {
            RuntimeError::InvalidBytecode("truncated instruction stream".to_string())
        })?;
        self.ip += 8;
        Ok(value)
    }

    fn fetch_f64(&mut self) -> Result<f64, RuntimeError> {
        let value = self.current_bytecode()?.get_double(self.ip).ok_or_else(|| {
            RuntimeError::InvalidBytecode("truncated instruction stream".to_string())
        })?;
        self.ip += 8;
        Ok(value)
    }

    fn current_bytecode(&self) -> Result<&crate::bytecode::Bytecode, RuntimeError> {
        self.code
            .function_by_id(self.function_id)
            .map(|f| &f.bytecode)
            .ok_or_else(|| {
                RuntimeError::InvalidBytecode(format!("bad function id {}", self.function_id))
            })
    }

    /// Apply a branch offset measured from after the 2-byte offset field
    fn jump(&mut self, offset: i16) -> Result<(), RuntimeError> {
        let target = self.ip as i64 + offset as i64;
        if target < 0 {
            return Err(RuntimeError::InvalidBytecode(
                "branch before start of function".to_string(),
            ));
        }
        self.ip = target as usize;
        Ok(())
    }

    /// Pop two ints and branch when `lower OP upper` holds
    fn branch_if(&mut self, cond: impl Fn(i64, i64) -> bool) -> Result<(), RuntimeError> {
        let offset = self.fetch_i16()?;
        let upper = self.pop_i64()?;
        let lower = self.pop_i64()?;
        if cond(lower, upper) {
            self.jump(offset)?;
        }
        Ok(())
    }
}

/// Three-way compare result: 0 if equal, −1 if lower < upper, else 1
fn three_way(equal: bool, less: bool) -> i64 {
    if equal {
        0
    } else if less {
        -1
    } else {
        1
    }
}
