//! Bytecode instruction set
//!
//! One opcode byte followed by inlined little-endian operands. Byte values
//! are contiguous starting at `INVALID` = 0, so decoding is a table index.

/// Opcode of a bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Invalid instruction; executing it is a runtime error
    Invalid = 0,

    /// Push an inlined i64 literal
    Iload,
    /// Push an inlined f64 literal
    Dload,
    /// Push an inlined u16 string-constant id
    Sload,
    /// Push integer 0
    Iload0,
    /// Push integer 1
    Iload1,
    /// Push integer −1
    IloadM1,
    /// Push double 0
    Dload0,
    /// Push double 1
    Dload1,
    /// Push double −1
    DloadM1,

    /// Integer add
    Iadd,
    /// Integer subtract
    Isub,
    /// Integer multiply
    Imul,
    /// Integer divide
    Idiv,
    /// Integer modulo
    Imod,
    /// Double add
    Dadd,
    /// Double subtract
    Dsub,
    /// Double multiply
    Dmul,
    /// Double divide
    Ddiv,

    /// Integer bitwise or
    Iaor,
    /// Integer bitwise and
    Iaand,
    /// Integer bitwise xor
    Iaxor,

    /// Integer negate
    Ineg,
    /// Double negate
    Dneg,

    /// Convert int to double
    I2d,
    /// Convert double to int (truncating)
    D2i,

    /// Three-way integer compare; pushes 0 / −1 / 1
    Icmp,
    /// Three-way double compare; pushes 0 / −1 / 1
    Dcmp,

    /// Pop and print an int
    Iprint,
    /// Pop and print a double
    Dprint,
    /// Pop a string id and print the pool entry
    Sprint,

    /// Load local int variable (u16 id)
    LoadIvar,
    /// Load local double variable (u16 id)
    LoadDvar,
    /// Store local int variable (u16 id)
    StoreIvar,
    /// Store local double variable (u16 id)
    StoreDvar,
    /// Load int through the static chain (u16 ctx, u16 id)
    LoadCtxIvar,
    /// Load double through the static chain (u16 ctx, u16 id)
    LoadCtxDvar,
    /// Store int through the static chain (u16 ctx, u16 id)
    StoreCtxIvar,
    /// Store double through the static chain (u16 ctx, u16 id)
    StoreCtxDvar,

    /// Unconditional jump (i16 offset)
    Ja,
    /// Branch if lower == upper (i16 offset)
    IficmpE,
    /// Branch if lower != upper (i16 offset)
    IficmpNe,
    /// Branch if lower > upper (i16 offset)
    IficmpG,
    /// Branch if lower >= upper (i16 offset)
    IficmpGe,
    /// Branch if lower < upper (i16 offset)
    IficmpL,
    /// Branch if lower <= upper (i16 offset)
    IficmpLe,

    /// Call function by id (u16)
    Call,
    /// Reserved: native call by id (u16); never emitted
    CallNative,
    /// Return from the current function
    Return,

    /// Exchange the top two slots
    Swap,
    /// Discard the top slot
    Pop,
    /// Terminate execution
    Stop,
}

impl Opcode {
    const ALL: [Opcode; 52] = [
        Opcode::Invalid,
        Opcode::Iload,
        Opcode::Dload,
        Opcode::Sload,
        Opcode::Iload0,
        Opcode::Iload1,
        Opcode::IloadM1,
        Opcode::Dload0,
        Opcode::Dload1,
        Opcode::DloadM1,
        Opcode::Iadd,
        Opcode::Isub,
        Opcode::Imul,
        Opcode::Idiv,
        Opcode::Imod,
        Opcode::Dadd,
        Opcode::Dsub,
        Opcode::Dmul,
        Opcode::Ddiv,
        Opcode::Iaor,
        Opcode::Iaand,
        Opcode::Iaxor,
        Opcode::Ineg,
        Opcode::Dneg,
        Opcode::I2d,
        Opcode::D2i,
        Opcode::Icmp,
        Opcode::Dcmp,
        Opcode::Iprint,
        Opcode::Dprint,
        Opcode::Sprint,
        Opcode::LoadIvar,
        Opcode::LoadDvar,
        Opcode::StoreIvar,
        Opcode::StoreDvar,
        Opcode::LoadCtxIvar,
        Opcode::LoadCtxDvar,
        Opcode::StoreCtxIvar,
        Opcode::StoreCtxDvar,
        Opcode::Ja,
        Opcode::IficmpE,
        Opcode::IficmpNe,
        Opcode::IficmpG,
        Opcode::IficmpGe,
        Opcode::IficmpL,
        Opcode::IficmpLe,
        Opcode::Call,
        Opcode::CallNative,
        Opcode::Return,
        Opcode::Swap,
        Opcode::Pop,
        Opcode::Stop,
    ];

    /// Decode an opcode byte
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Assembly mnemonic used by the disassembler
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Invalid => "INVALID",
            Opcode::Iload => "ILOAD",
            Opcode::Dload => "DLOAD",
            Opcode::Sload => "SLOAD",
            Opcode::Iload0 => "ILOAD0",
            Opcode::Iload1 => "ILOAD1",
            Opcode::IloadM1 => "ILOADM1",
            Opcode::Dload0 => "DLOAD0",
            Opcode::Dload1 => "DLOAD1",
            Opcode::DloadM1 => "DLOADM1",
            Opcode::Iadd => "IADD",
            Opcode::Isub => "ISUB",
            Opcode::Imul => "IMUL",
            Opcode::Idiv => "IDIV",
            Opcode::Imod => "IMOD",
            Opcode::Dadd => "DADD",
            Opcode::Dsub => "DSUB",
            Opcode::Dmul => "DMUL",
            Opcode::Ddiv => "DDIV",
            Opcode::Iaor => "IAOR",
            Opcode::Iaand => "IAAND",
            Opcode::Iaxor => "IAXOR",
            Opcode::Ineg => "INEG",
            Opcode::Dneg => "DNEG",
            Opcode::I2d => "I2D",
            Opcode::D2i => "D2I",
            Opcode::Icmp => "ICMP",
            Opcode::Dcmp => "DCMP",
            Opcode::Iprint => "IPRINT",
            Opcode::Dprint => "DPRINT",
            Opcode::Sprint => "SPRINT",
            Opcode::LoadIvar => "LOADIVAR",
            Opcode::LoadDvar => "LOADDVAR",
            Opcode::StoreIvar => "STOREIVAR",
            Opcode::StoreDvar => "STOREDVAR",
            Opcode::LoadCtxIvar => "LOADCTXIVAR",
            Opcode::LoadCtxDvar => "LOADCTXDVAR",
            Opcode::StoreCtxIvar => "STORECTXIVAR",
            Opcode::StoreCtxDvar => "STORECTXDVAR",
            Opcode::Ja => "JA",
            Opcode::IficmpE => "IFICMPE",
            Opcode::IficmpNe => "IFICMPNE",
            Opcode::IficmpG => "IFICMPG",
            Opcode::IficmpGe => "IFICMPGE",
            Opcode::IficmpL => "IFICMPL",
            Opcode::IficmpLe => "IFICMPLE",
            Opcode::Call => "CALL",
            Opcode::CallNative => "CALLNATIVE",
            Opcode::Return => "RETURN",
            Opcode::Swap => "SWAP",
            Opcode::Pop => "POP",
            Opcode::Stop => "STOP",
        }
    }
}
