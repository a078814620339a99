//! MathVM language runtime
//!
//! Translates MathVM source, a small statically-typed imperative language
//! with ints, doubles, strings, nested functions, and `print`, into a
//! compact stack-oriented bytecode, and executes it on a purpose-built
//! virtual machine.
//!
//! The pipeline is two sequential phases:
//!
//! ```text
//! source ── lexer ── parser ── BytecodeGenerator ── Code ── BytecodeInterpreter
//! ```
//!
//! [`translate`] runs the front half and yields executable [`Code`]; the
//! [`BytecodeInterpreter`] runs it. Both error kinds are fatal and carry
//! no recovery: a [`TranslationError`] points at the offending source
//! position, a [`vm::RuntimeError`] stops execution with a message.
//!
//! # Example
//!
//! ```
//! use mathvm_runtime::{translate, BytecodeInterpreter};
//!
//! let code = translate("print(2 + 3);").unwrap();
//! let mut out = Vec::new();
//! BytecodeInterpreter::new(code)
//!     .run_with_writer(&mut out)
//!     .unwrap();
//! assert_eq!(out, b"5");
//! ```

pub mod ast;
pub mod bytecode;
pub mod code;
pub mod diagnostic;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;
pub mod vm;

pub use code::Code;
pub use diagnostic::TranslationError;
pub use generator::BytecodeGenerator;
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::Span;
pub use vm::{BytecodeInterpreter, RuntimeError};

/// Translate MathVM source into executable [`Code`]
///
/// Lexes, parses, and generates bytecode; the first error at any stage
/// aborts the translation.
pub fn translate(source: &str) -> Result<Code, TranslationError> {
    let tokens = Lexer::new(source).tokenize()?;
    let ast = Parser::new(tokens).parse()?;
    BytecodeGenerator::new(&ast).generate()
}
