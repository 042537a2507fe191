//! Hack assembler: symbolic assembly in, 16-bit binary out.
//!
//! First stage of the Jack toolchain from the target end. The assembler
//! makes two passes over the instruction stream:
//!
//! - **Pass 1** records the address of every `(LABEL)` pseudo-command.
//! - **Pass 2** emits one 16-character binary word per real instruction,
//!   resolving symbols and allocating variable cells from RAM\[16\] up.
//!
//! # Architecture
//!
//! - [`parser`]: comment/whitespace stripping and instruction classification
//! - [`code`]: mnemonic encoding through perfect-hash tables, including
//!   the extended shift mnemonics under their own opcode prefix
//! - [`symbol_table`]: predefined symbols plus label/variable bindings
//!
//! # Example
//!
//! ```rust
//! use hack_assembler::assemble;
//!
//! let binary = assemble("@2\nD=A\n@3\nD=D+A\n@0\nM=D\n").unwrap();
//! let words: Vec<&str> = binary.lines().collect();
//!
//! assert_eq!(words.len(), 6);
//! assert_eq!(words[0], "0000000000000010"); // @2
//! assert_eq!(words[1], "1110110000010000"); // D=A
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::fmt;

pub mod code;
pub mod parser;
pub mod symbol_table;

pub use parser::{CommandType, ParserError, ParserLines};
pub use symbol_table::SymbolTable;

/// Fatal input errors. The assembly source is well-formed by contract,
/// so detection is limited to unambiguous lexical violations.
#[derive(Debug)]
pub enum AssembleError {
    UnknownDest(String),
    UnknownComp(String),
    UnknownJump(String),
    /// Numeric A-instruction literal outside 0..=32767.
    LiteralOutOfRange(String),
    Parser(ParserError),
}

impl std::error::Error for AssembleError {}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownDest(m) => write!(f, "unknown dest mnemonic: {m}"),
            Self::UnknownComp(m) => write!(f, "unknown comp mnemonic: {m}"),
            Self::UnknownJump(m) => write!(f, "unknown jump mnemonic: {m}"),
            Self::LiteralOutOfRange(lit) => {
                write!(f, "numeric literal out of range 0..=32767: @{lit}")
            }
            Self::Parser(e) => write!(f, "{e}"),
        }
    }
}

impl From<ParserError> for AssembleError {
    fn from(error: ParserError) -> Self {
        Self::Parser(error)
    }
}

/// Assembles a complete source file into binary, one 16-character line
/// per instruction, newline-terminated.
pub fn assemble(source: &str) -> Result<String, AssembleError> {
    let mut symbols = SymbolTable::new();

    first_pass(&mut ParserLines::from_source(source), &mut symbols)?;
    second_pass(&mut ParserLines::from_source(source), &mut symbols)
}

/// Pass 1: bind every label to the address of the instruction that
/// follows it. Labels generate no code, so only A- and C-instructions
/// advance the address counter.
fn first_pass(parser: &mut ParserLines, symbols: &mut SymbolTable) -> Result<(), AssembleError> {
    let mut rom_address = 0u16;

    while parser.advance() {
        match parser.command_type()? {
            CommandType::LCommand => symbols.bind(parser.symbol()?, rom_address),
            CommandType::ACommand | CommandType::CCommand => rom_address += 1,
        }
    }
    Ok(())
}

/// Pass 2: emit machine code, resolving symbols through the table built
/// in pass 1 and allocating variable cells on first reference.
fn second_pass(
    parser: &mut ParserLines,
    symbols: &mut SymbolTable,
) -> Result<String, AssembleError> {
    let mut output = String::new();

    while parser.advance() {
        match parser.command_type()? {
            CommandType::ACommand => {
                let symbol = parser.symbol()?;
                let address = if symbol.as_bytes().first().is_some_and(u8::is_ascii_digit) {
                    symbol
                        .parse::<u16>()
                        .ok()
                        .filter(|&a| a <= code::MAX_ADDRESS)
                        .ok_or_else(|| AssembleError::LiteralOutOfRange(symbol.to_string()))?
                } else {
                    symbols.resolve(symbol)
                };
                output.push_str(&code::encode_a_instruction(address));
                output.push('\n');
            }
            CommandType::CCommand => {
                let word =
                    code::encode_c_instruction(parser.dest()?, parser.comp()?, parser.jump()?)?;
                output.push_str(&word);
                output.push('\n');
            }
            // Already consumed by pass 1.
            CommandType::LCommand => {}
        }
    }
    Ok(output)
}
