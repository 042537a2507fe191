//! Jack compiler: object-oriented source in, VM commands out.
//!
//! Third stage of the toolchain. Each `.jack` file holds one class; the
//! compiler tokenizes it, parses it by recursive descent, resolves
//! identifiers through a two-scope symbol table, and emits VM commands
//! during the parse (no intermediate tree).
//!
//! # Architecture
//!
//! - [`tokenizer`]: token vector with index-based lookahead
//! - [`symbol_table`]: class scope + subroutine scope, per-kind indices
//! - [`vm_writer`]: typed VM command emission
//! - [`engine`]: syntax-directed translation over the grammar
//!
//! # Example
//!
//! ```rust
//! use jack_compiler::compile_source;
//!
//! let vm = compile_source(
//!     "class Main { function void main() { return; } }",
//! )
//! .unwrap();
//!
//! assert!(vm.starts_with("function Main.main 0\n"));
//! assert!(vm.contains("push constant 0\nreturn\n"));
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

use std::fmt;
use std::io;

pub mod engine;
pub mod symbol_table;
pub mod tokenizer;
pub mod vm_writer;

pub use engine::CompilationEngine;
pub use symbol_table::{Kind, SymbolTable};
pub use tokenizer::{Keyword, Token, TokenizeError, Tokenizer};
pub use vm_writer::{Arithmetic, Segment, VmWriter};

#[derive(Debug)]
pub enum CompileError {
    Tokenize(TokenizeError),
    Io(io::Error),
    UnexpectedToken(String),
    UnexpectedEnd,
    UnknownVariable(String),
}

impl std::error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tokenize(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::UnexpectedToken(msg) => write!(f, "unexpected token: {msg}"),
            Self::UnexpectedEnd => f.write_str("unexpected end of input"),
            Self::UnknownVariable(name) => write!(f, "unknown variable: {name}"),
        }
    }
}

impl From<TokenizeError> for CompileError {
    fn from(error: TokenizeError) -> Self {
        Self::Tokenize(error)
    }
}

impl From<io::Error> for CompileError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

/// Compiles one class source file into VM command text.
pub fn compile_source(source: &str) -> Result<String, CompileError> {
    let tokenizer = Tokenizer::new(source)?;
    let mut output = Vec::new();

    CompilationEngine::new(tokenizer, &mut output).compile_class()?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}
