//! VM translator: stack-machine commands in, Hack assembly out.
//!
//! Second stage of the toolchain. Each VM file becomes a stream of
//! assembly implementing the stack discipline on the Hack register
//! machine, including the full function calling convention and signed
//! comparisons that survive 16-bit overflow.
//!
//! # Architecture
//!
//! - [`parser`]: command stream parsing into a typed [`Command`] sum type
//! - [`code_writer`]: per-command assembly emission over any writer
//!
//! Translation state is per file (static variable mangling) and per
//! function (label mangling, call counters); a program bundle shares one
//! writer so the bootstrap prelude is emitted exactly once.
//!
//! # Example
//!
//! ```rust
//! use vm_translator::translate_program;
//!
//! let mut asm = Vec::new();
//! translate_program(&[("Main", "push constant 7\npush constant 8\nadd\n")], false, &mut asm)
//!     .unwrap();
//! let asm = String::from_utf8(asm).unwrap();
//!
//! assert!(asm.contains("@7"));
//! assert!(asm.contains("M=D+M"));
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::fmt;
use std::io::{self, Write};

pub mod code_writer;
pub mod parser;

pub use code_writer::CodeWriter;
pub use parser::{ArithmeticOp, Command, ParseError, Parser, Segment};

#[derive(Debug)]
pub enum TranslateError {
    Parse(ParseError),
    Io(io::Error),
}

impl std::error::Error for TranslateError {}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<ParseError> for TranslateError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<io::Error> for TranslateError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

/// Translates one source file into an already-open code writer.
pub fn translate_source<W: Write>(
    source: &str,
    file_stem: &str,
    writer: &mut CodeWriter<W>,
) -> Result<(), TranslateError> {
    writer.set_file_name(file_stem);

    let mut parser = Parser::from_source(source);
    while parser.has_more_commands() {
        let command = parser.advance()?;
        writer.write_command(&command)?;
    }
    Ok(())
}

/// Translates a program bundle of `(file stem, source)` pairs into one
/// assembly stream, prepending the bootstrap prelude when requested.
pub fn translate_program<W: Write>(
    files: &[(&str, &str)],
    bootstrap: bool,
    writer: W,
) -> Result<(), TranslateError> {
    let mut code_writer = CodeWriter::new(writer);
    if bootstrap {
        code_writer.write_bootstrap()?;
    }
    for (stem, source) in files {
        translate_source(source, stem, &mut code_writer)?;
    }
    code_writer.close()?;
    Ok(())
}

/// True when the program defines `Sys.init`, in which case a single-file
/// translation still wants the bootstrap prelude.
#[must_use]
pub fn defines_sys_init(source: &str) -> bool {
    source.lines().any(|line| {
        let mut parts = line.split_whitespace();
        parts.next() == Some("function") && parts.next() == Some("Sys.init")
    })
}
