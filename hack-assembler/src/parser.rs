//! Line-level parsing of Hack assembly.
//!
//! Preprocessing follows the assembly grammar: everything from the first
//! `/` onward is a comment, whitespace carries no meaning inside an
//! instruction, and blank lines are dropped. What survives is the
//! instruction stream, classified by its first byte.

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // Command suffix is intentional and clear
pub enum CommandType {
    /// `@Xxx` where `Xxx` is either a symbol or a decimal literal
    ACommand,
    /// `dest=comp;jump`
    CCommand,
    /// `(Xxx)` pseudo-command binding `Xxx` to the next instruction address
    LCommand,
}

#[derive(Debug)]
pub enum ParserError {
    InvalidState(&'static str),
}

impl std::error::Error for ParserError {}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidState(msg) => write!(f, "invalid parser state: {msg}"),
        }
    }
}

/// Strips the comment and every whitespace character from a raw source
/// line, returning `None` when nothing remains.
fn sanitize(line: &str) -> Option<String> {
    let code = match line.find('/') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let cleaned: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Cursor over the sanitized instruction stream of one source file.
///
/// `advance` steps to the next instruction; the accessors slice the
/// current one without further allocation.
pub struct ParserLines {
    lines: Vec<String>,
    cursor: usize,
    current: Option<(usize, CommandType)>,
}

impl ParserLines {
    /// Builds the instruction stream from raw assembly source.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        Self {
            lines: source.lines().filter_map(sanitize).collect(),
            cursor: 0,
            current: None,
        }
    }

    /// Steps to the next instruction. Returns `false` once the stream is
    /// exhausted, after which no command is current.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.lines.len() {
            let kind = Self::classify(&self.lines[self.cursor]);
            self.current = Some((self.cursor, kind));
            self.cursor += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    /// Classifies an instruction by its first byte. Sanitized lines are
    /// never empty, so indexing byte 0 is safe.
    #[inline]
    fn classify(line: &str) -> CommandType {
        match line.as_bytes()[0] {
            b'@' => CommandType::ACommand,
            b'(' => CommandType::LCommand,
            _ => CommandType::CCommand,
        }
    }

    fn current_line(&self) -> Result<(&str, CommandType), ParserError> {
        self.current
            .map(|(index, kind)| (self.lines[index].as_str(), kind))
            .ok_or(ParserError::InvalidState("no current command"))
    }

    pub fn command_type(&self) -> Result<CommandType, ParserError> {
        Ok(self.current_line()?.1)
    }

    /// Returns the symbol of the current A- or L-command.
    pub fn symbol(&self) -> Result<&str, ParserError> {
        match self.current_line()? {
            (line, CommandType::ACommand) => Ok(&line[1..]),
            (line, CommandType::LCommand) => Ok(&line[1..line.len() - 1]),
            (_, CommandType::CCommand) => {
                Err(ParserError::InvalidState("symbol() called on a C-command"))
            }
        }
    }

    /// Returns the dest mnemonic of the current C-command, empty when the
    /// instruction has no `=`.
    pub fn dest(&self) -> Result<&str, ParserError> {
        let line = self.c_command()?;
        Ok(line.find('=').map_or("", |pos| &line[..pos]))
    }

    /// Returns the comp mnemonic of the current C-command.
    pub fn comp(&self) -> Result<&str, ParserError> {
        let line = self.c_command()?;
        let start = line.find('=').map_or(0, |pos| pos + 1);
        let end = line.find(';').unwrap_or(line.len());
        Ok(&line[start..end])
    }

    /// Returns the jump mnemonic of the current C-command, empty when the
    /// instruction has no `;`.
    pub fn jump(&self) -> Result<&str, ParserError> {
        let line = self.c_command()?;
        Ok(line.find(';').map_or("", |pos| &line[pos + 1..]))
    }

    fn c_command(&self) -> Result<&str, ParserError> {
        match self.current_line()? {
            (line, CommandType::CCommand) => Ok(line),
            _ => Err(ParserError::InvalidState(
                "dest/comp/jump called on a non-C command",
            )),
        }
    }
}
