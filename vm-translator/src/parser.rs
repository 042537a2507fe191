//! Parsing of VM commands.
//!
//! Preprocessing matches the assembler: strip `//` comments, trim, drop
//! blank lines. Each surviving line is one command; the first
//! whitespace-separated token is the mnemonic and the rest are its
//! arguments. Commands come out as a sum type so every consumer matches
//! exhaustively instead of re-inspecting strings.

use std::fmt;

/// The eight VM memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "argument" => Some(Self::Argument),
            "local" => Some(Self::Local),
            "static" => Some(Self::Static),
            "constant" => Some(Self::Constant),
            "this" => Some(Self::This),
            "that" => Some(Self::That),
            "pointer" => Some(Self::Pointer),
            "temp" => Some(Self::Temp),
            _ => None,
        }
    }

    /// Runtime base pointer symbol for the indirectly addressed segments.
    pub(crate) fn pointer_symbol(self) -> Option<&'static str> {
        match self {
            Self::Local => Some("LCL"),
            Self::Argument => Some("ARG"),
            Self::This => Some("THIS"),
            Self::That => Some("THAT"),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Argument => "argument",
            Self::Local => "local",
            Self::Static => "static",
            Self::Constant => "constant",
            Self::This => "this",
            Self::That => "that",
            Self::Pointer => "pointer",
            Self::Temp => "temp",
        };
        f.write_str(name)
    }
}

/// The nine arithmetic and logic commands plus the two shift extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl ArithmeticOp {
    fn parse(mnemonic: &str) -> Option<Self> {
        match mnemonic {
            "add" => Some(Self::Add),
            "sub" => Some(Self::Sub),
            "neg" => Some(Self::Neg),
            "eq" => Some(Self::Eq),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "shiftleft" => Some(Self::ShiftLeft),
            "shiftright" => Some(Self::ShiftRight),
            _ => None,
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Neg => "neg",
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::ShiftLeft => "shiftleft",
            Self::ShiftRight => "shiftright",
        };
        f.write_str(name)
    }
}

/// One parsed VM command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Arithmetic(op) => write!(f, "{op}"),
            Self::Push(segment, index) => write!(f, "push {segment} {index}"),
            Self::Pop(segment, index) => write!(f, "pop {segment} {index}"),
            Self::Label(label) => write!(f, "label {label}"),
            Self::Goto(label) => write!(f, "goto {label}"),
            Self::IfGoto(label) => write!(f, "if-goto {label}"),
            Self::Function(name, n) => write!(f, "function {name} {n}"),
            Self::Call(name, n) => write!(f, "call {name} {n}"),
            Self::Return => f.write_str("return"),
        }
    }
}

#[derive(Debug)]
pub enum ParseError {
    UnknownCommand(String),
    UnknownSegment(String),
    MissingArgument(String),
    InvalidIndex(String),
    /// `pop constant` has no meaning: a literal is not a storage location.
    PopConstant,
    IndexOutOfRange(String),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownCommand(line) => write!(f, "unknown command: {line}"),
            Self::UnknownSegment(name) => write!(f, "unknown segment: {name}"),
            Self::MissingArgument(line) => write!(f, "missing argument: {line}"),
            Self::InvalidIndex(line) => write!(f, "invalid numeric argument: {line}"),
            Self::PopConstant => f.write_str("pop constant is illegal"),
            Self::IndexOutOfRange(line) => write!(f, "segment index out of range: {line}"),
        }
    }
}

/// Sequential reader over the command stream of one source file.
pub struct Parser {
    lines: Vec<String>,
    cursor: usize,
}

impl Parser {
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        let lines = source
            .lines()
            .map(|line| match line.find("//") {
                Some(pos) => &line[..pos],
                None => line,
            })
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { lines, cursor: 0 }
    }

    #[inline]
    #[must_use]
    pub fn has_more_commands(&self) -> bool {
        self.cursor < self.lines.len()
    }

    /// Parses the next command. Call only while
    /// [`has_more_commands`](Self::has_more_commands) is true.
    pub fn advance(&mut self) -> Result<Command, ParseError> {
        let line = &self.lines[self.cursor];
        self.cursor += 1;
        parse_line(line)
    }
}

fn parse_line(line: &str) -> Result<Command, ParseError> {
    let mut parts = line.split_whitespace();
    let mnemonic = parts.next().unwrap_or_default();

    match mnemonic {
        "push" | "pop" => {
            let segment_name = next_arg(&mut parts, line)?;
            let segment = Segment::parse(segment_name)
                .ok_or_else(|| ParseError::UnknownSegment(segment_name.to_string()))?;
            let index = next_index(&mut parts, line)?;
            check_segment_index(segment, index, line)?;
            if mnemonic == "push" {
                Ok(Command::Push(segment, index))
            } else if segment == Segment::Constant {
                Err(ParseError::PopConstant)
            } else {
                Ok(Command::Pop(segment, index))
            }
        }
        "label" => Ok(Command::Label(next_arg(&mut parts, line)?.to_string())),
        "goto" => Ok(Command::Goto(next_arg(&mut parts, line)?.to_string())),
        "if-goto" => Ok(Command::IfGoto(next_arg(&mut parts, line)?.to_string())),
        "function" => {
            let name = next_arg(&mut parts, line)?.to_string();
            let n_locals = next_index(&mut parts, line)?;
            Ok(Command::Function(name, n_locals))
        }
        "call" => {
            let name = next_arg(&mut parts, line)?.to_string();
            let n_args = next_index(&mut parts, line)?;
            Ok(Command::Call(name, n_args))
        }
        "return" => Ok(Command::Return),
        other => ArithmeticOp::parse(other)
            .map(Command::Arithmetic)
            .ok_or_else(|| ParseError::UnknownCommand(line.to_string())),
    }
}

fn next_arg<'a>(
    parts: &mut std::str::SplitWhitespace<'a>,
    line: &str,
) -> Result<&'a str, ParseError> {
    parts
        .next()
        .ok_or_else(|| ParseError::MissingArgument(line.to_string()))
}

fn next_index(parts: &mut std::str::SplitWhitespace, line: &str) -> Result<u16, ParseError> {
    next_arg(parts, line)?
        .parse()
        .map_err(|_| ParseError::InvalidIndex(line.to_string()))
}

/// Bounds from the segment table: `pointer` addresses two cells, `temp`
/// eight, and a pushed constant must fit an A-instruction literal.
fn check_segment_index(segment: Segment, index: u16, line: &str) -> Result<(), ParseError> {
    let in_range = match segment {
        Segment::Pointer => index <= 1,
        Segment::Temp => index <= 7,
        Segment::Constant => index <= 32767,
        _ => true,
    };
    if in_range {
        Ok(())
    } else {
        Err(ParseError::IndexOutOfRange(line.to_string()))
    }
}
