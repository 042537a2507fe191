//! Emission of Hack assembly for parsed VM commands.
//!
//! The writer is generic over its output stream so tests can capture
//! assembly in memory. Translation state is the current source file stem
//! (static variable mangling), the enclosing function name (label
//! mangling), and two counters that keep every generated label unique:
//! one per comparison site, one per call site within a function.

use std::io::{self, Write};

use crate::parser::{ArithmeticOp, Command, Segment};

// Joins fixed assembly lines into a single write.
macro_rules! write_asm {
    ($writer:expr, $($line:literal)*) => {
        $writer.write_all(concat!($($line, "\n"),*).as_bytes())
    };
}

pub struct CodeWriter<W: Write> {
    writer: W,
    file_stem: String,
    function: Option<String>,
    compare_counter: usize,
    call_counter: usize,
}

impl<W: Write> CodeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            file_stem: String::new(),
            function: None,
            compare_counter: 0,
            call_counter: 0,
        }
    }

    /// Starts the translation of a new source file. Comparison labels are
    /// keyed by the file stem, so the counter restarts per file.
    pub fn set_file_name(&mut self, stem: &str) {
        self.file_stem.clear();
        self.file_stem.push_str(stem);
        self.compare_counter = 0;
    }

    /// Emits the translation of one command, prefixed by the command
    /// itself as an assembly comment.
    pub fn write_command(&mut self, command: &Command) -> io::Result<()> {
        writeln!(self.writer, "// {command}")?;
        match command {
            Command::Arithmetic(op) => self.write_arithmetic(*op),
            Command::Push(segment, index) => self.write_push(*segment, *index),
            Command::Pop(segment, index) => self.write_pop(*segment, *index),
            Command::Label(label) => self.write_label(label),
            Command::Goto(label) => self.write_goto(label),
            Command::IfGoto(label) => self.write_if_goto(label),
            Command::Function(name, n_locals) => self.write_function(name, *n_locals),
            Command::Call(name, n_args) => self.write_call(name, *n_args),
            Command::Return => self.write_return(),
        }
    }

    /// Emits the VM startup sequence: `SP = 256`, then `call Sys.init 0`.
    pub fn write_bootstrap(&mut self) -> io::Result<()> {
        write_asm!(self.writer,
            "// bootstrap"
            "@256"
            "D=A"
            "@SP"
            "M=D"
        )?;
        self.write_call("Sys.init", 0)
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_arithmetic(&mut self, op: ArithmeticOp) -> io::Result<()> {
        match op {
            ArithmeticOp::Add => self.write_binary_op("M=D+M"),
            ArithmeticOp::Sub => self.write_binary_op("M=M-D"),
            ArithmeticOp::And => self.write_binary_op("M=D&M"),
            ArithmeticOp::Or => self.write_binary_op("M=D|M"),
            ArithmeticOp::Neg => self.write_unary_op("M=-M"),
            ArithmeticOp::Not => self.write_unary_op("M=!M"),
            ArithmeticOp::ShiftLeft => self.write_unary_op("M=M<<"),
            ArithmeticOp::ShiftRight => self.write_unary_op("M=M>>"),
            ArithmeticOp::Eq => self.write_comparison("JEQ"),
            ArithmeticOp::Gt => self.write_comparison("JGT"),
            ArithmeticOp::Lt => self.write_comparison("JLT"),
        }
    }

    /// Pops y into D, then combines into x in place at the new stack top.
    fn write_binary_op(&mut self, combine: &str) -> io::Result<()> {
        write!(
            self.writer,
            "@SP\n\
             AM=M-1\n\
             D=M\n\
             A=A-1\n\
             {combine}\n"
        )
    }

    /// Rewrites the stack top in place.
    fn write_unary_op(&mut self, operation: &str) -> io::Result<()> {
        write!(
            self.writer,
            "@SP\n\
             A=M-1\n\
             {operation}\n"
        )
    }

    /// Signed comparison that cannot be fooled by overflow.
    ///
    /// `x - y` wraps when the operands have opposite signs, so the signs
    /// are inspected first: equal signs subtract safely and branch on the
    /// jump condition; opposite signs decide by sign alone (the
    /// nonnegative operand is the greater). True pushes -1, false 0.
    fn write_comparison(&mut self, jump: &str) -> io::Result<()> {
        let key = format!("{}.{}", self.file_stem, self.compare_counter);
        self.compare_counter += 1;

        let x_neg = format!("CMP_X_NEG_{key}");
        let diff_pos = format!("CMP_POS_{key}"); // x >= 0 > y
        let diff_neg = format!("CMP_NEG_{key}"); // x < 0 <= y
        let set = format!("CMP_SET_{key}");
        let push_true = format!("CMP_TRUE_{key}");
        let end = format!("CMP_END_{key}");

        write!(
            self.writer,
            "@SP\n\
             AM=M-1\n\
             D=M\n\
             @R13\n\
             M=D\n\
             @SP\n\
             AM=M-1\n\
             D=M\n\
             @R14\n\
             M=D\n\
             @{x_neg}\n\
             D;JLT\n\
             @R13\n\
             D=M\n\
             @{diff_pos}\n\
             D;JLT\n\
             @R14\n\
             D=M\n\
             @R13\n\
             D=D-M\n\
             @{set}\n\
             0;JMP\n\
             ({x_neg})\n\
             @R13\n\
             D=M\n\
             @{diff_neg}\n\
             D;JGE\n\
             @R14\n\
             D=M\n\
             @R13\n\
             D=D-M\n\
             @{set}\n\
             0;JMP\n\
             ({diff_pos})\n\
             D=1\n\
             @{set}\n\
             0;JMP\n\
             ({diff_neg})\n\
             D=-1\n\
             ({set})\n\
             @{push_true}\n\
             D;{jump}\n\
             @SP\n\
             A=M\n\
             M=0\n\
             @SP\n\
             M=M+1\n\
             @{end}\n\
             0;JMP\n\
             ({push_true})\n\
             @SP\n\
             A=M\n\
             M=-1\n\
             @SP\n\
             M=M+1\n\
             ({end})\n"
        )
    }

    fn write_push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        match segment {
            Segment::Constant => {
                write!(self.writer, "@{index}\nD=A\n")?;
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let symbol = segment.pointer_symbol().unwrap_or_default();
                write!(
                    self.writer,
                    "@{symbol}\n\
                     D=M\n\
                     @{index}\n\
                     A=D+A\n\
                     D=M\n"
                )?;
            }
            Segment::Temp => {
                write!(
                    self.writer,
                    "@5\n\
                     D=A\n\
                     @{index}\n\
                     A=D+A\n\
                     D=M\n"
                )?;
            }
            Segment::Pointer => {
                let symbol = if index == 0 { "THIS" } else { "THAT" };
                write!(self.writer, "@{symbol}\nD=M\n")?;
            }
            Segment::Static => {
                write!(self.writer, "@{}.{index}\nD=M\n", self.file_stem)?;
            }
        }
        self.write_push_d()
    }

    fn write_pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        match segment {
            // The parser rejects pop constant before it gets here.
            Segment::Constant => unreachable!("pop constant is rejected at parse time"),
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let symbol = segment.pointer_symbol().unwrap_or_default();
                // Target address into R13 first; after the pop, D holds the
                // value and no register is left for the address.
                write!(
                    self.writer,
                    "@{symbol}\n\
                     D=M\n\
                     @{index}\n\
                     D=D+A\n\
                     @R13\n\
                     M=D\n"
                )?;
                self.write_pop_to_d()?;
                write_asm!(self.writer,
                    "@R13"
                    "A=M"
                    "M=D"
                )
            }
            Segment::Temp => {
                write!(
                    self.writer,
                    "@5\n\
                     D=A\n\
                     @{index}\n\
                     D=D+A\n\
                     @R13\n\
                     M=D\n"
                )?;
                self.write_pop_to_d()?;
                write_asm!(self.writer,
                    "@R13"
                    "A=M"
                    "M=D"
                )
            }
            Segment::Pointer => {
                let symbol = if index == 0 { "THIS" } else { "THAT" };
                self.write_pop_to_d()?;
                write!(self.writer, "@{symbol}\nM=D\n")
            }
            Segment::Static => {
                self.write_pop_to_d()?;
                write!(self.writer, "@{}.{index}\nM=D\n", self.file_stem)
            }
        }
    }

    fn write_label(&mut self, label: &str) -> io::Result<()> {
        let mangled = self.mangle_label(label);
        writeln!(self.writer, "({mangled})")
    }

    fn write_goto(&mut self, label: &str) -> io::Result<()> {
        let mangled = self.mangle_label(label);
        write!(self.writer, "@{mangled}\n0;JMP\n")
    }

    fn write_if_goto(&mut self, label: &str) -> io::Result<()> {
        let mangled = self.mangle_label(label);
        self.write_pop_to_d()?;
        write!(self.writer, "@{mangled}\nD;JNE\n")
    }

    /// Local labels live in the namespace of their enclosing function;
    /// outside any function the bare name is used.
    fn mangle_label(&self, label: &str) -> String {
        match &self.function {
            Some(function) => format!("{function}${label}"),
            None => label.to_string(),
        }
    }

    /// Declares a function entry point and zero-initializes its locals.
    fn write_function(&mut self, name: &str, n_locals: u16) -> io::Result<()> {
        self.function = Some(name.to_string());
        self.call_counter = 0;
        writeln!(self.writer, "({name})")?;
        for _ in 0..n_locals {
            self.write_push(Segment::Constant, 0)?;
        }
        Ok(())
    }

    /// Emits the calling convention: push the return address and the
    /// caller's four segment pointers, reposition ARG and LCL, transfer
    /// control, then define the return label.
    fn write_call(&mut self, name: &str, n_args: u16) -> io::Result<()> {
        let caller = match &self.function {
            Some(function) => format!("{}.{function}", self.file_stem),
            None if self.file_stem.is_empty() => "Bootstrap".to_string(),
            None => self.file_stem.clone(),
        };
        let return_label = format!("{caller}$ret.{}", self.call_counter);
        self.call_counter += 1;

        write!(self.writer, "@{return_label}\nD=A\n")?;
        self.write_push_d()?;
        for symbol in ["LCL", "ARG", "THIS", "THAT"] {
            write!(self.writer, "@{symbol}\nD=M\n")?;
            self.write_push_d()?;
        }
        write!(
            self.writer,
            "@SP\n\
             D=M\n\
             @{}\n\
             D=D-A\n\
             @ARG\n\
             M=D\n\
             @SP\n\
             D=M\n\
             @LCL\n\
             M=D\n\
             @{name}\n\
             0;JMP\n\
             ({return_label})\n",
            n_args + 5
        )
    }

    /// Emits the frame teardown. The return address is read into R14
    /// before the return value lands in `*ARG`: with zero arguments the
    /// two cells coincide, and writing first would destroy the address.
    fn write_return(&mut self) -> io::Result<()> {
        write_asm!(self.writer,
            "@LCL"
            "D=M"
            "@R13"
            "M=D"
            "@5"
            "A=D-A"
            "D=M"
            "@R14"
            "M=D"
            "@SP"
            "AM=M-1"
            "D=M"
            "@ARG"
            "A=M"
            "M=D"
            "@ARG"
            "D=M+1"
            "@SP"
            "M=D"
            "@R13"
            "AM=M-1"
            "D=M"
            "@THAT"
            "M=D"
            "@R13"
            "AM=M-1"
            "D=M"
            "@THIS"
            "M=D"
            "@R13"
            "AM=M-1"
            "D=M"
            "@ARG"
            "M=D"
            "@R13"
            "AM=M-1"
            "D=M"
            "@LCL"
            "M=D"
            "@R14"
            "A=M"
            "0;JMP"
        )
    }

    fn write_push_d(&mut self) -> io::Result<()> {
        write_asm!(self.writer,
            "@SP"
            "A=M"
            "M=D"
            "@SP"
            "M=M+1"
        )
    }

    fn write_pop_to_d(&mut self) -> io::Result<()> {
        write_asm!(self.writer,
            "@SP"
            "AM=M-1"
            "D=M"
        )
    }
}
