//! Recursive-descent compilation of Jack classes into VM commands.
//!
//! Parsing and code generation are fused: each grammar rule emits its VM
//! commands as it is recognized. One token of lookahead is enough
//! everywhere; the only place it is needed is term disambiguation, where
//! an identifier may start a variable, an array entry, or a subroutine
//! call.

use std::io::Write;

use crate::symbol_table::{Entry, Kind, SymbolTable};
use crate::tokenizer::{Keyword, Token, Tokenizer};
use crate::vm_writer::{Arithmetic, Segment, VmWriter};
use crate::CompileError;

pub struct CompilationEngine<W: Write> {
    tokenizer: Tokenizer,
    table: SymbolTable,
    writer: VmWriter<W>,
    class_name: String,
    if_counter: u16,
    while_counter: u16,
}

impl<W: Write> CompilationEngine<W> {
    pub fn new(tokenizer: Tokenizer, writer: W) -> Self {
        Self {
            tokenizer,
            table: SymbolTable::new(),
            writer: VmWriter::new(writer),
            class_name: String::new(),
            if_counter: 0,
            while_counter: 0,
        }
    }

    /// Compiles the single class of one source file.
    pub fn compile_class(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.take_identifier()?;
        self.expect_symbol('{')?;

        while matches!(
            self.tokenizer.current(),
            Some(Token::Keyword(Keyword::Static | Keyword::Field))
        ) {
            self.compile_class_var_dec()?;
        }
        while matches!(
            self.tokenizer.current(),
            Some(Token::Keyword(
                Keyword::Constructor | Keyword::Function | Keyword::Method
            ))
        ) {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;
        self.writer.flush()?;
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind = match self.take()? {
            Token::Keyword(Keyword::Static) => Kind::Static,
            Token::Keyword(Keyword::Field) => Kind::Field,
            other => return Err(unexpected(&other)),
        };
        let type_name = self.take_type()?;

        loop {
            let name = self.take_identifier()?;
            self.table.define(&name, &type_name, kind);
            if self.current_symbol() == Some(',') {
                self.tokenizer.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(';')
    }

    fn compile_subroutine(&mut self) -> Result<(), CompileError> {
        let subroutine_kind = match self.take()? {
            Token::Keyword(
                k @ (Keyword::Constructor | Keyword::Function | Keyword::Method),
            ) => k,
            other => return Err(unexpected(&other)),
        };
        self.take()?; // return type, unused by code generation
        let name = self.take_identifier()?;

        self.table.start_subroutine();
        self.if_counter = 0;
        self.while_counter = 0;
        if subroutine_kind == Keyword::Method {
            // The receiver arrives as the implicit argument 0.
            let class_name = self.class_name.clone();
            self.table.define("this", &class_name, Kind::Arg);
        }

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        self.expect_symbol('{')?;
        while matches!(self.tokenizer.current(), Some(Token::Keyword(Keyword::Var))) {
            self.compile_var_dec()?;
        }

        let function_name = format!("{}.{name}", self.class_name);
        self.writer
            .write_function(&function_name, self.table.var_count(Kind::Var))?;

        match subroutine_kind {
            Keyword::Constructor => {
                let n_fields = self.table.var_count(Kind::Field);
                self.writer.write_push(Segment::Constant, n_fields)?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')
    }

    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.current_symbol() == Some(')') {
            return Ok(());
        }
        loop {
            let type_name = self.take_type()?;
            let name = self.take_identifier()?;
            self.table.define(&name, &type_name, Kind::Arg);
            if self.current_symbol() == Some(',') {
                self.tokenizer.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Var)?;
        let type_name = self.take_type()?;

        loop {
            let name = self.take_identifier()?;
            self.table.define(&name, &type_name, Kind::Var);
            if self.current_symbol() == Some(',') {
                self.tokenizer.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(';')
    }

    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            match self.tokenizer.current() {
                Some(Token::Keyword(Keyword::Let)) => self.compile_let()?,
                Some(Token::Keyword(Keyword::If)) => self.compile_if()?,
                Some(Token::Keyword(Keyword::While)) => self.compile_while()?,
                Some(Token::Keyword(Keyword::Do)) => self.compile_do()?,
                Some(Token::Keyword(Keyword::Return)) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.take_identifier()?;
        let entry = self.resolve(&name)?;
        let (segment, index) = (entry.kind.segment(), entry.index);

        if self.current_symbol() == Some('[') {
            self.expect_symbol('[')?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_push(segment, index)?;
            self.writer.write_arithmetic(Arithmetic::Add)?;

            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;

            // The right side may itself read an array through THAT, so
            // the target address is anchored only after it has run.
            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            self.writer.write_pop(segment, index)?;
        }
        Ok(())
    }

    fn compile_if(&mut self) -> Result<(), CompileError> {
        // Capture the counter before recursing so nested statements
        // renumber themselves without moving these labels.
        let label_index = self.if_counter;
        self.if_counter += 1;
        let false_label = format!("IF_FALSE_{label_index}");
        let end_label = format!("IF_END_{label_index}");

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(Arithmetic::Not)?;
        self.writer.write_if(&false_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        if matches!(self.tokenizer.current(), Some(Token::Keyword(Keyword::Else))) {
            self.writer.write_goto(&end_label)?;
            self.writer.write_label(&false_label)?;
            self.tokenizer.advance();
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
            self.writer.write_label(&end_label)?;
        } else {
            self.writer.write_label(&false_label)?;
        }
        Ok(())
    }

    fn compile_while(&mut self) -> Result<(), CompileError> {
        let label_index = self.while_counter;
        self.while_counter += 1;
        let start_label = format!("WHILE_START_{label_index}");
        let end_label = format!("WHILE_END_{label_index}");

        self.writer.write_label(&start_label)?;
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(Arithmetic::Not)?;
        self.writer.write_if(&end_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&start_label)?;
        self.writer.write_label(&end_label)?;
        Ok(())
    }

    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Do)?;
        self.compile_subroutine_call()?;
        self.expect_symbol(';')?;
        // A call always leaves a value; do-statements discard it.
        self.writer.write_pop(Segment::Temp, 0)?;
        Ok(())
    }

    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Return)?;
        if self.current_symbol() == Some(';') {
            // Void subroutines still return a word.
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.writer.write_return()?;
        Ok(())
    }

    /// expression: term (op term)*. Operators are left-associative with
    /// no precedence, so each one is emitted right after its second
    /// operand.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;

        while let Some(op) = self
            .current_symbol()
            .filter(|c| matches!(c, '+' | '-' | '*' | '/' | '&' | '|' | '<' | '>' | '='))
        {
            self.tokenizer.advance();
            self.compile_term()?;
            match op {
                '+' => self.writer.write_arithmetic(Arithmetic::Add)?,
                '-' => self.writer.write_arithmetic(Arithmetic::Sub)?,
                '&' => self.writer.write_arithmetic(Arithmetic::And)?,
                '|' => self.writer.write_arithmetic(Arithmetic::Or)?,
                '<' => self.writer.write_arithmetic(Arithmetic::Lt)?,
                '>' => self.writer.write_arithmetic(Arithmetic::Gt)?,
                '=' => self.writer.write_arithmetic(Arithmetic::Eq)?,
                '*' => self.writer.write_call("Math.multiply", 2)?,
                _ => self.writer.write_call("Math.divide", 2)?,
            }
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        let token = self
            .tokenizer
            .current()
            .cloned()
            .ok_or(CompileError::UnexpectedEnd)?;

        match token {
            Token::IntConst(value) => {
                self.tokenizer.advance();
                self.writer.write_push(Segment::Constant, value)?;
            }
            Token::StringConst(text) => {
                self.tokenizer.advance();
                self.compile_string_constant(&text)?;
            }
            Token::Keyword(Keyword::True) => {
                self.tokenizer.advance();
                self.writer.write_push(Segment::Constant, 0)?;
                self.writer.write_arithmetic(Arithmetic::Not)?;
            }
            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.tokenizer.advance();
                self.writer.write_push(Segment::Constant, 0)?;
            }
            Token::Keyword(Keyword::This) => {
                self.tokenizer.advance();
                self.writer.write_push(Segment::Pointer, 0)?;
            }
            Token::Symbol('(') => {
                self.tokenizer.advance();
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Token::Symbol(op @ ('-' | '~' | '^' | '#')) => {
                self.tokenizer.advance();
                self.compile_term()?;
                let command = match op {
                    '-' => Arithmetic::Neg,
                    '~' => Arithmetic::Not,
                    '^' => Arithmetic::ShiftLeft,
                    _ => Arithmetic::ShiftRight,
                };
                self.writer.write_arithmetic(command)?;
            }
            Token::Identifier(name) => match self.tokenizer.peek(1) {
                Some(Token::Symbol('[')) => {
                    self.tokenizer.advance();
                    self.expect_symbol('[')?;
                    self.compile_expression()?;
                    self.expect_symbol(']')?;

                    let entry = self.resolve(&name)?;
                    self.writer.write_push(entry.kind.segment(), entry.index)?;
                    self.writer.write_arithmetic(Arithmetic::Add)?;
                    self.writer.write_pop(Segment::Pointer, 1)?;
                    self.writer.write_push(Segment::That, 0)?;
                }
                Some(Token::Symbol('(' | '.')) => self.compile_subroutine_call()?,
                _ => {
                    self.tokenizer.advance();
                    let entry = self.resolve(&name)?;
                    self.writer.write_push(entry.kind.segment(), entry.index)?;
                }
            },
            other => return Err(unexpected(&other)),
        }
        Ok(())
    }

    /// subroutineCall, starting at its leading identifier. Three shapes:
    /// `f(...)` is a method on the current object, `var.f(...)` a method
    /// on a variable, `Class.f(...)` a static call.
    fn compile_subroutine_call(&mut self) -> Result<(), CompileError> {
        let first = self.take_identifier()?;

        let (callee, has_receiver) = if self.current_symbol() == Some('.') {
            self.tokenizer.advance();
            let method = self.take_identifier()?;
            match self.table.lookup(&first).cloned() {
                Some(entry) => {
                    self.writer.write_push(entry.kind.segment(), entry.index)?;
                    (format!("{}.{method}", entry.type_name), true)
                }
                None => (format!("{first}.{method}"), false),
            }
        } else {
            self.writer.write_push(Segment::Pointer, 0)?;
            (format!("{}.{first}", self.class_name), true)
        };

        self.expect_symbol('(')?;
        let n_args = self.compile_expression_list()?;
        self.expect_symbol(')')?;
        self.writer
            .write_call(&callee, n_args + u16::from(has_receiver))?;
        Ok(())
    }

    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        let mut n_args = 0;
        if self.current_symbol() != Some(')') {
            self.compile_expression()?;
            n_args = 1;
            while self.current_symbol() == Some(',') {
                self.tokenizer.advance();
                self.compile_expression()?;
                n_args += 1;
            }
        }
        Ok(n_args)
    }

    /// A string literal becomes a `String.new` call followed by one
    /// `appendChar` per character.
    fn compile_string_constant(&mut self, text: &str) -> Result<(), CompileError> {
        self.writer
            .write_push(Segment::Constant, text.len() as u16)?;
        self.writer.write_call("String.new", 1)?;
        for c in text.chars() {
            self.writer.write_push(Segment::Constant, c as u16)?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    fn take(&mut self) -> Result<Token, CompileError> {
        let token = self
            .tokenizer
            .current()
            .cloned()
            .ok_or(CompileError::UnexpectedEnd)?;
        self.tokenizer.advance();
        Ok(token)
    }

    fn take_identifier(&mut self) -> Result<String, CompileError> {
        match self.take()? {
            Token::Identifier(name) => Ok(name),
            other => Err(unexpected(&other)),
        }
    }

    /// A type is a primitive keyword or a class name.
    fn take_type(&mut self) -> Result<String, CompileError> {
        match self.take()? {
            Token::Keyword(Keyword::Int) => Ok("int".to_string()),
            Token::Keyword(Keyword::Char) => Ok("char".to_string()),
            Token::Keyword(Keyword::Boolean) => Ok("boolean".to_string()),
            Token::Identifier(name) => Ok(name),
            other => Err(unexpected(&other)),
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), CompileError> {
        match self.take()? {
            Token::Symbol(c) if c == symbol => Ok(()),
            other => Err(CompileError::UnexpectedToken(format!(
                "expected {symbol:?}, found {other:?}"
            ))),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), CompileError> {
        match self.take()? {
            Token::Keyword(k) if k == keyword => Ok(()),
            other => Err(CompileError::UnexpectedToken(format!(
                "expected {keyword:?}, found {other:?}"
            ))),
        }
    }

    fn current_symbol(&self) -> Option<char> {
        match self.tokenizer.current() {
            Some(Token::Symbol(c)) => Some(*c),
            _ => None,
        }
    }

    fn resolve(&self, name: &str) -> Result<Entry, CompileError> {
        self.table
            .lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownVariable(name.to_string()))
    }
}

fn unexpected(token: &Token) -> CompileError {
    CompileError::UnexpectedToken(format!("{token:?}"))
}
