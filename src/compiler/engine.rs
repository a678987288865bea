//! The recursive-descent compilation engine.
//!
//! Each `compile_*` method mirrors one production of the Jack grammar: it
//! advances the token stream past its own production and emits the
//! corresponding bytecode as it goes. There is no syntax tree; parsing
//! order is emission order.

use std::io::Write;

use tracing::debug;

use crate::error::{Error, ErrorKind};
use crate::Result;

use super::lexer::Tokenizer;
use super::symbols::{Kind, SymbolTable};
use super::token::{Keyword, Token};
use super::vm_writer::{Op, Segment, VmWriter};

/// Compiles exactly one class, interleaving grammar recognition, symbol
/// resolution and instruction emission.
pub(super) struct Engine<'a, W: Write> {
    input: Tokenizer<'a>,
    writer: VmWriter<W>,
    class_table: SymbolTable,
    sub_table: SymbolTable,
    class_name: String,
    sub_name: String,
    sub_kind: Keyword,
    /// Branch label counter, reset at subroutine entry.
    branch_count: u32,
}

impl<'a, W: Write> Engine<'a, W> {
    pub(super) fn new(source: &'a str, out: W) -> Result<Self> {
        Ok(Engine {
            input: Tokenizer::new(source)?,
            writer: VmWriter::new(out),
            class_table: SymbolTable::new(),
            sub_table: SymbolTable::new(),
            class_name: String::new(),
            sub_name: String::new(),
            sub_kind: Keyword::Function,
            branch_count: 0,
        })
    }

    // Helper functions

    /// Constructs an error at the current source line.
    fn error(&self, kind: ErrorKind) -> Error {
        Error::at_line(kind, self.input.line())
    }

    fn err_unexpected(&self, token: Token) -> Error {
        self.error(ErrorKind::UnexpectedToken(token.to_string()))
    }

    /// Pulls the next token off the input; reaching the end of the input
    /// mid-production is an error.
    fn next_token(&mut self) -> Result<Token> {
        match self.input.next()? {
            Some(token) => Ok(token),
            None => Err(self.error(ErrorKind::UnexpectedEof)),
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        match self.next_token()? {
            Token::Symbol(c) if c == symbol => Ok(()),
            token => Err(self.err_unexpected(token)),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        match self.next_token()? {
            Token::Keyword(kw) if kw == keyword => Ok(()),
            token => Err(self.err_unexpected(token)),
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Identifier(name) => Ok(name),
            token => Err(self.err_unexpected(token)),
        }
    }

    /// A type is `int`, `char`, `boolean` or a class name.
    fn expect_type(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Keyword(kw @ (Keyword::Int | Keyword::Char | Keyword::Boolean)) => {
                Ok(kw.as_str().to_string())
            }
            Token::Identifier(name) => Ok(name),
            token => Err(self.err_unexpected(token)),
        }
    }

    fn is_symbol(&self, symbol: char) -> bool {
        matches!(self.input.peek(), Some(Token::Symbol(c)) if *c == symbol)
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.input.peek(), Some(Token::Keyword(kw)) if *kw == keyword)
    }

    /// Consumes the next token if it is the given symbol.
    fn try_symbol(&mut self, symbol: char) -> Result<bool> {
        if self.is_symbol(symbol) {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Looks a name up, subroutine scope first so locals and arguments
    /// shadow class members. Returns (kind, declared type, index).
    fn resolve(&self, name: &str) -> Option<(Kind, String, u16)> {
        for table in [&self.sub_table, &self.class_table] {
            if let Some(kind) = table.kind_of(name) {
                let typ = table.type_of(name)?.to_string();
                let index = table.index_of(name)?;
                return Some((kind, typ, index));
            }
        }
        None
    }

    fn push_var(&mut self, name: &str) -> Result<()> {
        let (kind, _, index) = self
            .resolve(name)
            .ok_or_else(|| self.error(ErrorKind::Undeclared(name.to_string())))?;
        self.writer.write_push(Segment::from(kind), index)
    }

    fn pop_var(&mut self, name: &str) -> Result<()> {
        let (kind, _, index) = self
            .resolve(name)
            .ok_or_else(|| self.error(ErrorKind::Undeclared(name.to_string())))?;
        self.writer.write_pop(Segment::from(kind), index)
    }

    fn branch_label(&self, count: u32, suffix: &str) -> String {
        format!(
            "{}.{}$br{}${}",
            self.class_name, self.sub_name, count, suffix
        )
    }

    // Actual compilation

    /// The entry point: compiles the entire class and flushes the output.
    pub(super) fn compile_class(mut self) -> Result<()> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.expect_identifier()?;
        self.expect_symbol('{')?;
        debug!(class = %self.class_name, "compiling class");

        while self.is_keyword(Keyword::Static) || self.is_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.is_keyword(Keyword::Constructor)
            || self.is_keyword(Keyword::Function)
            || self.is_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;
        self.writer.flush()
    }

    /// `static`/`field` declarations; a comma list of names repeats the
    /// definition under one kind and type.
    fn compile_class_var_dec(&mut self) -> Result<()> {
        let kind = match self.next_token()? {
            Token::Keyword(Keyword::Static) => Kind::Static,
            Token::Keyword(Keyword::Field) => Kind::Field,
            token => return Err(self.err_unexpected(token)),
        };
        let typ = self.expect_type()?;
        let name = self.expect_identifier()?;
        self.class_table.define(kind, &typ, &name);
        while self.try_symbol(',')? {
            let name = self.expect_identifier()?;
            self.class_table.define(kind, &typ, &name);
        }
        self.expect_symbol(';')
    }

    fn compile_subroutine(&mut self) -> Result<()> {
        self.sub_table = SymbolTable::new();
        self.sub_kind = match self.next_token()? {
            Token::Keyword(kw @ (Keyword::Constructor | Keyword::Function | Keyword::Method)) => kw,
            token => return Err(self.err_unexpected(token)),
        };
        if self.sub_kind == Keyword::Method {
            // The implicit receiver is always argument 0 of a method.
            let class_name = self.class_name.clone();
            self.sub_table.define(Kind::Arg, &class_name, "this");
        }

        // The return type is consumed but plays no part in codegen.
        match self.next_token()? {
            Token::Keyword(Keyword::Void | Keyword::Int | Keyword::Char | Keyword::Boolean)
            | Token::Identifier(_) => (),
            token => return Err(self.err_unexpected(token)),
        }

        self.sub_name = self.expect_identifier()?;
        self.branch_count = 0;
        debug!(subroutine = %self.sub_name, kind = self.sub_kind.as_str(), "compiling subroutine");

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;
        self.compile_subroutine_body()
    }

    fn compile_parameter_list(&mut self) -> Result<()> {
        if self.is_symbol(')') {
            return Ok(());
        }
        loop {
            let typ = self.expect_type()?;
            let name = self.expect_identifier()?;
            self.sub_table.define(Kind::Arg, &typ, &name);
            if !self.try_symbol(',')? {
                return Ok(());
            }
        }
    }

    /// Locals are declared before the function header is written because
    /// the header carries the local count.
    fn compile_subroutine_body(&mut self) -> Result<()> {
        self.expect_symbol('{')?;
        while self.is_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let name = format!("{}.{}", self.class_name, self.sub_name);
        self.writer
            .write_function(&name, self.sub_table.count(Kind::Var))?;
        match self.sub_kind {
            Keyword::Method => {
                // Bind the receiver to the THIS base pointer.
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Constructor => {
                // Allocate one word per field and bind the new object.
                self.writer
                    .write_push(Segment::Constant, self.class_table.count(Kind::Field))?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => (),
        }

        self.compile_statements()?;
        self.expect_symbol('}')
    }

    fn compile_var_dec(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Var)?;
        let typ = self.expect_type()?;
        let name = self.expect_identifier()?;
        self.sub_table.define(Kind::Var, &typ, &name);
        while self.try_symbol(',')? {
            let name = self.expect_identifier()?;
            self.sub_table.define(Kind::Var, &typ, &name);
        }
        self.expect_symbol(';')
    }

    fn compile_statements(&mut self) -> Result<()> {
        loop {
            match self.input.peek() {
                Some(Token::Keyword(Keyword::Let)) => self.compile_let()?,
                Some(Token::Keyword(Keyword::If)) => self.compile_if()?,
                Some(Token::Keyword(Keyword::While)) => self.compile_while()?,
                Some(Token::Keyword(Keyword::Do)) => self.compile_do()?,
                Some(Token::Keyword(Keyword::Return)) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    fn compile_let(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.expect_identifier()?;
        if self.try_symbol('[')? {
            // The target address must be fixed before the value
            // expression runs.
            self.push_var(&name)?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(Op::Add)?;
            self.expect_symbol('=')?;
            self.compile_expression()?;
            // Stash the value, aim THAT at the address, store through it.
            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.pop_var(&name)?;
        }
        self.expect_symbol(';')
    }

    fn compile_if(&mut self) -> Result<()> {
        let count = self.branch_count;
        self.branch_count += 1;
        let else_label = self.branch_label(count, "IF-ELSE");
        let out_label = self.branch_label(count, "IF-OUT");

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        // Branch to the else arm when the condition is false.
        self.writer.write_arithmetic(Op::Not)?;
        self.writer.write_if(&else_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&out_label)?;

        self.writer.write_label(&else_label)?;
        if self.is_keyword(Keyword::Else) {
            self.next_token()?;
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }
        self.writer.write_label(&out_label)
    }

    fn compile_while(&mut self) -> Result<()> {
        let count = self.branch_count;
        self.branch_count += 1;
        let exp_label = self.branch_label(count, "WHILE-EXP");
        let out_label = self.branch_label(count, "WHILE-OUT");

        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;
        self.writer.write_label(&exp_label)?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic(Op::Not)?;
        self.writer.write_if(&out_label)?;

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&exp_label)?;
        self.writer.write_label(&out_label)
    }

    /// `do call;` — the call's return value is discarded with a dummy pop.
    fn compile_do(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Do)?;
        let name = self.expect_identifier()?;
        self.compile_identifier_term(name)?;
        self.expect_symbol(';')?;
        self.writer.write_pop(Segment::Temp, 0)
    }

    fn compile_return(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Return)?;
        if self.is_symbol(';') {
            // Every subroutine leaves exactly one value for its caller.
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.writer.write_return()?;
        self.expect_symbol(';')
    }

    /// `term (op term)*`. Binary operators are buffered on a side stack
    /// and drained after the last term, most recently parsed first; with
    /// `-` rewritten as `neg`+`add`, the drain composes regardless of
    /// order. Chains of three or more same-precedence operators therefore
    /// group right-to-left.
    fn compile_expression(&mut self) -> Result<()> {
        let mut ops: Vec<Op> = Vec::new();
        self.compile_term()?;
        while let Some(op) = self.peek_binary_op() {
            self.next_token()?;
            match op {
                // `<=` and `>=` arrive as two tokens; fold each into a
                // swapped comparison plus a negation.
                Op::Lt if self.is_symbol('=') => {
                    self.next_token()?;
                    ops.push(Op::Gt);
                    ops.push(Op::Not);
                }
                Op::Gt if self.is_symbol('=') => {
                    self.next_token()?;
                    ops.push(Op::Lt);
                    ops.push(Op::Not);
                }
                op => ops.push(op),
            }
            self.compile_term()?;
        }
        while let Some(op) = ops.pop() {
            if op == Op::Sub {
                // A - B is emitted as A + (-B).
                self.writer.write_arithmetic(Op::Neg)?;
                self.writer.write_arithmetic(Op::Add)?;
            } else {
                self.writer.write_arithmetic(op)?;
            }
        }
        Ok(())
    }

    fn peek_binary_op(&self) -> Option<Op> {
        let c = match self.input.peek() {
            Some(Token::Symbol(c)) => *c,
            _ => return None,
        };
        let op = match c {
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            '&' => Op::And,
            '|' => Op::Or,
            '<' => Op::Lt,
            '>' => Op::Gt,
            '=' => Op::Eq,
            _ => return None,
        };
        Some(op)
    }

    fn compile_term(&mut self) -> Result<()> {
        match self.next_token()? {
            Token::IntConst(value) => self.writer.write_push(Segment::Constant, value),
            Token::StrConst(text) => {
                // A fresh string sized by length, appended one char at a
                // time.
                self.writer
                    .write_push(Segment::Constant, text.len() as u16)?;
                self.writer.write_call("String.new", 1)?;
                for c in text.chars() {
                    self.writer.write_push(Segment::Constant, c as u16)?;
                    self.writer.write_call("String.appendChar", 2)?;
                }
                Ok(())
            }
            Token::Keyword(Keyword::True) => {
                // All ones: 1 negated.
                self.writer.write_push(Segment::Constant, 1)?;
                self.writer.write_arithmetic(Op::Neg)
            }
            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.writer.write_push(Segment::Constant, 0)
            }
            Token::Keyword(Keyword::This) => self.writer.write_push(Segment::Pointer, 0),
            Token::Keyword(keyword) => {
                Err(self.error(ErrorKind::Unsupported(keyword.as_str().to_string())))
            }
            Token::Symbol('(') => {
                self.compile_expression()?;
                self.expect_symbol(')')
            }
            Token::Symbol('-') => {
                self.compile_term()?;
                self.writer.write_arithmetic(Op::Neg)
            }
            Token::Symbol('~') => {
                self.compile_term()?;
                self.writer.write_arithmetic(Op::Not)
            }
            Token::Identifier(name) => self.compile_identifier_term(name),
            token => Err(self.err_unexpected(token)),
        }
    }

    /// An identifier term takes one of four shapes, decided by the token
    /// after it: array element read, call on the current object,
    /// qualified call, or plain variable read.
    fn compile_identifier_term(&mut self, name: String) -> Result<()> {
        if self.try_symbol('[')? {
            self.push_var(&name)?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            // Indirect load through THAT.
            self.writer.write_arithmetic(Op::Add)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::That, 0)
        } else if self.try_symbol('(')? {
            // A method of the current object; the receiver is implicit.
            self.writer.write_push(Segment::Pointer, 0)?;
            let args = self.compile_expression_list()?;
            let target = format!("{}.{}", self.class_name, name);
            self.writer.write_call(&target, args + 1)?;
            self.expect_symbol(')')
        } else if self.try_symbol('.')? {
            let method = self.expect_identifier()?;
            self.expect_symbol('(')?;
            if let Some((kind, typ, index)) = self.resolve(&name) {
                // A declared variable: dispatch on its declared type,
                // with the object as the implicit first argument.
                self.writer.write_push(Segment::from(kind), index)?;
                let args = self.compile_expression_list()?;
                self.writer.write_call(&format!("{}.{}", typ, method), args + 1)?;
            } else {
                // A bare class name: a function or constructor call.
                let args = self.compile_expression_list()?;
                self.writer.write_call(&format!("{}.{}", name, method), args)?;
            }
            self.expect_symbol(')')
        } else {
            self.push_var(&name)
        }
    }

    /// Compiles a comma-separated list of expressions up to the closing
    /// parenthesis (not consumed) and returns how many there were.
    fn compile_expression_list(&mut self) -> Result<u16> {
        let mut args = 0;
        while !self.is_symbol(')') {
            if args > 0 {
                self.expect_symbol(',')?;
            }
            self.compile_expression()?;
            args += 1;
        }
        Ok(args)
    }
}
