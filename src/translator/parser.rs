//! Line-oriented parsing of bytecode commands.

use std::str::SplitWhitespace;

use crate::error::{Error, ErrorKind};
use crate::Result;

/// One bytecode command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Command {
    Arithmetic(ArithOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    If(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

/// The nine arithmetic-logic instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithOp {
    pub(super) fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Neg => "neg",
            ArithOp::Eq => "eq",
            ArithOp::Gt => "gt",
            ArithOp::Lt => "lt",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Not => "not",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
}

impl Segment {
    pub(super) fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Static => "static",
        }
    }
}

/// Parses one line of bytecode. Blank lines and `//` comments yield
/// `None`.
pub(super) fn parse_line(line: &str) -> Result<Option<Command>> {
    let text = match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    };
    let mut fields = text.split_whitespace();
    let head = match fields.next() {
        Some(head) => head,
        None => return Ok(None),
    };

    let command = match head {
        "add" => Command::Arithmetic(ArithOp::Add),
        "sub" => Command::Arithmetic(ArithOp::Sub),
        "neg" => Command::Arithmetic(ArithOp::Neg),
        "eq" => Command::Arithmetic(ArithOp::Eq),
        "gt" => Command::Arithmetic(ArithOp::Gt),
        "lt" => Command::Arithmetic(ArithOp::Lt),
        "and" => Command::Arithmetic(ArithOp::And),
        "or" => Command::Arithmetic(ArithOp::Or),
        "not" => Command::Arithmetic(ArithOp::Not),
        "push" => {
            let segment = segment(field(&mut fields, line)?, line)?;
            Command::Push(segment, index(&mut fields, line)?)
        }
        "pop" => {
            let segment = segment(field(&mut fields, line)?, line)?;
            if segment == Segment::Constant {
                // A constant has no address to store into.
                return Err(bad(line));
            }
            Command::Pop(segment, index(&mut fields, line)?)
        }
        "label" => Command::Label(field(&mut fields, line)?.to_string()),
        "goto" => Command::Goto(field(&mut fields, line)?.to_string()),
        "if-goto" => Command::If(field(&mut fields, line)?.to_string()),
        "function" => {
            let name = field(&mut fields, line)?.to_string();
            Command::Function(name, index(&mut fields, line)?)
        }
        "call" => {
            let name = field(&mut fields, line)?.to_string();
            Command::Call(name, index(&mut fields, line)?)
        }
        "return" => Command::Return,
        _ => return Err(bad(line)),
    };
    Ok(Some(command))
}

fn bad(line: &str) -> Error {
    Error::new(ErrorKind::BadCommand(line.trim().to_string()))
}

fn field<'a>(fields: &mut SplitWhitespace<'a>, line: &str) -> Result<&'a str> {
    fields.next().ok_or_else(|| bad(line))
}

fn index(fields: &mut SplitWhitespace<'_>, line: &str) -> Result<u16> {
    field(fields, line)?.parse().map_err(|_| bad(line))
}

fn segment(text: &str, line: &str) -> Result<Segment> {
    let segment = match text {
        "constant" => Segment::Constant,
        "local" => Segment::Local,
        "argument" => Segment::Argument,
        "this" => Segment::This,
        "that" => Segment::That,
        "temp" => Segment::Temp,
        "pointer" => Segment::Pointer,
        "static" => Segment::Static,
        _ => return Err(bad(line)),
    };
    Ok(segment)
}
