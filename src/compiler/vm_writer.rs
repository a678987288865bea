//! Formatting of abstract stack-machine operations as bytecode text.

use std::io::Write;

use crate::Result;

use super::symbols::Kind;

/// A named region of the stack machine's memory, addressed by a small
/// integer index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

/// Each storage kind occupies a fixed segment at runtime; fields live
/// behind the THIS base pointer.
impl From<Kind> for Segment {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Arg => Segment::Argument,
            Kind::Var => Segment::Local,
        }
    }
}

/// The arithmetic-logic operations of the expression grammar. `Mul` and
/// `Div` have no native instruction and desugar to runtime-library calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Op {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
    Neg,
    Not,
}

/// Writes bytecode instructions, one per line, to an output sink. The
/// writer performs no validation; emitting well-formed programs is the
/// engine's responsibility.
#[derive(Debug)]
pub(super) struct VmWriter<W: Write> {
    out: W,
}

impl<W: Write> VmWriter<W> {
    pub(super) fn new(out: W) -> Self {
        VmWriter { out }
    }

    pub(super) fn write_push(&mut self, segment: Segment, index: u16) -> Result<()> {
        writeln!(self.out, "push {} {}", segment.name(), index)?;
        Ok(())
    }

    pub(super) fn write_pop(&mut self, segment: Segment, index: u16) -> Result<()> {
        writeln!(self.out, "pop {} {}", segment.name(), index)?;
        Ok(())
    }

    pub(super) fn write_arithmetic(&mut self, op: Op) -> Result<()> {
        let name = match op {
            Op::Mul => return self.write_call("Math.multiply", 2),
            Op::Div => return self.write_call("Math.divide", 2),
            Op::Add => "add",
            Op::Sub => "sub",
            Op::And => "and",
            Op::Or => "or",
            Op::Lt => "lt",
            Op::Gt => "gt",
            Op::Eq => "eq",
            Op::Neg => "neg",
            Op::Not => "not",
        };
        writeln!(self.out, "{}", name)?;
        Ok(())
    }

    pub(super) fn write_label(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "label {}", label)?;
        Ok(())
    }

    pub(super) fn write_goto(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "goto {}", label)?;
        Ok(())
    }

    /// Branches if the top of the stack is nonzero, consuming it.
    pub(super) fn write_if(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "if-goto {}", label)?;
        Ok(())
    }

    pub(super) fn write_call(&mut self, name: &str, args: u16) -> Result<()> {
        writeln!(self.out, "call {} {}", name, args)?;
        Ok(())
    }

    pub(super) fn write_function(&mut self, name: &str, locals: u16) -> Result<()> {
        writeln!(self.out, "function {} {}", name, locals)?;
        Ok(())
    }

    pub(super) fn write_return(&mut self) -> Result<()> {
        writeln!(self.out, "return")?;
        Ok(())
    }

    pub(super) fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
