//! Emission of Hack assembly for bytecode commands.

use std::io::Write;

use crate::Result;

use super::parser::{ArithOp, Command, Segment};

/// Writes the assembly for each bytecode command, preceded by a comment
/// line carrying the command itself.
///
/// The writer is stateful: comparison branch labels and return-address
/// labels are numbered per writer, flow-control labels are scoped to the
/// current function, and static references are namespaced per unit via
/// [`set_namespace`](CodeWriter::set_namespace).
#[derive(Debug)]
pub(super) struct CodeWriter<W: Write> {
    out: W,
    /// Qualifies `static` references; the current unit's file stem.
    namespace: String,
    /// The most recent `function` name; scopes labels and return labels.
    function: String,
    cmp_count: u32,
    ret_count: u32,
}

impl<W: Write> CodeWriter<W> {
    pub(super) fn new(out: W) -> Self {
        CodeWriter {
            out,
            namespace: String::new(),
            function: String::new(),
            cmp_count: 0,
            ret_count: 0,
        }
    }

    pub(super) fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }

    /// `SP = 256`, then transfer control to `Sys.init`.
    pub(super) fn write_bootstrap(&mut self) -> Result<()> {
        writeln!(self.out, "// bootstrap")?;
        writeln!(self.out, "@256")?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=D")?;
        self.write_call("Sys.init", 0)
    }

    pub(super) fn write_command(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Arithmetic(op) => self.write_arithmetic(*op),
            Command::Push(segment, index) => self.write_push(*segment, *index),
            Command::Pop(segment, index) => self.write_pop(*segment, *index),
            Command::Label(name) => self.write_label(name),
            Command::Goto(name) => self.write_goto(name),
            Command::If(name) => self.write_if(name),
            Command::Function(name, locals) => self.write_function(name, *locals),
            Command::Call(name, args) => self.write_call(name, *args),
            Command::Return => self.write_return(),
        }
    }

    /// Pushes D onto the stack.
    fn push_d(&mut self) -> Result<()> {
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=M+1")?;
        Ok(())
    }

    /// Pops the top of the stack into D.
    fn pop_d(&mut self) -> Result<()> {
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=M-1")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "D=M")?;
        Ok(())
    }

    fn write_arithmetic(&mut self, op: ArithOp) -> Result<()> {
        writeln!(self.out, "// {}", op.name())?;
        match op {
            // Unary operations rewrite the top of the stack in place.
            ArithOp::Neg | ArithOp::Not => {
                let compute = if op == ArithOp::Neg { "M=-M" } else { "M=!M" };
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "A=M-1")?;
                writeln!(self.out, "{}", compute)?;
            }
            ArithOp::Add | ArithOp::Sub | ArithOp::And | ArithOp::Or => {
                let compute = match op {
                    ArithOp::Add => "M=M+D",
                    ArithOp::Sub => "M=M-D",
                    ArithOp::And => "M=M&D",
                    _ => "M=M|D",
                };
                self.pop_d()?;
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "A=M-1")?;
                writeln!(self.out, "{}", compute)?;
            }
            // Comparisons select -1 (true) or 0 (false).
            ArithOp::Eq | ArithOp::Gt | ArithOp::Lt => {
                let jump = match op {
                    ArithOp::Eq => "D;JEQ",
                    ArithOp::Gt => "D;JGT",
                    _ => "D;JLT",
                };
                self.pop_d()?;
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "A=M-1")?;
                writeln!(self.out, "D=M-D")?;
                writeln!(self.out, "M=-1")?;
                writeln!(self.out, "@END{}", self.cmp_count)?;
                writeln!(self.out, "{}", jump)?;
                writeln!(self.out, "@SP")?;
                writeln!(self.out, "A=M-1")?;
                writeln!(self.out, "M=0")?;
                writeln!(self.out, "(END{})", self.cmp_count)?;
                self.cmp_count += 1;
            }
        }
        Ok(())
    }

    /// Leaves the target address of a non-constant segment reference in A.
    fn load_address(&mut self, segment: Segment, index: u16) -> Result<()> {
        match segment {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let base = match segment {
                    Segment::Local => "LCL",
                    Segment::Argument => "ARG",
                    Segment::This => "THIS",
                    _ => "THAT",
                };
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", base)?;
                writeln!(self.out, "A=M+D")?;
            }
            Segment::Temp => writeln!(self.out, "@{}", 5 + index)?,
            Segment::Pointer => writeln!(self.out, "@{}", 3 + index)?,
            Segment::Static => writeln!(self.out, "@{}.{}", self.namespace, index)?,
            Segment::Constant => unreachable!("constant segment has no address"),
        }
        Ok(())
    }

    fn write_push(&mut self, segment: Segment, index: u16) -> Result<()> {
        writeln!(self.out, "// push {} {}", segment.name(), index)?;
        match segment {
            Segment::Constant => {
                writeln!(self.out, "@{}", index)?;
                writeln!(self.out, "D=A")?;
            }
            _ => {
                self.load_address(segment, index)?;
                writeln!(self.out, "D=M")?;
            }
        }
        self.push_d()
    }

    fn write_pop(&mut self, segment: Segment, index: u16) -> Result<()> {
        writeln!(self.out, "// pop {} {}", segment.name(), index)?;
        // Park the target address in R15 while the value is popped.
        self.load_address(segment, index)?;
        writeln!(self.out, "D=A")?;
        writeln!(self.out, "@R15")?;
        writeln!(self.out, "M=D")?;
        self.pop_d()?;
        writeln!(self.out, "@R15")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        Ok(())
    }

    fn write_label(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// label {}", label)?;
        writeln!(self.out, "({}${})", self.function, label)?;
        Ok(())
    }

    fn write_goto(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// goto {}", label)?;
        writeln!(self.out, "@{}${}", self.function, label)?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    /// Pops the condition and jumps when it is nonzero.
    fn write_if(&mut self, label: &str) -> Result<()> {
        writeln!(self.out, "// if-goto {}", label)?;
        self.pop_d()?;
        writeln!(self.out, "@{}${}", self.function, label)?;
        writeln!(self.out, "D;JNE")?;
        Ok(())
    }

    fn write_function(&mut self, name: &str, locals: u16) -> Result<()> {
        self.function = name.to_string();
        self.ret_count = 0;
        writeln!(self.out, "// function {} {}", name, locals)?;
        writeln!(self.out, "({})", name)?;
        for _ in 0..locals {
            writeln!(self.out, "@0")?;
            writeln!(self.out, "D=A")?;
            self.push_d()?;
        }
        Ok(())
    }

    fn write_call(&mut self, name: &str, args: u16) -> Result<()> {
        let ret_label = format!("{}$ret.{}", self.function, self.ret_count);
        self.ret_count += 1;
        writeln!(self.out, "// call {} {}", name, args)?;
        // Save the return address and the caller's frame.
        writeln!(self.out, "@{}", ret_label)?;
        writeln!(self.out, "D=A")?;
        self.push_d()?;
        for base in ["LCL", "ARG", "THIS", "THAT"] {
            writeln!(self.out, "@{}", base)?;
            writeln!(self.out, "D=M")?;
            self.push_d()?;
        }
        // ARG = SP - 5 - args
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@{}", 5 + args)?;
        writeln!(self.out, "D=D-A")?;
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "M=D")?;
        // LCL = SP
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@LCL")?;
        writeln!(self.out, "M=D")?;
        writeln!(self.out, "@{}", name)?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({})", ret_label)?;
        Ok(())
    }

    fn write_return(&mut self) -> Result<()> {
        writeln!(self.out, "// return")?;
        // R13 = frame (LCL)
        writeln!(self.out, "@LCL")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R13")?;
        writeln!(self.out, "M=D")?;
        // R14 = return address = *(frame - 5); fetched before the result
        // overwrites the argument area when args == 0.
        writeln!(self.out, "@5")?;
        writeln!(self.out, "A=D-A")?;
        writeln!(self.out, "D=M")?;
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "M=D")?;
        // *ARG = pop()
        self.pop_d()?;
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "M=D")?;
        // SP = ARG + 1
        writeln!(self.out, "@ARG")?;
        writeln!(self.out, "D=M+1")?;
        writeln!(self.out, "@SP")?;
        writeln!(self.out, "M=D")?;
        // Restore the caller's frame, walking down from frame - 1.
        for base in ["THAT", "THIS", "ARG", "LCL"] {
            writeln!(self.out, "@R13")?;
            writeln!(self.out, "M=M-1")?;
            writeln!(self.out, "A=M")?;
            writeln!(self.out, "D=M")?;
            writeln!(self.out, "@{}", base)?;
            writeln!(self.out, "M=D")?;
        }
        writeln!(self.out, "@R14")?;
        writeln!(self.out, "A=M")?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    pub(super) fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
