//! Two-pass assembly of Hack assembly text into binary machine code.
//!
//! The first pass records the address of every `(Label)`; the second
//! encodes each instruction as a 16-character binary line, allocating RAM
//! addresses from 16 upward for variables on first use.

mod code;
mod parser;
mod symbols;

use std::io::Write;

use crate::error::{Error, ErrorKind};
use crate::Result;

use parser::Instruction;
use symbols::SymbolTable;

/// Assembles one unit, writing one 16-character binary line per
/// instruction to `out`.
pub fn assemble(source: &str, mut out: impl Write) -> Result<()> {
    let mut instructions = Vec::new();
    for (number, line) in source.lines().enumerate() {
        match parser::parse_line(line) {
            Ok(Some(instruction)) => instructions.push(instruction),
            Ok(None) => (),
            Err(err) => return Err(err.with_line(number + 1)),
        }
    }

    // First pass: labels name the address of the next instruction.
    let mut table = SymbolTable::new();
    let mut address: u16 = 0;
    for instruction in &instructions {
        match instruction {
            Instruction::Label(name) => table.add_entry(name, address),
            _ => address += 1,
        }
    }

    // Second pass: encode.
    for instruction in &instructions {
        match instruction {
            Instruction::Label(_) => (),
            Instruction::A(value) => {
                let target = match value.parse::<u16>() {
                    Ok(number) => number,
                    Err(_) => table.resolve(value),
                };
                writeln!(out, "{:016b}", target)?;
            }
            Instruction::C { dest, comp, jump } => {
                let comp_bits = code::comp(comp).ok_or_else(|| bad_field(comp))?;
                let dest_bits = code::dest(dest).ok_or_else(|| bad_field(dest))?;
                let jump_bits = code::jump(jump).ok_or_else(|| bad_field(jump))?;
                writeln!(out, "111{}{}{}", comp_bits, dest_bits, jump_bits)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn bad_field(text: &str) -> Error {
    Error::new(ErrorKind::BadInstruction(text.to_string()))
}
