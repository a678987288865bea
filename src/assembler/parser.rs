//! Classification of assembly lines.

use crate::error::{Error, ErrorKind};
use crate::Result;

/// One line of assembly, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Instruction {
    /// `@value` — load an address or constant into A.
    A(String),
    /// `dest=comp;jump` — compute, with optional store and jump.
    C {
        dest: String,
        comp: String,
        jump: String,
    },
    /// `(Name)` — names a code location; emits no instruction.
    Label(String),
}

/// Classifies one line. Blank lines and `//` comments yield `None`.
pub(super) fn parse_line(line: &str) -> Result<Option<Instruction>> {
    let text = match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let instruction = if let Some(value) = text.strip_prefix('@') {
        Instruction::A(value.to_string())
    } else if let Some(rest) = text.strip_prefix('(') {
        match rest.strip_suffix(')') {
            Some(name) => Instruction::Label(name.to_string()),
            None => return Err(Error::new(ErrorKind::BadInstruction(text.to_string()))),
        }
    } else {
        let (dest, rest) = match text.split_once('=') {
            Some((dest, rest)) => (dest, rest),
            None => ("", text),
        };
        let (comp, jump) = match rest.split_once(';') {
            Some((comp, jump)) => (comp, jump),
            None => (rest, ""),
        };
        Instruction::C {
            dest: dest.to_string(),
            comp: comp.to_string(),
            jump: jump.to_string(),
        }
    };
    Ok(Some(instruction))
}
