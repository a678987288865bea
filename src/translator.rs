//! Translation of stack-machine bytecode into Hack assembly.
//!
//! The translator implements the calling convention over the machine's
//! flat memory: the working stack grows from RAM[256], segment base
//! pointers live in SP/LCL/ARG/THIS/THAT, and every `call` saves the
//! caller's frame on the stack for `return` to restore.

mod code_writer;
mod parser;

use std::io::Write;

use tracing::trace;

use crate::Result;

use code_writer::CodeWriter;

/// Translates one or more bytecode units into a single assembly artifact.
///
/// Construction writes the bootstrap preamble: `SP = 256` followed by
/// `call Sys.init 0`.
#[derive(Debug)]
pub struct Translator<W: Write> {
    writer: CodeWriter<W>,
}

impl<W: Write> Translator<W> {
    pub fn new(out: W) -> Result<Self> {
        let mut writer = CodeWriter::new(out);
        writer.write_bootstrap()?;
        Ok(Translator { writer })
    }

    /// Translates one unit. `namespace` qualifies the unit's static
    /// variables; by convention it is the source file's stem.
    pub fn translate(&mut self, namespace: &str, source: &str) -> Result<()> {
        self.writer.set_namespace(namespace);
        for (number, line) in source.lines().enumerate() {
            let command = match parser::parse_line(line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => return Err(err.with_line(number + 1)),
            };
            trace!(?command, "translating");
            self.writer.write_command(&command)?;
        }
        Ok(())
    }

    /// Flushes the output artifact.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()
    }
}
