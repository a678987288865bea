use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error as ThisError;

/// An error raised by any stage of the toolchain.
///
/// Every error is fatal for the unit being processed: a unit either
/// produces a complete artifact or no usable artifact at all.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    line: Option<usize>,
}

/// The kinds of failure the three stages can report.
#[derive(Debug, ThisError)]
pub enum ErrorKind {
    /// A string constant was not closed before the end of its line.
    #[error("unclosed string constant")]
    UnclosedString,
    /// A character outside the language's alphabet was read.
    #[error("invalid character `{0}`")]
    InvalidCharacter(char),
    /// Integer constants must fit in 0..=32767.
    #[error("integer constant `{0}` out of range")]
    IntOutOfRange(String),
    /// The grammar required a different token at this point.
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    /// The input ended while a production was still open.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// An identifier was used without a declaration in either scope.
    #[error("`{0}` is not defined")]
    Undeclared(String),
    /// A recognized construct with no code generation rule.
    #[error("unsupported construct `{0}`")]
    Unsupported(String),
    /// A bytecode line the translator cannot parse.
    #[error("malformed bytecode command `{0}`")]
    BadCommand(String),
    /// An assembly line or field the assembler cannot encode.
    #[error("malformed instruction `{0}`")]
    BadInstruction(String),
    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Error { kind, line: None }
    }

    pub(crate) fn at_line(kind: ErrorKind, line: usize) -> Self {
        Error {
            kind,
            line: Some(line),
        }
    }

    /// Attaches a 1-based source line number, unless one is already set.
    pub(crate) fn with_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The 1-based source line the error was raised at, where known.
    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(ErrorKind::Io(err))
    }
}
