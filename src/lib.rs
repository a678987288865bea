//! A toolchain for the Hack teaching computer: a compiler from the Jack
//! language to stack-machine bytecode, a translator from bytecode to Hack
//! assembly, and an assembler producing binary machine code.
//!
//! Each stage is a plain text-to-text transformation; the stages are
//! coupled only through the bytecode and assembly formats they read and
//! write.

#![warn(future_incompatible)]
#![warn(non_ascii_idents)]
#![warn(rust_2018_idioms)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused)]

pub mod assembler;
pub mod compiler;
mod error;
pub mod translator;

pub use error::{Error, ErrorKind};

/// Custom result type for every stage of the toolchain.
pub type Result<T> = std::result::Result<T, Error>;
