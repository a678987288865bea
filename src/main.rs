use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hackc::translator::Translator;
use hackc::{assembler, compiler, Result};

/// The Hack platform toolchain.
#[derive(Parser)]
#[command(name = "hackc", version)]
#[command(about = "Jack compiler, bytecode translator and assembler for the Hack platform")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .jack file, or every .jack file in a directory, each to
    /// a sibling .vm file
    Compile { path: PathBuf },
    /// Translate a .vm file, or every .vm file in a directory, into one
    /// .asm artifact
    Translate { path: PathBuf },
    /// Assemble a .asm file into a .hack binary image
    Assemble { path: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compile { path } => compile_path(&path),
        Command::Translate { path } => translate_path(&path),
        Command::Assemble { path } => assemble_path(&path),
    };
    if let Err(e) = result {
        eprintln!("{}", e);
        exit(1);
    }
}

fn compile_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        for source in sources_in(path, "jack")? {
            compile_file(&source)?;
        }
        Ok(())
    } else {
        compile_file(path)
    }
}

fn compile_file(path: &Path) -> Result<()> {
    info!(path = %path.display(), "compiling");
    let source = fs::read_to_string(path)?;
    let out = BufWriter::new(File::create(path.with_extension("vm"))?);
    compiler::compile(&source, out)
}

fn translate_path(path: &Path) -> Result<()> {
    let sources = if path.is_dir() {
        sources_in(path, "vm")?
    } else {
        vec![path.to_path_buf()]
    };
    let out = BufWriter::new(File::create(path.with_extension("asm"))?);
    let mut translator = Translator::new(out)?;
    for source in &sources {
        info!(path = %source.display(), "translating");
        let namespace = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        translator.translate(&namespace, &fs::read_to_string(source)?)?;
    }
    translator.finish()
}

fn assemble_path(path: &Path) -> Result<()> {
    info!(path = %path.display(), "assembling");
    let source = fs::read_to_string(path)?;
    let out = BufWriter::new(File::create(path.with_extension("hack"))?);
    assembler::assemble(&source, out)
}

/// All files in `dir` with the given extension, in name order so a
/// directory's units always process deterministically.
fn sources_in(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
