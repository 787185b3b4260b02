//! Two-pass MOS 6502 assembler emitting Commodore-64 `.prg` images.

pub mod addressing_mode;
pub mod assembler;
pub mod error;
pub mod formula;
pub mod literal;
pub mod opcode_table;
pub mod parser;
pub mod symbol_table;
pub mod token;

use std::path::Path;

use log::{debug, info};

pub use error::{Error, Result};
use parser::LineError;
use symbol_table::SymbolTable;

/// Why [`assemble_file`] failed: either the parser collected one or more
/// non-fatal per-line errors across the file set, or assembly aborted on
/// its first fatal error.
pub enum Failure {
    Parse(Vec<LineError>),
    Assembly(Error),
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Failure::Assembly(e)
    }
}

/// Drive the full pipeline for one entry file: parse (with include
/// expansion), then assemble, returning the `.prg` image bytes.
pub fn assemble_file(entry: &Path) -> std::result::Result<Vec<u8>, Failure> {
    let mut symtab = SymbolTable::new();
    let output = parser::parse_file(entry, &mut symtab)?;

    if !output.errors.is_empty() {
        return Err(Failure::Parse(output.errors));
    }

    debug!("tokenized {} line(s) from {}", output.lines.len(), entry.display());
    let bytes = assembler::assemble(&output.lines, &mut symtab)?;
    info!("assembled {} bytes starting at entry {}", bytes.len(), entry.display());
    Ok(bytes)
}
