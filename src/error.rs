//! Crate-wide error taxonomy.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single parse or assembly failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(String),

    #[error("unknown opcode: {mnemonic} (mode {mode:?})")]
    UnknownOpcode { mnemonic: String, mode: String },

    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    #[error("symbol redefinition: {0}")]
    SymbolRedefinition(String),

    #[error("invalid addressing mode: {0}")]
    InvalidMode(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("segment overlap at ${addr:04X}")]
    SegmentOverlap { addr: u32 },

    #[error("no start address: first instruction emitted before any .ORG")]
    NoStartAddress,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Error::Syntax(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
