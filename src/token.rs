//! Tokenized-line and assembly-line data model.

use crate::addressing_mode::AddressingMode;

/// A symbolic operand reference: either a bare name or a bracketed
/// formula string (still carrying its `[...]` delimiters, which is what
/// distinguishes the two).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicRef {
    Name(String),
    Formula(String),
}

/// One operand: a resolved value, an optional symbolic reference to
/// resolve later, the addressing mode it implies, and — for directives —
/// the literal bytes it expands to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operand {
    pub addr: u32,
    pub symbol: Option<SymbolicRef>,
    pub mode: AddressingMode,
    pub data_bytes: Vec<u8>,
}

impl Operand {
    pub fn implied() -> Self {
        Self {
            mode: AddressingMode::Implied,
            ..Default::default()
        }
    }

    pub fn literal(addr: u32, mode: AddressingMode) -> Self {
        Self {
            addr,
            mode,
            ..Default::default()
        }
    }

    pub fn symbolic(reference: SymbolicRef, mode: AddressingMode) -> Self {
        Self {
            symbol: Some(reference),
            mode,
            ..Default::default()
        }
    }

    pub fn data(bytes: Vec<u8>) -> Self {
        Self {
            mode: AddressingMode::None,
            data_bytes: bytes,
            ..Default::default()
        }
    }
}

/// One parsed source line: an optional label, an optional mnemonic
/// (opcode or directive name, empty for label-only lines), and its
/// operand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizedLine {
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub operand: Operand,
}

impl TokenizedLine {
    pub fn label_only(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn is_label_only(&self) -> bool {
        self.mnemonic.is_none()
    }
}

/// One laid-out line: its absolute address, the tokenized line it came
/// from, and whether operand bytes are suppressed (single-byte opcodes
/// and directive-expanded raw bytes).
#[derive(Debug, Clone)]
pub struct AssemblyLine {
    pub addr: u32,
    pub line: TokenizedLine,
    pub skip_operand: bool,
}

/// A contiguous run of assembly lines introduced by one `.ORG` (or the
/// lines before the program's first `.ORG`, which is itself an error by
/// the time layout finishes).
#[derive(Debug, Default)]
pub struct Segment {
    pub lines: Vec<AssemblyLine>,
}
