//! The closed set of 6502 addressing modes.

use derive_more::Display;

/// How an instruction interprets its operand bytes.
///
/// The three `Undef*` variants are a deliberate placeholder: the operand
/// classifier emits them when a symbolic operand isn't known yet, and the
/// second assembler pass resolves them to `Absolute`/`AbsoluteX`/`AbsoluteY`
/// unless the symbol turns out to be a zero-page value defined early enough
/// to prove a shorter mode (it can't be — late resolution always commits to
/// the 3-byte absolute forms).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    /// No operand at all: used for directive-synthesized lines.
    #[default]
    None,
    Undef,
    UndefX,
    UndefY,
}

impl AddressingMode {
    /// True for the three forward-reference placeholder modes.
    pub fn is_undef(self) -> bool {
        matches!(self, AddressingMode::Undef | AddressingMode::UndefX | AddressingMode::UndefY)
    }

    /// The concrete absolute-family mode this placeholder resolves to.
    pub fn resolved_absolute(self) -> Option<AddressingMode> {
        match self {
            AddressingMode::Undef => Some(AddressingMode::Absolute),
            AddressingMode::UndefX => Some(AddressingMode::AbsoluteX),
            AddressingMode::UndefY => Some(AddressingMode::AbsoluteY),
            _ => None,
        }
    }

    /// Implied/Accumulator/None never emit operand bytes.
    pub fn suppresses_operand(self) -> bool {
        matches!(
            self,
            AddressingMode::Implied | AddressingMode::Accumulator | AddressingMode::None
        )
    }
}
