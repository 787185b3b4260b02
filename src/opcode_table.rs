//! Static opcode and directive tables.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::addressing_mode::AddressingMode;
use crate::error::{Error, Result};

/// Encoding metadata for one (mnemonic, mode) pair.
///
/// Only `opcode` and `length` are consumed by the encoder; `cycles` and
/// `page_cross` are carried as metadata the way the table this was
/// modeled on carries them, for tooling that wants cycle-accurate timing
/// later (disassembly, a cycle counter) without another table rebuild.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeRecord {
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub opcode: u8,
    pub length: u8,
    pub cycles: u8,
    pub page_cross: bool,
}

impl OpcodeRecord {
    const fn new(
        mnemonic: &'static str,
        mode: AddressingMode,
        opcode: u8,
        length: u8,
        cycles: u8,
        page_cross: bool,
    ) -> Self {
        Self {
            mnemonic,
            mode,
            opcode,
            length,
            cycles,
            page_cross,
        }
    }
}

macro_rules! op {
    ($table:expr, $mn:expr, $mode:expr, $byte:expr, $len:expr, $cyc:expr) => {
        op!($table, $mn, $mode, $byte, $len, $cyc, false)
    };
    ($table:expr, $mn:expr, $mode:expr, $byte:expr, $len:expr, $cyc:expr, $pc:expr) => {
        $table.insert(($mn, $mode), OpcodeRecord::new($mn, $mode, $byte, $len, $cyc, $pc));
    };
}

fn build_opcode_table() -> HashMap<(&'static str, AddressingMode), OpcodeRecord> {
    use AddressingMode::*;
    let mut t = HashMap::new();

    op!(t, "ADC", Immediate, 0x69, 2, 2);
    op!(t, "ADC", ZeroPage, 0x65, 2, 3);
    op!(t, "ADC", ZeroPageX, 0x75, 2, 4);
    op!(t, "ADC", Absolute, 0x6D, 3, 4);
    op!(t, "ADC", AbsoluteX, 0x7D, 3, 4, true);
    op!(t, "ADC", AbsoluteY, 0x79, 3, 4, true);
    op!(t, "ADC", IndirectX, 0x61, 2, 6);
    op!(t, "ADC", IndirectY, 0x71, 2, 5, true);

    op!(t, "AND", Immediate, 0x29, 2, 2);
    op!(t, "AND", ZeroPage, 0x25, 2, 3);
    op!(t, "AND", ZeroPageX, 0x35, 2, 4);
    op!(t, "AND", Absolute, 0x2D, 3, 4);
    op!(t, "AND", AbsoluteX, 0x3D, 3, 4, true);
    op!(t, "AND", AbsoluteY, 0x39, 3, 4, true);
    op!(t, "AND", IndirectX, 0x21, 2, 6);
    op!(t, "AND", IndirectY, 0x31, 2, 5, true);

    op!(t, "ASL", Accumulator, 0x0A, 1, 2);
    op!(t, "ASL", ZeroPage, 0x06, 2, 5);
    op!(t, "ASL", ZeroPageX, 0x16, 2, 6);
    op!(t, "ASL", Absolute, 0x0E, 3, 6);
    op!(t, "ASL", AbsoluteX, 0x1E, 3, 7);

    op!(t, "BIT", ZeroPage, 0x24, 2, 3);
    op!(t, "BIT", Absolute, 0x2C, 3, 4);

    op!(t, "BPL", Relative, 0x10, 2, 2, true);
    op!(t, "BMI", Relative, 0x30, 2, 2, true);
    op!(t, "BVC", Relative, 0x50, 2, 2, true);
    op!(t, "BVS", Relative, 0x70, 2, 2, true);
    op!(t, "BCC", Relative, 0x90, 2, 2, true);
    op!(t, "BCS", Relative, 0xB0, 2, 2, true);
    op!(t, "BNE", Relative, 0xD0, 2, 2, true);
    op!(t, "BEQ", Relative, 0xF0, 2, 2, true);

    op!(t, "BRK", Implied, 0x00, 1, 7);

    op!(t, "CMP", Immediate, 0xC9, 2, 2);
    op!(t, "CMP", ZeroPage, 0xC5, 2, 3);
    op!(t, "CMP", ZeroPageX, 0xD5, 2, 4);
    op!(t, "CMP", Absolute, 0xCD, 3, 4);
    op!(t, "CMP", AbsoluteX, 0xDD, 3, 4, true);
    op!(t, "CMP", AbsoluteY, 0xD9, 3, 4, true);
    op!(t, "CMP", IndirectX, 0xC1, 2, 6);
    op!(t, "CMP", IndirectY, 0xD1, 2, 5, true);

    op!(t, "CPX", Immediate, 0xE0, 2, 2);
    op!(t, "CPX", ZeroPage, 0xE4, 2, 3);
    op!(t, "CPX", Absolute, 0xEC, 3, 4);

    op!(t, "CPY", Immediate, 0xC0, 2, 2);
    op!(t, "CPY", ZeroPage, 0xC4, 2, 3);
    op!(t, "CPY", Absolute, 0xCC, 3, 4);

    op!(t, "DEC", ZeroPage, 0xC6, 2, 5);
    op!(t, "DEC", ZeroPageX, 0xD6, 2, 6);
    op!(t, "DEC", Absolute, 0xCE, 3, 6);
    op!(t, "DEC", AbsoluteX, 0xDE, 3, 7);

    op!(t, "EOR", Immediate, 0x49, 2, 2);
    op!(t, "EOR", ZeroPage, 0x45, 2, 3);
    op!(t, "EOR", ZeroPageX, 0x55, 2, 4);
    op!(t, "EOR", Absolute, 0x4D, 3, 4);
    op!(t, "EOR", AbsoluteX, 0x5D, 3, 4, true);
    op!(t, "EOR", AbsoluteY, 0x59, 3, 4, true);
    op!(t, "EOR", IndirectX, 0x41, 2, 6);
    op!(t, "EOR", IndirectY, 0x51, 2, 5, true);

    // Flag instructions: Implied, one byte, no operand.
    op!(t, "CLC", Implied, 0x18, 1, 2);
    op!(t, "SEC", Implied, 0x38, 1, 2);
    op!(t, "CLI", Implied, 0x58, 1, 2);
    op!(t, "SEI", Implied, 0x78, 1, 2);
    op!(t, "CLV", Implied, 0xB8, 1, 2);
    op!(t, "CLD", Implied, 0xD8, 1, 2);
    op!(t, "SED", Implied, 0xF8, 1, 2);

    op!(t, "INC", ZeroPage, 0xE6, 2, 5);
    op!(t, "INC", ZeroPageX, 0xF6, 2, 6);
    op!(t, "INC", Absolute, 0xEE, 3, 6);
    op!(t, "INC", AbsoluteX, 0xFE, 3, 7);

    op!(t, "JMP", Absolute, 0x4C, 3, 3);
    op!(t, "JMP", Indirect, 0x6C, 3, 5);

    op!(t, "JSR", Absolute, 0x20, 3, 6);

    op!(t, "LDA", Immediate, 0xA9, 2, 2);
    op!(t, "LDA", ZeroPage, 0xA5, 2, 3);
    op!(t, "LDA", ZeroPageX, 0xB5, 2, 4);
    op!(t, "LDA", Absolute, 0xAD, 3, 4);
    op!(t, "LDA", AbsoluteX, 0xBD, 3, 4, true);
    op!(t, "LDA", AbsoluteY, 0xB9, 3, 4, true);
    op!(t, "LDA", IndirectX, 0xA1, 2, 6);
    op!(t, "LDA", IndirectY, 0xB1, 2, 5, true);

    op!(t, "LDX", Immediate, 0xA2, 2, 2);
    op!(t, "LDX", ZeroPage, 0xA6, 2, 3);
    op!(t, "LDX", ZeroPageY, 0xB6, 2, 4);
    op!(t, "LDX", Absolute, 0xAE, 3, 4);
    op!(t, "LDX", AbsoluteY, 0xBE, 3, 4, true);

    op!(t, "LDY", Immediate, 0xA0, 2, 2);
    op!(t, "LDY", ZeroPage, 0xA4, 2, 3);
    op!(t, "LDY", ZeroPageX, 0xB4, 2, 4);
    op!(t, "LDY", Absolute, 0xAC, 3, 4);
    op!(t, "LDY", AbsoluteX, 0xBC, 3, 4, true);

    op!(t, "LSR", Accumulator, 0x4A, 1, 2);
    op!(t, "LSR", ZeroPage, 0x46, 2, 5);
    op!(t, "LSR", ZeroPageX, 0x56, 2, 6);
    op!(t, "LSR", Absolute, 0x4E, 3, 6);
    op!(t, "LSR", AbsoluteX, 0x5E, 3, 7);

    op!(t, "NOP", Implied, 0xEA, 1, 2);

    op!(t, "ORA", Immediate, 0x09, 2, 2);
    op!(t, "ORA", ZeroPage, 0x05, 2, 3);
    op!(t, "ORA", ZeroPageX, 0x15, 2, 4);
    op!(t, "ORA", Absolute, 0x0D, 3, 4);
    op!(t, "ORA", AbsoluteX, 0x1D, 3, 4, true);
    op!(t, "ORA", AbsoluteY, 0x19, 3, 4, true);
    op!(t, "ORA", IndirectX, 0x01, 2, 6);
    op!(t, "ORA", IndirectY, 0x11, 2, 5, true);

    op!(t, "TAX", Implied, 0xAA, 1, 2);
    op!(t, "TXA", Implied, 0x8A, 1, 2);
    op!(t, "DEX", Implied, 0xCA, 1, 2);
    op!(t, "INX", Implied, 0xE8, 1, 2);
    op!(t, "TAY", Implied, 0xA8, 1, 2);
    op!(t, "TYA", Implied, 0x98, 1, 2);
    op!(t, "DEY", Implied, 0x88, 1, 2);
    op!(t, "INY", Implied, 0xC8, 1, 2);

    op!(t, "ROL", Accumulator, 0x2A, 1, 2);
    op!(t, "ROL", ZeroPage, 0x26, 2, 5);
    op!(t, "ROL", ZeroPageX, 0x36, 2, 6);
    op!(t, "ROL", Absolute, 0x2E, 3, 6);
    op!(t, "ROL", AbsoluteX, 0x3E, 3, 7);

    op!(t, "ROR", Accumulator, 0x6A, 1, 2);
    op!(t, "ROR", ZeroPage, 0x66, 2, 5);
    op!(t, "ROR", ZeroPageX, 0x76, 2, 6);
    op!(t, "ROR", Absolute, 0x6E, 3, 6);
    op!(t, "ROR", AbsoluteX, 0x7E, 3, 7);

    op!(t, "RTI", Implied, 0x40, 1, 6);
    op!(t, "RTS", Implied, 0x60, 1, 6);

    op!(t, "SBC", Immediate, 0xE9, 2, 2);
    op!(t, "SBC", ZeroPage, 0xE5, 2, 3);
    op!(t, "SBC", ZeroPageX, 0xF5, 2, 4);
    op!(t, "SBC", Absolute, 0xED, 3, 4);
    op!(t, "SBC", AbsoluteX, 0xFD, 3, 4, true);
    op!(t, "SBC", AbsoluteY, 0xF9, 3, 4, true);
    op!(t, "SBC", IndirectX, 0xE1, 2, 6);
    op!(t, "SBC", IndirectY, 0xF1, 2, 5, true);

    op!(t, "STA", ZeroPage, 0x85, 2, 3);
    op!(t, "STA", ZeroPageX, 0x95, 2, 4);
    op!(t, "STA", Absolute, 0x8D, 3, 4);
    op!(t, "STA", AbsoluteX, 0x9D, 3, 5);
    op!(t, "STA", AbsoluteY, 0x99, 3, 5);
    op!(t, "STA", IndirectX, 0x81, 2, 6);
    op!(t, "STA", IndirectY, 0x91, 2, 6);

    op!(t, "TXS", Implied, 0x9A, 1, 2);
    op!(t, "TSX", Implied, 0xBA, 1, 2);
    op!(t, "PHA", Implied, 0x48, 1, 3);
    op!(t, "PLA", Implied, 0x68, 1, 4);
    op!(t, "PHP", Implied, 0x08, 1, 3);
    op!(t, "PLP", Implied, 0x28, 1, 4);

    op!(t, "STX", ZeroPage, 0x86, 2, 3);
    op!(t, "STX", ZeroPageY, 0x96, 2, 4);
    op!(t, "STX", Absolute, 0x8E, 3, 4);

    op!(t, "STY", ZeroPage, 0x84, 2, 3);
    op!(t, "STY", ZeroPageX, 0x94, 2, 4);
    op!(t, "STY", Absolute, 0x8C, 3, 4);

    t
}

static OPCODES: Lazy<HashMap<(&'static str, AddressingMode), OpcodeRecord>> =
    Lazy::new(build_opcode_table);

static MNEMONICS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| OPCODES.keys().map(|(mn, _)| *mn).collect());

/// Directive mnemonics live in their own small table; `./INCLUDE` is only
/// ever consumed by the parser, never by the assembler.
pub const DIRECTIVES: &[&str] = &[".ORG", ".TEXT", "DFB", "./BIN", "./INCLUDE"];

/// True if `name` (case-insensitive) names a real 6502 mnemonic.
pub fn is_mnemonic(name: &str) -> bool {
    MNEMONICS.contains(name.to_ascii_uppercase().as_str())
}

/// True if `name` (case-insensitive) names a directive.
pub fn is_directive(name: &str) -> bool {
    let up = name.to_ascii_uppercase();
    DIRECTIVES.iter().any(|d| d.eq_ignore_ascii_case(&up))
}

/// Any 3-letter mnemonic starting with `B` except `BIT` and `BRK` is a
/// branch instruction and always encodes a relative offset.
pub fn is_branch_mnemonic(name: &str) -> bool {
    let up = name.to_ascii_uppercase();
    up.len() == 3 && up.starts_with('B') && up != "BIT" && up != "BRK"
}

/// Look up the encoding for `(mnemonic, mode)`.
///
/// `Undef*` modes short-circuit the table entirely and return a synthetic
/// record of length 3: the real opcode byte is only known once the second
/// pass resolves the mode to a concrete `Absolute*` variant.
pub fn lookup(mnemonic: &str, mode: AddressingMode) -> Result<OpcodeRecord> {
    if mode.is_undef() {
        // The real opcode byte isn't known until pass two resolves the
        // concrete Absolute* mode; the mnemonic text isn't needed here
        // since the caller already has it.
        return Ok(OpcodeRecord::new("", mode, 0, 3, 0, false));
    }
    let key = mnemonic.to_ascii_uppercase();
    OPCODES
        .get(&(key.as_str(), mode))
        .copied()
        .ok_or_else(|| Error::UnknownOpcode {
            mnemonic: mnemonic.to_string(),
            mode: format!("{:?}", mode),
        })
}
