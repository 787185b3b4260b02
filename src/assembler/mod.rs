//! Two-pass assembler: layout, segment sort & padding, resolve & encode.

pub mod screencode;

use std::collections::{HashMap, HashSet};
use std::fs;

use log::debug;

use crate::error::{Error, Result};
use crate::opcode_table::{is_branch_mnemonic, lookup};
use crate::symbol_table::SymbolTable;
use crate::token::{AssemblyLine, Operand, Segment, SymbolicRef, TokenizedLine};
use screencode::to_screencode;

/// Assemble a tokenized line stream into a `.prg` image: the two-byte
/// little-endian load address followed by the program bytes.
pub fn assemble(lines: &[TokenizedLine], symtab: &mut SymbolTable) -> Result<Vec<u8>> {
    let (start, segments) = layout(lines, symtab)?;
    debug!("layout produced {} segment(s), start = ${:04X}", segments.len(), start);
    let flattened = pad_and_flatten(start, segments)?;
    debug!("flattened layout to {} line(s)", flattened.len());
    encode(start, &flattened, symtab)
}

/// Pass one: walk the tokenized lines in order, assigning addresses,
/// committing labels, and expanding directives into per-byte lines.
fn layout(lines: &[TokenizedLine], symtab: &mut SymbolTable) -> Result<(u32, Vec<Segment>)> {
    let mut start: Option<u32> = None;
    let mut current: Option<u32> = None;
    let mut segments = Vec::new();
    let mut open = Segment::default();

    for line in lines {
        if let Some(label) = &line.label {
            let cur = current.ok_or(Error::NoStartAddress)?;
            symtab.define_label(label.trim_end_matches(':'), cur)?;
        }

        let Some(mnemonic) = &line.mnemonic else {
            continue;
        };

        match mnemonic.as_str() {
            ".ORG" => {
                let target = resolve_address_operand(&line.operand, symtab)?;
                current = Some(target);
                start = Some(start.map_or(target, |s| s.min(target)));
                if !open.lines.is_empty() {
                    segments.push(std::mem::replace(&mut open, Segment::default()));
                }
            }
            "./BIN" => {
                let cur = current.ok_or(Error::NoStartAddress)?;
                let path = match &line.operand.symbol {
                    Some(SymbolicRef::Name(p)) => p.clone(),
                    _ => return Err(Error::syntax("./BIN requires a file path")),
                };
                let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
                current = Some(emit_data_bytes(&mut open, cur, bytes, "DFB"));
            }
            ".TEXT" => {
                let cur = current.ok_or(Error::NoStartAddress)?;
                let encoded: Vec<u8> = line
                    .operand
                    .data_bytes
                    .iter()
                    .map(|b| to_screencode(*b))
                    .collect();
                current = Some(emit_data_bytes(&mut open, cur, encoded, ".TEXT"));
            }
            "DFB" => {
                let cur = current.ok_or(Error::NoStartAddress)?;
                current = Some(emit_data_bytes(&mut open, cur, line.operand.data_bytes.clone(), "DFB"));
            }
            _ => {
                let cur = current.ok_or(Error::NoStartAddress)?;
                let rec = lookup(mnemonic, line.operand.mode)?;
                open.lines.push(AssemblyLine {
                    addr: cur,
                    line: line.clone(),
                    skip_operand: line.operand.mode.suppresses_operand(),
                });
                current = Some(cur + rec.length as u32);
            }
        }
    }

    if !open.lines.is_empty() {
        segments.push(open);
    }

    let start = start.ok_or(Error::NoStartAddress)?;
    Ok((start, segments))
}

/// Append one single-byte assembly line per byte at successive addresses,
/// returning the address just past the last one written.
fn emit_data_bytes(segment: &mut Segment, base: u32, bytes: Vec<u8>, tag: &str) -> u32 {
    let mut addr = base;
    for b in bytes {
        segment.lines.push(AssemblyLine {
            addr,
            line: TokenizedLine {
                label: None,
                mnemonic: Some(tag.to_string()),
                operand: Operand::data(vec![b]),
            },
            skip_operand: true,
        });
        addr += 1;
    }
    addr
}

fn resolve_address_operand(operand: &Operand, symtab: &SymbolTable) -> Result<u32> {
    match &operand.symbol {
        Some(SymbolicRef::Formula(f)) => crate::formula::evaluate(f, symtab).map(|v| v as u32),
        Some(SymbolicRef::Name(n)) => symtab.lookup(n),
        None => Ok(operand.addr),
    }
}

/// Pass-one/pass-two shared sizing: directive-expanded lines are always
/// one byte; real instructions size by their (mnemonic, mode) record.
fn instruction_length(line: &AssemblyLine) -> Result<u8> {
    let mnemonic = line.line.mnemonic.as_deref().unwrap_or("");
    if mnemonic == "DFB" || mnemonic == ".TEXT" {
        return Ok(1);
    }
    lookup(mnemonic, line.line.operand.mode).map(|r| r.length)
}

/// Flatten all segments into one ordered layout between `start` and the
/// highest used address, padding every unclaimed address with `0x00`.
fn pad_and_flatten(start: u32, segments: Vec<Segment>) -> Result<Vec<AssemblyLine>> {
    let mut heads: HashMap<u32, AssemblyLine> = HashMap::new();
    let mut footprint: HashSet<u32> = HashSet::new();

    for segment in segments {
        for line in segment.lines {
            if heads.contains_key(&line.addr) {
                return Err(Error::SegmentOverlap { addr: line.addr });
            }
            let length = instruction_length(&line)?;
            for off in 1..length as u32 {
                footprint.insert(line.addr + off);
            }
            heads.insert(line.addr, line);
        }
    }

    if heads.is_empty() {
        return Ok(Vec::new());
    }

    let end = *heads.keys().max().unwrap();
    let mut out = Vec::new();
    let mut addr = start;
    while addr <= end {
        if let Some(line) = heads.remove(&addr) {
            let length = instruction_length(&line)? as u32;
            addr += length;
            out.push(line);
        } else if footprint.contains(&addr) {
            addr += 1;
        } else {
            out.push(AssemblyLine {
                addr,
                line: TokenizedLine {
                    label: None,
                    mnemonic: Some("DFB".to_string()),
                    operand: Operand::data(vec![0]),
                },
                skip_operand: true,
            });
            addr += 1;
        }
    }
    Ok(out)
}

fn resolve_operand_value(operand: &Operand, symtab: &SymbolTable) -> Result<u32> {
    match &operand.symbol {
        Some(SymbolicRef::Formula(f)) => crate::formula::evaluate(f, symtab).map(|v| v as u32),
        Some(SymbolicRef::Name(n)) => symtab.lookup(n),
        None => Ok(operand.addr),
    }
}

/// Resolve each line's operand, finalize any `Undef*` mode, emit the
/// opcode byte and (unless suppressed) its operand bytes.
fn encode(start: u32, lines: &[AssemblyLine], symtab: &SymbolTable) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 + lines.len() * 2);
    out.push((start & 0xFF) as u8);
    out.push((start >> 8) as u8);

    for line in lines {
        let mnemonic = line.line.mnemonic.as_deref().unwrap_or("");
        if mnemonic == "DFB" || mnemonic == ".TEXT" {
            out.extend_from_slice(&line.line.operand.data_bytes);
            continue;
        }

        let operand = &line.line.operand;
        let value = resolve_operand_value(operand, symtab)?;
        let mode = finalize_mode(operand, value, symtab)?;

        let rec = lookup(mnemonic, mode)?;
        out.push(rec.opcode);

        if line.skip_operand {
            continue;
        }

        if is_branch_mnemonic(mnemonic) {
            out.push(branch_offset(line.addr, value)?);
        } else if rec.length == 2 {
            out.push((value & 0xFF) as u8);
        } else if rec.length == 3 {
            out.push((value & 0xFF) as u8);
            out.push(((value >> 8) & 0xFF) as u8);
        }
    }

    Ok(out)
}

/// `Undef*` only ever wraps a bare symbol name (formulas are classified
/// straight to `Absolute` at tokenize time). Late resolution requires the
/// symbol to be a label, not a plain alias: an alias is just a number, so
/// there's nothing for the layout pass to have promised was
/// address-shaped.
fn finalize_mode(operand: &Operand, value: u32, symtab: &SymbolTable) -> Result<crate::addressing_mode::AddressingMode> {
    if !operand.mode.is_undef() {
        return Ok(operand.mode);
    }
    let name = match &operand.symbol {
        Some(SymbolicRef::Name(n)) => n.as_str(),
        _ => "",
    };
    if !symtab.is_label(name) {
        return Err(Error::InvalidMode(format!(
            "{name} is a constant, not a label; it cannot be used before its definition here"
        )));
    }
    if value <= 0xFF {
        return Err(Error::InvalidMode(format!(
            "{name} resolves to zero-page address {value:#x} but was referenced before its definition; \
             zero-page addressing requires the symbol to be defined earlier in the source"
        )));
    }
    Ok(operand.mode.resolved_absolute().expect("is_undef implies resolved_absolute"))
}

/// Signed 8-bit PC-relative offset: `target − (pc + 2)`, wrapped. A raw
/// value outside `i8`'s range is "branch too far".
fn branch_offset(pc: u32, target: u32) -> Result<u8> {
    let raw = target as i64 - (pc as i64 + 2);
    if !(-128..=127).contains(&raw) {
        return Err(Error::OutOfRange(format!("branch too far: offset {raw} from ${pc:04X}")));
    }
    Ok((raw as i8) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::{tokenize, TokenizeOutcome};

    fn assemble_source(src: &str) -> Result<Vec<u8>> {
        let mut symtab = SymbolTable::new();
        let mut lines = Vec::new();
        let mut held = None;
        for raw in src.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut new_partial = None;
            match tokenize(trimmed, held.take(), &mut new_partial, &mut symtab)? {
                TokenizeOutcome::Line(l) => lines.push(l),
                TokenizeOutcome::AliasOnly | TokenizeOutcome::Deferred => {}
            }
            held = new_partial;
        }
        assemble(&lines, &mut symtab)
    }

    #[test]
    fn simple_load_store_rts() {
        let bytes = assemble_source(".ORG $C000\nLDA #$01\nSTA $D020\nRTS\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0xC0, 0xA9, 0x01, 0x8D, 0x20, 0xD0, 0x60]);
    }

    #[test]
    fn forward_label_reference() {
        let bytes = assemble_source(".ORG $1000\nJMP LOOP\nLOOP: NOP\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0x10, 0x4C, 0x03, 0x10, 0xEA]);
    }

    #[test]
    fn branch_forward_to_label() {
        let bytes = assemble_source(".ORG $2000\nBEQ END\nNOP\nEND: RTS\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0x20, 0xF0, 0x01, 0xEA, 0x60]);
    }

    #[test]
    fn zero_page_via_early_alias() {
        let bytes = assemble_source("FOO = $0A\n.ORG $C000\nLDA FOO\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0xC0, 0xA5, 0x0A]);
    }

    #[test]
    fn late_alias_forbids_undef_resolution() {
        let err = assemble_source(".ORG $C000\nLDA BAR\nBAR = $C100\n").unwrap_err();
        assert!(matches!(err, Error::InvalidMode(_)));
    }

    #[test]
    fn late_label_resolves_absolute() {
        let bytes = assemble_source(".ORG $C000\nLDA BAR\nBAR: RTS\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0xC0, 0xAD, 0x03, 0xC0, 0x60]);
    }

    #[test]
    fn text_then_gap_padding_to_next_org() {
        let bytes = assemble_source(".ORG $1000\n.TEXT \"A\"\n.ORG $1003\nDFB $FF\n").unwrap();
        assert_eq!(bytes, vec![0x00, 0x10, 0x01, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn branch_too_far_fails() {
        let mut src = String::from(".ORG $1000\nBEQ FAR\n");
        for _ in 0..200 {
            src.push_str("NOP\n");
        }
        src.push_str("FAR: RTS\n");
        assert!(assemble_source(&src).is_err());
    }

    #[test]
    fn symbol_write_once_violation() {
        let err = assemble_source(".ORG $C000\nFOO = $01\nFOO: NOP\n").unwrap_err();
        assert!(matches!(err, Error::SymbolRedefinition(_)));
    }

    #[test]
    fn no_start_address_before_org() {
        let err = assemble_source("NOP\n.ORG $1000\n").unwrap_err();
        assert!(matches!(err, Error::NoStartAddress));
    }

    #[test]
    fn immediate_boundary_0xff_succeeds_0x100_fails() {
        assert!(assemble_source(".ORG $C000\nLDA #$FF\n").is_ok());
        assert!(assemble_source(".ORG $C000\nLDA #$100\n").is_err());
    }

    #[test]
    fn descending_org_addresses_still_set_minimum_start() {
        let bytes = assemble_source(".ORG $2000\nNOP\n.ORG $1000\nNOP\n").unwrap();
        assert_eq!(&bytes[0..2], &[0x00, 0x10]);
    }
}
