//! Line splitter and operand classifier.

use crate::addressing_mode::AddressingMode;
use crate::error::{Error, Result};
use crate::literal::{read_literal, Literal};
use crate::opcode_table::{is_directive, is_mnemonic};
use crate::symbol_table::SymbolTable;
use crate::token::{Operand, SymbolicRef, TokenizedLine};

/// Split a comment-stripped, trimmed line into up to three tokens, honoring
/// quoted strings (rest-of-line, unterminated trailing quote forgiven) and
/// bracket-depth-tracked formulas so embedded whitespace doesn't split them.
fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' && depth == 0 {
            current.push(c);
            current.extend(chars.by_ref());
            break;
        }
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// One line's tokenization result: either a complete tokenized line, or
/// nothing at all (a constant alias commits directly to the table and
/// emits no line).
pub enum TokenizeOutcome {
    Line(TokenizedLine),
    AliasOnly,
    /// A colon-less bare label: held for the next non-empty line, nothing
    /// is appended to the output stream for this one.
    Deferred,
}

/// Tokenize one already comment-stripped, trimmed, non-empty line.
///
/// `held_label` is the partial label carried from a preceding label-only
/// line without a trailing colon; it is consumed (prepended) here if
/// present. `new_partial` receives a fresh partial label if this line
/// turns out to be a bare, colon-less label by itself.
pub fn tokenize(
    line: &str,
    held_label: Option<String>,
    new_partial: &mut Option<String>,
    symtab: &mut SymbolTable,
) -> Result<TokenizeOutcome> {
    let mut tokens = split_tokens(line);
    let mut held_label = held_label;

    // A 4-token `X Y = Z` line: peel X off as an independent label-only
    // carrier, then retokenize the remainder.
    if tokens.len() == 4 && tokens[2] == "=" {
        let peeled = tokens.remove(0);
        *new_partial = Some(join_label(held_label.take(), &peeled));
    }

    let label = held_label;

    match tokens.len() {
        1 => tokenize_one(&tokens[0], label, new_partial),
        2 => tokenize_two(&tokens[0], &tokens[1], label, symtab),
        3 => tokenize_three(&tokens[0], &tokens[1], &tokens[2], label, symtab),
        n => Err(Error::syntax(format!("cannot tokenize line with {n} tokens: {line}"))),
    }
}

fn tokenize_one(
    tok: &str,
    label: Option<String>,
    new_partial: &mut Option<String>,
) -> Result<TokenizeOutcome> {
    if let Some(name) = tok.strip_suffix(':') {
        let full = join_label(label, name);
        return Ok(TokenizeOutcome::Line(TokenizedLine::label_only(full)));
    }
    if is_mnemonic(tok) {
        return Ok(TokenizeOutcome::Line(TokenizedLine {
            label,
            mnemonic: Some(tok.to_ascii_uppercase()),
            operand: Operand::implied(),
        }));
    }
    // A bare word with no colon and no mnemonic meaning: a partial label,
    // carried forward onto the next line.
    *new_partial = Some(join_label(label, tok));
    Ok(TokenizeOutcome::Deferred)
}

fn tokenize_two(
    first: &str,
    second: &str,
    label: Option<String>,
    symtab: &mut SymbolTable,
) -> Result<TokenizeOutcome> {
    if is_directive(first) {
        return Ok(TokenizeOutcome::Line(directive_line(label, first, second)?));
    }
    if is_mnemonic(first) {
        let mnemonic = first.to_ascii_uppercase();
        let operand = classify_operand(second, &mnemonic, symtab)?;
        return Ok(TokenizeOutcome::Line(TokenizedLine {
            label,
            mnemonic: Some(mnemonic),
            operand,
        }));
    }
    // token[0] is a label, token[1] is a bare mnemonic in Implied mode.
    let full_label = join_label(label, first);
    if !is_mnemonic(second) {
        return Err(Error::syntax(format!("unknown mnemonic '{second}'")));
    }
    Ok(TokenizeOutcome::Line(TokenizedLine {
        label: Some(full_label),
        mnemonic: Some(second.to_ascii_uppercase()),
        operand: Operand::implied(),
    }))
}

fn tokenize_three(
    first: &str,
    second: &str,
    third: &str,
    label: Option<String>,
    symtab: &mut SymbolTable,
) -> Result<TokenizeOutcome> {
    if second == "=" {
        // Alias: NAME = VALUE, evaluated and committed immediately.
        let value = eval_alias_value(third, symtab)?;
        symtab.define(first, value)?;
        return Ok(TokenizeOutcome::AliasOnly);
    }
    if is_directive(second) {
        let full_label = join_label(label, first);
        let mut line = directive_line(None, second, third)?;
        line.label = Some(full_label);
        return Ok(TokenizeOutcome::Line(line));
    }
    // LABEL MNEMONIC OPERAND
    let full_label = join_label(label, first);
    if !is_mnemonic(second) {
        return Err(Error::syntax(format!("unknown mnemonic '{second}'")));
    }
    let mnemonic = second.to_ascii_uppercase();
    let operand = classify_operand(third, &mnemonic, symtab)?;
    Ok(TokenizeOutcome::Line(TokenizedLine {
        label: Some(full_label),
        mnemonic: Some(mnemonic),
        operand,
    }))
}

fn join_label(held: Option<String>, tok: &str) -> String {
    match held {
        Some(h) => format!("{h}{tok}"),
        None => tok.to_string(),
    }
}

fn eval_alias_value(atom: &str, symtab: &SymbolTable) -> Result<u32> {
    if atom.starts_with('[') {
        return crate::formula::evaluate(atom, symtab).map(|v| v as u32);
    }
    match read_literal(atom)? {
        Literal::Int(v) => Ok(v as u32),
        Literal::Symbol(name) => Err(Error::syntax(format!(
            "alias value must be numeric, found symbol '{name}'"
        ))),
    }
}

/// Build a `TokenizedLine` for a directive token pair. `./INCLUDE` never
/// reaches here: the parser intercepts it before tokenization.
fn directive_line(label: Option<String>, directive: &str, arg: &str) -> Result<TokenizedLine> {
    let up = directive.to_ascii_uppercase();
    let operand = match up.as_str() {
        ".ORG" => classify_org_target(arg)?,
        ".TEXT" => Operand::data(text_bytes(arg)?),
        "DFB" => Operand::data(dfb_bytes(arg)?),
        "./BIN" => Operand::symbolic(SymbolicRef::Name(arg.to_string()), AddressingMode::None),
        other => return Err(Error::syntax(format!("unknown directive '{other}'"))),
    };
    Ok(TokenizedLine {
        label,
        mnemonic: Some(up),
        operand,
    })
}

fn classify_org_target(arg: &str) -> Result<Operand> {
    if arg.starts_with('[') {
        return Ok(Operand::symbolic(
            SymbolicRef::Formula(arg.to_string()),
            AddressingMode::Absolute,
        ));
    }
    match read_literal(arg)? {
        Literal::Int(v) => Ok(Operand::literal(v as u32, AddressingMode::Absolute)),
        Literal::Symbol(name) => Ok(Operand::symbolic(SymbolicRef::Name(name), AddressingMode::Absolute)),
    }
}

/// `.TEXT` accepts a quoted string; an unterminated trailing quote is
/// forgiven, the screencode mapping itself is applied later by the
/// assembler.
fn text_bytes(arg: &str) -> Result<Vec<u8>> {
    let inner = arg.strip_prefix('"').unwrap_or(arg);
    match inner.strip_suffix('"') {
        Some(closed) => Ok(closed.bytes().collect()),
        None => {
            log::warn!(".TEXT string '{inner}' has no closing quote; treating end of line as the closing quote");
            Ok(inner.bytes().collect())
        }
    }
}

fn dfb_bytes(arg: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for part in arg.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let v = match read_literal(part)? {
            Literal::Int(v) => v,
            Literal::Symbol(name) => return Err(Error::syntax(format!("DFB value '{name}' is not numeric"))),
        };
        if v > 0xFF {
            return Err(Error::OutOfRange(format!("DFB value {v:#x} exceeds 0xFF")));
        }
        out.push(v as u8);
    }
    Ok(out)
}

/// Classify a raw operand string against its mnemonic context.
pub fn classify_operand(raw: &str, mnemonic: &str, symtab: &SymbolTable) -> Result<Operand> {
    if raw.is_empty() {
        return Ok(Operand::implied());
    }
    if raw.eq_ignore_ascii_case("a") {
        return Ok(Operand::literal(0, AddressingMode::Accumulator));
    }
    if let Some(inner) = raw.strip_prefix('#') {
        return classify_immediate(inner, symtab);
    }
    if let Some(body) = raw.strip_prefix('(').and_then(|s| s.strip_suffix(")")) {
        return classify_indirect(body, symtab);
    }
    if let Some(body) = raw.strip_prefix('(') {
        // (...),Y shape: the closing paren is followed by ",Y".
        if let Some(rest) = body.strip_suffix(",Y").or_else(|| body.strip_suffix(",y")) {
            let inner = rest.strip_suffix(')').ok_or_else(|| {
                Error::syntax(format!("malformed indirect operand '{raw}'"))
            })?;
            return classify_value(inner, mnemonic, symtab, IndexKind::IndirectY);
        }
        return Err(Error::syntax(format!("malformed indirect operand '{raw}'")));
    }
    if let Some(inner) = raw.strip_suffix(",X").or_else(|| raw.strip_suffix(",x")) {
        return classify_value(inner, mnemonic, symtab, IndexKind::X);
    }
    if let Some(inner) = raw.strip_suffix(",Y").or_else(|| raw.strip_suffix(",y")) {
        return classify_value(inner, mnemonic, symtab, IndexKind::Y);
    }
    classify_value(raw, mnemonic, symtab, IndexKind::None)
}

fn classify_immediate(inner: &str, symtab: &SymbolTable) -> Result<Operand> {
    if inner.starts_with('[') {
        return Ok(Operand::symbolic(
            SymbolicRef::Formula(inner.to_string()),
            AddressingMode::Immediate,
        ));
    }
    match read_literal(inner)? {
        Literal::Int(v) => {
            if v > 0xFF {
                return Err(Error::OutOfRange(format!("immediate value {v:#x} exceeds 0xFF")));
            }
            Ok(Operand::literal(v as u32, AddressingMode::Immediate))
        }
        Literal::Symbol(name) => {
            if let Some(v) = symtab.get(&name) {
                if v > 0xFF {
                    return Err(Error::OutOfRange(format!("immediate value {v:#x} exceeds 0xFF")));
                }
                Ok(Operand::literal(v, AddressingMode::Immediate))
            } else {
                Ok(Operand::symbolic(SymbolicRef::Name(name), AddressingMode::Immediate))
            }
        }
    }
}

fn classify_indirect(body: &str, symtab: &SymbolTable) -> Result<Operand> {
    if let Some(inner) = body.strip_suffix(",X").or_else(|| body.strip_suffix(",x")) {
        return classify_value(inner, "", symtab, IndexKind::IndirectX);
    }
    classify_value(body, "", symtab, IndexKind::Indirect)
}

enum IndexKind {
    None,
    X,
    Y,
    Indirect,
    IndirectX,
    IndirectY,
}

fn classify_value(
    inner: &str,
    mnemonic: &str,
    symtab: &SymbolTable,
    kind: IndexKind,
) -> Result<Operand> {
    if inner.starts_with('[') {
        let mode = match kind {
            IndexKind::None => {
                if crate::opcode_table::is_branch_mnemonic(mnemonic) {
                    AddressingMode::Relative
                } else {
                    AddressingMode::Absolute
                }
            }
            IndexKind::X => AddressingMode::AbsoluteX,
            IndexKind::Y => AddressingMode::AbsoluteY,
            IndexKind::Indirect => AddressingMode::Indirect,
            IndexKind::IndirectX => AddressingMode::IndirectX,
            IndexKind::IndirectY => AddressingMode::IndirectY,
        };
        return Ok(Operand::symbolic(SymbolicRef::Formula(inner.to_string()), mode));
    }

    match read_literal(inner)? {
        Literal::Int(v) => mode_for_width(v as u32, mnemonic, &kind).map(|m| Operand::literal(v as u32, m)),
        Literal::Symbol(name) => {
            if let Some(v) = symtab.get(&name) {
                mode_for_width(v, mnemonic, &kind).map(|m| Operand::symbolic(SymbolicRef::Name(name), m))
            } else {
                let mode = undef_mode(&kind);
                Ok(Operand::symbolic(SymbolicRef::Name(name), mode))
            }
        }
    }
}

fn undef_mode(kind: &IndexKind) -> AddressingMode {
    match kind {
        IndexKind::None => AddressingMode::Undef,
        IndexKind::X => AddressingMode::UndefX,
        IndexKind::Y => AddressingMode::UndefY,
        IndexKind::Indirect => AddressingMode::Indirect,
        IndexKind::IndirectX => AddressingMode::IndirectX,
        IndexKind::IndirectY => AddressingMode::IndirectY,
    }
}

fn mode_for_width(value: u32, mnemonic: &str, kind: &IndexKind) -> Result<AddressingMode> {
    match kind {
        IndexKind::Indirect => return Ok(AddressingMode::Indirect),
        IndexKind::IndirectX => return Ok(AddressingMode::IndirectX),
        IndexKind::IndirectY => return Ok(AddressingMode::IndirectY),
        _ => {}
    }
    if value > 0xFFFF {
        return Err(Error::OutOfRange(format!("address {value:#x} exceeds 0xFFFF")));
    }
    if crate::opcode_table::is_branch_mnemonic(mnemonic) && matches!(kind, IndexKind::None) {
        return Ok(AddressingMode::Relative);
    }
    let zero_page = value <= 0xFF;
    Ok(match kind {
        IndexKind::None => {
            if zero_page {
                AddressingMode::ZeroPage
            } else {
                AddressingMode::Absolute
            }
        }
        IndexKind::X => {
            if zero_page {
                AddressingMode::ZeroPageX
            } else {
                AddressingMode::AbsoluteX
            }
        }
        IndexKind::Y => {
            if zero_page {
                AddressingMode::ZeroPageY
            } else {
                AddressingMode::AbsoluteY
            }
        }
        IndexKind::Indirect | IndexKind::IndirectX | IndexKind::IndirectY => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(line: &str) -> TokenizedLine {
        let mut held = None;
        let mut new_partial = None;
        let mut symtab = SymbolTable::new();
        match tokenize(line, held.take(), &mut new_partial, &mut symtab).unwrap() {
            TokenizeOutcome::Line(l) => l,
            TokenizeOutcome::AliasOnly => panic!("expected a line"),
            TokenizeOutcome::Deferred => panic!("expected a line"),
        }
    }

    #[test]
    fn label_only_with_colon() {
        let l = tok("LOOP:");
        assert_eq!(l.label.as_deref(), Some("LOOP"));
        assert!(l.is_label_only());
    }

    #[test]
    fn single_mnemonic_is_implied() {
        let l = tok("RTS");
        assert_eq!(l.mnemonic.as_deref(), Some("RTS"));
        assert_eq!(l.operand.mode, AddressingMode::Implied);
    }

    #[test]
    fn two_token_instruction() {
        let l = tok("LDA #$01");
        assert_eq!(l.mnemonic.as_deref(), Some("LDA"));
        assert_eq!(l.operand.mode, AddressingMode::Immediate);
        assert_eq!(l.operand.addr, 1);
    }

    #[test]
    fn two_token_label_plus_implied_mnemonic() {
        let l = tok("LOOP NOP");
        assert_eq!(l.label.as_deref(), Some("LOOP"));
        assert_eq!(l.mnemonic.as_deref(), Some("NOP"));
    }

    #[test]
    fn three_token_label_mnemonic_operand() {
        let l = tok("LOOP LDA $10");
        assert_eq!(l.label.as_deref(), Some("LOOP"));
        assert_eq!(l.operand.mode, AddressingMode::ZeroPage);
    }

    #[test]
    fn zero_page_indexed() {
        let l = tok("LDA $10,X");
        assert_eq!(l.operand.mode, AddressingMode::ZeroPageX);
    }

    #[test]
    fn absolute_indexed() {
        let l = tok("LDA $1000,Y");
        assert_eq!(l.operand.mode, AddressingMode::AbsoluteY);
    }

    #[test]
    fn indirect_x() {
        let l = tok("LDA ($10,X)");
        assert_eq!(l.operand.mode, AddressingMode::IndirectX);
    }

    #[test]
    fn indirect_y() {
        let l = tok("LDA ($10),Y");
        assert_eq!(l.operand.mode, AddressingMode::IndirectY);
    }

    #[test]
    fn indirect_plain() {
        let l = tok("JMP ($1000)");
        assert_eq!(l.operand.mode, AddressingMode::Indirect);
    }

    #[test]
    fn undefined_symbol_defers() {
        let l = tok("LDA BAR");
        assert_eq!(l.operand.mode, AddressingMode::Undef);
    }

    #[test]
    fn branch_forces_relative() {
        let l = tok("BEQ END");
        assert_eq!(l.mnemonic.as_deref(), Some("BEQ"));
        assert_eq!(l.operand.mode, AddressingMode::Relative);
    }

    #[test]
    fn immediate_out_of_range_errors() {
        let mut new_partial = None;
        let mut symtab = SymbolTable::new();
        assert!(tokenize("LDA #$100", None, &mut new_partial, &mut symtab).is_err());
    }

    #[test]
    fn alias_commits_and_emits_nothing() {
        let mut new_partial = None;
        let mut symtab = SymbolTable::new();
        let outcome = tokenize("FOO = $0A", None, &mut new_partial, &mut symtab).unwrap();
        assert!(matches!(outcome, TokenizeOutcome::AliasOnly));
        assert_eq!(symtab.lookup("FOO").unwrap(), 10);
    }

    #[test]
    fn zero_page_symbol_defined_early() {
        let mut new_partial = None;
        let mut symtab = SymbolTable::new();
        symtab.define("FOO", 10).unwrap();
        let outcome = tokenize("LDA FOO", None, &mut new_partial, &mut symtab).unwrap();
        let line = match outcome {
            TokenizeOutcome::Line(l) => l,
            _ => panic!(),
        };
        assert_eq!(line.operand.mode, AddressingMode::ZeroPage);
    }
}
