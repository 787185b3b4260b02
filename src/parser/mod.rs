//! Line-oriented front end: include expansion, comment stripping, partial
//! label carrying, and per-line error collection.

pub mod tokenizer;

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::symbol_table::SymbolTable;
use crate::token::TokenizedLine;
use tokenizer::{tokenize, TokenizeOutcome};

/// One non-fatal tokenization failure, attached to its source location.
#[derive(Debug, Clone)]
pub struct LineError {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.message)
    }
}

/// The result of driving the full include graph: the aggregated tokenized
/// line stream plus any non-fatal per-line errors collected along the way.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub lines: Vec<TokenizedLine>,
    pub errors: Vec<LineError>,
}

struct PendingFile {
    path: PathBuf,
}

/// Drive the include graph starting at `entry`, tokenizing every line of
/// every transitively included file into one aggregated stream.
///
/// I/O failures (the entry file or an included file can't be opened) are
/// fatal and abort immediately; tokenization failures are collected and
/// the run continues. A file that (directly or transitively) includes
/// itself is rejected with an `IOError` rather than recursing forever.
pub fn parse_file(entry: &Path, symtab: &mut SymbolTable) -> Result<ParseOutput> {
    let mut queue: VecDeque<PendingFile> = VecDeque::new();
    queue.push_back(PendingFile { path: entry.to_path_buf() });

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut output = ParseOutput::default();
    let mut held_label: Option<String> = None;

    while let Some(pending) = queue.pop_front() {
        let canonical = pending
            .path
            .canonicalize()
            .map_err(|e| Error::io(&pending.path, e))?;
        if !visited.insert(canonical) {
            return Err(Error::io(
                &pending.path,
                std::io::Error::new(std::io::ErrorKind::Other, "circular ./INCLUDE"),
            ));
        }

        let contents = fs::read_to_string(&pending.path).map_err(|e| Error::io(&pending.path, e))?;
        let dir = pending.path.parent().unwrap_or_else(|| Path::new("."));

        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let stripped = strip_comment(raw);
            let trimmed = stripped.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = strip_include_prefix(trimmed) {
                let included = dir.join(rest.trim());
                queue.push_back(PendingFile { path: included });
                continue;
            }

            let resolved = resolve_bin_path(trimmed, dir);

            let mut new_partial = None;
            match tokenize(&resolved, held_label.take(), &mut new_partial, symtab) {
                Ok(TokenizeOutcome::Line(line)) => output.lines.push(line),
                Ok(TokenizeOutcome::AliasOnly) => {}
                Ok(TokenizeOutcome::Deferred) => {}
                Err(e) => output.errors.push(LineError {
                    file: pending.path.clone(),
                    line: line_no,
                    message: e.to_string(),
                }),
            }
            held_label = new_partial;
        }
    }

    Ok(output)
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// `./BIN path` is resolved here, relative to the referencing file's
/// directory, the same way `./INCLUDE` is — the tokenizer has no notion
/// of "current directory", so the path substitution happens before the
/// line ever reaches it.
fn resolve_bin_path(trimmed: &str, dir: &Path) -> String {
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let bin_idx = tokens.iter().position(|t| t.eq_ignore_ascii_case("./BIN"));
    let Some(idx) = bin_idx else {
        return trimmed.to_string();
    };
    let Some(path_tok) = tokens.get(idx + 1) else {
        return trimmed.to_string();
    };
    let resolved = dir.join(path_tok).to_string_lossy().into_owned();
    let mut out: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    out[idx + 1] = resolved;
    out.join(" ")
}

fn strip_include_prefix(trimmed: &str) -> Option<&str> {
    const PREFIX: &str = "./INCLUDE ";
    if trimmed.len() >= PREFIX.len() && trimmed[..PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
        Some(&trimmed[PREFIX.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("rasm_test_{}_{}", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn strips_comments_and_skips_blank_lines() {
        let path = write_temp("comments.asm", "; full line comment\n\nRTS ; trailing\n");
        let mut symtab = SymbolTable::new();
        let out = parse_file(&path, &mut symtab).unwrap();
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].mnemonic.as_deref(), Some("RTS"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn partial_label_carries_to_next_line() {
        let path = write_temp("partial.asm", "LOOP\nNOP\n");
        let mut symtab = SymbolTable::new();
        let out = parse_file(&path, &mut symtab).unwrap();
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].label.as_deref(), Some("LOOP"));
        assert_eq!(out.lines[0].mnemonic.as_deref(), Some("NOP"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn include_resolves_relative_to_referencing_file() {
        let dir = std::env::temp_dir().join(format!("rasm_inc_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let child = dir.join("child.asm");
        fs::write(&child, "RTS\n").unwrap();
        let parent = dir.join("parent.asm");
        fs::write(&parent, "./INCLUDE child.asm\nNOP\n").unwrap();

        let mut symtab = SymbolTable::new();
        let out = parse_file(&parent, &mut symtab).unwrap();
        // FIFO queue: the parent's own lines drain before a file it
        // includes is popped, so NOP (parent) precedes RTS (child).
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0].mnemonic.as_deref(), Some("NOP"));
        assert_eq!(out.lines[1].mnemonic.as_deref(), Some("RTS"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn self_include_is_rejected() {
        let dir = std::env::temp_dir().join(format!("rasm_cycle_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("self.asm");
        fs::write(&file, "./INCLUDE self.asm\nNOP\n").unwrap();

        let mut symtab = SymbolTable::new();
        assert!(parse_file(&file, &mut symtab).is_err());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn tokenization_error_is_collected_not_fatal() {
        let path = write_temp("bad.asm", "LDA #$100\nRTS\n");
        let mut symtab = SymbolTable::new();
        let out = parse_file(&path, &mut symtab).unwrap();
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.lines.len(), 1);
        fs::remove_file(path).ok();
    }
}
