//! Write-once symbol table.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

/// Flat mapping from symbol name to a non-negative integer value.
///
/// Names are write-once: defining the same name twice — whether via a
/// label or a `NAME = VALUE` alias — is a `SymbolRedefinition` error.
/// Shared by the tokenizer (alias evaluation, indexed-mode width
/// inference) and the assembler (label definitions and lookups); `reset`
/// exists so a single table instance can be reused across compilations in
/// tests without leaking symbols between them.
///
/// Labels are tracked separately from aliases: a forward reference that
/// resolves to an address-valued *label* may be late-bound to Absolute in
/// the second pass, but one that resolves only to a constant *alias* may
/// not — an alias is a plain number, not something the layout pass can
/// promise is address-shaped.
#[derive(Debug, Default)]
pub struct SymbolTable {
    values: HashMap<String, u32>,
    labels: HashSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every defined symbol, restoring a fresh table.
    pub fn reset(&mut self) {
        self.values.clear();
        self.labels.clear();
    }

    /// Define `name` with `value`, failing if it's already defined.
    pub fn define(&mut self, name: &str, value: u32) -> Result<()> {
        if self.values.contains_key(name) {
            return Err(Error::SymbolRedefinition(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Define `name` as a label: same write-once rule as [`define`], but
    /// also marks it eligible for late Absolute resolution.
    pub fn define_label(&mut self, name: &str, value: u32) -> Result<()> {
        self.define(name, value)?;
        self.labels.insert(name.to_string());
        Ok(())
    }

    /// True if `name` was defined via [`define_label`] rather than as a
    /// plain alias.
    pub fn is_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    /// Look up `name`, failing with `UndefinedSymbol` if absent.
    pub fn lookup(&self, name: &str) -> Result<u32> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| Error::UndefinedSymbol(name.to_string()))
    }

    /// Non-failing lookup, for callers that branch on definedness
    /// themselves (operand classification's width inference).
    pub fn get(&self, name: &str) -> Option<u32> {
        self.values.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_once() {
        let mut t = SymbolTable::new();
        t.define("FOO", 10).unwrap();
        assert!(t.define("FOO", 20).is_err());
        assert_eq!(t.lookup("FOO").unwrap(), 10);
    }

    #[test]
    fn reset_clears() {
        let mut t = SymbolTable::new();
        t.define("FOO", 10).unwrap();
        t.reset();
        assert!(t.lookup("FOO").is_err());
    }
}
