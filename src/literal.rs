//! Numeric literal reader.

use crate::error::{Error, Result};
use crate::opcode_table::is_mnemonic;

/// The result of classifying a single atom.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A non-negative integer, from a `$hex`, `o`ctal, `b`inary, or bare
    /// decimal atom.
    Int(i64),
    /// An atom that isn't numeric — a bare name, either a label or a
    /// constant alias.
    Symbol(String),
}

/// Classify `atom` as a numeric literal or a symbolic name.
///
/// `$` selects hex, `o` selects octal, `b` selects binary, anything else
/// is tried as decimal; failure to parse decimal falls back to treating
/// the atom as a symbol name, unless it case-insensitively collides with
/// a real mnemonic, which is a hard error (opcodes can't be used as
/// labels).
pub fn read_literal(atom: &str) -> Result<Literal> {
    if atom.is_empty() {
        return Err(Error::syntax("empty numeric literal"));
    }

    let mut chars = atom.chars();
    let first = chars.next().unwrap();
    let rest = chars.as_str();

    let parsed = match first {
        '$' => i64::from_str_radix(rest, 16).ok(),
        'o' => i64::from_str_radix(rest, 8).ok(),
        'b' => i64::from_str_radix(rest, 2).ok(),
        _ => atom.parse::<i64>().ok(),
    };

    match parsed {
        Some(v) if v >= 0 => Ok(Literal::Int(v)),
        Some(_) => Err(Error::syntax(format!("negative literal: {atom}"))),
        None => {
            if is_mnemonic(atom) {
                Err(Error::syntax(format!("cannot use opcode {atom} as a label")))
            } else {
                Ok(Literal::Symbol(atom.to_string()))
            }
        }
    }
}

/// Try to read `atom` as a float with a fractional part (used only by the
/// formula evaluator, which falls back to this after `read_literal` fails
/// to find an integer).
pub fn read_float(atom: &str) -> Option<f64> {
    if !atom.contains('.') {
        return None;
    }
    atom.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_octal_binary_decimal() {
        assert_eq!(read_literal("$ff").unwrap(), Literal::Int(0xFF));
        assert_eq!(read_literal("o17").unwrap(), Literal::Int(15));
        assert_eq!(read_literal("b101").unwrap(), Literal::Int(5));
        assert_eq!(read_literal("42").unwrap(), Literal::Int(42));
    }

    #[test]
    fn bare_name_is_symbol() {
        assert_eq!(read_literal("LOOP").unwrap(), Literal::Symbol("LOOP".into()));
    }

    #[test]
    fn opcode_as_label_errors() {
        assert!(read_literal("lda").is_err());
    }

    #[test]
    fn float_atom() {
        assert_eq!(read_float("3.4"), Some(3.4));
        assert_eq!(read_float("42"), None);
    }
}
