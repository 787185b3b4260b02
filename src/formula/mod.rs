//! Bracketed prefix-notation expression evaluator.

use pest::Parser;
use pest_derive::Parser;

use crate::error::{Error, Result};
use crate::literal::{read_float, read_literal, Literal};
use crate::symbol_table::SymbolTable;

#[derive(Parser)]
#[grammar = "formula/grammar.pest"]
struct FormulaParser;

/// The evaluator's internal numeric representation. Arithmetic widens to
/// `Float` and truncates only where the operator itself demands it (`DIV`,
/// `%`/`MOD`) or at the very top of the call, never at intermediate nested
/// steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl Value {
    fn as_float(self) -> Result<f64> {
        match self {
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            Value::Float(v) => Ok(v),
            Value::Bool(_) => Err(Error::syntax("expected a numeric value, found a boolean")),
        }
    }

    fn as_int(self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(v),
            Value::UInt(v) => Ok(v as i64),
            _ => Err(Error::syntax("expected an integer value")),
        }
    }

    fn as_uint(self) -> Result<u64> {
        match self {
            Value::UInt(v) => Ok(v),
            Value::Int(v) if v >= 0 => Ok(v as u64),
            _ => Err(Error::syntax("expected an unsigned integer value")),
        }
    }
}

/// Evaluate a bracketed formula string (including its enclosing `[` `]`)
/// against `symtab`, returning the raw `Value` without top-level coercion.
/// Most callers want [`evaluate`] instead.
pub fn evaluate_raw(formula: &str, symtab: &SymbolTable) -> Result<Value> {
    let mut pairs = FormulaParser::parse(Rule::formula, formula)
        .map_err(|e| Error::syntax(format!("formula syntax error: {e}")))?;
    let formula_pair = pairs.next().expect("formula rule always produces a pair");
    let expr_pair = formula_pair
        .into_inner()
        .next()
        .expect("formula always wraps exactly one expr");
    eval_expr(expr_pair, symtab)
}

/// Evaluate a bracketed formula and coerce the result to a non-negative
/// integer: a non-negative int, a non-negative float (truncated), or an
/// unsigned integer. Anything else, including a boolean from a comparison
/// operator, is an error.
pub fn evaluate(formula: &str, symtab: &SymbolTable) -> Result<i64> {
    match evaluate_raw(formula, symtab)? {
        Value::Int(v) if v >= 0 => Ok(v),
        Value::UInt(v) => Ok(v as i64),
        Value::Float(v) if v >= 0.0 => Ok(v.trunc() as i64),
        other => Err(Error::syntax(format!(
            "formula must evaluate to a non-negative number, got {other:?}"
        ))),
    }
}

fn eval_expr(pair: pest::iterators::Pair<Rule>, symtab: &SymbolTable) -> Result<Value> {
    let mut inner = pair.into_inner();
    let op_pair = inner
        .next()
        .ok_or_else(|| Error::syntax("empty formula expression"))?;
    if op_pair.as_rule() != Rule::atom {
        return Err(Error::syntax("formula operator must be a bare atom"));
    }
    let op = op_pair.as_str().to_ascii_uppercase();

    let mut args = Vec::new();
    for p in inner {
        args.push(match p.as_rule() {
            Rule::atom => eval_atom(p.as_str(), symtab)?,
            Rule::expr => eval_expr(p, symtab)?,
            _ => unreachable!("term is either atom or expr"),
        });
    }

    apply_operator(&op, args)
}

fn eval_atom(atom: &str, symtab: &SymbolTable) -> Result<Value> {
    if let Some(f) = read_float(atom) {
        return Ok(Value::Float(f));
    }
    match read_literal(atom)? {
        Literal::Int(v) => Ok(Value::Int(v)),
        Literal::Symbol(name) => symtab.lookup(&name).map(|v| Value::Int(v as i64)),
    }
}

fn check_arity(op: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        Err(Error::syntax(format!(
            "{op} takes exactly {n} argument(s), got {}",
            args.len()
        )))
    } else {
        Ok(())
    }
}

fn apply_operator(op: &str, args: Vec<Value>) -> Result<Value> {
    match op {
        "+" | "-" | "*" | "/" | "DIV" => basic_arithmetic(op, args),
        "^" => {
            check_arity(op, &args, 2)?;
            Ok(Value::Float(args[0].as_float()?.powf(args[1].as_float()?)))
        }
        "%" | "MOD" => {
            check_arity(op, &args, 2)?;
            let a = args[0].as_int()?;
            let b = args[1].as_int()?;
            Ok(Value::Int(a % b))
        }
        "ASL" | "LSL" | "<<" => shift(op, args, true),
        "ASR" | "LSR" | ">>" | ">>>" => shift(op, args, false),
        "<B" => byte_mask(op, args, |v| v & 0xFF),
        ">B" => byte_mask(op, args, |v| v >> 8),
        "^B" => byte_mask(op, args, |v| v >> 16),
        "=" => comparison(op, args, |a, b| a == b),
        "!=" | "<>" | "><" => comparison(op, args, |a, b| a != b),
        "<" => comparison(op, args, |a, b| a < b),
        "<=" => comparison(op, args, |a, b| a <= b),
        ">" => comparison(op, args, |a, b| a > b),
        ">=" => comparison(op, args, |a, b| a >= b),
        "&" | "AND" => bitwise(op, args, |a, b| a & b),
        "|" | "OR" => bitwise(op, args, |a, b| a | b),
        "XOR" | "EOR" => bitwise(op, args, |a, b| a ^ b),
        "!" | "NOT" => {
            check_arity(op, &args, 1)?;
            Ok(Value::UInt(!args[0].as_uint()?))
        }
        other => Err(Error::syntax(format!("undefined operator '{other}'"))),
    }
}

/// `+`/`*` fold over all arguments; `-`/`/`/`DIV` fold starting from the
/// first argument, so a single-argument `-` or `/` is the identity rather
/// than a negation or reciprocal.
fn basic_arithmetic(op: &str, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::syntax(format!("{op} requires at least one argument")));
    }
    let terms: Result<Vec<f64>> = args.into_iter().map(Value::as_float).collect();
    let terms = terms?;

    let result = match op {
        "+" => terms.iter().sum::<f64>(),
        "*" => terms.iter().product::<f64>(),
        "-" => terms[1..].iter().fold(terms[0], |acc, t| acc - t),
        "/" | "DIV" => terms[1..].iter().fold(terms[0], |acc, t| acc / t),
        _ => unreachable!(),
    };

    if op == "DIV" {
        Ok(Value::Int(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

fn shift(op: &str, args: Vec<Value>, left: bool) -> Result<Value> {
    check_arity(op, &args, 2)?;
    let value = args[0].as_int()?;
    let amount = args[1].as_uint()? as u32;
    Ok(Value::Int(if left { value << amount } else { value >> amount }))
}

fn byte_mask(op: &str, args: Vec<Value>, f: impl Fn(u64) -> u64) -> Result<Value> {
    check_arity(op, &args, 1)?;
    let v = args[0].as_uint()?;
    if (op == "<B" || op == ">B") && v > 0xFFFF {
        return Err(Error::OutOfRange(format!("{op} argument {v:#x} exceeds 0xFFFF")));
    }
    Ok(Value::UInt(f(v)))
}

fn comparison(op: &str, args: Vec<Value>, f: impl Fn(f64, f64) -> bool) -> Result<Value> {
    check_arity(op, &args, 2)?;
    Ok(Value::Bool(f(args[0].as_float()?, args[1].as_float()?)))
}

fn bitwise(op: &str, args: Vec<Value>, f: impl Fn(i64, i64) -> i64) -> Result<Value> {
    check_arity(op, &args, 2)?;
    Ok(Value::Int(f(args[0].as_int()?, args[1].as_int()?)))
}
