//! Expression tree for translated formulas.
//!
//! The parser builds an `Expr` following the spreadsheet's precedence and
//! associativity; `render` turns it into target source text, adding
//! parentheses only where the target language would group differently.

use std::fmt;

use super::functions::Function;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn from_excel(op: &str) -> Option<Self> {
        match op {
            "-" => Some(Self::Neg),
            "+" => Some(Self::Plus),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// Infix operator as written in a formula. The union operator `,` and the
    /// intersection (space) operator are not supported.
    pub fn from_excel(op: &str) -> Option<Self> {
        Some(match op {
            "=" => Self::Eq,
            "<>" => Self::Ne,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "&" => Self::Concat,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "^" => Self::Pow,
            _ => return None,
        })
    }

    /// Binding strength in the spreadsheet grammar. All levels are
    /// left-associative.
    pub fn excel_precedence(self) -> u8 {
        match self {
            Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge => 1,
            Self::Concat => 2,
            Self::Add | Self::Sub => 3,
            Self::Mul | Self::Div => 4,
            Self::Pow => 5,
        }
    }

    /// Operator text in the generated program (`=` -> `==`, `^` -> `**`).
    pub fn target_symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Concat => "&",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }

    fn is_comparison(self) -> bool {
        self.excel_precedence() == 1
    }
}

// Target-side binding strengths.
const PREC_CONDITIONAL: u8 = 1;
const PREC_COMPARISON: u8 = 4;
const PREC_ADDITIVE: u8 = 6;
const PREC_MULTIPLICATIVE: u8 = 7;
const PREC_UNARY: u8 = 8;
const PREC_POWER: u8 = 9;
const PREC_ATOM: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal text, e.g. `1.5E+3`
    Number(String),
    /// String literal, already quoted for the target
    Text(String),
    Bool(bool),
    /// Variable bound by an earlier instruction
    Var(String),
    /// Opaque target expression (accessor calls, label strings)
    Raw(String),
    /// Members of a range, in row-major order
    List(Vec<Expr>),
    /// Parentheses present in the source formula
    Group(Box<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Postfix `%`
    Percent(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Call { func: Function, args: Vec<Expr> },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::Unary { op, operand: Box::new(operand) }
    }

    pub fn conditional(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::Conditional { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) }
    }

    /// Render as target source text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(n) if n.starts_with('-') => PREC_UNARY,
            Expr::Unary { .. } => PREC_UNARY,
            Expr::Binary { op, .. } => match op {
                BinaryOp::Concat => PREC_ATOM,
                BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
                BinaryOp::Mul | BinaryOp::Div => PREC_MULTIPLICATIVE,
                BinaryOp::Pow => PREC_POWER,
                _ => PREC_COMPARISON,
            },
            Expr::Conditional { .. } => PREC_CONDITIONAL,
            _ => PREC_ATOM,
        }
    }

    fn write(&self, out: &mut String) {
        match self {
            Expr::Number(text) | Expr::Text(text) | Expr::Var(text) | Expr::Raw(text) => out.push_str(text),
            Expr::Bool(b) => out.push_str(if *b { "True" } else { "False" }),
            Expr::List(items) => {
                out.push('[');
                write_joined(out, items);
                out.push(']');
            }
            Expr::Group(inner) => {
                out.push('(');
                inner.write(out);
                out.push(')');
            }
            Expr::Unary { op, operand } => {
                out.push_str(op.symbol());
                write_operand(out, operand, PREC_UNARY, false);
            }
            Expr::Percent(inner) => {
                out.push('(');
                write_operand(out, inner, PREC_MULTIPLICATIVE, false);
                out.push_str(" / 100)");
            }
            Expr::Binary { op: BinaryOp::Concat, left, right } => {
                out.push_str("xls_concat(");
                left.write(out);
                out.push_str(", ");
                right.write(out);
                out.push(')');
            }
            Expr::Binary { op, left, right } => {
                let prec = self.precedence();
                let strict = op.is_comparison() || *op == BinaryOp::Pow;
                write_operand(out, left, prec, strict);
                out.push(' ');
                out.push_str(op.target_symbol());
                out.push(' ');
                write_operand(out, right, prec, true);
            }
            Expr::Conditional { cond, then, otherwise } => {
                write_conditional(out, cond, then, otherwise);
            }
            Expr::Call { func, args } => func.write_call(out, args),
        }
    }
}

/// Write `child`, parenthesized when it binds looser than `parent_prec` (or
/// equally, if `strict`).
fn write_operand(out: &mut String, child: &Expr, parent_prec: u8, strict: bool) {
    let prec = child.precedence();
    if prec < parent_prec || (strict && prec == parent_prec) {
        out.push('(');
        child.write(out);
        out.push(')');
    } else {
        child.write(out);
    }
}

pub(crate) fn write_joined(out: &mut String, items: &[Expr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write(out);
    }
}

pub(crate) fn write_conditional(out: &mut String, cond: &Expr, then: &Expr, otherwise: &Expr) {
    out.push('(');
    then.write(out);
    out.push_str(") if (");
    cond.write(out);
    out.push_str(") else (");
    otherwise.write(out);
    out.push(')');
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote `s` as a single-quoted target string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// String operand from a formula (`"yes"`). Kept verbatim when the target
/// reads it the same way; requoted when it carries `""` escapes,
/// backslashes or control characters.
pub fn text_literal(raw: &str) -> Expr {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    if inner.contains(['"', '\\']) || inner.chars().any(char::is_control) {
        Expr::Text(py_str(&inner.replace("\"\"", "\"")))
    } else {
        Expr::Text(format!("\"{inner}\""))
    }
}
