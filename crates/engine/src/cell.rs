use serde::{Deserialize, Serialize};

use crate::formula::expr::{py_str, Expr};

/// Cached value of a cell, as the spreadsheet application last computed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Display text, used for labels and header lookups.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }

    /// Literal expression for this value in the generated program.
    ///
    /// Empty cells become `''`, which the runtime helpers treat as "skip".
    pub fn to_expr(&self) -> Expr {
        match self {
            CellValue::Empty => Expr::Text(py_str("")),
            CellValue::Text(s) | CellValue::Error(s) => Expr::Text(py_str(s)),
            CellValue::Number(n) => Expr::Number(format_number(*n)),
            CellValue::Boolean(b) => Expr::Bool(*b),
        }
    }
}

/// Format a number the way a literal would be written: integers without a
/// fractional part, everything else with Rust's shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One cell: the cached value plus the formula that produced it, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// Formula text including the leading `=`
    pub formula: Option<String>,
}

impl Cell {
    pub fn literal(value: CellValue) -> Self {
        Self { value, formula: None }
    }

    pub fn formula(formula: impl Into<String>, cached: CellValue) -> Self {
        let formula = formula.into();
        let formula = if formula.starts_with('=') { formula } else { format!("={formula}") };
        Self { value: cached, formula: Some(formula) }
    }
}

/// What the cell accessor reports for a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Formula,
    Literal,
    /// Inside a merged region but not its top-left anchor
    Merged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.1), "0.1");
    }

    #[test]
    fn test_to_expr() {
        assert_eq!(CellValue::Number(2.0).to_expr().render(), "2");
        assert_eq!(CellValue::Empty.to_expr().render(), "''");
        assert_eq!(CellValue::Text("it's".into()).to_expr().render(), "'it\\'s'");
        assert_eq!(CellValue::Boolean(true).to_expr().render(), "True");
    }

    #[test]
    fn test_formula_prefix() {
        let cell = Cell::formula("A1+1", CellValue::Number(2.0));
        assert_eq!(cell.formula.as_deref(), Some("=A1+1"));
        let cell = Cell::formula("=A1+1", CellValue::Empty);
        assert_eq!(cell.formula.as_deref(), Some("=A1+1"));
    }
}
