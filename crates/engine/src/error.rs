use std::fmt;

use crate::cell_id::CellId;

#[derive(Debug, Clone, PartialEq)]
pub enum TranspileError {
    /// Unknown defined name, malformed reference, or missing sheet.
    Resolution { reference: String, reason: String },
    /// Token shape or function name outside the supported grammar.
    Unsupported { cell: Option<String>, construct: String },
    /// Structurally broken formula (missing close, bad arity, leftovers).
    Parse { cell: Option<String>, message: String },
    /// Formula text the tokenizer could not split.
    Tokenize { cell: Option<String>, message: String },
    /// Circular reference, as the chain of cells that closed the loop.
    Cycle { chain: Vec<String> },
    /// Broken internal invariant or caller mistake.
    Structural(String),
    /// Layout configuration error.
    Config(String),
}

impl TranspileError {
    pub fn resolution(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution { reference: reference.into(), reason: reason.into() }
    }

    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported { cell: None, construct: construct.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { cell: None, message: message.into() }
    }

    /// Attach the cell whose formula was being translated, unless one is
    /// already recorded (the innermost cell wins).
    pub fn in_cell(mut self, id: &CellId) -> Self {
        match &mut self {
            Self::Unsupported { cell, .. } | Self::Parse { cell, .. } | Self::Tokenize { cell, .. } => {
                if cell.is_none() {
                    *cell = Some(id.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

fn cell_prefix(cell: &Option<String>) -> String {
    match cell {
        Some(c) => format!("{c}: "),
        None => String::new(),
    }
}

impl fmt::Display for TranspileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { reference, reason } => {
                write!(f, "cannot resolve '{reference}': {reason}")
            }
            Self::Unsupported { cell, construct } => {
                write!(f, "{}unsupported construct: {construct}", cell_prefix(cell))
            }
            Self::Parse { cell, message } => {
                write!(f, "{}formula parse error: {message}", cell_prefix(cell))
            }
            Self::Tokenize { cell, message } => {
                write!(f, "{}formula tokenize error: {message}", cell_prefix(cell))
            }
            Self::Cycle { chain } => write!(f, "circular reference: {}", chain.join(" -> ")),
            Self::Structural(msg) => write!(f, "internal invariant violated: {msg}"),
            Self::Config(msg) => write!(f, "layout config error: {msg}"),
        }
    }
}

impl std::error::Error for TranspileError {}

/// Non-fatal conditions collected during translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A reference landed on a merged cell that is not the region's anchor.
    MergedCell { cell: CellId },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergedCell { cell } => {
                write!(f, "{cell} is covered by a merged region; using its own (empty) value")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_cell_keeps_innermost() {
        let inner = CellId::new("report", 1, 1);
        let outer = CellId::new("report", 0, 0);
        let err = TranspileError::unsupported("VLOOKUP(").in_cell(&inner).in_cell(&outer);
        assert_eq!(err.to_string(), "report!B2: unsupported construct: VLOOKUP(");
    }

    #[test]
    fn cycle_display() {
        let err = TranspileError::Cycle {
            chain: vec!["report!A1".into(), "report!B1".into(), "report!A1".into()],
        };
        assert_eq!(err.to_string(), "circular reference: report!A1 -> report!B1 -> report!A1");
    }
}
