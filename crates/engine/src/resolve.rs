//! Reference resolution.
//!
//! Turns operand text from a formula (`C4`, `$C$4`, `data!C4`,
//! `'my sheet'!A1:A12`, a defined name) into canonical `CellId`s against an
//! immutable workbook. Pure lookup: no side effects.

use crate::cell_id::{parse_a1, CellId};
use crate::error::TranspileError;
use crate::workbook::Workbook;

/// Defined names may point at other defined names; stop following after this.
const MAX_NAME_DEPTH: usize = 8;

/// Largest range, in cells, that is expanded into members.
pub const MAX_RANGE_CELLS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Cell(CellId),
    /// Members in row-major order
    Range(Vec<CellId>),
}

impl Resolved {
    pub fn cells(&self) -> &[CellId] {
        match self {
            Resolved::Cell(id) => std::slice::from_ref(id),
            Resolved::Range(ids) => ids,
        }
    }

    pub fn into_cells(self) -> Vec<CellId> {
        match self {
            Resolved::Cell(id) => vec![id],
            Resolved::Range(ids) => ids,
        }
    }
}

/// Resolve `raw` against `workbook`, treating unqualified references as
/// belonging to `current_sheet`.
pub fn resolve(workbook: &Workbook, raw: &str, current_sheet: &str) -> Result<Resolved, TranspileError> {
    resolve_at_depth(workbook, raw, current_sheet, 0)
}

/// Resolve a reference that must denote exactly one cell.
pub fn resolve_cell(workbook: &Workbook, raw: &str, current_sheet: &str) -> Result<CellId, TranspileError> {
    match resolve(workbook, raw, current_sheet)? {
        Resolved::Cell(id) => Ok(id),
        Resolved::Range(_) => Err(TranspileError::resolution(raw, "expected a single cell, got a range")),
    }
}

fn resolve_at_depth(
    workbook: &Workbook,
    raw: &str,
    current_sheet: &str,
    depth: usize,
) -> Result<Resolved, TranspileError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TranspileError::resolution(raw, "empty reference"));
    }
    if text.starts_with('[') {
        return Err(TranspileError::resolution(raw, "external workbook references are not supported"));
    }

    if let Some(named) = workbook.defined_names().get(text) {
        if depth >= MAX_NAME_DEPTH {
            return Err(TranspileError::resolution(raw, "defined name chain too deep"));
        }
        return resolve_at_depth(workbook, &named.target, current_sheet, depth + 1);
    }

    let (sheet_part, coord_part) = split_sheet(text).map_err(|reason| TranspileError::resolution(raw, reason))?;
    let sheet_name = sheet_part.as_deref().unwrap_or(current_sheet);
    let sheet = workbook
        .sheet(sheet_name)
        .ok_or_else(|| TranspileError::resolution(raw, format!("no sheet named '{sheet_name}'")))?;
    let sheet_name = sheet.name.as_str();

    match coord_part.split_once(':') {
        Some((first, last)) => {
            // `data!A1:data!A3` repeats the sheet on the second half; accept it
            // when it names the same sheet.
            let last = match split_sheet(last) {
                Ok((Some(other), rest)) if other.eq_ignore_ascii_case(sheet_name) => rest,
                Ok((None, rest)) => rest,
                _ => return Err(TranspileError::resolution(raw, "range spans sheets")),
            };
            let (r1, c1) = parse_a1(first).ok_or_else(|| malformed(raw))?;
            let (r2, c2) = parse_a1(&last).ok_or_else(|| malformed(raw))?;
            let height = r1.abs_diff(r2) + 1;
            let width = c1.abs_diff(c2) + 1;
            match height.checked_mul(width) {
                Some(n) if n <= MAX_RANGE_CELLS => {}
                _ => {
                    return Err(TranspileError::resolution(
                        raw,
                        format!("range of {height}x{width} cells exceeds the limit of {MAX_RANGE_CELLS}"),
                    ))
                }
            }
            let mut cells = Vec::with_capacity(height * width);
            for row in r1.min(r2)..=r1.max(r2) {
                for col in c1.min(c2)..=c1.max(c2) {
                    cells.push(CellId::new(sheet_name, row, col));
                }
            }
            Ok(Resolved::Range(cells))
        }
        None => match parse_a1(&coord_part) {
            Some((row, col)) => Ok(Resolved::Cell(CellId::new(sheet_name, row, col))),
            None if sheet_part.is_none() => {
                Err(TranspileError::resolution(raw, "not a cell reference or defined name"))
            }
            None => Err(malformed(raw)),
        },
    }
}

fn malformed(raw: &str) -> TranspileError {
    TranspileError::resolution(raw, "malformed cell reference (whole rows/columns are not supported)")
}

/// Split `sheet!coord` into its parts, unquoting `'my sheet'!A1`.
/// Returns `(None, text)` when there is no sheet qualifier.
pub fn split_sheet(text: &str) -> Result<(Option<String>, String), String> {
    if let Some(rest) = text.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if let Some(&(_, '\'')) = chars.peek() {
                    chars.next();
                    name.push('\'');
                    continue;
                }
                let after = &rest[i + 1..];
                return match after.strip_prefix('!') {
                    Some(coord) => Ok((Some(name), coord.to_string())),
                    None => Err("quoted sheet name must be followed by '!'".into()),
                };
            }
            name.push(ch);
        }
        return Err("unterminated quoted sheet name".into());
    }

    match text.split_once('!') {
        Some((sheet, coord)) => Ok((Some(sheet.to_string()), coord.to_string())),
        None => Ok((None, text.to_string())),
    }
}
