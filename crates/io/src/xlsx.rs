//! Workbook loading through calamine (xlsx, xlsm, xls, xlsb, ods).
//!
//! Both layers of every sheet are read: the cached values the spreadsheet
//! application last computed, and the formula text behind them. Defined
//! names come from the workbook; merged regions from the package XML.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use sheetc_engine::cell::CellValue;
use sheetc_engine::sheet::Sheet;
use sheetc_engine::workbook::Workbook;

use crate::merges;

/// Maximum dimensions for a sheet
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Counters reported after a load
#[derive(Debug, Default, Clone)]
pub struct LoadResult {
    pub sheets_loaded: usize,
    pub values_loaded: usize,
    pub formulas_loaded: usize,
    pub names_loaded: usize,
    pub merges_loaded: usize,
    /// Merged regions dropped because they overlap an earlier one
    pub merges_dropped: usize,
    /// Defined names the workbook model rejected
    pub names_skipped: Vec<String>,
}

impl LoadResult {
    /// Returns a summary message suitable for display
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} sheet{}", self.sheets_loaded, if self.sheets_loaded == 1 { "" } else { "s" }),
            format!("{} values", self.values_loaded),
            format!("{} formulas", self.formulas_loaded),
        ];
        if self.names_loaded > 0 {
            parts.push(format!("{} names", self.names_loaded));
        }
        if self.merges_loaded > 0 {
            parts.push(format!("{} merged regions", self.merges_loaded));
        }
        parts.join(", ")
    }
}

/// Load every sheet of the workbook at `path`.
pub fn load_workbook(path: &Path) -> Result<(Workbook, LoadResult), String> {
    let mut source: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("Failed to open workbook '{}': {}", path.display(), e))?;

    let sheet_names: Vec<String> = source.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(format!("'{}' contains no sheets", path.display()));
    }

    let mut result = LoadResult::default();
    let mut workbook = Workbook::new();

    for sheet_name in &sheet_names {
        let mut sheet = Sheet::new(sheet_name.as_str());

        let range = source
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row as usize + row_idx;
            if target_row >= MAX_ROWS {
                break;
            }
            for (col_idx, data) in row.iter().enumerate() {
                let target_col = start_col as usize + col_idx;
                if target_col >= MAX_COLS {
                    break;
                }
                let value = cell_value(data);
                if !value.is_empty() {
                    sheet.set_value(target_row, target_col, value);
                    result.values_loaded += 1;
                }
            }
        }

        // Formula range may start at a different offset than data range
        match source.worksheet_formula(sheet_name) {
            Ok(formulas) => {
                let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
                for (row_idx, row) in formulas.rows().enumerate() {
                    let target_row = start_row as usize + row_idx;
                    for (col_idx, formula) in row.iter().enumerate() {
                        if formula.is_empty() {
                            continue;
                        }
                        let target_col = start_col as usize + col_idx;
                        if target_row >= MAX_ROWS || target_col >= MAX_COLS {
                            continue;
                        }
                        let text = if formula.starts_with('=') { formula.clone() } else { format!("={}", formula) };
                        sheet.set_formula(target_row, target_col, &strip_ods_prefix(&text));
                        result.formulas_loaded += 1;
                    }
                }
            }
            Err(e) => log::debug!("no formulas for sheet '{}': {}", sheet_name, e),
        }

        workbook.add_sheet(sheet)?;
        result.sheets_loaded += 1;
    }

    for (name, target) in source.defined_names() {
        match workbook.define_name(name, target) {
            Ok(()) => result.names_loaded += 1,
            Err(e) => {
                log::warn!("skipping defined name '{}': {}", name, e);
                result.names_skipped.push(name.clone());
            }
        }
    }

    if merges::is_ooxml(path) {
        let regions = merges::read_merged_regions(path, &sheet_names)?;
        for (sheet_name, regions) in sheet_names.iter().zip(regions) {
            let Some(sheet) = workbook.sheet_mut(sheet_name) else {
                continue;
            };
            for region in regions {
                match sheet.add_merge(region) {
                    Ok(()) => result.merges_loaded += 1,
                    Err(e) => {
                        log::warn!("sheet '{}': {}", sheet_name, e);
                        result.merges_dropped += 1;
                    }
                }
            }
        }
    }

    log::info!("loaded {}: {}", path.display(), result.summary());
    Ok((workbook, result))
}

/// Cached value of one calamine cell.
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        // Dates are serial numbers to the formulas that read them.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// ODS files use prefixed function names like `=of:SUM(A1:A10)` and `;` as
/// the argument separator. Rewrite them to `=SUM(A1:A10)` with commas.
fn strip_ods_prefix(formula: &str) -> String {
    if !formula.starts_with("=of:") && !formula.starts_with("=OF:") {
        return formula.to_string();
    }

    let mut result = String::with_capacity(formula.len());
    let mut in_string = false;
    let mut rest = &formula[1..];
    result.push('=');

    while let Some(c) = rest.chars().next() {
        if c == '"' {
            in_string = !in_string;
        }
        if !in_string && rest.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("of:")) {
            rest = &rest[3..];
            continue;
        }
        result.push(if c == ';' && !in_string { ',' } else { c });
        rest = &rest[c.len_utf8()..];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ods_prefix() {
        assert_eq!(strip_ods_prefix("=of:SUM(A1:A10)"), "=SUM(A1:A10)");
        assert_eq!(strip_ods_prefix("=OF:IF(of:OR(A1>0;B1>0);1;0)"), "=IF(OR(A1>0,B1>0),1,0)");
        assert_eq!(strip_ods_prefix("=of:IF(A1>0;\"yes;of:no\";0)"), "=IF(A1>0,\"yes;of:no\",0)");
        assert_eq!(strip_ods_prefix("=A1+B1"), "=A1+B1");
    }

    #[test]
    fn test_cell_value() {
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Boolean(true));
        assert_eq!(cell_value(&Data::Error(calamine::CellErrorType::Div0)), CellValue::Error("#DIV/0!".into()));
    }

    #[test]
    fn test_summary() {
        let result = LoadResult { sheets_loaded: 1, values_loaded: 4, formulas_loaded: 2, ..Default::default() };
        assert_eq!(result.summary(), "1 sheet, 4 values, 2 formulas");
    }

    #[test]
    fn test_missing_file() {
        let err = load_workbook(Path::new("/nonexistent/report.xlsx")).unwrap_err();
        assert!(err.contains("Failed to open workbook"));
    }
}
