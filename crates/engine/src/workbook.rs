//! Immutable workbook model consumed by the transpiler.
//!
//! The loader fills a `Workbook` once, up front; nothing in the translation
//! path mutates it afterwards.

use crate::cell::{Cell, CellKind, CellValue};
use crate::cell_id::CellId;
use crate::named_range::{NamedRange, NamedRangeStore};
use crate::sheet::Sheet;

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    names: NamedRangeStore,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet. Sheet titles must be unique (case-insensitive).
    pub fn add_sheet(&mut self, sheet: Sheet) -> Result<(), String> {
        if self.sheet(&sheet.name).is_some() {
            return Err(format!("duplicate sheet name '{}'", sheet.name));
        }
        self.sheets.push(sheet);
        Ok(())
    }

    /// Convenience for builders: add an empty sheet and return it.
    pub fn add_empty_sheet(&mut self, name: &str) -> Result<&mut Sheet, String> {
        self.add_sheet(Sheet::new(name))?;
        let idx = self.sheets.len() - 1;
        Ok(&mut self.sheets[idx])
    }

    /// Look up a sheet by title. Exact match wins; otherwise the lookup is
    /// case-insensitive, like the spreadsheet application's.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        let idx = self
            .sheets
            .iter()
            .position(|s| s.name == name)
            .or_else(|| self.sheets.iter().position(|s| s.name.eq_ignore_ascii_case(name)))?;
        Some(&mut self.sheets[idx])
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn define_name(&mut self, name: &str, target: &str) -> Result<(), String> {
        self.names.set(NamedRange::new(name, target))
    }

    pub fn defined_names(&self) -> &NamedRangeStore {
        &self.names
    }

    pub fn cell(&self, id: &CellId) -> Option<&Cell> {
        self.sheet(&id.sheet)?.get(id.row, id.col)
    }

    /// Cached value of a cell; Empty for missing sheets or cells.
    pub fn value(&self, id: &CellId) -> CellValue {
        self.sheet(&id.sheet)
            .map(|s| s.value(id.row, id.col).clone())
            .unwrap_or_default()
    }

    pub fn cell_kind(&self, id: &CellId) -> CellKind {
        self.sheet(&id.sheet)
            .map(|s| s.kind(id.row, id.col))
            .unwrap_or(CellKind::Literal)
    }

    pub fn formula_count(&self) -> usize {
        self.sheets.iter().map(Sheet::formula_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_lookup_case_insensitive() {
        let mut wb = Workbook::new();
        wb.add_empty_sheet("Report").unwrap();
        assert!(wb.sheet("Report").is_some());
        assert_eq!(wb.sheet("report").unwrap().name, "Report");
        assert!(wb.sheet("data").is_none());
    }

    #[test]
    fn test_duplicate_sheet_rejected() {
        let mut wb = Workbook::new();
        wb.add_empty_sheet("report").unwrap();
        assert!(wb.add_empty_sheet("REPORT").is_err());
    }

    #[test]
    fn test_value_and_kind() {
        let mut wb = Workbook::new();
        let sheet = wb.add_empty_sheet("report").unwrap();
        sheet.set_value(0, 0, CellValue::Number(1.0));
        sheet.set_formula(0, 1, "=A1*2");

        assert_eq!(wb.value(&CellId::new("report", 0, 0)), CellValue::Number(1.0));
        assert_eq!(wb.cell_kind(&CellId::new("report", 0, 1)), CellKind::Formula);
        assert_eq!(wb.value(&CellId::new("nope", 0, 0)), CellValue::Empty);
        assert_eq!(wb.formula_count(), 1);
    }
}
