use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellKind, CellValue};

/// A merged cell region. Only the anchor (top-left) cell carries a value;
/// every other cell of the region is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    /// (row, col) of the anchor cell, 0-based
    pub start: (usize, usize),
    /// (row, col) of the bottom-right cell, 0-based, inclusive
    pub end: (usize, usize),
}

impl MergedRegion {
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start.0 && row <= self.end.0 && col >= self.start.1 && col <= self.end.1
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        (row, col) == self.start
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    cells: HashMap<(usize, usize), Cell>,
    pub merged_regions: Vec<MergedRegion>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), cells: HashMap::new(), merged_regions: Vec::new() }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cached value at (row, col); Empty when the cell was never written.
    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&(row, col)).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        let entry = self.cells.entry((row, col)).or_default();
        entry.value = value;
    }

    /// Attach a formula, keeping whatever cached value the cell already has.
    pub fn set_formula(&mut self, row: usize, col: usize, formula: &str) {
        let cached = self.value(row, col).clone();
        self.cells.insert((row, col), Cell::formula(formula, cached));
    }

    /// Register a merged region. Overlapping an existing region is rejected.
    pub fn add_merge(&mut self, region: MergedRegion) -> Result<(), String> {
        if region.end.0 < region.start.0 || region.end.1 < region.start.1 {
            return Err(format!("inverted merge region {:?}", region));
        }
        for existing in &self.merged_regions {
            let disjoint = region.end.0 < existing.start.0
                || region.start.0 > existing.end.0
                || region.end.1 < existing.start.1
                || region.start.1 > existing.end.1;
            if !disjoint {
                return Err(format!("merge {:?} overlaps {:?}", region, existing));
            }
        }
        self.merged_regions.push(region);
        Ok(())
    }

    /// True when (row, col) lies in a merged region without being its anchor.
    pub fn is_merge_hidden(&self, row: usize, col: usize) -> bool {
        self.merged_regions
            .iter()
            .any(|m| m.contains(row, col) && !m.is_anchor(row, col))
    }

    pub fn kind(&self, row: usize, col: usize) -> CellKind {
        if self.is_merge_hidden(row, col) {
            return CellKind::Merged;
        }
        match self.get(row, col) {
            Some(cell) if cell.formula.is_some() => CellKind::Formula,
            _ => CellKind::Literal,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|c| c.formula.is_some()).count()
    }
}
