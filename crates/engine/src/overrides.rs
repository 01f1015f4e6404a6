//! Raw-value shortcuts.
//!
//! Some cells are not translated from their formula at all: labels are
//! copied as strings, hand-entered constants keep their value, and profiler
//! readings become calls on the accessor object of the generated program.

use crate::cell::CellValue;
use crate::cell_id::{parse_a1, CellId};
use crate::error::TranspileError;
use crate::formula::expr::{py_str, Expr};
use crate::layout::{Accessor, ReportLayout};
use crate::workbook::Workbook;

#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// Cell on the label sheet
    Label(String),
    /// Allow-listed hand-entered value on the data sheet
    Constant(CellValue),
    /// Named single-value getter
    Accessor(Accessor),
    /// Event counter reading for one thread
    Event { name: String, thread: usize },
}

impl Override {
    /// Expression for this override, calling getters on `accessor_obj`.
    pub fn to_expr(&self, accessor_obj: &str) -> Expr {
        match self {
            Override::Label(text) => Expr::Text(py_str(text)),
            Override::Constant(value) => value.to_expr(),
            Override::Accessor(accessor) => Expr::Raw(format!("{accessor_obj}.{}()", accessor.method())),
            Override::Event { name, thread } => {
                Expr::Raw(format!("{accessor_obj}.get_event({}, {thread})", py_str(name)))
            }
        }
    }
}

/// The override for `cell`, if any. Checked in order: label sheet, constant
/// allow-list, named accessors, event table.
pub fn raw_override(
    workbook: &Workbook,
    layout: &ReportLayout,
    cell: &CellId,
) -> Result<Option<Override>, TranspileError> {
    if cell.sheet.eq_ignore_ascii_case(&layout.label_sheet) {
        return Ok(Some(Override::Label(workbook.value(cell).display())));
    }
    if !cell.sheet.eq_ignore_ascii_case(&layout.data_sheet) {
        return Ok(None);
    }

    let at_cell = |coord: &String| parse_a1(coord) == Some((cell.row, cell.col));

    if layout.constants.iter().any(at_cell) {
        return Ok(Some(Override::Constant(workbook.value(cell))));
    }

    if let Some((_, accessor)) = layout.accessors.iter().find(|(coord, _)| at_cell(coord)) {
        return Ok(Some(Override::Accessor(*accessor)));
    }

    if let Some(table) = &layout.event_table {
        if table.contains(cell.row, cell.col) {
            let header = CellId::new(cell.sheet.clone(), table.header_row_index(), cell.col);
            let name = workbook.value(&header).display();
            if name.trim().is_empty() {
                return Err(TranspileError::resolution(
                    cell.to_string(),
                    format!("event header {header} is empty"),
                ));
            }
            return Ok(Some(Override::Event { name, thread: table.thread(cell.row) }));
        }
    }

    Ok(None)
}
