//! Report driver: walks the layout's entries, ensures every exported cell
//! and records where its value goes in the result document.

use crate::cell::CellKind;
use crate::cell_id::{col_range, CellId};
use crate::codegen::Session;
use crate::error::TranspileError;
use crate::layout::{ReportEntry, ReportLayout};
use crate::output::{OutputMapping, OutputValue};

/// Translate every cell the layout exports and build the output mapping.
pub fn build_outputs(session: &mut Session, layout: &ReportLayout) -> Result<OutputMapping, TranspileError> {
    let workbook = session.workbook();
    let sheet = workbook
        .sheet(&layout.default_sheet)
        .ok_or_else(|| {
            TranspileError::resolution(layout.default_sheet.clone(), "report sheet not found in workbook")
        })?
        .name
        .as_str();
    let label_of = |coord: &str| -> Result<String, TranspileError> {
        Ok(workbook.value(&cell_at(sheet, coord)?).display())
    };

    let mut outputs = OutputMapping::new();
    for entry in &layout.entries {
        match entry {
            ReportEntry::Single { path, label, value } => {
                let var = session.ensure_instruction(&cell_at(sheet, value)?)?;
                let path = path.iter().map(|p| label_of(p.as_str())).collect::<Result<Vec<_>, _>>()?;
                outputs.push(path, label_of(label.as_str())?, OutputValue::Single(var));
            }
            ReportEntry::Table { path, first_column, last_column, header_row, first_row, rows } => {
                let columns = col_range(first_column, last_column).ok_or_else(|| {
                    TranspileError::Config(format!("invalid column range {first_column}:{last_column}"))
                })?;
                let path = path.iter().map(|p| label_of(p.as_str())).collect::<Result<Vec<_>, _>>()?;
                for col in columns {
                    let key = label_of(format!("{col}{header_row}").as_str())?;
                    let first = cell_at(sheet, &format!("{col}{first_row}"))?;

                    // A merged block under the first cell means the column holds one value.
                    if workbook.cell_kind(&first.offset_rows(1)) == CellKind::Merged {
                        let var = session.ensure_instruction(&first)?;
                        outputs.push(path.clone(), key, OutputValue::Single(var));
                        continue;
                    }

                    let mut members = Vec::with_capacity(*rows);
                    for offset in 0..*rows {
                        members.push(session.ensure_instruction(&first.offset_rows(offset))?);
                    }
                    // total row: emitted, not exported
                    session.ensure_instruction(&first.offset_rows(*rows))?;
                    outputs.push(path.clone(), key, OutputValue::Column(members));
                }
            }
        }
    }

    log::info!("{} output entries, {} instructions", outputs.len(), session.instructions().len());
    Ok(outputs)
}

fn cell_at(sheet: &str, coord: &str) -> Result<CellId, TranspileError> {
    CellId::from_a1(sheet, coord).ok_or_else(|| TranspileError::resolution(coord, "not a cell coordinate"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::sheet::MergedRegion;
    use crate::workbook::Workbook;

    const LAYOUT: &str = r#"
[[entry]]
kind = "single"
label = "A1"
value = "B1"

[[entry]]
kind = "table"
path = ["A3"]
first_column = "B"
last_column = "C"
header_row = 4
first_row = 5
rows = 2
"#;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let s = wb.add_empty_sheet("report").unwrap();
        s.set_value(0, 0, CellValue::Text("Elapsed".into()));
        s.set_value(0, 1, CellValue::Number(1.5));
        s.set_value(2, 0, CellValue::Text("Stats".into()));
        s.set_value(3, 1, CellValue::Text("IPC".into()));
        s.set_value(3, 2, CellValue::Text("Total".into()));
        // column B: two rows plus a total
        s.set_value(4, 1, CellValue::Number(1.0));
        s.set_value(5, 1, CellValue::Number(2.0));
        s.set_formula(6, 1, "=SUM(B5:B6)");
        // column C: merged block, single value
        s.set_value(4, 2, CellValue::Number(9.0));
        s.add_merge(MergedRegion::new((4, 2), (6, 2))).unwrap();
        wb
    }

    #[test]
    fn builds_singles_columns_and_merged_singles() {
        let wb = workbook();
        let layout = ReportLayout::from_toml(LAYOUT).unwrap();
        let mut session = Session::new(&wb, &layout);
        let outputs = build_outputs(&mut session, &layout).unwrap();

        let rendered: Vec<String> = outputs.entries().iter().map(|e| e.render()).collect();
        assert_eq!(
            rendered,
            vec![
                "add_path([], 'Elapsed', report_B1, results)",
                "add_path(['Stats'], 'IPC', [e for e in [report_B5, report_B6] if e != ''], results)",
                "add_path(['Stats'], 'Total', report_C5, results)",
            ]
        );

        let names: Vec<&str> = session.instructions().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["report_B1", "report_B5", "report_B6", "report_B7", "report_C5"]);
        assert!(session.warnings().is_empty());
    }

    #[test]
    fn missing_report_sheet() {
        let mut wb = Workbook::new();
        wb.add_empty_sheet("other").unwrap();
        let layout = ReportLayout::from_toml(LAYOUT).unwrap();
        let mut session = Session::new(&wb, &layout);
        assert!(matches!(build_outputs(&mut session, &layout), Err(TranspileError::Resolution { .. })));
    }
}
