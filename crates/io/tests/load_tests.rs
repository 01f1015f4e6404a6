// Integration tests for workbook loading
// Run with: cargo test -p sheetc-io --test load_tests

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use sheetc_engine::cell::{CellKind, CellValue};
use sheetc_engine::cell_id::CellId;
use sheetc_engine::layout::ReportLayout;
use sheetc_engine::sheet::MergedRegion;
use sheetc_engine::transpile;
use sheetc_io::load_workbook;

const LAYOUT: &str = r#"
accessor = "accessor"
expected_report_files = 2

[accessors]
C4 = "counter_timer_freq"

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

/// report: a frequency, one per-thread column with a total, one merged column.
/// data: the raw counter the frequency reads.
fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("report.xlsx");
    let mut book = XlsxWorkbook::new();

    let report = book.add_worksheet().set_name("report").unwrap();
    report.write_string(0, 0, "Frequency").unwrap();
    report.write_formula(0, 1, "=data!C4").unwrap();
    report.write_string(2, 0, "Per thread").unwrap();
    report.write_string(3, 1, "Cycles").unwrap();
    report.write_string(3, 2, "Peak").unwrap();
    report.write_formula(4, 1, "=B1/2").unwrap();
    report.write_formula(5, 1, "=Freq/4").unwrap();
    report.write_formula(6, 1, "=SUM(B5:B6)").unwrap();
    report.merge_range(4, 2, 6, 2, "", &Format::new()).unwrap();
    report.write_formula(4, 2, "=MAX(B5:B6)").unwrap();

    let data = book.add_worksheet().set_name("data").unwrap();
    data.write_number(3, 2, 2000.0).unwrap();

    book.define_name("Freq", "=data!$C$4").unwrap();
    book.save(&path).unwrap();
    path
}

#[test]
fn loads_values_formulas_names_and_merges() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path());

    let (workbook, result) = load_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["report", "data"]);
    assert_eq!(result.sheets_loaded, 2);
    assert_eq!(result.formulas_loaded, 5);
    assert_eq!(result.names_loaded, 1);
    assert_eq!(result.merges_loaded, 1);

    let report = workbook.sheet("report").unwrap();
    assert_eq!(report.value(0, 0), &CellValue::Text("Frequency".into()));
    assert_eq!(report.get(0, 1).unwrap().formula.as_deref(), Some("=data!C4"));
    assert_eq!(report.get(6, 1).unwrap().formula.as_deref(), Some("=SUM(B5:B6)"));
    assert_eq!(report.merged_regions, vec![MergedRegion::new((4, 2), (6, 2))]);
    assert_eq!(workbook.cell_kind(&CellId::new("report", 5, 2)), CellKind::Merged);
    assert_eq!(workbook.cell_kind(&CellId::new("report", 4, 2)), CellKind::Formula);

    let data = workbook.sheet("data").unwrap();
    assert_eq!(data.value(3, 2), &CellValue::Number(2000.0));

    let name = workbook.defined_names().get("freq").unwrap();
    assert_eq!(name.target, "data!$C$4");
}

#[test]
fn unsupported_function_in_loaded_workbook_names_the_cell() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path());
    let (workbook, _) = load_workbook(&path).unwrap();
    let layout = ReportLayout::from_toml(LAYOUT).unwrap();

    let err = transpile(&workbook, &layout, "report.xlsx").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("MAX"), "{message}");
    assert!(message.contains("report!C5"), "{message}");
}

#[test]
fn transpiles_loaded_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path());
    let (mut workbook, _) = load_workbook(&path).unwrap();
    workbook.sheet_mut("report").unwrap().set_formula(4, 2, "=B5+B6");
    let layout = ReportLayout::from_toml(LAYOUT).unwrap();

    let out = transpile(&workbook, &layout, "report.xlsx").unwrap();
    assert!(out.program.contains("report_B1 = accessor.get_counter_timer_freq()\n"));
    assert!(out.program.contains("report_B6 = accessor.get_counter_timer_freq() / 4\n"));
    assert!(out.program.contains("report_C5 = report_B5 + report_B6\n"));
    assert!(out.program.contains("add_path(['Per thread'], 'Peak', report_C5, results)\n"));
    assert!(out.warnings.is_empty());
}

#[test]
fn rejects_non_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.xlsx");
    std::fs::write(&path, "not a workbook").unwrap();
    assert!(load_workbook(&path).is_err());
}
