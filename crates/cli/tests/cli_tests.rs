// Integration tests for the sheetc binary
// Run with: cargo test -p sheetc-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rust_xlsxwriter::{Format, Workbook};

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

/// One profiler report: a single thread on CMG 0 with one event in the
/// "kernel" region.
const PA_XML: &str = r#"<?xml version="1.0"?>
<fapp>
  <environment>
    <measured_time>2024-05-01 10:00:00</measured_time>
    <vector_length vlen="512"/>
    <spawn>
      <process id="0">
        <host name="node01"/>
        <cntfrq>2000</cntfrq>
        <thread id="0"><cmg id="0"/></thread>
      </process>
    </spawn>
  </environment>
  <information>
    <region name="kernel" id="1">
      <spawn>
        <process id="0">
          <thread id="0"><cpupa><event name="0x0011">12345</event></cpupa></thread>
        </process>
      </spawn>
    </region>
  </information>
</fapp>
"#;

fn sheetc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sheetc"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// Report workbook plus layout file in `dir`. `peak` is the formula of the
/// merged column's anchor.
fn write_fixture(dir: &Path, peak: &str) -> (PathBuf, PathBuf) {
    let path = dir.join("report.xlsx");
    let mut book = Workbook::new();

    let report = book.add_worksheet().set_name("report").unwrap();
    report.write_string(0, 0, "Frequency").unwrap();
    report.write_formula(0, 1, "=data!C4").unwrap();
    report.write_string(2, 0, "Per thread").unwrap();
    report.write_string(3, 1, "Cycles").unwrap();
    report.write_string(3, 2, "Peak").unwrap();
    report.write_formula(4, 1, "=B1/2").unwrap();
    report.write_formula(5, 1, "=B1/4").unwrap();
    report.write_formula(6, 1, "=SUM(B5:B6)").unwrap();
    report.merge_range(4, 2, 6, 2, "", &Format::new()).unwrap();
    report.write_formula(4, 2, peak).unwrap();

    let data = book.add_worksheet().set_name("data").unwrap();
    data.write_number(3, 2, 2000.0).unwrap();
    book.save(&path).unwrap();

    let layout = dir.join("layout.toml");
    std::fs::write(&layout, LAYOUT).unwrap();
    (path, layout)
}

#[test]
fn list_functions_prints_table() {
    let out = sheetc().arg("list-functions").output().unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    for name in ["IF", "OR", "COUNT", "SUM", "AVERAGE", "GuardLimitLower", "GuardLimitUpper"] {
        assert!(text.lines().any(|l| l.starts_with(name)), "missing {name} in:\n{text}");
    }
}

#[test]
fn tokens_prints_one_token_per_line() {
    let out = sheetc().args(["tokens", "=SUM(A1:B2)+1"]).output().unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5, "{text}");
    assert_eq!(lines[0], "\"SUM(\" (Func/Open)");
    assert_eq!(lines[1], "\"A1:B2\" (Operand/Range)");
}

#[test]
fn tokens_mismatched_paren_fails() {
    let out = sheetc().args(["tokens", "=1)"]).output().unwrap();
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("error:"));
}

#[test]
fn transpile_writes_program() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");
    let program = dir.path().join("report.py");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("-o")
        .arg(&program)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("5 instructions, 3 outputs"), "{}", stderr(&out));

    let text = std::fs::read_to_string(&program).unwrap();
    assert!(text.starts_with("#!/usr/bin/env python3\n"));
    assert!(text.contains(
        "report_B1 = accessor.get_counter_timer_freq()\n\
         report_B5 = report_B1 / 2\n\
         report_B6 = report_B1 / 4\n\
         report_B7 = (sum_skip_empty([report_B5, report_B6]))\n\
         report_C5 = report_B5 + report_B6\n"
    ));
    assert!(text.contains("add_path(['Per thread'], 'Peak', report_C5, results)\n"));
    assert!(text.contains("accessor = FappXml("));
}

#[test]
fn transpile_default_output_next_to_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");

    let out = sheetc().arg("transpile").arg(&workbook).arg("--layout").arg(&layout).arg("-q").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).is_empty());
    assert!(dir.path().join("report.out.py").is_file());
}

#[test]
fn transpile_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .args(["-o", "-", "--accessor", "fapp"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("report_B1 = fapp.get_counter_timer_freq()\n"));
    assert!(text.ends_with("print(json.dumps(results, indent=2))\n"));
}

#[test]
fn transpile_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");
    let program = dir.path().join("report.py");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("-o")
        .arg(&program)
        .arg("--json")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(summary["instructions"], 5);
    assert_eq!(summary["outputs"], 3);
    assert_eq!(summary["warnings"], serde_json::json!([]));
    assert_eq!(summary["output"], program.display().to_string());
}

#[test]
fn transpile_unsupported_function_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=MAX(B5:B6)");
    let program = dir.path().join("report.py");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("-o")
        .arg(&program)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
    let err = stderr(&out);
    assert!(err.contains("report!C5"), "{err}");
    assert!(err.contains("MAX"), "{err}");
    assert!(err.contains("hint:"), "{err}");
    assert!(!program.exists(), "nothing is written on failure");
}

#[test]
fn transpile_missing_workbook_exit_code() {
    let out = sheetc().args(["transpile", "/nonexistent/report.xlsx", "-o", "-"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn transpile_bad_layout_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, _) = write_fixture(dir.path(), "=B5+B6");
    let layout = dir.path().join("bad.toml");
    std::fs::write(&layout, "accessor = \"not an identifier\"\n").unwrap();

    let out = sheetc().arg("transpile").arg(&workbook).arg("--layout").arg(&layout).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("layout"));
}

#[test]
fn transpile_reserved_accessor_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .args(["-o", "-", "--accessor", "json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("reserved"), "{}", stderr(&out));
}

#[test]
fn transpile_builtin_layout_on_blank_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.xlsx");
    let mut book = Workbook::new();
    book.add_worksheet().set_name("report").unwrap().write_string(0, 0, "CPU").unwrap();
    book.save(&path).unwrap();

    let out = sheetc().arg("transpile").arg(&path).args(["-o", "-"]).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("EXPECTED_REPORT_FILES = 17\n"));
    assert!(text.contains("fapp_xml = FappXml("));
    assert!(text.contains("\nresults = {}\n"));
}

/// Interpreter for the tests that execute generated programs; `None` skips them.
fn python3() -> Option<PathBuf> {
    match which::which("python3") {
        Ok(path) => Some(path),
        Err(_) => {
            eprintln!("python3 not found, skipping");
            None
        }
    }
}

#[test]
fn generated_program_is_valid_python() {
    let Some(python) = python3() else { return };
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=IF(B5>B6,B5&\"\n\",\"none\")");
    let program = dir.path().join("report.py");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("-o")
        .arg(&program)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let check = Command::new(&python)
        .args(["-c", "import ast,sys; ast.parse(open(sys.argv[1]).read())"])
        .arg(&program)
        .output()
        .unwrap();
    assert!(check.status.success(), "{}", stderr(&check));

    let builtin = dir.path().join("builtin.py");
    let blank = dir.path().join("blank.xlsx");
    let mut book = Workbook::new();
    book.add_worksheet().set_name("report").unwrap().write_string(0, 0, "CPU").unwrap();
    book.save(&blank).unwrap();
    let out = sheetc().arg("transpile").arg(&blank).arg("-o").arg(&builtin).arg("-q").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let check = Command::new(&python)
        .args(["-c", "import ast,sys; ast.parse(open(sys.argv[1]).read())"])
        .arg(&builtin)
        .output()
        .unwrap();
    assert!(check.status.success(), "{}", stderr(&check));
}

#[test]
fn run_evaluates_program_on_reports() {
    let Some(python) = python3() else { return };
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");
    let reports = dir.path().join("stream.1");
    std::fs::create_dir(&reports).unwrap();
    std::fs::write(reports.join("pa1.xml"), PA_XML).unwrap();
    std::fs::write(reports.join("pa2.xml"), PA_XML).unwrap();
    let program = dir.path().join("report.py");

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("-o")
        .arg(&program)
        .arg("--run")
        .arg(&reports)
        .arg("--python")
        .arg(&python)
        .arg("-q")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let results: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(results["Frequency"], 2000);
    assert_eq!(results["Per thread"]["Cycles"], serde_json::json!([1000.0, 500.0]));
    assert_eq!(results["Per thread"]["Peak"].as_f64(), Some(1500.0));
}

#[test]
fn run_rejects_wrong_report_count() {
    let dir = tempfile::tempdir().unwrap();
    let (workbook, layout) = write_fixture(dir.path(), "=B5+B6");
    let reports = dir.path().join("run.1");
    std::fs::create_dir(&reports).unwrap();
    std::fs::write(reports.join("pa1.xml"), "<x/>").unwrap();

    let out = sheetc()
        .arg("transpile")
        .arg(&workbook)
        .arg("--layout")
        .arg(&layout)
        .arg("--run")
        .arg(&reports)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(8));
    assert!(stderr(&out).contains("expected 2 pa*.xml files"), "{}", stderr(&out));
}

#[test]
fn run_and_stdout_conflict() {
    let out = sheetc().args(["transpile", "report.xlsx", "-o", "-", "--run", "runs/a"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn flatten_missing_program_exit_code() {
    let out = sheetc().args(["flatten", "--program", "/nonexistent/report.out.py"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("hint:"));
}
