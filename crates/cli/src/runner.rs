//! Running generated programs.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::CliError;

/// Expand `~` and environment variables in a user-supplied path.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match shellexpand::full(&text) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(&text).as_ref()),
    }
}

/// Number of per-thread `pa*.xml` reports in `dir`.
pub(crate) fn count_reports(dir: &Path) -> Result<usize, CliError> {
    if !dir.is_dir() {
        return Err(CliError::io(format!("'{}' is not a directory", dir.display())));
    }
    let pattern = dir.join("pa*.xml");
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| CliError::args(format!("bad report directory '{}': {}", dir.display(), e)))?;
    Ok(entries.filter_map(Result::ok).count())
}

/// Fail early when the report directory does not hold what the program expects.
pub(crate) fn check_reports(dir: &Path, expected: usize) -> Result<(), CliError> {
    let found = count_reports(dir)?;
    if found != expected {
        return Err(CliError::run(format!(
            "expected {} pa*.xml files in '{}', found {}",
            expected,
            dir.display(),
            found
        ))
        .with_hint("point --run at the directory holding one profiler run"));
    }
    Ok(())
}

/// Locate the interpreter on PATH (or accept an explicit path).
pub(crate) fn find_python(python: &str) -> Result<PathBuf, CliError> {
    which::which(python).map_err(|_| {
        CliError::run(format!("interpreter '{}' not found", python))
            .with_hint("pass --python or set SHEETC_PYTHON")
    })
}

/// Run `program` on `report_dir` and return what it printed.
pub(crate) fn run_program(python: &Path, program: &Path, report_dir: &Path) -> Result<String, CliError> {
    tracing::debug!(program = %program.display(), dir = %report_dir.display(), "running generated program");

    let output = Command::new(python)
        .arg(program)
        .arg(report_dir)
        .output()
        .map_err(|e| CliError::run(format!("failed to start '{}': {}", python.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
        return Err(CliError::run(format!(
            "'{}' failed on '{}' ({}): {}",
            program.display(),
            report_dir.display(),
            output.status,
            last
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|_| CliError::run(format!("'{}' printed non-UTF-8 output", program.display())))
}
