// ============================================================================
// transpile
// ============================================================================

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sheetc_engine::layout::ReportLayout;
use sheetc_io::load_workbook;

use crate::runner::{check_reports, expand_path, find_python, run_program};
use crate::CliError;

pub(crate) struct TranspileArgs {
    pub workbook: PathBuf,
    pub output: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub accessor: Option<String>,
    pub run: Option<PathBuf>,
    pub python: String,
    pub json: bool,
    pub quiet: bool,
}

/// Machine-readable result of `sheetc transpile --json`.
#[derive(Debug, Serialize)]
struct TranspileSummary {
    workbook: String,
    output: String,
    instructions: usize,
    outputs: usize,
    warnings: Vec<String>,
}

pub(crate) fn cmd_transpile(args: TranspileArgs) -> Result<(), CliError> {
    let workbook_path = expand_path(&args.workbook);
    let to_stdout = args.output.as_deref() == Some(Path::new("-"));
    if to_stdout && args.run.is_some() {
        return Err(CliError::args("--run needs the program written to a file, not stdout"));
    }
    if to_stdout && args.json {
        return Err(CliError::args("--json cannot be combined with -o -"));
    }

    let layout = load_layout(args.layout.as_deref(), args.accessor.as_deref())?;

    let (workbook, load) = load_workbook(&workbook_path).map_err(CliError::io)?;
    tracing::info!("{}", load.summary());

    let source = workbook_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| workbook_path.display().to_string());
    let out = sheetc_engine::transpile(&workbook, &layout, &source)?;

    let warnings: Vec<String> = out.warnings.iter().map(|w| w.to_string()).collect();
    if !args.quiet && !args.json {
        for warning in &warnings {
            eprintln!("warning: {}", warning);
        }
    }

    if to_stdout {
        io::stdout()
            .write_all(out.program.as_bytes())
            .map_err(|e| CliError::io(format!("Failed to write program: {}", e)))?;
        return Ok(());
    }

    let output_path = match &args.output {
        Some(path) => expand_path(path),
        None => default_output(&workbook_path),
    };
    write_program(&output_path, &out.program)?;

    if args.json {
        let summary = TranspileSummary {
            workbook: workbook_path.display().to_string(),
            output: output_path.display().to_string(),
            instructions: out.instruction_count,
            outputs: out.output_count,
            warnings,
        };
        let text = serde_json::to_string_pretty(&summary).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", text);
    } else if !args.quiet {
        eprintln!(
            "wrote {}: {} instructions, {} outputs",
            output_path.display(),
            out.instruction_count,
            out.output_count
        );
    }

    if let Some(report_dir) = &args.run {
        let report_dir = expand_path(report_dir);
        check_reports(&report_dir, layout.expected_report_files)?;
        let python = find_python(&args.python)?;
        let printed = run_program(&python, &output_path, &report_dir)?;
        print!("{}", printed);
    }

    Ok(())
}

fn load_layout(path: Option<&Path>, accessor: Option<&str>) -> Result<ReportLayout, CliError> {
    let layout = match path {
        Some(path) => {
            let path = expand_path(path);
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CliError::io(format!("Failed to read layout '{}': {}", path.display(), e)))?;
            ReportLayout::from_toml(&text)?
        }
        None => ReportLayout::builtin()?,
    };
    match accessor {
        Some(name) => Ok(layout.with_accessor(name)?),
        None => Ok(layout),
    }
}

/// `dir/report.xlsx` -> `dir/report.out.py`
fn default_output(workbook: &Path) -> PathBuf {
    let stem = workbook.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "report".into());
    workbook.with_file_name(format!("{}.out.py", stem))
}

fn write_program(path: &Path, program: &str) -> Result<(), CliError> {
    std::fs::write(path, program).map_err(|e| CliError::io(format!("Failed to write '{}': {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).map_err(|e| CliError::io(e.to_string()))?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(path, perms).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}
