// ============================================================================
// flatten
// ============================================================================

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use sheetc_io::tsv::{benchmark_name, parse_document, TsvWriter};

use crate::runner::{expand_path, find_python, run_program};
use crate::CliError;

pub(crate) fn cmd_flatten(program: PathBuf, infile: Option<PathBuf>, python: String) -> Result<(), CliError> {
    let program = expand_path(&program);
    if !program.is_file() {
        return Err(CliError::io(format!("program '{}' not found", program.display()))
            .with_hint("generate it with `sheetc transpile`"));
    }

    let dirs = read_dirs(infile)?;
    if dirs.is_empty() {
        return Err(CliError::args("no report directories given"));
    }
    let python = find_python(&python)?;

    let mut writer = TsvWriter::new(io::stdout().lock());
    for dir in &dirs {
        let benchmark = benchmark_name(dir);
        let printed = run_program(&python, &program, &expand_path(Path::new(dir)))?;
        let document = parse_document(&printed).map_err(|e| CliError::run(format!("{}: {}", dir, e)))?;
        writer.write_document(&benchmark, &document).map_err(CliError::io)?;
    }
    writer.into_inner().map_err(CliError::io)?;
    Ok(())
}

/// Non-blank lines of `infile` (stdin when absent), trimmed.
fn read_dirs(infile: Option<PathBuf>) -> Result<Vec<String>, CliError> {
    let reader: Box<dyn BufRead> = match infile {
        Some(path) => {
            let path = expand_path(&path);
            let file = std::fs::File::open(&path)
                .map_err(|e| CliError::io(format!("Failed to open '{}': {}", path.display(), e)))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut dirs = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| CliError::io(format!("Failed to read directory list: {}", e)))?;
        let line = line.trim();
        if !line.is_empty() {
            dirs.push(line.to_string());
        }
    }
    Ok(dirs)
}
