// sheetc - compile spreadsheet reports into standalone evaluation programs

mod exit_codes;
mod flatten;
mod runner;
mod transpile;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sheetc_engine::error::TranspileError;

use exit_codes::{transpile_exit_code, EXIT_ERROR, EXIT_IO, EXIT_RUN_FAILED, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sheetc")]
#[command(about = "Compile a spreadsheet report into a program that evaluates it on profiler output")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a report workbook into a standalone program
    #[command(after_help = "\
Examples:
  sheetc transpile cpu_pa_report.xlsx
  sheetc transpile report.xlsx -o report.py --layout my_layout.toml
  sheetc transpile report.xlsx -o - | less
  sheetc transpile report.xlsx --run ~/runs/stream.1")]
    Transpile {
        /// Workbook to translate (xlsx, xlsm, xls, ods)
        workbook: PathBuf,

        /// Output program (default: <workbook stem>.out.py next to the workbook, '-' for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Report layout TOML (default: built-in CPU performance-analysis layout)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Variable name the profiler-data accessor is bound to
        #[arg(long, value_name = "NAME")]
        accessor: Option<String>,

        /// Run the generated program on this report directory afterwards
        #[arg(long, value_name = "XML_DIR")]
        run: Option<PathBuf>,

        /// Interpreter used for --run
        #[arg(long, default_value = "python3", env = "SHEETC_PYTHON")]
        python: String,

        /// Print a JSON summary instead of the human-readable one
        #[arg(long)]
        json: bool,

        /// Suppress warnings and the summary line
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Run a generated program on many report directories and print one TSV row each
    #[command(after_help = "\
Examples:
  ls -d runs/* | sheetc flatten --program report.out.py > results.tsv
  sheetc flatten --program report.out.py --infile dirs.txt")]
    Flatten {
        /// Generated program to run
        #[arg(long)]
        program: PathBuf,

        /// File listing one report directory per line (default: stdin)
        #[arg(long)]
        infile: Option<PathBuf>,

        /// Interpreter used to run the program
        #[arg(long, default_value = "python3", env = "SHEETC_PYTHON")]
        python: String,
    },

    /// Print the tokens of a formula
    Tokens {
        /// Formula text (leading '=' optional)
        formula: String,
    },

    /// List the spreadsheet functions the translator supports
    ListFunctions,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  sheetc-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Install a stderr subscriber when RUST_LOG is set. Library crates log
/// through `log`; the subscriber picks those records up too.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .try_init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transpile { workbook, output, layout, accessor, run, python, json, quiet } => {
            transpile::cmd_transpile(transpile::TranspileArgs {
                workbook,
                output,
                layout,
                accessor,
                run,
                python,
                json,
                quiet,
            })
        }
        Commands::Flatten { program, infile, python } => flatten::cmd_flatten(program, infile, python),
        Commands::Tokens { formula } => cmd_tokens(&formula),
        Commands::ListFunctions => cmd_list_functions(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn run(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUN_FAILED, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<TranspileError> for CliError {
    fn from(err: TranspileError) -> Self {
        let hint = match &err {
            TranspileError::Unsupported { .. } => {
                Some("run `sheetc list-functions` for the supported functions".to_string())
            }
            TranspileError::Cycle { .. } => Some("break the loop in the workbook, then retry".to_string()),
            TranspileError::Config(_) => Some("check the layout file passed with --layout".to_string()),
            _ => None,
        };
        Self { code: transpile_exit_code(&err), message: err.to_string(), hint }
    }
}

// ============================================================================
// tokens / list-functions
// ============================================================================

fn cmd_tokens(formula: &str) -> Result<(), CliError> {
    let formula = if formula.starts_with('=') { formula.to_string() } else { format!("={}", formula) };
    let tokens = sheetc_engine::formula::tokenize(&formula)
        .map_err(|message| CliError::from(TranspileError::Tokenize { cell: None, message }))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for token in tokens {
        writeln!(handle, "{}", token).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

fn cmd_list_functions() -> Result<(), CliError> {
    let functions = sheetc_engine::formula::list_functions();
    let width = functions.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (name, translation) in functions {
        writeln!(handle, "{:width$}  {}", name, translation, width = width).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}
