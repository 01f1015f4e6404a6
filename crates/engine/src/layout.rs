use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell_id::{letters_to_col, parse_a1};
use crate::error::TranspileError;

const BUILTIN_LAYOUT: &str = include_str!("../layouts/cpu_pa_report.toml");

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

/// Where things live in a report workbook and what to export from it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportLayout {
    /// Sheet that unqualified references and report entries refer to
    #[serde(default = "default_report_sheet")]
    pub default_sheet: String,
    /// Cells on this sheet are emitted as quoted label strings
    #[serde(default = "default_label_sheet")]
    pub label_sheet: String,
    /// Sheet holding raw profiler values (constants, accessor cells, events)
    #[serde(default = "default_data_sheet")]
    pub data_sheet: String,
    /// Name the generated program binds the profiler-data accessor to
    #[serde(default = "default_accessor")]
    pub accessor: String,
    /// Per-thread report files the accessor expects to find
    #[serde(default = "default_expected_files")]
    pub expected_report_files: usize,
    /// Data-sheet cells whose stored value is used as-is
    #[serde(default)]
    pub constants: Vec<String>,
    /// Data-sheet cells read through a named accessor getter
    #[serde(default)]
    pub accessors: BTreeMap<String, Accessor>,
    #[serde(default)]
    pub event_table: Option<EventTable>,
    /// Values to export, in output order
    #[serde(default, rename = "entry")]
    pub entries: Vec<ReportEntry>,
}

fn default_report_sheet() -> String {
    "report".into()
}

fn default_label_sheet() -> String {
    "label".into()
}

fn default_data_sheet() -> String {
    "data".into()
}

fn default_accessor() -> String {
    "fapp_xml".into()
}

fn default_expected_files() -> usize {
    17
}

fn default_table_rows() -> usize {
    12
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// Single-value getters of the profiler-data accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessor {
    CounterTimerFreq,
    MeasuredTime,
    NodeName,
    ProcessNo,
    CmgNo,
    MeasuredRegion,
    VectorLength,
}

impl Accessor {
    /// Getter method called on the accessor object.
    pub fn method(&self) -> &'static str {
        match self {
            Self::CounterTimerFreq => "get_counter_timer_freq",
            Self::MeasuredTime => "get_measured_time",
            Self::NodeName => "get_node_name",
            Self::ProcessNo => "get_process_no",
            Self::CmgNo => "get_cmg_no",
            Self::MeasuredRegion => "get_measured_region",
            Self::VectorLength => "get_vector_length",
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

// ---------------------------------------------------------------------------
// Event table
// ---------------------------------------------------------------------------

/// Rectangle of per-thread event counters on the data sheet. The header row
/// holds event names; each row below it is one thread.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventTable {
    pub header_row: usize,
    pub first_row: usize,
    pub last_row: usize,
    pub first_column: String,
    pub last_column: String,
}

impl EventTable {
    /// Whether the 0-based (row, col) lies inside the table body.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        let (Some(first_col), Some(last_col)) = (letters_to_col(&self.first_column), letters_to_col(&self.last_column))
        else {
            return false;
        };
        let row = row + 1;
        row >= self.first_row && row <= self.last_row && col >= first_col && col <= last_col
    }

    /// 0-based header row.
    pub fn header_row_index(&self) -> usize {
        self.header_row.saturating_sub(1)
    }

    /// Thread index of a 0-based body row.
    pub fn thread(&self, row: usize) -> usize {
        row.saturating_sub(self.header_row)
    }
}

// ---------------------------------------------------------------------------
// Report entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    /// One value under the label read from `label`.
    Single {
        #[serde(default)]
        path: Vec<String>,
        label: String,
        value: String,
    },
    /// One entry per column: key from `header_row`, values from `rows`
    /// cells starting at `first_row`, followed by a total row.
    Table {
        #[serde(default)]
        path: Vec<String>,
        first_column: String,
        last_column: String,
        header_row: usize,
        first_row: usize,
        #[serde(default = "default_table_rows")]
        rows: usize,
    },
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportLayout {
    pub fn from_toml(input: &str) -> Result<Self, TranspileError> {
        let layout: ReportLayout = toml::from_str(input).map_err(|e| TranspileError::Config(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Layout of the CPU performance-analysis report.
    pub fn builtin() -> Result<Self, TranspileError> {
        Self::from_toml(BUILTIN_LAYOUT)
    }

    /// Same layout, with the generated program binding the accessor to `name`.
    pub fn with_accessor(mut self, name: &str) -> Result<Self, TranspileError> {
        self.accessor = name.to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), TranspileError> {
        if !is_identifier(&self.accessor) {
            return Err(config_err(format!("accessor '{}' is not a valid identifier", self.accessor)));
        }
        if is_reserved(&self.accessor) {
            return Err(config_err(format!("accessor '{}' is a reserved name in the generated program", self.accessor)));
        }

        for sheet in [&self.default_sheet, &self.label_sheet, &self.data_sheet] {
            if sheet.trim().is_empty() {
                return Err(config_err("sheet names must not be empty"));
            }
        }

        for coord in self.constants.iter().chain(self.accessors.keys()) {
            check_coord(coord)?;
        }

        if let Some(table) = &self.event_table {
            if table.first_row > table.last_row || table.first_row <= table.header_row || table.header_row == 0 {
                return Err(config_err(format!(
                    "event table rows must satisfy 0 < header_row < first_row <= last_row, got {}/{}/{}",
                    table.header_row, table.first_row, table.last_row
                )));
            }
            check_columns(&table.first_column, &table.last_column)?;
        }

        for entry in &self.entries {
            match entry {
                ReportEntry::Single { path, label, value } => {
                    for coord in path.iter().chain([label, value]) {
                        check_coord(coord)?;
                    }
                }
                ReportEntry::Table { path, first_column, last_column, header_row, first_row, rows } => {
                    for coord in path {
                        check_coord(coord)?;
                    }
                    check_columns(first_column, last_column)?;
                    if *header_row == 0 || *first_row == 0 {
                        return Err(config_err("table rows are 1-based"));
                    }
                    if *rows == 0 {
                        return Err(config_err(format!("table {first_column}:{last_column} has no rows")));
                    }
                }
            }
        }

        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> TranspileError {
    TranspileError::Config(msg.into())
}

fn check_coord(coord: &str) -> Result<(), TranspileError> {
    match parse_a1(coord) {
        Some(_) => Ok(()),
        None => Err(config_err(format!("'{coord}' is not a cell coordinate"))),
    }
}

fn check_columns(first: &str, last: &str) -> Result<(), TranspileError> {
    match (letters_to_col(first), letters_to_col(last)) {
        (Some(a), Some(b)) if a <= b => Ok(()),
        (Some(_), Some(_)) => Err(config_err(format!("column range {first}:{last} is reversed"))),
        _ => Err(config_err(format!("invalid column range {first}:{last}"))),
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Target-language keywords.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Names bound or called by the prelude, the generated body and the postlude.
const PROGRAM_NAMES: &[&str] = &[
    "argparse", "json", "sys", "xml", "ET", "defaultdict", "Path", "FappXml", "EXPECTED_REPORT_FILES",
    "sum_skip_empty", "count_non_empty", "_xls_text", "xls_concat", "add_path", "vba_guard_limit_lower",
    "vba_guard_limit_upper", "_parser", "_args", "results", "any", "enumerate", "int", "isinstance", "len",
    "print", "sorted", "str", "sum",
];

/// Whether binding `name` at the top of the generated program would break it.
pub(crate) fn is_reserved(name: &str) -> bool {
    KEYWORDS.contains(&name) || PROGRAM_NAMES.contains(&name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
