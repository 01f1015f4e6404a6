//! Program assembly: prelude, instructions, result mapping, postlude.

use crate::codegen::Instruction;
use crate::layout::ReportLayout;
use crate::output::OutputMapping;

const PRELUDE: &str = include_str!("../assets/prelude.py");

const POSTLUDE: &str = "\nprint(json.dumps(results, indent=2))\n";

/// Knobs for the generated program's fixed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Variable the profiler-data accessor is bound to
    pub accessor: String,
    /// Number of pa*.xml files the accessor insists on
    pub expected_report_files: usize,
    /// Default measured region
    pub region: String,
    /// Name of the workbook the program was generated from
    pub source: String,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            accessor: "fapp_xml".into(),
            expected_report_files: 17,
            region: "kernel".into(),
            source: "workbook".into(),
        }
    }
}

impl AssembleOptions {
    pub fn from_layout(layout: &ReportLayout, source: impl Into<String>) -> Self {
        Self {
            accessor: layout.accessor.clone(),
            expected_report_files: layout.expected_report_files,
            source: source.into(),
            ..Self::default()
        }
    }
}

/// Assemble the complete program text.
pub fn assemble(instructions: &[Instruction], outputs: &OutputMapping, options: &AssembleOptions) -> String {
    let mut program = PRELUDE
        .replace("{{SOURCE}}", &sanitize(&options.source))
        .replace("{{EXPECTED_REPORT_FILES}}", &options.expected_report_files.to_string())
        .replace("{{REGION}}", &sanitize(&options.region))
        .replace("{{ACCESSOR}}", &options.accessor);

    for instruction in instructions {
        program.push_str(&instruction.render());
        program.push('\n');
    }

    program.push_str("\nresults = {}\n");
    for entry in outputs.entries() {
        program.push_str(&entry.render());
        program.push('\n');
    }

    program.push_str(POSTLUDE);
    program
}

/// Text spliced into comments and double-quoted strings.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
