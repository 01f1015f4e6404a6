pub mod assemble;
pub mod cell;
pub mod cell_id;
pub mod codegen;
pub mod error;
pub mod formula;
pub mod layout;
pub mod named_range;
pub mod output;
pub mod overrides;
pub mod report;
pub mod resolve;
pub mod sheet;
pub mod workbook;

use assemble::{assemble, AssembleOptions};
use codegen::Session;
use error::{TranspileError, Warning};
use layout::ReportLayout;
use workbook::Workbook;

/// Result of translating one workbook.
#[derive(Debug, Clone)]
pub struct Transpiled {
    /// Complete program text
    pub program: String,
    pub instruction_count: usize,
    pub output_count: usize,
    pub warnings: Vec<Warning>,
}

/// Translate every cell `layout` exports from `workbook` into one program.
/// `source` names the workbook in the generated header.
pub fn transpile(workbook: &Workbook, layout: &ReportLayout, source: &str) -> Result<Transpiled, TranspileError> {
    let mut session = Session::new(workbook, layout);
    let outputs = report::build_outputs(&mut session, layout)?;
    let (instructions, warnings) = session.into_parts();
    let program = assemble(&instructions, &outputs, &AssembleOptions::from_layout(layout, source));
    Ok(Transpiled {
        program,
        instruction_count: instructions.len(),
        output_count: outputs.len(),
        warnings,
    })
}
