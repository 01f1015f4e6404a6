//! Dependency-ordered code generation.
//!
//! A `Session` walks the reference graph depth-first from whatever cells the
//! caller asks for and emits one instruction per reachable cell, after the
//! instructions of everything it references.
//!
//! # Invariants
//!
//! 1. **Single emission:** each cell is translated at most once; later
//!    requests return the memoized variable name.
//! 2. **Topological order:** an instruction is appended only after every
//!    cell its expression names has been appended.
//! 3. **Scoped sheets:** the worksheet stack is pushed on entering a formula
//!    and popped on every exit path; it is empty between top-level calls.
//! 4. **Cycles are errors:** reaching a cell that is still being translated
//!    reports the chain that closed the loop.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::cell::CellKind;
use crate::cell_id::CellId;
use crate::error::{TranspileError, Warning};
use crate::formula::expr::Expr;
use crate::formula::parser::{parse_formula, OperandResolver};
use crate::formula::tokenizer::tokenize;
use crate::layout::ReportLayout;
use crate::overrides::raw_override;
use crate::resolve::{resolve, resolve_cell, Resolved};
use crate::workbook::Workbook;

/// One generated `name = expression` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub name: String,
    pub expr: Expr,
}

impl Instruction {
    pub fn render(&self) -> String {
        format!("{} = {}", self.name, self.expr.render())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.expr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done(String),
}

/// Translation state for one workbook.
pub struct Session<'a> {
    workbook: &'a Workbook,
    layout: &'a ReportLayout,
    memo: FxHashMap<CellId, VisitState>,
    /// Variable name -> cell that owns it
    owners: FxHashMap<String, CellId>,
    instructions: Vec<Instruction>,
    sheet_stack: Vec<String>,
    /// Cells currently being translated, outermost first
    in_progress: Vec<CellId>,
    warnings: Vec<Warning>,
}

impl<'a> Session<'a> {
    pub fn new(workbook: &'a Workbook, layout: &'a ReportLayout) -> Self {
        Self {
            workbook,
            layout,
            memo: FxHashMap::default(),
            owners: FxHashMap::default(),
            instructions: Vec::new(),
            sheet_stack: Vec::new(),
            in_progress: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn workbook(&self) -> &'a Workbook {
        self.workbook
    }

    pub fn layout(&self) -> &'a ReportLayout {
        self.layout
    }

    /// Make sure `cell` has an instruction and return its variable name.
    pub fn ensure_instruction(&mut self, cell: &CellId) -> Result<String, TranspileError> {
        let top_level = self.in_progress.is_empty();
        let cell = self.canonical(cell)?;
        let result = self.ensure(&cell);
        if top_level && !self.sheet_stack.is_empty() {
            return Err(TranspileError::Structural(format!(
                "worksheet stack not empty after translating {cell}: {:?}",
                self.sheet_stack
            )));
        }
        result
    }

    /// Resolve `reference` against the default sheet and ensure it.
    pub fn ensure_reference(&mut self, reference: &str) -> Result<String, TranspileError> {
        let cell = resolve_cell(self.workbook, reference, &self.layout.default_sheet)?;
        self.ensure_instruction(&cell)
    }

    /// Instructions in emission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Depth of the worksheet stack; zero between top-level calls.
    pub fn scope_depth(&self) -> usize {
        self.sheet_stack.len()
    }

    pub fn into_parts(self) -> (Vec<Instruction>, Vec<Warning>) {
        (self.instructions, self.warnings)
    }

    fn canonical(&self, cell: &CellId) -> Result<CellId, TranspileError> {
        let sheet = self
            .workbook
            .sheet(&cell.sheet)
            .ok_or_else(|| TranspileError::resolution(cell.to_string(), format!("no sheet named '{}'", cell.sheet)))?;
        Ok(CellId::new(sheet.name.clone(), cell.row, cell.col))
    }

    fn current_sheet(&self) -> &str {
        self.sheet_stack.last().map(String::as_str).unwrap_or(&self.layout.default_sheet)
    }

    fn ensure(&mut self, cell: &CellId) -> Result<String, TranspileError> {
        match self.memo.get(cell) {
            Some(VisitState::Done(name)) => return Ok(name.clone()),
            Some(VisitState::InProgress) => {
                let start = self.in_progress.iter().position(|c| c == cell).unwrap_or(0);
                let mut chain: Vec<String> = self.in_progress[start..].iter().map(CellId::to_string).collect();
                chain.push(cell.to_string());
                return Err(TranspileError::Cycle { chain });
            }
            None => {}
        }

        let name = cell.var_name();
        if let Some(owner) = self.owners.get(&name) {
            if owner != cell {
                return Err(TranspileError::Structural(format!(
                    "{cell} and {owner} both map to variable '{name}'"
                )));
            }
        }

        if self.workbook.cell_kind(cell) == CellKind::Merged {
            let warning = Warning::MergedCell { cell: cell.clone() };
            log::warn!("{warning}");
            self.warnings.push(warning);
        }

        // The name is claimed before the dependencies are visited so that a
        // referenced cell mapping to the same name is caught as well.
        self.memo.insert(cell.clone(), VisitState::InProgress);
        self.owners.insert(name.clone(), cell.clone());
        self.in_progress.push(cell.clone());
        let result = self.translate(cell);
        self.in_progress.pop();

        match result {
            Ok(expr) => {
                log::debug!("emit {name}");
                self.memo.insert(cell.clone(), VisitState::Done(name.clone()));
                self.instructions.push(Instruction { name: name.clone(), expr });
                Ok(name)
            }
            Err(e) => {
                self.memo.remove(cell);
                self.owners.remove(&name);
                Err(e)
            }
        }
    }

    /// Expression for a cell: its override, its formula, or its literal value.
    fn translate(&mut self, cell: &CellId) -> Result<Expr, TranspileError> {
        if let Some(ov) = raw_override(self.workbook, self.layout, cell)? {
            return Ok(ov.to_expr(&self.layout.accessor));
        }

        let workbook = self.workbook;
        match workbook.cell(cell).and_then(|c| c.formula.as_deref()) {
            Some(formula) => {
                self.sheet_stack.push(cell.sheet.clone());
                let result = self.translate_formula(formula).map_err(|e| e.in_cell(cell));
                self.sheet_stack.pop();
                result
            }
            None => Ok(workbook.value(cell).to_expr()),
        }
    }

    fn translate_formula(&mut self, formula: &str) -> Result<Expr, TranspileError> {
        let tokens = tokenize(formula).map_err(|message| TranspileError::Tokenize { cell: None, message })?;
        parse_formula(&tokens, self)
    }

    /// Override expression or variable for one referenced cell.
    fn member(&mut self, cell: &CellId) -> Result<Expr, TranspileError> {
        if let Some(ov) = raw_override(self.workbook, self.layout, cell)? {
            return Ok(ov.to_expr(&self.layout.accessor));
        }
        Ok(Expr::Var(self.ensure(cell)?))
    }
}

impl OperandResolver for Session<'_> {
    fn operand(&mut self, reference: &str) -> Result<Expr, TranspileError> {
        let resolved = resolve(self.workbook, reference, self.current_sheet())?;
        match resolved {
            Resolved::Cell(cell) => self.member(&cell),
            Resolved::Range(cells) => {
                let mut items = Vec::with_capacity(cells.len());
                for cell in &cells {
                    items.push(self.member(cell)?);
                }
                Ok(Expr::List(items))
            }
        }
    }
}
