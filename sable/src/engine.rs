//! External execution engine boundary
//!
//! The core never computes anything numeric. It lowers the statement queue
//! into a textual program, ships data as labeled tables, and ingests
//! whatever tables come back. Everything behind this trait is out of
//! process from the core's point of view; the two methods below are the
//! entire contract.

use crate::records::Table;
use crate::scheduler::StatementBatch;
use crate::SableResult;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// The engine's textual intermediate representation of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramText {
    pub text: String,
}

impl fmt::Display for ProgramText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Location-bearing diagnostic attached to a terminal engine status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// Line in the program text, where applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Solution attributes reported by a successful solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveValues {
    pub model_status: String,
    pub solver_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

/// Terminal status of one engine invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        solve: Option<SolveValues>,
    },
    CompileError(Diagnostic),
    SolveInfeasible(Diagnostic),
    SolveUnbounded(Diagnostic),
    /// The external process was interrupted; nothing was applied
    UserInterrupt(Diagnostic),
    FatalError(Diagnostic),
}

impl ExecutionStatus {
    pub fn success() -> Self {
        ExecutionStatus::Success { solve: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success { .. })
    }

    /// Short status label for messages
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionStatus::Success { .. } => "success",
            ExecutionStatus::CompileError(_) => "compile error",
            ExecutionStatus::SolveInfeasible(_) => "solve infeasible",
            ExecutionStatus::SolveUnbounded(_) => "solve unbounded",
            ExecutionStatus::UserInterrupt(_) => "user interrupt",
            ExecutionStatus::FatalError(_) => "fatal error",
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ExecutionStatus::Success { .. } => None,
            ExecutionStatus::CompileError(d)
            | ExecutionStatus::SolveInfeasible(d)
            | ExecutionStatus::SolveUnbounded(d)
            | ExecutionStatus::UserInterrupt(d)
            | ExecutionStatus::FatalError(d) => Some(d),
        }
    }
}

/// Result of one engine invocation: output tables keyed by symbol name,
/// plus the terminal status
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub outputs: BTreeMap<String, Table>,
    pub status: ExecutionStatus,
}

/// The external execution engine contract
pub trait ExecutionEngine {
    /// Lower the queued statements into the engine's textual intermediate
    /// representation
    fn generate_program(&self, batch: &StatementBatch) -> SableResult<ProgramText>;

    /// Run one program, exchanging data through labeled tables
    fn execute(
        &mut self,
        program: &ProgramText,
        inputs: &BTreeMap<String, Table>,
    ) -> SableResult<EngineOutcome>;
}

/// A scriptable engine double for exercising scheduler semantics without a
/// real solver process
///
/// Output tables are canned per symbol name; each invocation is counted,
/// and a failure status can be staged for the next call.
#[derive(Default)]
pub struct PlaybackEngine {
    outputs: BTreeMap<String, Table>,
    solve: Option<SolveValues>,
    fail_next: Option<ExecutionStatus>,
    calls: Rc<Cell<usize>>,
    programs: Rc<RefCell<Vec<ProgramText>>>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a table to be returned for a symbol on every invocation
    pub fn with_output(mut self, symbol: impl Into<String>, table: Table) -> Self {
        self.outputs.insert(symbol.into(), table);
        self
    }

    /// Stage solution attributes reported on success
    pub fn with_solve_values(mut self, values: SolveValues) -> Self {
        self.solve = Some(values);
        self
    }

    /// Make the next invocation terminate with the given status
    pub fn fail_next(mut self, status: ExecutionStatus) -> Self {
        self.fail_next = Some(status);
        self
    }

    /// Shared invocation counter, usable after the engine is moved into a
    /// workspace
    pub fn call_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }

    /// Shared log of every program this engine was asked to execute
    pub fn program_log(&self) -> Rc<RefCell<Vec<ProgramText>>> {
        Rc::clone(&self.programs)
    }
}

impl ExecutionEngine for PlaybackEngine {
    fn generate_program(&self, batch: &StatementBatch) -> SableResult<ProgramText> {
        crate::codegen::render_program(batch)
    }

    fn execute(
        &mut self,
        program: &ProgramText,
        inputs: &BTreeMap<String, Table>,
    ) -> SableResult<EngineOutcome> {
        self.calls.set(self.calls.get() + 1);
        self.programs.borrow_mut().push(program.clone());

        if let Some(status) = self.fail_next.take() {
            return Ok(EngineOutcome {
                outputs: BTreeMap::new(),
                status,
            });
        }

        // Inputs round-trip unchanged unless a canned table overrides them.
        let mut outputs = inputs.clone();
        for (name, table) in &self.outputs {
            outputs.insert(name.clone(), table.clone());
        }
        Ok(EngineOutcome {
            outputs,
            status: ExecutionStatus::Success {
                solve: self.solve.clone(),
            },
        })
    }
}
