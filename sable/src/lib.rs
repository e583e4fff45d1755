//! # Sable Engine
//!
//! **Algebraic modeling as data**
//!
//! Sable is a symbolic layer for building algebraic optimization models:
//! sets, parameters, variables, and equations are declared into a
//! workspace, composed with index-aware expressions, and executed lazily
//! against an external engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sable::{Declaration, PlaybackEngine, SableResult, Workspace};
//!
//! fn main() -> SableResult<()> {
//!     let mut ws = Workspace::new("transport", Box::new(PlaybackEngine::new()));
//!
//!     let plants = ws.declare(Declaration::set("plants"))?;
//!     let demand = ws.declare(
//!         Declaration::parameter("demand")
//!             .domain(vec![sable::AxisRef::Symbol(plants)])
//!             .forwarding(),
//!     )?;
//!
//!     ws.set_records(
//!         demand,
//!         vec![
//!             (vec!["seattle".into()], 350.0),
//!             (vec!["san-diego".into()], 600.0),
//!         ],
//!     )?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Workspace
//! The workspace owns every symbol, the domain tree between sets, and the
//! pending statement queue. All operations take it explicitly; there is no
//! ambient default container.
//!
//! ### Symbols
//! Sets carry membership and ordering; aliases are alternate index names
//! over a set; parameters, variables, and equations carry numeric records
//! over their declared domains.
//!
//! ### Expressions
//! Elementwise algebra, reductions, matrix multiplication with rank-driven
//! dimension inference, lag/lead offsets, and ord/card over ordered sets.
//! Domains are inferred and checked at construction time.
//!
//! ### Lazy execution
//! Mutations enqueue statements and mark their targets dirty. A flush
//! consolidates the queue into one program, runs it on the engine, and
//! ingests the returned tables atomically.

pub mod algebra;
pub mod codegen;
pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod records;
pub mod scheduler;
pub mod symbols;
pub mod validator;
pub mod workspace;

pub use algebra::{
    binary, card, constant, lag, lead, matmul, ord, permute, reduce, slice, sym, sym_ix, unary,
    BinaryOp, Expr, IndexSel, ReductionOp, UnaryOp,
};
pub use engine::{
    Diagnostic, EngineOutcome, ExecutionEngine, ExecutionStatus, PlaybackEngine, ProgramText,
    SolveValues,
};
pub use error::SableError;
pub use model::{Model, ProblemClass, Sense, SolveSummary};
pub use options::{ExecutionMode, SingletonPolicy, WorkspaceOptions};
pub use records::{Row, Table};
pub use scheduler::{Assignment, EquationDef, SolveDirective, Statement};
pub use symbols::sets::OffsetMode;
pub use symbols::{AxisRef, EquationRelation, SymbolId, SymbolKind, VariableType};
pub use workspace::{Declaration, RecordState, Workspace};

/// Result type for Sable operations
pub type SableResult<T> = Result<T, SableError>;

#[cfg(test)]
mod tests;
