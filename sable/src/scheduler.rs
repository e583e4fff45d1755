//! Statement queue and dirty tracking
//!
//! All mutations are buffered as statements in one workspace-wide queue, in
//! issue order, because later statements may depend on earlier ones' side
//! effects. A statement only reaches the queue after local validation, so
//! the queue never holds anything malformed. The flush itself is driven by
//! the workspace, which owns both the queue and the symbol arena.

use crate::algebra::expr::{Expr, IndexSel};
use crate::model::{ProblemClass, Sense};
use crate::symbols::sets::AliasTarget;
use crate::symbols::{
    AxisRef, EquationRelation, SymbolId, SymbolKind, VariableType,
};
use std::collections::{BTreeMap, BTreeSet};

/// An indexed assignment `target(indices) $ guard = value`
#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: SymbolId,
    /// Left-hand side index selections; lag/lead here is domain control,
    /// not a reference
    pub indices: Vec<IndexSel>,
    /// Optional boolean restriction of the assignment's domain
    pub guard: Option<Expr>,
    pub value: Expr,
}

/// An equation definition `name(indices) $ guard .. lhs <rel> rhs`
#[derive(Debug, Clone)]
pub struct EquationDef {
    pub equation: SymbolId,
    pub indices: Vec<IndexSel>,
    pub guard: Option<Expr>,
    pub relation: EquationRelation,
    pub lhs: Expr,
    pub rhs: Expr,
}

/// A solve request forwarded to the engine with enough metadata for its
/// compile-time problem-class check
#[derive(Debug, Clone)]
pub struct SolveDirective {
    pub model: String,
    pub equations: Vec<SymbolId>,
    pub objective: Option<SymbolId>,
    pub sense: Sense,
    pub problem_class: ProblemClass,
}

/// One buffered statement
#[derive(Debug, Clone)]
pub enum Statement {
    /// Records were supplied directly; the data travels in the exchange
    /// tables and the program loads it by name
    Data { symbol: SymbolId },
    Assign(Assignment),
    EquationDef(EquationDef),
    Solve(SolveDirective),
}

impl Statement {
    /// The symbol this statement writes, if any
    pub fn target(&self) -> Option<SymbolId> {
        match self {
            Statement::Data { symbol } => Some(*symbol),
            Statement::Assign(assign) => Some(assign.target),
            Statement::EquationDef(def) => Some(def.equation),
            Statement::Solve(_) => None,
        }
    }

    /// Every symbol the statement mentions
    pub fn collect_symbols(&self, out: &mut Vec<SymbolId>) {
        match self {
            Statement::Data { symbol } => out.push(*symbol),
            Statement::Assign(assign) => {
                out.push(assign.target);
                collect_index_symbols(&assign.indices, out);
                if let Some(guard) = &assign.guard {
                    guard.collect_symbols(out);
                }
                assign.value.collect_symbols(out);
            }
            Statement::EquationDef(def) => {
                out.push(def.equation);
                collect_index_symbols(&def.indices, out);
                if let Some(guard) = &def.guard {
                    guard.collect_symbols(out);
                }
                def.lhs.collect_symbols(out);
                def.rhs.collect_symbols(out);
            }
            Statement::Solve(solve) => {
                out.extend(&solve.equations);
                if let Some(objective) = solve.objective {
                    out.push(objective);
                }
            }
        }
    }
}

fn collect_index_symbols(sels: &[IndexSel], out: &mut Vec<SymbolId>) {
    for sel in sels {
        match sel {
            IndexSel::Axis(AxisRef::Symbol(id)) => out.push(*id),
            IndexSel::Shifted { axis, .. } => out.push(*axis),
            _ => {}
        }
    }
}

/// Declaration-time facts about one symbol, snapshotted for program
/// generation
#[derive(Debug, Clone)]
pub struct SymbolMeta {
    pub name: String,
    pub kind: SymbolKind,
    pub description: Option<String>,
    pub domain: Vec<AxisRef>,
    pub singleton: bool,
    pub var_type: Option<VariableType>,
    pub alias_target: Option<AliasTarget>,
}

/// Snapshot of the symbol table, keyed in declaration order
pub type SymbolDict = BTreeMap<SymbolId, SymbolMeta>;

/// A consolidated queue handed to the engine as one unit
#[derive(Debug, Clone)]
pub struct StatementBatch {
    pub statements: Vec<Statement>,
    pub dict: SymbolDict,
}

impl StatementBatch {
    /// Closure of every symbol the batch touches: statement symbols plus
    /// their domains and alias targets, in declaration order
    pub fn referenced_symbols(&self) -> Vec<SymbolId> {
        let mut pending: Vec<SymbolId> = Vec::new();
        for statement in &self.statements {
            statement.collect_symbols(&mut pending);
        }
        let mut seen: BTreeSet<SymbolId> = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(meta) = self.dict.get(&id) {
                for axis in &meta.domain {
                    if let AxisRef::Symbol(parent) = axis {
                        pending.push(*parent);
                    }
                }
                if let Some(AliasTarget::Symbol(target)) = meta.alias_target {
                    pending.push(target);
                }
            }
        }
        seen.into_iter().collect()
    }
}

/// The workspace-wide pending statement queue
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Vec<Statement>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, statement: Statement) {
        self.queue.push(statement);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.queue
    }

    /// Targets of every buffered writing statement, in issue order
    pub fn written_symbols(&self) -> Vec<SymbolId> {
        let mut out = Vec::new();
        for statement in &self.queue {
            if let Some(target) = statement.target() {
                if !out.contains(&target) {
                    out.push(target);
                }
            }
        }
        out
    }

    /// Empty the queue after a successful flush
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
