//! Symbol data model
//!
//! Every declared entity lives in the workspace arena as a [`Symbol`]: a
//! shared base record (name, domain, dirty state, materialized records) plus
//! a kind-specific payload. Symbols are created once and live for the
//! workspace's lifetime; they are never deleted, only marked dirty/clean and
//! overwritten by new assignments.

pub mod sets;

use crate::records::Table;
use serde::Serialize;
use std::fmt;

pub use sets::{AliasTarget, SetData};

/// Arena index of a symbol inside its workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

/// The closed set of symbol kinds
///
/// A name, once bound to a kind, can never be rebound to a different kind
/// within the same workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Set,
    Alias,
    Parameter,
    Variable,
    Equation,
}

impl SymbolKind {
    /// Returns a human-readable name for the kind
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Set => "set",
            SymbolKind::Alias => "alias",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::Equation => "equation",
        }
    }
}

/// One entry of a symbol's domain: a declared set/alias, or the universal
/// wildcard that accepts any label unchecked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AxisRef {
    Symbol(SymbolId),
    Universe,
}

impl AxisRef {
    pub fn symbol(self) -> Option<SymbolId> {
        match self {
            AxisRef::Symbol(id) => Some(id),
            AxisRef::Universe => None,
        }
    }
}

/// Variable sign/integrality class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Free,
    Positive,
    Negative,
    Binary,
    Integer,
}

impl VariableType {
    /// True for binary and integer variables, which restrict the admissible
    /// problem class to the MIP family
    pub fn is_discrete(&self) -> bool {
        matches!(self, VariableType::Binary | VariableType::Integer)
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariableType::Free => "free",
            VariableType::Positive => "positive",
            VariableType::Negative => "negative",
            VariableType::Binary => "binary",
            VariableType::Integer => "integer",
        }
    }
}

/// Relation of an equation definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationRelation {
    /// Left and right side are equal
    Eq,
    /// Left side is greater than or equal to the right side
    Geq,
    /// Left side is less than or equal to the right side
    Leq,
}

/// Per-symbol flush state
///
/// `Flushing` is transient: it only exists while control is inside the flush
/// call itself, since execution is single-threaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    Clean,
    Dirty,
    Flushing,
}

/// Kind-specific payload of a symbol
#[derive(Debug, Clone)]
pub enum SymbolPayload {
    Set(SetData),
    Alias(AliasData),
    Parameter(ParameterData),
    Variable(VariableData),
    Equation(EquationData),
}

#[derive(Debug, Clone)]
pub struct AliasData {
    pub target: AliasTarget,
}

#[derive(Debug, Clone)]
pub struct ParameterData {
    /// Populate unpopulated domain sets from the distinct labels observed in
    /// this parameter's records
    pub domain_forwarding: bool,
}

#[derive(Debug, Clone)]
pub struct VariableData {
    pub var_type: VariableType,
}

#[derive(Debug, Clone, Default)]
pub struct EquationData {
    /// Set once the equation body has been defined
    pub defined: bool,
    pub relation: Option<EquationRelation>,
    /// Variables referenced by the definition, for problem-class checks
    pub variables: Vec<SymbolId>,
    /// True when the definition contains terms that are nonlinear in the
    /// variables
    pub nonlinear: bool,
}

/// A declared entity: shared base record plus kind payload
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub description: Option<String>,
    pub domain: Vec<AxisRef>,
    pub state: SymbolState,
    pub records: Option<Table>,
    pub payload: SymbolPayload,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match &self.payload {
            SymbolPayload::Set(_) => SymbolKind::Set,
            SymbolPayload::Alias(_) => SymbolKind::Alias,
            SymbolPayload::Parameter(_) => SymbolKind::Parameter,
            SymbolPayload::Variable(_) => SymbolKind::Variable,
            SymbolPayload::Equation(_) => SymbolKind::Equation,
        }
    }

    /// Number of axes in the declared domain
    pub fn dimension(&self) -> usize {
        self.domain.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SymbolState::Dirty
    }

    /// Number of materialized records
    pub fn card(&self) -> usize {
        self.records.as_ref().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn set_data(&self) -> Option<&SetData> {
        match &self.payload {
            SymbolPayload::Set(data) => Some(data),
            _ => None,
        }
    }

    pub fn set_data_mut(&mut self) -> Option<&mut SetData> {
        match &mut self.payload {
            SymbolPayload::Set(data) => Some(data),
            _ => None,
        }
    }

    pub fn equation_data(&self) -> Option<&EquationData> {
        match &self.payload {
            SymbolPayload::Equation(data) => Some(data),
            _ => None,
        }
    }

    pub fn variable_type(&self) -> Option<VariableType> {
        match &self.payload {
            SymbolPayload::Variable(data) => Some(data.var_type),
            _ => None,
        }
    }
}
