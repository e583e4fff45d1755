//! The workspace: symbol registry and flush orchestration
//!
//! A workspace owns every declared symbol, the domain tree between sets,
//! the pending statement queue, and the handle to the external engine.
//! There is no ambient default container: every constructor and operation
//! takes the workspace explicitly. Execution is single-threaded and
//! cooperative; correctness depends on strict enqueue-before-flush and
//! flush-before-read ordering, not on locking.

use crate::algebra::{self, profile};
use crate::engine::{ExecutionEngine, ProgramText, SolveValues};
use crate::error::SableError;
use crate::options::{ExecutionMode, SingletonPolicy, WorkspaceOptions};
use crate::records::Table;
use crate::scheduler::{
    Assignment, EquationDef, Scheduler, Statement, StatementBatch, SymbolDict, SymbolMeta,
};
use crate::symbols::sets::{AliasTarget, SetData};
use crate::symbols::{
    AliasData, AxisRef, EquationData, ParameterData, Symbol, SymbolId, SymbolKind, SymbolPayload,
    SymbolState, VariableData, VariableType,
};
use crate::validator::Validator;
use crate::SableResult;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Result of a non-forcing records read
///
/// A dirty symbol's data is stale until a flush runs; the caller decides
/// whether to force one via [`Workspace::records_synced`].
#[derive(Debug)]
pub enum RecordState<'a> {
    Clean(Option<&'a Table>),
    Dirty,
}

impl<'a> RecordState<'a> {
    pub fn is_dirty(&self) -> bool {
        matches!(self, RecordState::Dirty)
    }
}

/// A pending symbol declaration, built fluently and handed to
/// [`Workspace::declare`]
#[derive(Debug, Clone)]
pub struct Declaration {
    pub(crate) name: String,
    pub(crate) kind: SymbolKind,
    pub(crate) domain: Vec<AxisRef>,
    pub(crate) description: Option<String>,
    pub(crate) singleton: bool,
    pub(crate) domain_forwarding: bool,
    pub(crate) var_type: VariableType,
    pub(crate) alias_target: Option<AliasTarget>,
}

impl Declaration {
    fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            domain: Vec::new(),
            description: None,
            singleton: false,
            domain_forwarding: false,
            var_type: VariableType::Free,
            alias_target: None,
        }
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Set)
    }

    pub fn singleton_set(name: impl Into<String>) -> Self {
        let mut decl = Self::new(name, SymbolKind::Set);
        decl.singleton = true;
        decl
    }

    pub fn alias(name: impl Into<String>, target: SymbolId) -> Self {
        let mut decl = Self::new(name, SymbolKind::Alias);
        decl.alias_target = Some(AliasTarget::Symbol(target));
        decl
    }

    /// Alias of the implicit universal set; accepts any label, unchecked
    pub fn universe_alias(name: impl Into<String>) -> Self {
        let mut decl = Self::new(name, SymbolKind::Alias);
        decl.alias_target = Some(AliasTarget::Universe);
        decl
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Parameter)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Variable)
    }

    pub fn equation(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Equation)
    }

    pub fn domain(mut self, domain: Vec<AxisRef>) -> Self {
        self.domain = domain;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Populate unpopulated domain sets from this parameter's records
    pub fn forwarding(mut self) -> Self {
        self.domain_forwarding = true;
        self
    }

    pub fn var_type(mut self, var_type: VariableType) -> Self {
        self.var_type = var_type;
        self
    }
}

pub struct Workspace {
    name: String,
    options: WorkspaceOptions,
    validator: Validator,
    symbols: Vec<Symbol>,
    names: HashMap<String, SymbolId>,
    scheduler: Scheduler,
    engine: Box<dyn ExecutionEngine>,
}

impl Workspace {
    pub fn new(name: impl Into<String>, engine: Box<dyn ExecutionEngine>) -> Self {
        Self::with_options(name, engine, WorkspaceOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        engine: Box<dyn ExecutionEngine>,
        options: WorkspaceOptions,
    ) -> Self {
        Self {
            name: name.into(),
            options,
            validator: Validator,
            symbols: Vec::new(),
            names: HashMap::new(),
            scheduler: Scheduler::new(),
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    /// Number of statements waiting for the next flush
    pub fn pending_statements(&self) -> usize {
        self.scheduler.len()
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Declare a symbol, or return the existing handle when the name is
    /// already bound to the same kind.
    ///
    /// Re-declaring under a different kind is a name conflict; a name,
    /// once bound to a kind, keeps that kind for the workspace's lifetime.
    pub fn declare(&mut self, decl: Declaration) -> SableResult<SymbolId> {
        self.validator.check_identifier(&decl.name)?;

        if let Some(&existing) = self.names.get(&decl.name) {
            let symbol = &self.symbols[existing.index()];
            if symbol.kind() != decl.kind {
                return Err(SableError::name_conflict(
                    decl.name,
                    symbol.kind(),
                    decl.kind,
                ));
            }
            // Idempotent re-declaration: same identity, description may be
            // refreshed.
            if decl.description.is_some() {
                self.symbols[existing.index()].description = decl.description;
            }
            return Ok(existing);
        }

        for &axis in &decl.domain {
            if let AxisRef::Symbol(id) = axis {
                self.check_handle(id)?;
                self.validator
                    .check_domain_entry(axis, self.symbols[id.index()].kind())?;
            }
        }

        let payload = match decl.kind {
            SymbolKind::Set => {
                let mut data = SetData::default();
                data.singleton = decl.singleton;
                SymbolPayload::Set(data)
            }
            SymbolKind::Alias => {
                let target = decl.alias_target.ok_or_else(|| {
                    SableError::validation("an alias declaration needs a target")
                })?;
                if let AliasTarget::Symbol(id) = target {
                    self.check_handle(id)?;
                    let kind = self.symbols[id.index()].kind();
                    if !matches!(kind, SymbolKind::Set | SymbolKind::Alias) {
                        return Err(SableError::domain_violation(format!(
                            "'{}' aliases a {}, expected a set",
                            decl.name,
                            kind.name()
                        )));
                    }
                    // The chain must already resolve; this also rejects
                    // cycles among existing aliases.
                    self.resolve_alias(id)?;
                }
                SymbolPayload::Alias(AliasData { target })
            }
            SymbolKind::Parameter => SymbolPayload::Parameter(ParameterData {
                domain_forwarding: decl.domain_forwarding,
            }),
            SymbolKind::Variable => SymbolPayload::Variable(VariableData {
                var_type: decl.var_type,
            }),
            SymbolKind::Equation => SymbolPayload::Equation(EquationData::default()),
        };

        // Sets have at least one axis; an undomained set ranges over the
        // universal set. Aliases mirror their target's domain.
        let domain = match &payload {
            SymbolPayload::Set(_) if decl.domain.is_empty() => vec![AxisRef::Universe],
            SymbolPayload::Alias(data) => match data.target {
                AliasTarget::Universe => vec![AxisRef::Universe],
                AliasTarget::Symbol(target) => self.symbols[target.index()].domain.clone(),
            },
            _ => decl.domain.clone(),
        };

        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: decl.name.clone(),
            description: decl.description,
            domain,
            state: SymbolState::Clean,
            records: None,
            payload,
        });
        self.names.insert(decl.name, id);

        // Domain-tree edges from parent sets to this set.
        if decl.kind == SymbolKind::Set {
            let parents: Vec<SymbolId> = self.symbols[id.index()]
                .domain
                .clone()
                .into_iter()
                .filter_map(|axis| axis.symbol())
                .filter_map(|axis_id| self.root_set_of(axis_id).ok().flatten())
                .collect();
            for parent in parents {
                let data = self.symbols[parent.index()]
                    .set_data_mut()
                    .expect("root of a set axis is a set");
                if !data.children.contains(&id) {
                    data.children.push(id);
                }
            }
        }

        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Borrow a declared symbol.
    ///
    /// Panics if the handle comes from a different workspace.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Walk the alias chain to the root set, or to the universal set
    ///
    /// An alias must never reference itself, directly or transitively;
    /// such a chain is rejected as fatal.
    pub fn resolve_alias(&self, id: SymbolId) -> SableResult<AxisRef> {
        self.check_handle(id)?;
        let mut visited = vec![id];
        let mut current = id;
        loop {
            match &self.symbols[current.index()].payload {
                SymbolPayload::Set(_) => return Ok(AxisRef::Symbol(current)),
                SymbolPayload::Alias(data) => match data.target {
                    AliasTarget::Universe => return Ok(AxisRef::Universe),
                    AliasTarget::Symbol(next) => {
                        if visited.contains(&next) {
                            return Err(SableError::domain_violation_on(
                                "alias chain references itself",
                                self.symbols[id.index()].name.clone(),
                            ));
                        }
                        visited.push(next);
                        current = next;
                    }
                },
                _ => {
                    return Err(SableError::domain_violation(format!(
                        "'{}' is a {}, not a set or alias",
                        self.symbols[current.index()].name,
                        self.symbols[current.index()].kind().name()
                    )))
                }
            }
        }
    }

    /// Display name of an axis
    pub fn axis_name(&self, axis: AxisRef) -> String {
        match axis {
            AxisRef::Universe => "*".to_string(),
            AxisRef::Symbol(id) => self.symbols[id.index()].name.clone(),
        }
    }

    pub(crate) fn validator_check_identifier(&self, name: &str) -> SableResult<()> {
        self.validator.check_identifier(name)
    }

    pub(crate) fn check_handle(&self, id: SymbolId) -> SableResult<()> {
        if id.index() < self.symbols.len() {
            Ok(())
        } else {
            Err(SableError::validation(format!(
                "{} is not a handle of this workspace",
                id
            )))
        }
    }

    fn root_set_of(&self, id: SymbolId) -> SableResult<Option<SymbolId>> {
        match self.resolve_alias(id)? {
            AxisRef::Symbol(root) => Ok(Some(root)),
            AxisRef::Universe => Ok(None),
        }
    }

    /// Intern a synthesized alias for a repeated set occurrence
    ///
    /// The name is deterministic per (root, ordinal), so identical
    /// collision shapes reuse one alias. A user may have legally bound
    /// `"{root}__{n}"` to something else; such ordinals are skipped, since
    /// the returned handle must always be an alias of `root`.
    pub(crate) fn collision_alias(
        &mut self,
        root: SymbolId,
        ordinal: usize,
    ) -> SableResult<SymbolId> {
        let mut ordinal = ordinal;
        loop {
            let name = format!("{}__{}", self.symbols[root.index()].name, ordinal);
            match self.names.get(&name).copied() {
                None => return self.declare(Declaration::alias(name, root)),
                Some(existing) => {
                    if self.symbols[existing.index()].kind() == SymbolKind::Alias
                        && self.resolve_alias(existing)? == AxisRef::Symbol(root)
                    {
                        return Ok(existing);
                    }
                    ordinal += 1;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Ordered sets
    // ------------------------------------------------------------------

    /// Mark a set ordered because an ordering operator touched it
    pub(crate) fn mark_ordered(&mut self, id: SymbolId) -> SableResult<()> {
        let root = self.root_set_of(id)?.ok_or_else(|| {
            SableError::validation("ordering operators do not apply to the universal set")
        })?;
        if self.symbols[root.index()].dimension() != 1 {
            return Err(SableError::validation(format!(
                "ordering operators need a one-dimensional set, '{}' has {} axes",
                self.symbols[root.index()].name,
                self.symbols[root.index()].dimension()
            )));
        }
        self.symbols[root.index()]
            .set_data_mut()
            .expect("root is a set")
            .ordered = true;
        Ok(())
    }

    /// 1-based position of an element in a set's current ordering
    pub fn ord_of(&mut self, set: SymbolId, element: &str) -> SableResult<usize> {
        self.mark_ordered(set)?;
        let root = self.root_set_of(set)?.expect("checked by mark_ordered");
        let symbol = &self.symbols[root.index()];
        symbol
            .set_data()
            .and_then(|data| data.position(element))
            .ok_or_else(|| {
                SableError::domain_violation_on(
                    format!("'{}' is not an element", element),
                    symbol.name.clone(),
                )
            })
    }

    /// Number of records of a symbol; aliases count their root's records
    pub fn card(&self, id: SymbolId) -> SableResult<usize> {
        let target = self.storage_target(id)?;
        let symbol = &self.symbols[target.index()];
        if let Some(data) = symbol.set_data() {
            if symbol.dimension() == 1 {
                return Ok(data.len());
            }
        }
        Ok(symbol.card())
    }

    /// Where a symbol's records live: aliases read through to their root
    /// set, everything else stores its own
    fn storage_target(&self, id: SymbolId) -> SableResult<SymbolId> {
        self.check_handle(id)?;
        if self.symbols[id.index()].kind() == SymbolKind::Alias {
            if let AxisRef::Symbol(root) = self.resolve_alias(id)? {
                return Ok(root);
            }
        }
        Ok(id)
    }

    /// Label validity against one declared axis, for index selections
    pub(crate) fn check_label(&self, label: &str, axis: AxisRef) -> SableResult<()> {
        self.validator.check_label(label, self.options.max_label_len)?;
        let root = match axis {
            AxisRef::Universe => return Ok(()),
            AxisRef::Symbol(id) => match self.resolve_alias(id)? {
                AxisRef::Universe => return Ok(()),
                AxisRef::Symbol(root) => root,
            },
        };
        let symbol = &self.symbols[root.index()];
        if let Some(data) = symbol.set_data() {
            // Dynamic or unpopulated membership is checked by the engine at
            // execution time instead.
            if !data.dynamic && !data.is_empty() && symbol.dimension() == 1 && !data.contains(label)
            {
                return Err(SableError::domain_violation_on(
                    format!("label '{}' is not a member", label),
                    symbol.name.clone(),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Data entry
    // ------------------------------------------------------------------

    /// Supply records directly, replacing any pending statement's effect
    /// for this symbol wholesale
    pub fn set_records(
        &mut self,
        id: SymbolId,
        rows: Vec<(Vec<String>, f64)>,
    ) -> SableResult<()> {
        self.check_handle(id)?;
        let kind = self.symbols[id.index()].kind();
        if kind == SymbolKind::Alias {
            return Err(SableError::validation(format!(
                "'{}' is an alias; aliases never store their own records",
                self.symbols[id.index()].name
            )));
        }

        let dimension = self.symbols[id.index()].dimension();
        for (keys, _) in &rows {
            if keys.len() != dimension {
                return Err(SableError::domain_violation_on(
                    format!(
                        "record has {} labels but the symbol has {} axes",
                        keys.len(),
                        dimension
                    ),
                    self.symbols[id.index()].name.clone(),
                ));
            }
            for label in keys {
                self.validator
                    .check_label(label, self.options.max_label_len)?;
            }
        }
        if dimension == 0 && rows.len() > 1 {
            return Err(SableError::validation(format!(
                "'{}' is a scalar and takes a single record",
                self.symbols[id.index()].name
            )));
        }

        let mut rows = rows;
        if kind == SymbolKind::Set {
            let data = self.symbols[id.index()].set_data().expect("kind checked");
            if data.singleton && rows.len() > 1 {
                match self.options.singleton_policy {
                    SingletonPolicy::Error => {
                        return Err(SableError::validation(format!(
                            "singleton set '{}' was assigned {} elements",
                            self.symbols[id.index()].name,
                            rows.len()
                        )));
                    }
                    SingletonPolicy::TakeFirst => rows.truncate(1),
                }
            }
            if !data.dynamic && !data.is_empty() {
                return Err(SableError::validation(format!(
                    "membership of static set '{}' was fixed at its first assignment",
                    self.symbols[id.index()].name
                )));
            }
        }

        let forwarding = matches!(
            &self.symbols[id.index()].payload,
            SymbolPayload::Parameter(data) if data.domain_forwarding
        );

        let domain = self.symbols[id.index()].domain.clone();
        let table = Table::from_rows(
            domain.iter().map(|&axis| self.axis_name(axis)).collect(),
            rows.into_iter(),
        );

        if forwarding {
            self.forward_domains(&domain, &table)?;
        } else {
            self.check_record_domains(id, &domain, &table)?;
        }

        if kind == SymbolKind::Set {
            self.apply_set_membership(id, &table)?;
            self.freeze_parents(id)?;
        }

        self.symbols[id.index()].records = Some(table);
        self.symbols[id.index()].state = SymbolState::Dirty;
        self.scheduler.enqueue(Statement::Data { symbol: id });
        debug!(symbol = %self.symbols[id.index()].name, "records staged");
        self.autoflush()
    }

    /// Every label must be a member of its axis's root set at assignment
    /// time
    fn check_record_domains(
        &self,
        id: SymbolId,
        domain: &[AxisRef],
        table: &Table,
    ) -> SableResult<()> {
        for (position, &axis) in domain.iter().enumerate() {
            let root = match axis {
                AxisRef::Universe => continue,
                AxisRef::Symbol(axis_id) => match self.resolve_alias(axis_id)? {
                    AxisRef::Universe => continue,
                    AxisRef::Symbol(root) => root,
                },
            };
            // Self-referential axes (a set over itself cannot occur, but a
            // subset's own id can be its root through an alias) are skipped.
            if root == id {
                continue;
            }
            let parent = &self.symbols[root.index()];
            let data = parent.set_data().expect("root is a set");
            if data.dynamic {
                continue;
            }
            for row in &table.rows {
                let label = &row.keys[position];
                if !data.contains(label) {
                    return Err(SableError::domain_violation_on(
                        format!(
                            "label '{}' is not a member of parent set '{}'",
                            label, parent.name
                        ),
                        self.symbols[id.index()].name.clone(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Domain forwarding: push distinct observed labels into each axis's
    /// root set, in first-seen order
    fn forward_domains(&mut self, domain: &[AxisRef], table: &Table) -> SableResult<()> {
        for (position, &axis) in domain.iter().enumerate() {
            let root = match axis {
                AxisRef::Universe => continue,
                AxisRef::Symbol(axis_id) => match self.resolve_alias(axis_id)? {
                    AxisRef::Universe => continue,
                    AxisRef::Symbol(root) => root,
                },
            };
            let labels = table.distinct_labels(position);
            let symbol = &mut self.symbols[root.index()];
            let data = symbol.set_data_mut().expect("root is a set");
            for label in labels {
                data.insert(&label);
            }
            let elements = data.elements.clone();
            let name = symbol.name.clone();
            symbol.records = Some(Table::from_elements(name, elements));
        }
        Ok(())
    }

    /// Replace a set's own membership from a freshly checked table
    fn apply_set_membership(&mut self, id: SymbolId, table: &Table) -> SableResult<()> {
        if self.symbols[id.index()].dimension() != 1 {
            return Ok(());
        }
        let frozen = self.symbols[id.index()]
            .set_data()
            .map(|d| d.frozen)
            .unwrap_or(false);
        let new_elements: Vec<String> = table.rows.iter().map(|r| r.keys[0].clone()).collect();
        if frozen {
            self.check_frozen_superset(id, &new_elements)?;
        }
        self.symbols[id.index()]
            .set_data_mut()
            .expect("set kind")
            .replace(new_elements);
        Ok(())
    }

    /// A frozen superset may not drop elements its checked subsets use
    fn check_frozen_superset(&self, id: SymbolId, new_elements: &[String]) -> SableResult<()> {
        let children = self.symbols[id.index()]
            .set_data()
            .map(|d| d.children.clone())
            .unwrap_or_default();
        for child in children {
            let child_symbol = &self.symbols[child.index()];
            let positions: Vec<usize> = child_symbol
                .domain
                .iter()
                .enumerate()
                .filter(|(_, &axis)| {
                    matches!(
                        axis.symbol().and_then(|a| self.root_set_of(a).ok().flatten()),
                        Some(root) if root == id
                    )
                })
                .map(|(i, _)| i)
                .collect();
            if let Some(records) = &child_symbol.records {
                for row in &records.rows {
                    for &position in &positions {
                        let label = &row.keys[position];
                        if !new_elements.iter().any(|e| e == label) {
                            return Err(SableError::domain_violation_on(
                                format!(
                                    "cannot drop '{}'; subset '{}' still uses it",
                                    label, child_symbol.name
                                ),
                                self.symbols[id.index()].name.clone(),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Writing to a subset freezes each of its supersets
    fn freeze_parents(&mut self, id: SymbolId) -> SableResult<()> {
        let parents: Vec<SymbolId> = self.symbols[id.index()]
            .domain
            .clone()
            .into_iter()
            .filter_map(|axis| axis.symbol())
            .filter_map(|axis_id| self.root_set_of(axis_id).ok().flatten())
            .filter(|&root| root != id)
            .collect();
        for parent in parents {
            if let Some(data) = self.symbols[parent.index()].set_data_mut() {
                data.frozen = true;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Enqueue an indexed assignment; the pending statement for a symbol
    /// is conceptually a full overwrite, not a merge
    pub fn assign(&mut self, assignment: Assignment) -> SableResult<()> {
        self.check_handle(assignment.target)?;
        let kind = self.symbols[assignment.target.index()].kind();
        match kind {
            SymbolKind::Parameter | SymbolKind::Set => {}
            SymbolKind::Equation => {
                return Err(SableError::validation_with_suggestion(
                    format!(
                        "'{}' is an equation",
                        self.symbols[assignment.target.index()].name
                    ),
                    "use define_equation for equation bodies",
                ));
            }
            _ => {
                return Err(SableError::validation(format!(
                    "cannot assign to a {}",
                    kind.name()
                )));
            }
        }

        let controlled = self.controlled_axes(assignment.target, &assignment.indices)?;
        self.check_controlled(&assignment.value, &controlled)?;
        if let Some(guard) = &assignment.guard {
            self.check_controlled(guard, &controlled)?;
        }

        if kind == SymbolKind::Set {
            // A boolean-valued assignment makes the subset dynamic and
            // freezes its supersets.
            self.symbols[assignment.target.index()]
                .set_data_mut()
                .expect("set kind")
                .dynamic = true;
            self.freeze_parents(assignment.target)?;
        }

        self.symbols[assignment.target.index()].state = SymbolState::Dirty;
        self.scheduler.enqueue(Statement::Assign(assignment));
        self.autoflush()
    }

    /// Define an equation body
    pub fn define_equation(&mut self, def: EquationDef) -> SableResult<()> {
        self.check_handle(def.equation)?;
        if self.symbols[def.equation.index()].kind() != SymbolKind::Equation {
            return Err(SableError::validation(format!(
                "'{}' is a {}, not an equation",
                self.symbols[def.equation.index()].name,
                self.symbols[def.equation.index()].kind().name()
            )));
        }

        let controlled = self.controlled_axes(def.equation, &def.indices)?;
        self.check_controlled(&def.lhs, &controlled)?;
        self.check_controlled(&def.rhs, &controlled)?;
        if let Some(guard) = &def.guard {
            self.check_controlled(guard, &controlled)?;
        }

        let mut combined = profile(self, &def.lhs);
        let rhs_profile = profile(self, &def.rhs);
        for var in rhs_profile.variables {
            if !combined.variables.contains(&var) {
                combined.variables.push(var);
            }
        }
        combined.nonlinear |= rhs_profile.nonlinear;

        if let SymbolPayload::Equation(data) = &mut self.symbols[def.equation.index()].payload {
            data.defined = true;
            data.relation = Some(def.relation);
            data.variables = combined.variables;
            data.nonlinear = combined.nonlinear;
        }

        self.symbols[def.equation.index()].state = SymbolState::Dirty;
        self.scheduler.enqueue(Statement::EquationDef(def));
        self.autoflush()
    }

    /// The controlling indices of a statement's left-hand side
    fn controlled_axes(
        &self,
        target: SymbolId,
        indices: &[crate::algebra::IndexSel],
    ) -> SableResult<Vec<AxisRef>> {
        if indices.is_empty() {
            Ok(self.symbols[target.index()].domain.clone())
        } else {
            // Validates count and per-position compatibility as a side
            // effect.
            let reference = algebra::sym_ix(self, target, indices.to_vec())?;
            Ok(reference.domain)
        }
    }

    /// Every free index of an enqueued expression must be controlled by
    /// the statement's left-hand side
    fn check_controlled(&self, expr: &algebra::Expr, controlled: &[AxisRef]) -> SableResult<()> {
        for &axis in &expr.domain {
            if axis == AxisRef::Universe {
                continue;
            }
            if !controlled.contains(&axis) {
                return Err(SableError::validation(format!(
                    "index '{}' is not controlled by the statement's left-hand side",
                    self.axis_name(axis)
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads and flushing
    // ------------------------------------------------------------------

    /// Non-forcing read of a symbol's materialized records
    pub fn records(&self, id: SymbolId) -> SableResult<RecordState<'_>> {
        let target = self.storage_target(id)?;
        let symbol = &self.symbols[target.index()];
        if symbol.is_dirty() {
            Ok(RecordState::Dirty)
        } else {
            Ok(RecordState::Clean(symbol.records.as_ref()))
        }
    }

    /// Read a symbol's records, flushing first when it is dirty
    ///
    /// Reading a clean symbol never triggers a flush.
    pub fn records_synced(&mut self, id: SymbolId) -> SableResult<Option<&Table>> {
        let target = self.storage_target(id)?;
        if self.symbols[target.index()].is_dirty() {
            self.flush_batch()?;
        }
        Ok(self.symbols[target.index()].records.as_ref())
    }

    /// Flush the pending statement queue as one batch
    pub fn flush(&mut self) -> SableResult<()> {
        self.flush_batch().map(|_| ())
    }

    /// Render the pending queue without executing it
    pub fn pending_program(&self) -> SableResult<ProgramText> {
        let batch = StatementBatch {
            statements: self.scheduler.statements().to_vec(),
            dict: self.snapshot_dict(),
        };
        self.engine.generate_program(&batch)
    }

    fn autoflush(&mut self) -> SableResult<()> {
        match self.options.execution_mode {
            ExecutionMode::Immediate => self.flush_batch().map(|_| ()),
            ExecutionMode::Deferred => Ok(()),
        }
    }

    pub(crate) fn enqueue_solve(&mut self, directive: crate::scheduler::SolveDirective) {
        self.scheduler.enqueue(Statement::Solve(directive));
    }

    /// Consolidate the queue into one program, run it, ingest results.
    ///
    /// The flush is atomic: on any failure the queue and every dirty flag
    /// are preserved, and nothing is partially applied.
    pub(crate) fn flush_batch(&mut self) -> SableResult<Option<SolveValues>> {
        if self.scheduler.is_empty() {
            return Ok(None);
        }

        let written = self.scheduler.written_symbols();
        for &id in &written {
            if self.symbols[id.index()].state == SymbolState::Dirty {
                self.symbols[id.index()].state = SymbolState::Flushing;
            }
        }

        let batch = StatementBatch {
            statements: self.scheduler.statements().to_vec(),
            dict: self.snapshot_dict(),
        };
        debug!(
            workspace = %self.name,
            statements = batch.statements.len(),
            "flushing statement batch"
        );

        let result = self.run_batch(&batch);
        match result {
            Ok(solve) => {
                for &id in &written {
                    self.symbols[id.index()].state = SymbolState::Clean;
                }
                self.scheduler.clear();
                Ok(solve)
            }
            Err(err) => {
                for &id in &written {
                    if self.symbols[id.index()].state == SymbolState::Flushing {
                        self.symbols[id.index()].state = SymbolState::Dirty;
                    }
                }
                Err(err)
            }
        }
    }

    fn run_batch(&mut self, batch: &StatementBatch) -> SableResult<Option<SolveValues>> {
        let program = self.engine.generate_program(batch)?;

        let mut inputs = BTreeMap::new();
        for id in batch.referenced_symbols() {
            let symbol = &self.symbols[id.index()];
            if let Some(records) = &symbol.records {
                inputs.insert(symbol.name.clone(), records.clone());
            }
        }

        let outcome = self.engine.execute(&program, &inputs)?;
        if !outcome.status.is_success() {
            warn!(
                workspace = %self.name,
                status = outcome.status.label(),
                "engine invocation failed"
            );
            return Err(SableError::execution(
                format!("engine reported {}", outcome.status.label()),
                outcome.status,
            ));
        }

        for (name, table) in outcome.outputs {
            if let Some(&id) = self.names.get(&name) {
                self.ingest(id, table)?;
            }
        }

        match outcome.status {
            crate::engine::ExecutionStatus::Success { solve } => Ok(solve),
            _ => Ok(None),
        }
    }

    /// Accept a returned table as a symbol's materialized records
    fn ingest(&mut self, id: SymbolId, table: Table) -> SableResult<()> {
        let forwarding = matches!(
            &self.symbols[id.index()].payload,
            SymbolPayload::Parameter(data) if data.domain_forwarding
        );
        if forwarding {
            let domain = self.symbols[id.index()].domain.clone();
            self.forward_domains(&domain, &table)?;
        }

        if self.symbols[id.index()].kind() == SymbolKind::Set
            && self.symbols[id.index()].dimension() == 1
        {
            let elements: Vec<String> = table.rows.iter().map(|r| r.keys[0].clone()).collect();
            self.symbols[id.index()]
                .set_data_mut()
                .expect("set kind")
                .replace(elements);
        }

        self.symbols[id.index()].records = Some(table);
        Ok(())
    }

    pub(crate) fn snapshot_dict(&self) -> SymbolDict {
        self.symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| {
                let meta = SymbolMeta {
                    name: symbol.name.clone(),
                    kind: symbol.kind(),
                    description: symbol.description.clone(),
                    domain: symbol.domain.clone(),
                    singleton: symbol.set_data().map(|d| d.singleton).unwrap_or(false),
                    var_type: symbol.variable_type(),
                    alias_target: match &symbol.payload {
                        SymbolPayload::Alias(data) => Some(data.target),
                        _ => None,
                    },
                };
                (SymbolId(index as u32), meta)
            })
            .collect()
    }
}
