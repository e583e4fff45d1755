//! Model assembly and solving
//!
//! A model is a named bundle of defined equations plus an optional scalar
//! objective. Assembly validates the bundle against its declared problem
//! class locally; the solve itself is one more statement through the
//! scheduler, so pending data always reaches the engine in the same batch
//! as the solve directive.

use crate::engine::SolveValues;
use crate::error::SableError;
use crate::scheduler::SolveDirective;
use crate::symbols::{SymbolId, SymbolKind};
use crate::workspace::Workspace;
use crate::SableResult;
use serde::Serialize;
use tracing::debug;

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Min,
    Max,
    /// Pure feasibility: no objective, any feasible point is a solution
    Feasibility,
}

impl Sense {
    /// Directive keyword, absent for feasibility models
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Sense::Min => Some("minimizing"),
            Sense::Max => Some("maximizing"),
            Sense::Feasibility => None,
        }
    }
}

/// Declared problem class, checked locally against model content before
/// anything is enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemClass {
    LP,
    NLP,
    MIP,
    MINLP,
    QCP,
    MIQCP,
}

impl ProblemClass {
    pub fn keyword(&self) -> &'static str {
        match self {
            ProblemClass::LP => "lp",
            ProblemClass::NLP => "nlp",
            ProblemClass::MIP => "mip",
            ProblemClass::MINLP => "minlp",
            ProblemClass::QCP => "qcp",
            ProblemClass::MIQCP => "miqcp",
        }
    }

    fn admits_nonlinear(&self) -> bool {
        matches!(
            self,
            ProblemClass::NLP | ProblemClass::MINLP | ProblemClass::QCP | ProblemClass::MIQCP
        )
    }

    fn admits_discrete(&self) -> bool {
        matches!(
            self,
            ProblemClass::MIP | ProblemClass::MINLP | ProblemClass::MIQCP
        )
    }
}

/// An assembled, locally validated model
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub equations: Vec<SymbolId>,
    pub objective: Option<SymbolId>,
    pub sense: Sense,
    pub problem_class: ProblemClass,
}

impl Model {
    /// Number of equation rows, counting the implicit objective row
    pub fn card(&self) -> usize {
        self.equations.len() + usize::from(self.objective.is_some())
    }
}

/// Solution attributes of a completed solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveSummary {
    pub model_status: String,
    pub solver_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

impl From<SolveValues> for SolveSummary {
    fn from(values: SolveValues) -> Self {
        Self {
            model_status: values.model_status,
            solver_status: values.solver_status,
            objective: values.objective,
        }
    }
}

impl Workspace {
    /// Assemble a model from defined equations and validate it against its
    /// declared problem class
    ///
    /// Duplicate equation handles collapse to one membership. The check is
    /// conservative: it rejects content the class can never admit and
    /// leaves everything finer-grained to the engine.
    pub fn assemble(
        &mut self,
        name: impl Into<String>,
        equations: Vec<SymbolId>,
        objective: Option<SymbolId>,
        sense: Sense,
        problem_class: ProblemClass,
    ) -> SableResult<Model> {
        let name = name.into();
        self.validator_check_identifier(&name)?;

        if equations.is_empty() {
            return Err(SableError::validation(format!(
                "model '{}' has no equations",
                name
            )));
        }

        let mut members: Vec<SymbolId> = Vec::new();
        for id in equations {
            self.check_handle(id)?;
            let symbol = self.symbol(id);
            let data = symbol.equation_data().ok_or_else(|| {
                SableError::validation(format!(
                    "'{}' is a {}, not an equation",
                    symbol.name,
                    symbol.kind().name()
                ))
            })?;
            if !data.defined {
                return Err(SableError::validation_with_suggestion(
                    format!("equation '{}' has no definition", symbol.name),
                    "define its body before assembling a model over it",
                ));
            }
            if !members.contains(&id) {
                members.push(id);
            }
        }

        match (sense, objective) {
            (Sense::Feasibility, Some(_)) => {
                return Err(SableError::validation(format!(
                    "feasibility model '{}' cannot carry an objective",
                    name
                )));
            }
            (Sense::Min | Sense::Max, None) => {
                return Err(SableError::validation(format!(
                    "model '{}' optimizes but names no objective variable",
                    name
                )));
            }
            _ => {}
        }

        if let Some(objective_id) = objective {
            self.check_handle(objective_id)?;
            let symbol = self.symbol(objective_id);
            if symbol.kind() != SymbolKind::Variable {
                return Err(SableError::validation(format!(
                    "objective '{}' is a {}, not a variable",
                    symbol.name,
                    symbol.kind().name()
                )));
            }
            if symbol.dimension() != 0 {
                return Err(SableError::validation_with_suggestion(
                    format!("objective '{}' is indexed", symbol.name),
                    "objectives must be scalar variables",
                ));
            }
        }

        self.check_problem_class(&name, &members, problem_class)?;

        Ok(Model {
            name,
            equations: members,
            objective,
            sense,
            problem_class,
        })
    }

    fn check_problem_class(
        &self,
        model: &str,
        equations: &[SymbolId],
        class: ProblemClass,
    ) -> SableResult<()> {
        for &id in equations {
            let symbol = self.symbol(id);
            let data = symbol.equation_data().expect("members are equations");
            if data.nonlinear && !class.admits_nonlinear() {
                return Err(SableError::validation_with_suggestion(
                    format!(
                        "model '{}' is declared {} but equation '{}' is nonlinear",
                        model,
                        class.keyword(),
                        symbol.name
                    ),
                    "declare the model nlp or minlp",
                ));
            }
            for &var in &data.variables {
                let discrete = self
                    .symbol(var)
                    .variable_type()
                    .map(|t| t.is_discrete())
                    .unwrap_or(false);
                if discrete && !class.admits_discrete() {
                    return Err(SableError::validation_with_suggestion(
                        format!(
                            "model '{}' is declared {} but variable '{}' is discrete",
                            model,
                            class.keyword(),
                            self.symbol(var).name
                        ),
                        "declare the model mip or minlp",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Solve an assembled model
    ///
    /// The directive joins the pending queue and the whole queue is flushed
    /// as one batch, so data staged before the call reaches the engine with
    /// it. On failure the queue and all dirty flags are preserved.
    pub fn solve(&mut self, model: &Model) -> SableResult<SolveSummary> {
        debug!(model = %model.name, class = model.problem_class.keyword(), "solving");
        self.enqueue_solve(SolveDirective {
            model: model.name.clone(),
            equations: model.equations.clone(),
            objective: model.objective,
            sense: model.sense,
            problem_class: model.problem_class,
        });
        let values = self.flush_batch()?;
        Ok(values
            .map(SolveSummary::from)
            .unwrap_or_else(|| SolveSummary {
                model_status: "unknown".to_string(),
                solver_status: "unknown".to_string(),
                objective: None,
            }))
    }
}
