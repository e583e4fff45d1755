//! Canonical program-text rendering
//!
//! Lowers a statement batch into deterministic textual form: a declaration
//! block for every symbol the batch touches, followed by the statements in
//! issue order. Engine implementations are free to generate their own
//! dialect; this printer is the reference lowering used by the bundled
//! playback engine and by snapshot tests.

use crate::algebra::expr::{BinaryOp, Expr, ExprKind, IndexSel, ReductionOp, UnaryOp};
use crate::engine::ProgramText;
use crate::error::SableError;
use crate::records::Table;
use crate::scheduler::{Statement, StatementBatch, SymbolDict, SymbolMeta};
use crate::symbols::sets::{AliasTarget, OffsetMode};
use crate::symbols::{AxisRef, EquationRelation, SymbolId, SymbolKind, VariableType};
use crate::SableResult;
use std::collections::HashMap;
use std::fmt::Write;

type Subst = HashMap<SymbolId, String>;

pub fn render_program(batch: &StatementBatch) -> SableResult<ProgramText> {
    let mut out = String::new();

    for id in batch.referenced_symbols() {
        let meta = lookup(&batch.dict, id)?;
        render_declaration(&batch.dict, meta, &mut out)?;
    }
    if !out.is_empty() {
        out.push('\n');
    }

    for statement in &batch.statements {
        render_statement(&batch.dict, statement, &mut out)?;
    }

    Ok(ProgramText { text: out })
}

fn lookup(dict: &SymbolDict, id: SymbolId) -> SableResult<&SymbolMeta> {
    dict.get(&id).ok_or_else(|| {
        SableError::validation(format!("symbol {} is not part of the batch dictionary", id))
    })
}

fn axis_text(dict: &SymbolDict, subst: &Subst, axis: AxisRef) -> SableResult<String> {
    match axis {
        AxisRef::Universe => Ok("*".to_string()),
        AxisRef::Symbol(id) => {
            if let Some(mapped) = subst.get(&id) {
                Ok(mapped.clone())
            } else {
                Ok(lookup(dict, id)?.name.clone())
            }
        }
    }
}

fn render_declaration(dict: &SymbolDict, meta: &SymbolMeta, out: &mut String) -> SableResult<()> {
    let keyword = match meta.kind {
        SymbolKind::Set if meta.singleton => "Singleton Set".to_string(),
        SymbolKind::Set => "Set".to_string(),
        SymbolKind::Alias => {
            let target = match meta.alias_target {
                Some(AliasTarget::Symbol(id)) => lookup(dict, id)?.name.clone(),
                _ => "*".to_string(),
            };
            writeln!(out, "Alias ({}, {});", target, meta.name)?;
            return Ok(());
        }
        SymbolKind::Parameter => "Parameter".to_string(),
        SymbolKind::Variable => match meta.var_type {
            Some(VariableType::Positive) => "Positive Variable".to_string(),
            Some(VariableType::Negative) => "Negative Variable".to_string(),
            Some(VariableType::Binary) => "Binary Variable".to_string(),
            Some(VariableType::Integer) => "Integer Variable".to_string(),
            _ => "Variable".to_string(),
        },
        SymbolKind::Equation => "Equation".to_string(),
    };

    write!(out, "{} {}", keyword, meta.name)?;
    if !meta.domain.is_empty() {
        let axes: SableResult<Vec<String>> = meta
            .domain
            .iter()
            .map(|&axis| axis_text(dict, &Subst::new(), axis))
            .collect();
        write!(out, "({})", axes?.join(","))?;
    }
    if let Some(description) = &meta.description {
        write!(out, " \"{}\"", description)?;
    }
    out.push_str(";\n");
    Ok(())
}

fn render_statement(dict: &SymbolDict, statement: &Statement, out: &mut String) -> SableResult<()> {
    let subst = Subst::new();
    match statement {
        Statement::Data { symbol } => {
            writeln!(out, "$load {}", lookup(dict, *symbol)?.name)?;
        }
        Statement::Assign(assign) => {
            write!(out, "{}", lookup(dict, assign.target)?.name)?;
            render_indices(dict, &subst, &assign.indices, out)?;
            if let Some(guard) = &assign.guard {
                write!(out, "$({})", render_expr(dict, &subst, guard)?)?;
            }
            writeln!(out, " = {};", render_expr(dict, &subst, &assign.value)?)?;
        }
        Statement::EquationDef(def) => {
            write!(out, "{}", lookup(dict, def.equation)?.name)?;
            render_indices(dict, &subst, &def.indices, out)?;
            if let Some(guard) = &def.guard {
                write!(out, "$({})", render_expr(dict, &subst, guard)?)?;
            }
            let relation = match def.relation {
                EquationRelation::Eq => "=e=",
                EquationRelation::Geq => "=g=",
                EquationRelation::Leq => "=l=",
            };
            writeln!(
                out,
                ".. {} {} {};",
                render_expr(dict, &subst, &def.lhs)?,
                relation,
                render_expr(dict, &subst, &def.rhs)?
            )?;
        }
        Statement::Solve(solve) => {
            let equations: SableResult<Vec<String>> = solve
                .equations
                .iter()
                .map(|&id| Ok(lookup(dict, id)?.name.clone()))
                .collect();
            writeln!(out, "Model {} / {} /;", solve.model, equations?.join(", "))?;
            write!(out, "solve {} using {}", solve.model, solve.problem_class.keyword())?;
            if let (Some(objective), Some(word)) = (solve.objective, solve.sense.keyword()) {
                write!(out, " {} {}", word, lookup(dict, objective)?.name)?;
            }
            out.push_str(";\n");
        }
    }
    Ok(())
}

fn render_indices(
    dict: &SymbolDict,
    subst: &Subst,
    sels: &[IndexSel],
    out: &mut String,
) -> SableResult<()> {
    if sels.is_empty() {
        return Ok(());
    }
    let parts: SableResult<Vec<String>> = sels
        .iter()
        .map(|sel| render_sel(dict, subst, sel))
        .collect();
    write!(out, "({})", parts?.join(","))?;
    Ok(())
}

fn render_sel(dict: &SymbolDict, subst: &Subst, sel: &IndexSel) -> SableResult<String> {
    match sel {
        IndexSel::Axis(axis) => axis_text(dict, subst, *axis),
        IndexSel::Label(label) => Ok(format!("\"{}\"", label)),
        IndexSel::Shifted { axis, shift, mode } => {
            let name = axis_text(dict, subst, AxisRef::Symbol(*axis))?;
            let magnitude = shift.unsigned_abs();
            let op = match (mode, *shift >= 0) {
                (OffsetMode::Linear, true) => "+",
                (OffsetMode::Linear, false) => "-",
                (OffsetMode::Circular, true) => "++",
                (OffsetMode::Circular, false) => "--",
            };
            Ok(format!("{}{}{}", name, op, magnitude))
        }
        IndexSel::Ellipsis => Err(SableError::validation(
            "unexpanded ellipsis reached program generation",
        )),
    }
}

fn render_expr(dict: &SymbolDict, subst: &Subst, expr: &Expr) -> SableResult<String> {
    match &expr.kind {
        ExprKind::Constant(value) => Ok(format!("{}", value)),
        ExprKind::SymbolRef(sref) => {
            let mut text = lookup(dict, sref.symbol)?.name.clone();
            if !sref.indices.is_empty() {
                let parts: SableResult<Vec<String>> = sref
                    .indices
                    .iter()
                    .map(|sel| render_sel(dict, subst, sel))
                    .collect();
                text.push('(');
                text.push_str(&parts?.join(","));
                text.push(')');
            }
            Ok(text)
        }
        ExprKind::Unary { op, operand } => {
            let inner = render_expr(dict, subst, operand)?;
            Ok(match op {
                UnaryOp::Neg => format!("(-{})", inner),
                UnaryOp::Not => format!("(not {})", inner),
                UnaryOp::Abs => format!("abs({})", inner),
                UnaryOp::Exp => format!("exp({})", inner),
                UnaryOp::Log => format!("log({})", inner),
                UnaryOp::Sqrt => format!("sqrt({})", inner),
            })
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let token = match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::Pow => "**",
                BinaryOp::And => "and",
                BinaryOp::Or => "or",
                BinaryOp::Xor => "xor",
                BinaryOp::Lt => "<",
                BinaryOp::Le => "<=",
                BinaryOp::Gt => ">",
                BinaryOp::Ge => ">=",
                BinaryOp::Eq => "=",
                BinaryOp::Ne => "<>",
            };
            Ok(format!(
                "({} {} {})",
                render_expr(dict, subst, lhs)?,
                token,
                render_expr(dict, subst, rhs)?
            ))
        }
        ExprKind::Reduction { op, over, body } => {
            let keyword = match op {
                ReductionOp::Sum => "sum",
                ReductionOp::Prod => "prod",
                ReductionOp::Smin => "smin",
                ReductionOp::Smax => "smax",
            };
            let axes: SableResult<Vec<String>> = over
                .iter()
                .map(|&axis| axis_text(dict, subst, axis))
                .collect();
            let axes = axes?;
            let index = if axes.len() == 1 {
                axes[0].clone()
            } else {
                format!("({})", axes.join(","))
            };
            Ok(format!(
                "{}({}, {})",
                keyword,
                index,
                render_expr(dict, subst, body)?
            ))
        }
        ExprKind::MatMul(node) => {
            let reduce = axis_text(dict, subst, node.plan.reduce)?;
            let lhs_subst = operand_subst(dict, subst, &node.lhs.domain, &node.plan.lhs_axes)?;
            let rhs_subst = operand_subst(dict, subst, &node.rhs.domain, &node.plan.rhs_axes)?;
            Ok(format!(
                "sum({}, {} * {})",
                reduce,
                render_expr(dict, &lhs_subst, &node.lhs)?,
                render_expr(dict, &rhs_subst, &node.rhs)?
            ))
        }
        ExprKind::Permute { base, .. } => {
            // Axes are id-addressed, so a reordered view prints as its base.
            render_expr(dict, subst, base)
        }
        ExprKind::Slice { base, sels } => {
            let mut inner = subst.clone();
            for (pos, sel) in sels.iter().enumerate() {
                match base.domain[pos] {
                    AxisRef::Symbol(id) => {
                        inner.insert(id, render_sel(dict, subst, sel)?);
                    }
                    AxisRef::Universe => {
                        if !matches!(sel, IndexSel::Axis(AxisRef::Universe)) {
                            return Err(SableError::validation(
                                "cannot slice an unnamed axis of a composite expression",
                            ));
                        }
                    }
                }
            }
            render_expr(dict, &inner, base)
        }
        ExprKind::Ord { set } => Ok(format!(
            "ord({})",
            axis_text(dict, subst, AxisRef::Symbol(*set))?
        )),
        ExprKind::Card { symbol } => Ok(format!("card({})", lookup(dict, *symbol)?.name)),
    }
}

fn operand_subst(
    dict: &SymbolDict,
    outer: &Subst,
    operand_domain: &[AxisRef],
    assigned: &[AxisRef],
) -> SableResult<Subst> {
    let mut subst = outer.clone();
    for (&orig, &axis) in operand_domain.iter().zip(assigned) {
        if let AxisRef::Symbol(id) = orig {
            subst.insert(id, axis_text(dict, outer, axis)?);
        }
    }
    Ok(subst)
}

/// Render an exchange table for diagnostics and snapshots
pub fn render_table(name: &str, table: &Table) -> String {
    let mut out = format!("{}({}):\n", name, table.columns.join(","));
    for row in &table.rows {
        let _ = writeln!(out, "  [{}] = {}", row.keys.join(","), row.value);
    }
    out
}
