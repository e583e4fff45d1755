//! Expression trees and the explicit builder API
//!
//! Expressions are immutable trees built through pure functions rather than
//! operator overloads, so every domain-inference rule is directly
//! observable and testable. Each node carries its inferred domain, computed
//! at construction time; building a node fails synchronously when shapes or
//! domains are incompatible, so nothing malformed ever reaches the
//! scheduler.

use super::domain::{compatible_index, dedupe_indices, root_of, union_domains};
use super::matmul::{plan_matmul, MatMulPlan};
use crate::error::SableError;
use crate::symbols::sets::OffsetMode;
use crate::symbols::{AxisRef, SymbolId, SymbolKind};
use crate::workspace::Workspace;
use crate::SableResult;

/// One index position of a symbol reference or slice
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSel {
    /// Index by a set or alias (the controlling index for that position)
    Axis(AxisRef),
    /// Fix the position to one label
    Label(String),
    /// Lag/lead reference on an ordered set
    Shifted {
        axis: SymbolId,
        shift: i64,
        mode: OffsetMode,
    },
    /// Stand-in for all remaining implicit axes; expanded by the builder
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Abs,
    Exp,
    Log,
    Sqrt,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "negation",
            UnaryOp::Not => "logical not",
            UnaryOp::Abs => "absolute value",
            UnaryOp::Exp => "exponential",
            UnaryOp::Log => "logarithm",
            UnaryOp::Sqrt => "square root",
        }
    }

    /// True for operations that make an expression nonlinear in its
    /// variables
    pub fn is_nonlinear(&self) -> bool {
        !matches!(self, UnaryOp::Neg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    And,
    Or,
    Xor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "addition",
            BinaryOp::Sub => "subtraction",
            BinaryOp::Mul => "multiplication",
            BinaryOp::Div => "division",
            BinaryOp::Pow => "exponentiation",
            BinaryOp::And => "logical and",
            BinaryOp::Or => "logical or",
            BinaryOp::Xor => "logical xor",
            BinaryOp::Lt => "less than",
            BinaryOp::Le => "less than or equal",
            BinaryOp::Gt => "greater than",
            BinaryOp::Ge => "greater than or equal",
            BinaryOp::Eq => "equality",
            BinaryOp::Ne => "inequality",
        }
    }
}

/// Reduction over one or more controlling indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionOp {
    Sum,
    Prod,
    Smin,
    Smax,
}

impl ReductionOp {
    pub fn name(&self) -> &'static str {
        match self {
            ReductionOp::Sum => "sum",
            ReductionOp::Prod => "prod",
            ReductionOp::Smin => "smin",
            ReductionOp::Smax => "smax",
        }
    }
}

/// Reference to a declared symbol with explicit or implicit indexing
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRef {
    pub symbol: SymbolId,
    /// Empty means the symbol's own declared domain is substituted
    pub indices: Vec<IndexSel>,
}

/// A lowered matrix multiplication with its index assignments
#[derive(Debug, Clone)]
pub struct MatMulNode {
    pub lhs: Expr,
    pub rhs: Expr,
    pub plan: MatMulPlan,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(f64),
    SymbolRef(SymbolRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Reduction {
        op: ReductionOp,
        over: Vec<AxisRef>,
        body: Box<Expr>,
    },
    MatMul(Box<MatMulNode>),
    /// Placeholder view with axes reordered; reads are rewritten back to
    /// the base expression's indices at printing time
    Permute {
        base: Box<Expr>,
        axes: Vec<usize>,
    },
    /// Partial indexing of a composite expression
    Slice {
        base: Box<Expr>,
        sels: Vec<IndexSel>,
    },
    /// 1-based position of the controlling index in its ordered set
    Ord {
        set: SymbolId,
    },
    /// Number of records of a symbol
    Card {
        symbol: SymbolId,
    },
}

/// An immutable expression node with its inferred index domain
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub domain: Vec<AxisRef>,
}

impl Expr {
    pub fn rank(&self) -> usize {
        self.domain.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.domain.is_empty()
    }

    /// All symbols this expression mentions, including index axes
    pub fn collect_symbols(&self, out: &mut Vec<SymbolId>) {
        for &axis in &self.domain {
            if let AxisRef::Symbol(id) = axis {
                out.push(id);
            }
        }
        match &self.kind {
            ExprKind::Constant(_) => {}
            ExprKind::SymbolRef(sref) => {
                out.push(sref.symbol);
                collect_index_symbols(&sref.indices, out);
            }
            ExprKind::Unary { operand, .. } => operand.collect_symbols(out),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            ExprKind::Reduction { over, body, .. } => {
                for &axis in over {
                    if let AxisRef::Symbol(id) = axis {
                        out.push(id);
                    }
                }
                body.collect_symbols(out);
            }
            ExprKind::MatMul(node) => {
                node.lhs.collect_symbols(out);
                node.rhs.collect_symbols(out);
                for &axis in node
                    .plan
                    .lhs_axes
                    .iter()
                    .chain(&node.plan.rhs_axes)
                    .chain(std::iter::once(&node.plan.reduce))
                {
                    if let AxisRef::Symbol(id) = axis {
                        out.push(id);
                    }
                }
            }
            ExprKind::Permute { base, .. } => base.collect_symbols(out),
            ExprKind::Slice { base, sels } => {
                base.collect_symbols(out);
                collect_index_symbols(sels, out);
            }
            ExprKind::Ord { set } => out.push(*set),
            ExprKind::Card { symbol } => out.push(*symbol),
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

/// A numeric constant
pub fn constant(value: f64) -> Expr {
    Expr {
        kind: ExprKind::Constant(value),
        domain: Vec::new(),
    }
}

/// Reference a symbol with its implicit declared domain
pub fn sym(ws: &Workspace, symbol: SymbolId) -> SableResult<Expr> {
    sym_ix(ws, symbol, Vec::new())
}

/// Reference a symbol with explicit index selections
///
/// An empty selection list substitutes the declared domain. An `Ellipsis`
/// entry expands to the untouched declared axes at its position.
pub fn sym_ix(ws: &Workspace, symbol: SymbolId, indices: Vec<IndexSel>) -> SableResult<Expr> {
    let declared = ws.symbol(symbol).domain.clone();
    let sels = if indices.is_empty() {
        declared.iter().map(|&axis| IndexSel::Axis(axis)).collect()
    } else {
        expand_ellipsis(indices, &declared)?
    };

    if sels.len() != declared.len() {
        return Err(SableError::validation(format!(
            "'{}' has {} axes but was indexed with {}",
            ws.symbol(symbol).name,
            declared.len(),
            sels.len()
        )));
    }

    let domain = selection_domain(ws, &sels, &declared, &ws.symbol(symbol).name)?;
    Ok(Expr {
        kind: ExprKind::SymbolRef(SymbolRef {
            symbol,
            indices: sels,
        }),
        domain,
    })
}

/// Apply a unary operation; the domain passes through unchanged
pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    let domain = operand.domain.clone();
    Expr {
        kind: ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        domain,
    }
}

/// Combine two expressions elementwise
///
/// The result domain is the ordered union of the operand domains; operands
/// missing an axis broadcast over it, and axes sharing a controlling index
/// unify.
pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let domain = union_domains(&lhs.domain, &rhs.domain);
    Expr {
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        domain,
    }
}

/// Generalized matrix multiplication over the trailing axis pair
pub fn matmul(ws: &mut Workspace, lhs: Expr, rhs: Expr) -> SableResult<Expr> {
    let plan = plan_matmul(ws, &lhs.domain, &rhs.domain)?;
    let domain = plan.output.clone();
    Ok(Expr {
        kind: ExprKind::MatMul(Box::new(MatMulNode { lhs, rhs, plan })),
        domain,
    })
}

/// Reduce one or more controlling indices out of an expression
pub fn reduce(op: ReductionOp, over: Vec<AxisRef>, body: Expr) -> SableResult<Expr> {
    let mut domain = body.domain.clone();
    for &axis in &over {
        let position = domain.iter().position(|&have| have == axis);
        match position {
            Some(pos) => {
                domain.remove(pos);
            }
            None => {
                return Err(SableError::validation(format!(
                    "{} index is not part of the body's domain",
                    op.name()
                )));
            }
        }
    }
    Ok(Expr {
        kind: ExprKind::Reduction {
            op,
            over,
            body: Box::new(body),
        },
        domain,
    })
}

/// Reorder the axes of an expression without materializing anything
///
/// `axes[k]` is the position in the base domain that becomes output axis
/// `k`.
pub fn permute(base: Expr, axes: Vec<usize>) -> SableResult<Expr> {
    if axes.len() != base.rank() {
        return Err(SableError::validation(format!(
            "permutation of length {} applied to an expression of rank {}",
            axes.len(),
            base.rank()
        )));
    }
    let mut seen = vec![false; axes.len()];
    for &axis in &axes {
        if axis >= axes.len() || seen[axis] {
            return Err(SableError::validation(
                "permutation must mention every axis exactly once",
            ));
        }
        seen[axis] = true;
    }
    let domain = axes.iter().map(|&i| base.domain[i]).collect();
    Ok(Expr {
        kind: ExprKind::Permute {
            base: Box::new(base),
            axes,
        },
        domain,
    })
}

/// Index an expression per axis, fixing or re-controlling positions
///
/// Indexing a permuted view against its original (un-permuted) axis order
/// is a domain violation: selections are checked against the view's own
/// domain.
pub fn slice(ws: &Workspace, base: Expr, sels: Vec<IndexSel>) -> SableResult<Expr> {
    let sels = expand_ellipsis(sels, &base.domain)?;
    if sels.len() != base.rank() {
        return Err(SableError::validation(format!(
            "expression of rank {} was indexed with {} selections",
            base.rank(),
            sels.len()
        )));
    }

    // A plain symbol reference folds the selections into itself; a permuted
    // symbol reference is rewritten back to the base symbol's axis order.
    match base.kind {
        ExprKind::SymbolRef(sref) if implicit_indices(&sref) => {
            let sels = respread_collapsed(&sref.indices, &base.domain, sels);
            return sym_ix(ws, sref.symbol, sels);
        }
        ExprKind::Permute { base: inner, axes } => {
            if let ExprKind::SymbolRef(sref) = &inner.kind {
                if implicit_indices(sref) {
                    // Verify against the permuted view before rewriting.
                    let view_domain = axes.iter().map(|&i| inner.domain[i]).collect::<Vec<_>>();
                    selection_domain(ws, &sels, &view_domain, "permuted view")?;
                    let mut rewritten = vec![IndexSel::Ellipsis; sels.len()];
                    for (k, sel) in sels.into_iter().enumerate() {
                        rewritten[axes[k]] = sel;
                    }
                    return sym_ix(ws, sref.symbol, rewritten);
                }
            }
            let base = Expr {
                kind: ExprKind::Permute { base: inner, axes },
                domain: base.domain,
            };
            let domain = selection_domain(ws, &sels, &base.domain, "permuted view")?;
            Ok(Expr {
                kind: ExprKind::Slice {
                    base: Box::new(base),
                    sels,
                },
                domain,
            })
        }
        kind => {
            let base = Expr {
                kind,
                domain: base.domain,
            };
            let domain = selection_domain(ws, &sels, &base.domain, "expression")?;
            Ok(Expr {
                kind: ExprKind::Slice {
                    base: Box::new(base),
                    sels,
                },
                domain,
            })
        }
    }
}

/// 1-based position of a set's controlling index; marks the set ordered
pub fn ord(ws: &mut Workspace, set: SymbolId) -> SableResult<Expr> {
    ws.mark_ordered(set)?;
    Ok(Expr {
        kind: ExprKind::Ord { set },
        domain: vec![AxisRef::Symbol(set)],
    })
}

/// Record count of a symbol as a scalar leaf; marks sets ordered
pub fn card(ws: &mut Workspace, symbol: SymbolId) -> SableResult<Expr> {
    let kind = ws.symbol(symbol).kind();
    if matches!(kind, SymbolKind::Set | SymbolKind::Alias) {
        ws.mark_ordered(symbol)?;
    }
    Ok(Expr {
        kind: ExprKind::Card { symbol },
        domain: Vec::new(),
    })
}

/// Lag reference: the element `n` positions earlier in the ordering
pub fn lag(ws: &mut Workspace, axis: SymbolId, n: u32, mode: OffsetMode) -> SableResult<IndexSel> {
    ws.mark_ordered(axis)?;
    Ok(IndexSel::Shifted {
        axis,
        shift: -(n as i64),
        mode,
    })
}

/// Lead reference: the element `n` positions later in the ordering
pub fn lead(ws: &mut Workspace, axis: SymbolId, n: u32, mode: OffsetMode) -> SableResult<IndexSel> {
    ws.mark_ordered(axis)?;
    Ok(IndexSel::Shifted {
        axis,
        shift: n as i64,
        mode,
    })
}

fn implicit_indices(sref: &SymbolRef) -> bool {
    sref.indices
        .iter()
        .all(|sel| matches!(sel, IndexSel::Axis(_)))
}

/// Spread selections sized to a reference's visible domain back over its
/// declared arity.
///
/// The visible domain drops collapsed axes (singleton sets, diagonal
/// repeats); those positions keep their original axis selection while the
/// caller's selections land on the axes that survived, in order.
fn respread_collapsed(
    declared: &[IndexSel],
    visible: &[AxisRef],
    sels: Vec<IndexSel>,
) -> Vec<IndexSel> {
    if sels.len() == declared.len() {
        return sels;
    }
    let mut out = Vec::with_capacity(declared.len());
    let mut pending = sels.into_iter();
    let mut cursor = 0;
    for sel in declared {
        match sel {
            IndexSel::Axis(axis) if cursor < visible.len() && visible[cursor] == *axis => {
                out.push(pending.next().expect("one selection per visible axis"));
                cursor += 1;
            }
            other => out.push(other.clone()),
        }
    }
    out
}

/// Expand a single `Ellipsis` entry into identity selections over the
/// untouched axes
fn expand_ellipsis(sels: Vec<IndexSel>, declared: &[AxisRef]) -> SableResult<Vec<IndexSel>> {
    let positions: Vec<usize> = sels
        .iter()
        .enumerate()
        .filter(|(_, sel)| matches!(sel, IndexSel::Ellipsis))
        .map(|(i, _)| i)
        .collect();
    match positions.len() {
        0 => Ok(sels),
        1 => {
            let at = positions[0];
            let explicit = sels.len() - 1;
            if explicit > declared.len() {
                return Err(SableError::validation(
                    "more index selections than axes to expand into",
                ));
            }
            let fill = declared.len() - explicit;
            let mut out = Vec::with_capacity(declared.len());
            out.extend(sels[..at].iter().cloned());
            for &axis in &declared[at..at + fill] {
                out.push(IndexSel::Axis(axis));
            }
            out.extend(sels[at + 1..].iter().cloned());
            Ok(out)
        }
        _ => Err(SableError::validation(
            "at most one ellipsis is allowed per index tuple",
        )),
    }
}

/// Validate selections against the axes they index and derive the
/// resulting domain
///
/// Fixed labels drop their axis; axis and shifted selections contribute
/// their controlling index. Singleton sets collapse out of the result, and
/// a set indexing a symbol twice is a diagonal with one controlling index.
fn selection_domain(
    ws: &Workspace,
    sels: &[IndexSel],
    declared: &[AxisRef],
    context: &str,
) -> SableResult<Vec<AxisRef>> {
    let mut out = Vec::with_capacity(sels.len());
    for (pos, sel) in sels.iter().enumerate() {
        let target = declared[pos];
        match sel {
            IndexSel::Axis(axis) => {
                if !compatible_index(ws, *axis, target)? {
                    return Err(SableError::domain_violation(format!(
                        "index {} of {} expects {} but was given {}",
                        pos + 1,
                        context,
                        ws.axis_name(target),
                        ws.axis_name(*axis),
                    )));
                }
                if !collapses(ws, *axis)? {
                    out.push(*axis);
                }
            }
            IndexSel::Label(label) => {
                ws.check_label(label, target)?;
            }
            IndexSel::Shifted { axis, .. } => {
                let axis = AxisRef::Symbol(*axis);
                if !compatible_index(ws, axis, target)? {
                    return Err(SableError::domain_violation(format!(
                        "index {} of {} expects {} but was given {}",
                        pos + 1,
                        context,
                        ws.axis_name(target),
                        ws.axis_name(axis),
                    )));
                }
                if !collapses(ws, axis)? {
                    out.push(axis);
                }
            }
            IndexSel::Ellipsis => {
                return Err(SableError::validation(
                    "ellipsis must be expanded before validation",
                ));
            }
        }
    }
    Ok(dedupe_indices(&out))
}

/// Singleton sets contribute no controlling index
fn collapses(ws: &Workspace, axis: AxisRef) -> SableResult<bool> {
    match root_of(ws, axis)? {
        Some(AxisRef::Symbol(root)) => Ok(ws
            .symbol(root)
            .set_data()
            .map(|data| data.singleton)
            .unwrap_or(false)),
        _ => Ok(false),
    }
}
