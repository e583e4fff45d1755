//! Expression construction and domain inference
//!
//! The builder functions here are the only way to create expressions.
//! Domain inference runs at construction time, so an expression that
//! exists is always well-shaped.

pub mod analysis;
pub mod domain;
pub mod expr;
pub mod matmul;

pub use analysis::{profile, ExprProfile};
pub use domain::{compatible_index, dedupe_indices, root_of, union_domains};
pub use expr::{
    binary, card, constant, lag, lead, matmul, ord, permute, reduce, slice, sym, sym_ix, unary,
    BinaryOp, Expr, ExprKind, IndexSel, MatMulNode, ReductionOp, SymbolRef, UnaryOp,
};
pub use matmul::{plan_matmul, MatMulPlan};

use crate::symbols::AxisRef;

/// The inferred index domain of an expression
pub fn infer_domain(expr: &Expr) -> &[AxisRef] {
    &expr.domain
}
