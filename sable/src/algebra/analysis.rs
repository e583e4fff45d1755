//! Light structural analysis of expressions
//!
//! The model assembler needs to know which variables an equation touches
//! and whether any term is nonlinear in them, so problem-class
//! compatibility can be rejected before anything reaches the external
//! engine.

use super::expr::{BinaryOp, Expr, ExprKind};
use crate::symbols::{SymbolId, SymbolKind};
use crate::workspace::Workspace;

/// What an expression does with decision variables
#[derive(Debug, Clone, Default)]
pub struct ExprProfile {
    pub variables: Vec<SymbolId>,
    pub nonlinear: bool,
}

impl ExprProfile {
    pub fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }

    fn absorb(&mut self, other: ExprProfile) {
        for var in other.variables {
            if !self.variables.contains(&var) {
                self.variables.push(var);
            }
        }
        self.nonlinear |= other.nonlinear;
    }
}

/// Profile an expression: referenced variables and linearity in them
pub fn profile(ws: &Workspace, expr: &Expr) -> ExprProfile {
    let mut out = ExprProfile::default();
    walk(ws, expr, &mut out);
    out
}

fn walk(ws: &Workspace, expr: &Expr, out: &mut ExprProfile) {
    match &expr.kind {
        ExprKind::Constant(_) | ExprKind::Ord { .. } | ExprKind::Card { .. } => {}
        ExprKind::SymbolRef(sref) => {
            if ws.symbol(sref.symbol).kind() == SymbolKind::Variable
                && !out.variables.contains(&sref.symbol)
            {
                out.variables.push(sref.symbol);
            }
        }
        ExprKind::Unary { op, operand } => {
            let inner = profile(ws, operand);
            if inner.has_variables() && op.is_nonlinear() {
                out.nonlinear = true;
            }
            out.absorb(inner);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let left = profile(ws, lhs);
            let right = profile(ws, rhs);
            match op {
                BinaryOp::Mul => {
                    if left.has_variables() && right.has_variables() {
                        out.nonlinear = true;
                    }
                }
                BinaryOp::Div => {
                    if right.has_variables() {
                        out.nonlinear = true;
                    }
                }
                BinaryOp::Pow => {
                    if left.has_variables() || right.has_variables() {
                        out.nonlinear = true;
                    }
                }
                BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne => {
                    // Discontinuous in any participating variable.
                    if left.has_variables() || right.has_variables() {
                        out.nonlinear = true;
                    }
                }
                BinaryOp::Add | BinaryOp::Sub => {}
            }
            out.absorb(left);
            out.absorb(right);
        }
        ExprKind::Reduction { body, .. } => walk(ws, body, out),
        ExprKind::MatMul(node) => {
            let left = profile(ws, &node.lhs);
            let right = profile(ws, &node.rhs);
            if left.has_variables() && right.has_variables() {
                out.nonlinear = true;
            }
            out.absorb(left);
            out.absorb(right);
        }
        ExprKind::Permute { base, .. } => walk(ws, base, out),
        ExprKind::Slice { base, .. } => walk(ws, base, out),
    }
}
