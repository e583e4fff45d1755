//! Generalized matrix-multiplication dimension rules
//!
//! Seven shapes are defined, keyed by the rank of each operand:
//!
//! 1. vector @ vector       -> scalar (dot product)
//! 2. matrix @ matrix       -> matrix
//! 3. vector @ matrix       -> vector (leading unit axis dropped)
//! 4. matrix @ vector       -> vector
//! 5. vector @ tensor       -> batched, unit axis dropped
//! 6. tensor @ vector       -> batched, symmetric to (5)
//! 7. tensor @ tensor       -> equal batch ranks, matched positionally,
//!                             contraction on the trailing axis pair
//!
//! Anything else is a validation error. Contraction always happens over the
//! left operand's trailing axis against the right operand's second-to-last
//! axis (or only axis for a vector), which must resolve to the same root
//! set.

use super::domain::{inject_aliases, root_of};
use crate::error::SableError;
use crate::symbols::AxisRef;
use crate::workspace::Workspace;
use crate::SableResult;

/// The resolved shape of one matrix multiplication
///
/// `lhs_axes`/`rhs_axes` are the index assignments used when the product is
/// lowered to a contraction: the shared `reduce` index in the contracted
/// slots, batch indices unified positionally, and synthesized aliases in
/// slots whose output axis collided with an earlier one.
#[derive(Debug, Clone)]
pub struct MatMulPlan {
    pub output: Vec<AxisRef>,
    pub lhs_axes: Vec<AxisRef>,
    pub rhs_axes: Vec<AxisRef>,
    pub reduce: AxisRef,
}

#[derive(Clone, Copy)]
enum Slot {
    Lhs(usize),
    Rhs(usize),
}

pub fn plan_matmul(
    ws: &mut Workspace,
    lhs: &[AxisRef],
    rhs: &[AxisRef],
) -> SableResult<MatMulPlan> {
    let l = lhs.len();
    let r = rhs.len();
    if l == 0 || r == 0 {
        return Err(SableError::validation(
            "matrix multiplication requires operands of rank 1 or higher",
        ));
    }

    let contracted_lhs = l - 1;
    let contracted_rhs = if r == 1 { 0 } else { r - 2 };
    check_contraction(ws, lhs[contracted_lhs], rhs[contracted_rhs])?;

    let reduce = lhs[contracted_lhs];
    let mut lhs_axes = lhs.to_vec();
    let mut rhs_axes = rhs.to_vec();
    rhs_axes[contracted_rhs] = reduce;

    // Output axes with provenance, so alias injection can rewrite the
    // operand slot an output axis came from.
    let mut output: Vec<AxisRef> = Vec::new();
    let mut origin: Vec<Slot> = Vec::new();

    match (l, r) {
        (1, 1) => {}
        (2, 2) => {
            output.push(lhs[0]);
            origin.push(Slot::Lhs(0));
            output.push(rhs[1]);
            origin.push(Slot::Rhs(1));
        }
        (1, 2) => {
            output.push(rhs[1]);
            origin.push(Slot::Rhs(1));
        }
        (2, 1) => {
            output.push(lhs[0]);
            origin.push(Slot::Lhs(0));
        }
        (1, _) if r > 2 => {
            for (i, &axis) in rhs.iter().enumerate().take(r - 2) {
                output.push(axis);
                origin.push(Slot::Rhs(i));
            }
            output.push(rhs[r - 1]);
            origin.push(Slot::Rhs(r - 1));
        }
        (_, 1) if l > 2 => {
            for (i, &axis) in lhs.iter().enumerate().take(l - 2) {
                output.push(axis);
                origin.push(Slot::Lhs(i));
            }
            output.push(lhs[l - 2]);
            origin.push(Slot::Lhs(l - 2));
        }
        _ if l > 2 && r > 2 && l == r => {
            // Batch axes match positionally; no broadcasting.
            for i in 0..l - 2 {
                if !same_root(ws, lhs[i], rhs[i])? {
                    return Err(SableError::validation(format!(
                        "batch axis {} of the operands indexes different sets",
                        i + 1
                    )));
                }
                rhs_axes[i] = lhs[i];
                output.push(lhs[i]);
                origin.push(Slot::Lhs(i));
            }
            output.push(lhs[l - 2]);
            origin.push(Slot::Lhs(l - 2));
            output.push(rhs[r - 1]);
            origin.push(Slot::Rhs(r - 1));
        }
        _ => {
            return Err(SableError::validation(format!(
                "no matrix-multiplication rule for operands of rank {} and {}",
                l, r
            )));
        }
    }

    let replaced = inject_aliases(ws, &mut output, &[reduce])?;
    for (pos, axis) in replaced {
        match origin[pos] {
            Slot::Lhs(i) => lhs_axes[i] = axis,
            Slot::Rhs(i) => rhs_axes[i] = axis,
        }
    }

    Ok(MatMulPlan {
        output,
        lhs_axes,
        rhs_axes,
        reduce,
    })
}

fn check_contraction(ws: &Workspace, lhs_inner: AxisRef, rhs_inner: AxisRef) -> SableResult<()> {
    let lhs_root = root_of(ws, lhs_inner)?;
    let rhs_root = root_of(ws, rhs_inner)?;
    match (lhs_root, rhs_root) {
        (Some(a), Some(b)) if a == b => Ok(()),
        (None, _) | (_, None) => Err(SableError::validation(
            "cannot contract over the universal set",
        )),
        _ => Err(SableError::validation(
            "inner axes of a matrix multiplication must index the same set",
        )),
    }
}

fn same_root(ws: &Workspace, a: AxisRef, b: AxisRef) -> SableResult<bool> {
    match (root_of(ws, a)?, root_of(ws, b)?) {
        (Some(x), Some(y)) => Ok(x == y),
        _ => Ok(false),
    }
}
