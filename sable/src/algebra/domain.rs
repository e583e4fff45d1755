//! Domain inference primitives
//!
//! The index domain of an expression is an ordered sequence of set/alias
//! axes. Elementwise combination takes the ordered union of operand
//! domains, unifying axes that share a controlling index. Contraction-style
//! operations instead combine axes positionally; when that would put the
//! same controlling index into the result twice, a fresh internal alias is
//! synthesized for the later occurrence so no index is repeated.

use crate::error::SableError;
use crate::symbols::AxisRef;
use crate::workspace::Workspace;
use crate::SableResult;

/// Resolve an axis to its root set through any chain of aliases.
///
/// `None` means the universal set.
pub fn root_of(ws: &Workspace, axis: AxisRef) -> SableResult<Option<AxisRef>> {
    match axis {
        AxisRef::Universe => Ok(None),
        AxisRef::Symbol(id) => match ws.resolve_alias(id)? {
            AxisRef::Universe => Ok(None),
            root => Ok(Some(root)),
        },
    }
}

/// Whether two axes are controlled by the same index.
///
/// Identity is the axis symbol itself: two distinct aliases of one root set
/// are distinct indices on purpose. Universe axes never unify.
fn same_index(a: AxisRef, b: AxisRef) -> bool {
    match (a, b) {
        (AxisRef::Symbol(x), AxisRef::Symbol(y)) => x == y,
        _ => false,
    }
}

/// Ordered union of two domains with implicit broadcasting.
///
/// Axes of `rhs` already controlled by an index of `lhs` unify with it;
/// the rest are appended in order.
pub fn union_domains(lhs: &[AxisRef], rhs: &[AxisRef]) -> Vec<AxisRef> {
    let mut out = lhs.to_vec();
    for &axis in rhs {
        if !out.iter().any(|&have| same_index(have, axis)) {
            out.push(axis);
        }
    }
    out
}

/// Drop repeated controlling indices from a domain, keeping first
/// occurrences. A symbol indexed twice by the same set is a diagonal
/// reference, controlled by a single index.
pub fn dedupe_indices(domain: &[AxisRef]) -> Vec<AxisRef> {
    let mut out: Vec<AxisRef> = Vec::with_capacity(domain.len());
    for &axis in domain {
        if axis == AxisRef::Universe || !out.iter().any(|&have| same_index(have, axis)) {
            out.push(axis);
        }
    }
    out
}

/// Replace repeated controlling indices with synthesized aliases.
///
/// `reserved` indices count as already present (a contraction index must
/// not reappear in the output). Synthesized aliases are deterministic and
/// interned per workspace, so identical collision shapes reuse one alias.
/// Positions whose axis was replaced are reported so callers can rewrite
/// operand index assignments to match.
pub fn inject_aliases(
    ws: &mut Workspace,
    domain: &mut Vec<AxisRef>,
    reserved: &[AxisRef],
) -> SableResult<Vec<(usize, AxisRef)>> {
    let mut seen: Vec<AxisRef> = reserved.to_vec();
    let mut replaced = Vec::new();

    for pos in 0..domain.len() {
        let axis = domain[pos];
        if axis == AxisRef::Universe {
            continue;
        }
        if seen.iter().any(|&have| same_index(have, axis)) {
            let root = match root_of(ws, axis)? {
                Some(AxisRef::Symbol(id)) => id,
                _ => {
                    return Err(SableError::domain_violation(
                        "cannot synthesize an alias of the universal set",
                    ))
                }
            };
            // Ordinal is the occurrence count of this index so far, 1-based.
            let occurrences = 1 + seen
                .iter()
                .filter(|&&have| same_index(have, axis))
                .count();
            let alias = ws.collision_alias(root, occurrences)?;
            domain[pos] = AxisRef::Symbol(alias);
            replaced.push((pos, AxisRef::Symbol(alias)));
            seen.push(AxisRef::Symbol(alias));
        } else {
            seen.push(axis);
        }
    }
    Ok(replaced)
}

/// Whether `axis` may stand in an index position declared over `declared`.
///
/// Allowed when the declared axis is the universal wildcard, when the two
/// resolve to the same root set, or when the axis's root is declared
/// (transitively) beneath the declared root in the domain tree.
pub fn compatible_index(ws: &Workspace, axis: AxisRef, declared: AxisRef) -> SableResult<bool> {
    let declared_root = match root_of(ws, declared)? {
        None => return Ok(true),
        Some(root) => root,
    };
    let axis_root = match root_of(ws, axis)? {
        // A universe index against a checked axis is permitted; the engine
        // checks the labels it actually touches.
        None => return Ok(true),
        Some(root) => root,
    };
    if axis_root == declared_root {
        return Ok(true);
    }
    is_within(ws, axis_root, declared_root)
}

/// Domain-tree ancestry: whether `child` is declared beneath `ancestor`.
fn is_within(ws: &Workspace, child: AxisRef, ancestor: AxisRef) -> SableResult<bool> {
    let child_id = match child {
        AxisRef::Symbol(id) => id,
        AxisRef::Universe => return Ok(false),
    };
    for &parent in &ws.symbol(child_id).domain {
        let parent_root = match root_of(ws, parent)? {
            Some(root) => root,
            None => continue,
        };
        if parent_root == ancestor || is_within(ws, parent_root, ancestor)? {
            return Ok(true);
        }
    }
    Ok(false)
}
