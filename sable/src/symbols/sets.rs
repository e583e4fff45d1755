//! Set membership, ordering, and lag/lead position arithmetic
//!
//! Sets are unordered by default. The moment an ordering operator (ord,
//! card, lag, lead) is applied, the set is treated as ordered by the
//! sequence of its current elements. Position arithmetic comes in two
//! modes: linear addressing leaves out-of-range references undefined,
//! circular addressing wraps modulo cardinality and is always defined.

use std::collections::HashMap;

/// What an alias resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTarget {
    /// Another set or alias; chains resolve recursively to a root set
    Symbol(super::SymbolId),
    /// The implicit universal set. Accepts any label, unchecked.
    Universe,
}

/// Membership and ordering state of a declared set
#[derive(Debug, Clone, Default)]
pub struct SetData {
    /// Elements in insertion order. Insertion order is the ordering used by
    /// positional operators.
    pub elements: Vec<String>,
    positions: HashMap<String, usize>,

    /// At most one element may ever be assigned
    pub singleton: bool,

    /// Set once an ordering operator has been applied
    pub ordered: bool,

    /// Set on the first direct assignment; dynamic sets may change
    /// membership via boolean-valued assignments over their domain
    pub dynamic: bool,

    /// Set on a superset once one of its subsets is written directly. A
    /// frozen set may no longer drop elements that its checked subsets use.
    pub frozen: bool,

    /// Domain-tree edges to sets declared with this set as a parent axis
    pub children: Vec<super::SymbolId>,
}

impl SetData {
    pub fn singleton() -> Self {
        Self {
            singleton: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    /// 1-based position of an element in the current ordering
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).map(|p| p + 1)
    }

    /// Insert a label, keeping insertion order. Returns false if already
    /// present.
    pub fn insert(&mut self, label: &str) -> bool {
        if self.positions.contains_key(label) {
            return false;
        }
        self.positions.insert(label.to_string(), self.elements.len());
        self.elements.push(label.to_string());
        true
    }

    /// Replace the membership wholesale, preserving the given order
    pub fn replace(&mut self, labels: Vec<String>) {
        self.elements.clear();
        self.positions.clear();
        for label in labels {
            if !self.positions.contains_key(&label) {
                self.positions.insert(label.clone(), self.elements.len());
                self.elements.push(label);
            }
        }
    }
}

/// Linear or circular offset addressing on an ordered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetMode {
    /// Out-of-range positions are undefined. Models non-repeating
    /// sequences such as years.
    Linear,
    /// Positions wrap modulo cardinality and are always defined. Models
    /// repeating cycles such as seasons or hours.
    Circular,
}

/// Apply a signed shift to a 1-based position on a set of `card` elements.
///
/// Returns `None` only in linear mode, when the shifted position falls
/// outside `1..=card`. A lag of `n` is a shift of `-n`, a lead of `n` a
/// shift of `+n`.
pub fn shifted_position(pos: usize, shift: i64, card: usize, mode: OffsetMode) -> Option<usize> {
    debug_assert!(pos >= 1 && pos <= card);
    match mode {
        OffsetMode::Linear => {
            let target = pos as i64 + shift;
            if target >= 1 && target <= card as i64 {
                Some(target as usize)
            } else {
                None
            }
        }
        OffsetMode::Circular => {
            let n = card as i64;
            let target = (pos as i64 - 1 + shift).rem_euclid(n) + 1;
            Some(target as usize)
        }
    }
}

/// Reference semantics: the element a shifted reference resolves to.
///
/// On the right-hand side of an assignment an undefined linear shift
/// contributes the value 0, so the caller maps `None` to a vanished term.
pub fn shifted_element<'a>(
    data: &'a SetData,
    label: &str,
    shift: i64,
    mode: OffsetMode,
) -> Option<&'a str> {
    let pos = data.position(label)?;
    let target = shifted_position(pos, shift, data.len(), mode)?;
    data.elements.get(target - 1).map(|s| s.as_str())
}

/// Domain-control semantics: whether an indexed statement at `label` is
/// generated at all.
///
/// On the left-hand side of an assignment an undefined linear shift skips
/// that tuple silently; no record or equation is generated for it.
pub fn shift_defined(data: &SetData, label: &str, shift: i64, mode: OffsetMode) -> bool {
    match data.position(label) {
        Some(pos) => shifted_position(pos, shift, data.len(), mode).is_some(),
        None => false,
    }
}
