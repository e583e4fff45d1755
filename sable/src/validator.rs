//! Local validation of names, labels, and declarations
//!
//! Everything here is checked synchronously at the call that caused it,
//! before anything is enqueued; the scheduler's queue only ever contains
//! statements that passed these checks.

use crate::error::SableError;
use crate::symbols::{AxisRef, SymbolKind};
use crate::SableResult;
use regex::Regex;
use std::sync::OnceLock;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,62}$").expect("valid pattern"))
}

/// Stateless validator for locally checkable rules
#[derive(Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    /// Symbol names: a letter followed by letters, digits or underscores,
    /// at most 63 characters
    pub fn check_identifier(&self, name: &str) -> SableResult<()> {
        if identifier_pattern().is_match(name) {
            Ok(())
        } else {
            Err(SableError::validation_with_suggestion(
                format!("'{}' is not a valid symbol name", name),
                "use a letter followed by letters, digits or underscores",
            ))
        }
    }

    /// Record labels: non-empty, within the configured length cap
    pub fn check_label(&self, label: &str, max_len: usize) -> SableResult<()> {
        if label.is_empty() {
            return Err(SableError::validation("record labels cannot be empty"));
        }
        if label.len() > max_len {
            return Err(SableError::validation(format!(
                "record label '{}' exceeds the {}-character limit",
                label, max_len
            )));
        }
        Ok(())
    }

    /// Domain entries must be declared sets or aliases, or the universal
    /// wildcard
    pub fn check_domain_entry(&self, axis: AxisRef, kind: SymbolKind) -> SableResult<()> {
        match axis {
            AxisRef::Universe => Ok(()),
            AxisRef::Symbol(_) => {
                if matches!(kind, SymbolKind::Set | SymbolKind::Alias) {
                    Ok(())
                } else {
                    Err(SableError::domain_violation(format!(
                        "domain entries must be sets or aliases, found a {}",
                        kind.name()
                    )))
                }
            }
        }
    }
}
