use crate::engine::ExecutionStatus;
use crate::symbols::SymbolKind;
use std::fmt;

/// Detailed error information for locally detected violations
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub message: String,
    /// Symbol the violation was detected on, when known
    pub symbol: Option<String>,
    pub suggestion: Option<String>,
}

/// Details for a name bound to one kind and re-declared as another
#[derive(Debug, Clone)]
pub struct ConflictDetails {
    pub name: String,
    pub existing: SymbolKind,
    pub requested: SymbolKind,
}

/// Details of a failed external-engine invocation
#[derive(Debug, Clone)]
pub struct ExecutionDetails {
    pub message: String,
    pub status: ExecutionStatus,
}

/// Error types for the Sable system
///
/// Name, domain, and shape violations are raised synchronously at the call
/// that caused them, before anything is enqueued. Execution errors are raised
/// only at flush boundaries and leave the workspace in its last-known-clean
/// state.
#[derive(Debug, Clone)]
pub enum SableError {
    /// Re-declaring an existing name under a different kind
    NameConflict(Box<ConflictDetails>),

    /// Element outside its declared superset, alias cycle, or an index
    /// tuple that does not match a view's axis order
    DomainViolation(Box<ErrorDetails>),

    /// Expression shape outside the matrix-multiplication rule table, or
    /// model content incompatible with its declared problem class
    Validation(Box<ErrorDetails>),

    /// External engine failure surfaced via its execution status
    Execution(Box<ExecutionDetails>),
}

impl SableError {
    /// Create a domain violation error
    pub fn domain_violation(message: impl Into<String>) -> Self {
        Self::DomainViolation(Box::new(ErrorDetails {
            message: message.into(),
            symbol: None,
            suggestion: None,
        }))
    }

    /// Create a domain violation error attached to a symbol
    pub fn domain_violation_on(message: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::DomainViolation(Box::new(ErrorDetails {
            message: message.into(),
            symbol: Some(symbol.into()),
            suggestion: None,
        }))
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(Box::new(ErrorDetails {
            message: message.into(),
            symbol: None,
            suggestion: None,
        }))
    }

    /// Create a validation error with a suggestion
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation(Box::new(ErrorDetails {
            message: message.into(),
            symbol: None,
            suggestion: Some(suggestion.into()),
        }))
    }

    /// Create a name conflict error
    pub fn name_conflict(
        name: impl Into<String>,
        existing: SymbolKind,
        requested: SymbolKind,
    ) -> Self {
        Self::NameConflict(Box::new(ConflictDetails {
            name: name.into(),
            existing,
            requested,
        }))
    }

    /// Create an execution error wrapping an engine status
    pub fn execution(message: impl Into<String>, status: ExecutionStatus) -> Self {
        Self::Execution(Box::new(ExecutionDetails {
            message: message.into(),
            status,
        }))
    }

    /// The engine status behind an execution error, if this is one
    pub fn execution_status(&self) -> Option<&ExecutionStatus> {
        match self {
            SableError::Execution(details) => Some(&details.status),
            _ => None,
        }
    }
}

impl fmt::Display for SableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SableError::NameConflict(details) => {
                write!(
                    f,
                    "Name conflict: '{}' is already declared as {} and cannot be re-declared as {}",
                    details.name,
                    details.existing.name(),
                    details.requested.name()
                )
            }
            SableError::DomainViolation(details) => {
                write!(f, "Domain violation: {}", details.message)?;
                if let Some(symbol) = &details.symbol {
                    write!(f, " (symbol '{}')", symbol)?;
                }
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                Ok(())
            }
            SableError::Validation(details) => {
                write!(f, "Validation error: {}", details.message)?;
                if let Some(symbol) = &details.symbol {
                    write!(f, " (symbol '{}')", symbol)?;
                }
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                Ok(())
            }
            SableError::Execution(details) => {
                write!(f, "Execution error: {}", details.message)
            }
        }
    }
}

impl std::error::Error for SableError {}

impl From<std::fmt::Error> for SableError {
    fn from(err: std::fmt::Error) -> Self {
        SableError::validation(format!("format error: {}", err))
    }
}
