use serde::Serialize;

/// When queued statements are handed to the external engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Every assignment statement is flushed synchronously right after it is
    /// issued. Slower, but errors surface immediately and records are always
    /// current.
    Immediate,

    /// Assignments only enqueue and mark their target dirty. The queue is
    /// flushed when a solve is requested or a dirty symbol's records are
    /// read.
    Deferred,
}

/// What happens when more than one element is assigned to a singleton set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SingletonPolicy {
    /// Reject the assignment with a validation error
    Error,

    /// Keep the first element and drop the rest
    TakeFirst,
}

/// Workspace-level configuration
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub execution_mode: ExecutionMode,
    pub singleton_policy: SingletonPolicy,

    /// Maximum length of a record label
    pub max_label_len: usize,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Immediate,
            singleton_policy: SingletonPolicy::Error,
            max_label_len: 63,
        }
    }
}

impl WorkspaceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with deferred execution enabled
    pub fn deferred() -> Self {
        Self {
            execution_mode: ExecutionMode::Deferred,
            ..Self::default()
        }
    }
}
