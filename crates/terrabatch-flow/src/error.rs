//! Error types for the orchestration core.

/// Result type alias for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Boxed cause preserved inside an [`ActionError`].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured failure raised by an action's `execute`.
///
/// Carries the failing action's name, a human-readable message, and the
/// original error as cause when one exists.
#[derive(Debug, thiserror::Error)]
#[error("action '{action}' failed: {message}")]
pub struct ActionError {
    /// Name of the action that failed.
    pub action: String,
    /// Human-readable failure description.
    pub message: String,
    /// The underlying error, preserved for diagnostics.
    #[source]
    pub cause: Option<Cause>,
}

impl ActionError {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        action: impl Into<String>,
        message: impl Into<String>,
        cause: impl Into<Cause>,
    ) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

/// Errors raised by flow-manager operations.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// An action could not be instantiated from its configuration.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The per-consumer working directory could not be created.
    #[error("failed to create working directory '{path}': {source}")]
    WorkingDir {
        path: String,
        source: std::io::Error,
    },
}
