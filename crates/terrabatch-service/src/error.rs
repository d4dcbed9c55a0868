//! Management-boundary error types.

use terrabatch_flow::FlowError;

/// Result type alias for management operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced to callers of the management API.
///
/// Expected conditions (unknown consumer ids, double dispose) never raise
/// these: `get_status` answers `Unknown` and `dispose_action` is a no-op.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A required request key is missing or empty.
    #[error("missing required key '{0}' in the request parameter table")]
    MissingKey(&'static str),

    /// No action service is registered under the requested id.
    #[error("no action service registered under id '{0}'")]
    UnknownService(String),

    /// Consumer creation or scheduling failed.
    #[error(transparent)]
    Flow(#[from] FlowError),
}
