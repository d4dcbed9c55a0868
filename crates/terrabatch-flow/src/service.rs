//! The factory seam between declarative configurations and live actions.

use terrabatch_config::{ActionConfiguration, PropertySchema};

use crate::action::Action;
use crate::error::ActionError;

/// Creates actions of one kind from bound configurations.
///
/// Registered by id with the management boundary; one service instance may
/// create many actions, but every created action belongs to exactly one
/// consumer run.
pub trait ActionService: Send + Sync {
    /// The registration table of bindable property keys for this service's
    /// configurations.
    fn schema(&self) -> PropertySchema;

    /// Whether a bound configuration is complete enough to create an
    /// action from. Default: always.
    fn can_create_action(&self, _config: &ActionConfiguration) -> bool {
        true
    }

    /// Instantiate a fresh action owning the configuration.
    fn create_action(&self, config: ActionConfiguration) -> Result<Box<dyn Action>, ActionError>;
}
