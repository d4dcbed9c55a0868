//! Management boundary of the terrabatch pipeline engine.
//!
//! Turns an arbitrary key/value request into a live consumer run:
//!
//! 1. [`ServiceRegistry`] resolves the target [`ActionService`] by id
//! 2. the binder materializes an `ActionConfiguration` from the request
//! 3. the flow manager atomically registers, enqueues, and schedules a
//!    consumer wrapping that configuration
//!
//! The transport in front of this API (HTTP, JMX-like agent, CLI) is an
//! external collaborator; everything here is transport-agnostic.
//!
//! [`ActionService`]: terrabatch_flow::ActionService

pub mod error;
pub mod logging;
pub mod manager;
pub mod registry;

pub use error::{Result, ServiceError};
pub use logging::init_logging;
pub use manager::{ActionManager, INPUT_KEY, SERVICE_ID_KEY};
pub use registry::ServiceRegistry;
