//! Configuration layer for the terrabatch pipeline engine.
//!
//! Provides:
//! - [`ActionConfiguration`]: the declarative, dynamically-bound parameter
//!   set for one action instance
//! - [`PropertySchema`] and [`bind`]: the tagged-shape binder that merges
//!   untyped string key/value requests onto a configuration
//! - [`FlowSettings`]: TOML-based settings for a flow manager

pub mod binder;
pub mod configuration;
pub mod error;
pub mod settings;

pub use binder::{bind, PropertySchema, PropertyShape};
pub use configuration::{ActionConfiguration, PropertyValue};
pub use error::{ConfigError, Result};
pub use settings::FlowSettings;
