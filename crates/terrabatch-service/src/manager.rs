//! The transport-agnostic management API.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use terrabatch_config::{bind, ActionConfiguration};
use terrabatch_flow::{ConsumerStatus, Event, FlowManager};

use crate::error::{Result, ServiceError};
use crate::registry::ServiceRegistry;

/// Request key naming the target action service.
pub const SERVICE_ID_KEY: &str = "serviceId";

/// Request key naming the input path the initiating event points at.
pub const INPUT_KEY: &str = "input";

/// Boundary API turning key/value requests into live consumer runs.
///
/// Submission success is decoupled from execution outcome: `run_action`
/// returns as soon as the consumer is registered and scheduled, and run
/// failures are visible only through [`get_status`](Self::get_status) and
/// the logs.
pub struct ActionManager {
    registry: ServiceRegistry,
    flow: Arc<FlowManager>,
}

impl ActionManager {
    pub fn new(flow: Arc<FlowManager>) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            flow,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn flow(&self) -> &Arc<FlowManager> {
        &self.flow
    }

    /// Run an action of the named service with the given parameters.
    ///
    /// `params` must contain an `input` path; remaining keys bind onto the
    /// service's configuration per its property schema. Configuration
    /// problems (missing keys, unknown service) fail here, before any
    /// consumer is created. Returns the fresh consumer id.
    pub fn run_action(
        &self,
        service_id: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<String> {
        let input = params
            .remove(INPUT_KEY)
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::MissingKey(INPUT_KEY))?;
        let service = self
            .registry
            .lookup(service_id)
            .ok_or_else(|| ServiceError::UnknownService(service_id.to_string()))?;

        let mut config = ActionConfiguration::new(
            Uuid::new_v4().to_string(),
            service_id,
            format!("dynamically configured '{service_id}' action"),
        );
        bind(&mut config, &service.schema(), &params);
        // Always populated regardless of the untyped input.
        config.set_service_id(service_id);

        let event = Event::added(input);
        let consumer_id = self
            .flow
            .run_action(service.as_ref(), config, vec![event])?;

        info!(service = %service_id, consumer = %consumer_id, "action submitted");
        Ok(consumer_id.to_string())
    }

    /// Variant of [`run_action`](Self::run_action) for callers that carry
    /// the service id inside the parameter table itself.
    pub fn call_action(&self, mut params: BTreeMap<String, String>) -> Result<String> {
        let service_id = params
            .remove(SERVICE_ID_KEY)
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::MissingKey(SERVICE_ID_KEY))?;
        self.run_action(&service_id, params)
    }

    /// Status of a consumer by id. `Unknown` for unparsable or
    /// unregistered ids; never an error.
    pub fn get_status(&self, consumer_id: &str) -> ConsumerStatus {
        match Uuid::parse_str(consumer_id) {
            Ok(id) => self.flow.get_status(id),
            Err(_) => {
                debug!(consumer = %consumer_id, "not a consumer id, answering unknown");
                ConsumerStatus::Unknown
            }
        }
    }

    /// Remove a consumer from the registry. Idempotent; unknown ids are a
    /// no-op and an in-flight run is left to finish naturally.
    pub fn dispose_action(&self, consumer_id: &str) {
        if let Ok(id) = Uuid::parse_str(consumer_id) {
            self.flow.dispose(id);
        } else {
            debug!(consumer = %consumer_id, "not a consumer id, dispose is a no-op");
        }
    }
}

impl std::fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionManager")
            .field("registry", &self.registry)
            .field("flow", &self.flow)
            .finish()
    }
}
