//! Registry of named action services.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use terrabatch_flow::ActionService;

/// Named [`ActionService`] providers, registered explicitly under a lock.
///
/// This is the capability set of the running process: a service id in a
/// management request resolves here or the request is rejected.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn ActionService>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under an id, replacing any previous provider
    /// with the same id.
    pub fn register(&self, id: impl Into<String>, service: Arc<dyn ActionService>) {
        let id = id.into();
        if self.services.write().insert(id.clone(), service).is_some() {
            info!(service = %id, "action service replaced");
        } else {
            info!(service = %id, "action service registered");
        }
    }

    /// The provider registered under an id, if any.
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn ActionService>> {
        let found = self.services.read().get(id).cloned();
        if found.is_none() {
            debug!(service = %id, "action service not found");
        }
        found
    }

    /// Ids of all registered services, unordered.
    pub fn service_ids(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_ids())
            .finish()
    }
}
