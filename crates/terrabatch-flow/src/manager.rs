//! The flow manager: consumer registry plus the shared execution pool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use terrabatch_config::{ActionConfiguration, FlowSettings};

use crate::consumer::{Consumer, ConsumerStatus};
use crate::error::{ActionError, FlowError, Result};
use crate::event::Event;
use crate::progress::LoggingProgressListener;
use crate::service::ActionService;

/// Configuration for one flow manager.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Identifier used for logging and working-directory naming.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Root under which each consumer gets its own working directory.
    pub working_dir: PathBuf,
    /// Maximum consumers executing at once on the shared pool.
    pub max_parallel: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            id: "batch-flow".to_string(),
            name: "batch-flow".to_string(),
            description: "auto generated flow".to_string(),
            working_dir: PathBuf::from("work"),
            max_parallel: 4,
        }
    }
}

impl FlowConfig {
    /// Build a flow config from operator-facing TOML settings.
    pub fn from_settings(settings: &FlowSettings) -> Self {
        Self {
            id: settings.id.clone(),
            name: settings.id.clone(),
            description: format!("auto generated {} flow", settings.id),
            working_dir: settings.working_dir.clone(),
            max_parallel: settings.max_parallel,
        }
    }
}

/// Registry of consumers plus the shared execution pool.
///
/// Constructed once and passed by explicit handle to everything that needs
/// it; there is no ambient static lookup. The registry lock is the single
/// mutual-exclusion point: register + enqueue + submit happen under it as
/// one indivisible unit, so no other manager call can observe a consumer
/// registered with an empty queue and already submitted.
pub struct FlowManager {
    config: FlowConfig,
    consumers: Mutex<HashMap<Uuid, Arc<Consumer>>>,
    permits: Arc<Semaphore>,
}

impl FlowManager {
    /// Create the manager and its working-directory root.
    pub fn new(config: FlowConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.working_dir).map_err(|source| FlowError::WorkingDir {
            path: config.working_dir.display().to_string(),
            source,
        })?;
        info!(
            flow = %config.id,
            working_dir = %config.working_dir.display(),
            max_parallel = config.max_parallel,
            "flow manager initialized"
        );
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_parallel.max(1))),
            config,
            consumers: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Create, register, and schedule a consumer for a bound configuration.
    ///
    /// Performs, as one atomically-observed unit with respect to any other
    /// call on this manager: id generation, action instantiation, registry
    /// insertion, enqueueing of the initiating events, and submission to
    /// the shared pool. Returns the fresh consumer id.
    ///
    /// Must be called within a tokio runtime; the consumer occupies a
    /// blocking-pool thread for its full run.
    pub fn run_action(
        &self,
        service: &dyn ActionService,
        mut config: ActionConfiguration,
        events: Vec<Event>,
    ) -> Result<Uuid> {
        let mut registry = self.consumers.lock();

        let id = Uuid::new_v4();
        let working_dir = self.config.working_dir.join(id.to_string());
        std::fs::create_dir_all(&working_dir).map_err(|source| FlowError::WorkingDir {
            path: working_dir.display().to_string(),
            source,
        })?;
        config.set_working_dir(&working_dir);

        if !service.can_create_action(&config) {
            return Err(FlowError::Action(ActionError::new(
                config.name(),
                "configuration is not complete enough to create an action",
            )));
        }
        let mut action = service.create_action(config)?;
        action
            .base_mut()
            .set_running_context(working_dir.display().to_string());
        action.add_listener(Arc::new(LoggingProgressListener::new(
            action.name().to_string(),
        )));

        let consumer = Arc::new(Consumer::with_id(id, working_dir, vec![action]));
        registry.insert(id, consumer.clone());
        for event in events {
            consumer.enqueue(event);
        }
        self.submit(consumer);

        debug!(flow = %self.config.id, consumer = %id, "consumer registered and submitted");
        Ok(id)
    }

    /// Status of a consumer by id; `Unknown` when the id is not registered.
    pub fn get_status(&self, id: Uuid) -> ConsumerStatus {
        self.consumers
            .lock()
            .get(&id)
            .map_or(ConsumerStatus::Unknown, |c| c.status())
    }

    /// The registered consumer, if present.
    pub fn consumer(&self, id: Uuid) -> Option<Arc<Consumer>> {
        self.consumers.lock().get(&id).cloned()
    }

    /// Ids of all registered consumers.
    pub fn consumer_ids(&self) -> Vec<Uuid> {
        self.consumers.lock().keys().copied().collect()
    }

    /// Remove a consumer from the registry. Idempotent; an in-flight run
    /// is not interrupted and finishes (or fails) naturally.
    pub fn dispose(&self, id: Uuid) {
        if self.consumers.lock().remove(&id).is_some() {
            info!(flow = %self.config.id, consumer = %id, "consumer disposed");
        } else {
            debug!(flow = %self.config.id, consumer = %id, "dispose of unknown consumer, no-op");
        }
    }

    /// Hand the consumer to the shared pool: a tokio task waits for a
    /// parallelism permit, then the run occupies a blocking-pool thread
    /// for its full duration.
    fn submit(&self, consumer: Arc<Consumer>) {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, manager is gone
            };
            let runner = consumer.clone();
            if let Err(join_err) = tokio::task::spawn_blocking(move || runner.run()).await {
                error!(consumer = %consumer.id(), error = %join_err, "consumer worker panicked");
                consumer.mark_failed(format!("worker panicked: {join_err}"));
            }
        });
    }
}

impl std::fmt::Debug for FlowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowManager")
            .field("id", &self.config.id)
            .field("consumers", &self.consumers.lock().len())
            .finish()
    }
}
