//! The action contract: one configured unit of processing in a chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use terrabatch_config::ActionConfiguration;

use crate::error::ActionError;
use crate::event::EventQueue;
use crate::progress::{ListenerKind, ProgressForwarder, ProgressListener};

/// Lifecycle state shared by every action implementation.
///
/// Concrete actions embed one of these and expose it through
/// [`Action::base`]; the trait's provided methods (listeners, pause,
/// fail-ignored policy) all delegate here.
#[derive(Debug)]
pub struct BaseAction {
    id: String,
    name: String,
    description: String,
    fail_ignored: bool,
    running_context: Option<String>,
    temp_dir: Option<PathBuf>,
    forwarder: ProgressForwarder,
}

impl BaseAction {
    /// Build lifecycle state from a bound configuration.
    pub fn new(config: &ActionConfiguration) -> Self {
        Self {
            id: config.id().to_string(),
            name: config.name().to_string(),
            description: config.description().to_string(),
            fail_ignored: config.fail_ignored(),
            running_context: None,
            temp_dir: config.working_dir().map(Path::to_path_buf),
            forwarder: ProgressForwarder::new(config.name()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fail_ignored(&self) -> bool {
        self.fail_ignored
    }

    pub fn set_fail_ignored(&mut self, fail_ignored: bool) {
        self.fail_ignored = fail_ignored;
    }

    /// The context this action runs in, initialized by the flow manager.
    pub fn running_context(&self) -> Option<&str> {
        self.running_context.as_deref()
    }

    pub fn set_running_context(&mut self, context: impl Into<String>) {
        self.running_context = Some(context.into());
    }

    /// Scratch directory for this run, cleaned up by the engine.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub fn set_temp_dir(&mut self, dir: impl Into<PathBuf>) {
        self.temp_dir = Some(dir.into());
    }

    pub fn forwarder(&self) -> &ProgressForwarder {
        &self.forwarder
    }
}

/// The unit of work: consumes a queue of events, produces a queue of
/// events.
///
/// Instantiated once per consumer run by an
/// [`ActionService`](crate::ActionService); never shared across two
/// concurrently running consumers.
pub trait Action: Send {
    /// Shared lifecycle state.
    fn base(&self) -> &BaseAction;

    /// Mutable lifecycle state.
    fn base_mut(&mut self) -> &mut BaseAction;

    /// Run the action over the input queue.
    ///
    /// Implementations notify `started` before work begins, set a task
    /// description before each major phase, notify `completed` on success,
    /// and notify `failed` before returning an [`ActionError`].
    fn execute(&mut self, events: EventQueue) -> Result<EventQueue, ActionError>;

    /// Release resources at the end of a run. Default: nothing to release.
    fn destroy(&mut self) {}

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Policy flag read by the owning consumer, not by the action itself.
    fn fail_ignored(&self) -> bool {
        self.base().fail_ignored()
    }

    /// Request a pause. The base behavior accepts the request but does not
    /// honor it: the action keeps running and `false` is returned, so
    /// callers must not assume pause is guaranteed.
    fn pause(&mut self) -> bool {
        info!(action = %self.base().name(), "pause requested but not honored");
        false
    }

    /// Resume after a pause request. Base behavior: log only.
    fn resume(&mut self) {
        info!(action = %self.base().name(), "resume requested");
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.base().forwarder().add_listener(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn ProgressListener>) {
        self.base().forwarder().remove_listener(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn ProgressListener>> {
        self.base().forwarder().listeners()
    }

    /// Only listeners carrying the requested capability tag.
    fn listeners_of(&self, kind: ListenerKind) -> Vec<Arc<dyn ProgressListener>> {
        self.base().forwarder().listeners_of(kind)
    }
}

impl std::fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
