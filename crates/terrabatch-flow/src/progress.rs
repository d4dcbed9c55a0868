//! Progress reporting: listeners, capability tags, and the per-action
//! broadcast forwarder.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use crate::error::ActionError;

/// Capability tag declared by each listener, used to retrieve specialized
/// listeners without knowing the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// Forwards lifecycle notifications to the log.
    Logging,
    /// Records lifecycle notifications for later inspection.
    StatusTracking,
    /// Anything else.
    Other,
}

/// Observer attached to an action.
///
/// All methods default to no-ops except the four core lifecycle
/// notifications, so simple listeners implement only what they need.
pub trait ProgressListener: Send + Sync {
    /// Capability tag for filtered retrieval.
    fn kind(&self) -> ListenerKind {
        ListenerKind::Other
    }

    fn started(&self);

    fn task_changed(&self, task: &str);

    fn completed(&self);

    fn failed(&self, cause: &ActionError);

    fn progressing(&self, _percent: f32) {}

    fn paused(&self) {}

    fn resumed(&self) {}
}

#[derive(Default)]
struct ForwarderInner {
    listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
    current_task: RwLock<String>,
}

/// Cloneable broadcast handle fanning notifications out to every listener
/// registered on one action.
///
/// Also handed to pluggable action implementations (for example, scripts)
/// so they can report phase changes without touching the listener set.
#[derive(Clone)]
pub struct ProgressForwarder {
    owner: Arc<str>,
    inner: Arc<ForwarderInner>,
}

impl ProgressForwarder {
    /// Create a forwarder owned by the named action.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: Arc::from(owner.into()),
            inner: Arc::new(ForwarderInner::default()),
        }
    }

    /// Name of the owning action.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Register a listener. Listeners are compared by identity, so the same
    /// `Arc` may only be removed with the pointer used here.
    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Remove a previously registered listener by identity. Unknown
    /// listeners are a no-op.
    pub fn remove_listener(&self, listener: &Arc<dyn ProgressListener>) {
        self.inner
            .listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Snapshot of all registered listeners.
    pub fn listeners(&self) -> Vec<Arc<dyn ProgressListener>> {
        self.inner.listeners.read().clone()
    }

    /// Only the listeners carrying the requested capability tag.
    pub fn listeners_of(&self, kind: ListenerKind) -> Vec<Arc<dyn ProgressListener>> {
        self.inner
            .listeners
            .read()
            .iter()
            .filter(|l| l.kind() == kind)
            .cloned()
            .collect()
    }

    /// The most recently set task description.
    pub fn current_task(&self) -> String {
        self.inner.current_task.read().clone()
    }

    pub fn started(&self) {
        for l in self.listeners() {
            l.started();
        }
    }

    /// Record the current phase and notify listeners.
    pub fn set_task(&self, task: &str) {
        *self.inner.current_task.write() = task.to_string();
        for l in self.listeners() {
            l.task_changed(task);
        }
    }

    pub fn progressing(&self, percent: f32) {
        for l in self.listeners() {
            l.progressing(percent);
        }
    }

    pub fn completed(&self) {
        for l in self.listeners() {
            l.completed();
        }
    }

    pub fn failed(&self, cause: &ActionError) {
        for l in self.listeners() {
            l.failed(cause);
        }
    }

    pub fn paused(&self) {
        for l in self.listeners() {
            l.paused();
        }
    }

    pub fn resumed(&self) {
        for l in self.listeners() {
            l.resumed();
        }
    }
}

impl std::fmt::Debug for ProgressForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressForwarder")
            .field("owner", &self.owner)
            .field("listeners", &self.inner.listeners.read().len())
            .finish()
    }
}

/// Listener that forwards lifecycle notifications to the log.
#[derive(Debug)]
pub struct LoggingProgressListener {
    action: String,
}

impl LoggingProgressListener {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

impl ProgressListener for LoggingProgressListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Logging
    }

    fn started(&self) {
        info!(action = %self.action, "action started");
    }

    fn task_changed(&self, task: &str) {
        info!(action = %self.action, task, "task changed");
    }

    fn completed(&self) {
        info!(action = %self.action, "action completed");
    }

    fn failed(&self, cause: &ActionError) {
        error!(action = %self.action, error = %cause, "action failed");
    }

    fn paused(&self) {
        info!(action = %self.action, "action paused");
    }

    fn resumed(&self) {
        info!(action = %self.action, "action resumed");
    }
}

/// One recorded lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressRecord {
    Started,
    Task(String),
    Progress(f32),
    Completed,
    Failed(String),
    Paused,
    Resumed,
}

/// Listener that records every notification it receives, for status
/// tracking and tests.
#[derive(Debug, Default)]
pub struct StatusProgressListener {
    records: Mutex<Vec<ProgressRecord>>,
}

impl StatusProgressListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in notification order.
    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.lock().clone()
    }

    pub fn is_completed(&self) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| matches!(r, ProgressRecord::Completed))
    }

    pub fn is_failed(&self) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| matches!(r, ProgressRecord::Failed(_)))
    }
}

impl ProgressListener for StatusProgressListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::StatusTracking
    }

    fn started(&self) {
        self.records.lock().push(ProgressRecord::Started);
    }

    fn task_changed(&self, task: &str) {
        self.records.lock().push(ProgressRecord::Task(task.to_string()));
    }

    fn completed(&self) {
        self.records.lock().push(ProgressRecord::Completed);
    }

    fn failed(&self, cause: &ActionError) {
        self.records
            .lock()
            .push(ProgressRecord::Failed(cause.to_string()));
    }

    fn progressing(&self, percent: f32) {
        self.records.lock().push(ProgressRecord::Progress(percent));
    }

    fn paused(&self) {
        self.records.lock().push(ProgressRecord::Paused);
    }

    fn resumed(&self) {
        self.records.lock().push(ProgressRecord::Resumed);
    }
}
