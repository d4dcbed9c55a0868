//! A runnable instance binding a chain of actions to a pending event
//! queue and a status.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::Action;
use crate::event::{Event, EventQueue};

/// Lifecycle of a consumer as observable through the management boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerStatus {
    /// Registered, not yet picked up by a worker.
    Created,
    /// Executing its action chain on a pool worker.
    Running,
    /// The whole chain finished.
    Completed,
    /// An action failed and the failure was not ignored.
    Failed,
    /// The id is not present in the registry.
    Unknown,
}

impl std::fmt::Display for ConsumerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConsumerStatus::Created => "created",
            ConsumerStatus::Running => "running",
            ConsumerStatus::Completed => "completed",
            ConsumerStatus::Failed => "failed",
            ConsumerStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Owns one ordered chain of configured actions, an input queue, and a
/// status; executes the chain when a pool worker schedules it.
///
/// Single-use: the chain is taken when the run starts, and the flow
/// manager builds a fresh consumer per management request.
pub struct Consumer {
    id: Uuid,
    working_dir: PathBuf,
    status: Mutex<ConsumerStatus>,
    pending: Mutex<EventQueue>,
    output: Mutex<EventQueue>,
    chain: Mutex<Vec<Box<dyn Action>>>,
    failure: Mutex<Option<String>>,
}

impl Consumer {
    /// Build a consumer with a fresh id.
    pub fn new(working_dir: impl Into<PathBuf>, chain: Vec<Box<dyn Action>>) -> Self {
        Self::with_id(Uuid::new_v4(), working_dir, chain)
    }

    /// Build a consumer with a caller-supplied id. Used by the flow
    /// manager, which needs the id before the consumer exists to lay out
    /// its working directory.
    pub fn with_id(id: Uuid, working_dir: impl Into<PathBuf>, chain: Vec<Box<dyn Action>>) -> Self {
        Self {
            id,
            working_dir: working_dir.into(),
            status: Mutex::new(ConsumerStatus::Created),
            pending: Mutex::new(VecDeque::new()),
            output: Mutex::new(VecDeque::new()),
            chain: Mutex::new(chain),
            failure: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn status(&self) -> ConsumerStatus {
        *self.status.lock()
    }

    /// The failure message, when the terminal status is `Failed`.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Append an initiating event to the input queue.
    pub fn enqueue(&self, event: Event) {
        self.pending.lock().push_back(event);
    }

    /// Snapshot of the not-yet-consumed input events.
    pub fn pending_events(&self) -> Vec<Event> {
        self.pending.lock().iter().cloned().collect()
    }

    /// Snapshot of the chain's final output events. Empty until the run
    /// completes.
    pub fn output_events(&self) -> Vec<Event> {
        self.output.lock().iter().cloned().collect()
    }

    pub(crate) fn mark_failed(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
        *self.status.lock() = ConsumerStatus::Failed;
    }

    /// Execute the action chain to completion on the calling thread.
    ///
    /// Events flow strictly in chain order. A failing action aborts the
    /// chain unless it is marked fail-ignored, in which case its original
    /// input is forwarded unchanged to the next action.
    pub fn run(&self) {
        *self.status.lock() = ConsumerStatus::Running;

        let mut events = std::mem::take(&mut *self.pending.lock());
        let mut chain = std::mem::take(&mut *self.chain.lock());
        debug!(consumer = %self.id, actions = chain.len(), events = events.len(), "consumer run starting");

        for action in chain.iter_mut() {
            let input: EventQueue = events.clone();
            match action.execute(events) {
                Ok(produced) => events = produced,
                Err(e) if action.fail_ignored() => {
                    warn!(
                        consumer = %self.id,
                        action = %action.name(),
                        error = %e,
                        "action failed but is fail-ignored, forwarding its input"
                    );
                    events = input;
                }
                Err(e) => {
                    self.mark_failed(e.to_string());
                    for a in chain.iter_mut() {
                        a.destroy();
                    }
                    info!(consumer = %self.id, error = %e, "consumer failed");
                    return;
                }
            }
        }

        for a in chain.iter_mut() {
            a.destroy();
        }
        *self.output.lock() = events;
        *self.status.lock() = ConsumerStatus::Completed;
        info!(consumer = %self.id, outputs = self.output.lock().len(), "consumer completed");
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("working_dir", &self.working_dir)
            .finish()
    }
}
