//! Events flowing through action chains.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What happened to the referenced resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Added,
    Modified,
    Removed,
}

/// Immutable description of one unit of input: a path reference plus a
/// change-kind tag.
///
/// Created by the upstream watcher, the management boundary, or an action
/// emitting a follow-on event; consumed exactly once by the next action in
/// a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    path: PathBuf,
    kind: EventKind,
}

/// The queue shape actions consume and produce.
pub type EventQueue = VecDeque<Event>;

impl Event {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Shorthand for the most common case: a newly produced file.
    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Added)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}
