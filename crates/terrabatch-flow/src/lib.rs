//! Orchestration core of the terrabatch pipeline engine.
//!
//! External events flow through operator-configured chains of actions:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  FlowManager                                             │
//! │  - registry of Consumers (Uuid → Arc<Consumer>)          │
//! │  - shared blocking pool, capped by a semaphore           │
//! │  - atomic register + enqueue + submit                    │
//! │      │                                                   │
//! │      ▼                                                   │
//! │  Consumer ── Action ── Action ── … ── output events      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Actions report progress through [`ProgressListener`]s and fail with a
//! structured [`ActionError`]; a consumer either aborts its chain on
//! failure or, when the action is marked fail-ignored, forwards the
//! original input to the next action.

pub mod action;
pub mod consumer;
pub mod error;
pub mod event;
pub mod manager;
pub mod progress;
pub mod service;

pub use action::{Action, BaseAction};
pub use consumer::{Consumer, ConsumerStatus};
pub use error::{ActionError, FlowError, Result};
pub use event::{Event, EventKind, EventQueue};
pub use manager::{FlowConfig, FlowManager};
pub use progress::{
    ListenerKind, LoggingProgressListener, ProgressForwarder, ProgressListener, ProgressRecord,
    StatusProgressListener,
};
pub use service::ActionService;
