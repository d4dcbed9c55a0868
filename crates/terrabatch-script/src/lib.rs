//! Pluggable, script-driven action for the terrabatch pipeline engine.
//!
//! Demonstrates runtime capability extension: the action's behavior is not
//! compiled in but loaded from a Rhai script file at run time. A script
//! plugs into the engine by defining a single entry function:
//!
//! ```rhai
//! fn execute(config, input, progress) {
//!     progress.set_task("processing " + input);
//!     ["/data/out.tif"]
//! }
//! ```
//!
//! Sibling `.rhai` files in a `modules/` directory next to the script are
//! registered (by name, once) in a lock-guarded [`ModuleRegistry`] and made
//! importable from the script.

pub mod action;
pub mod modules;

pub use action::{ScriptAction, ScriptActionService, ENTRY_FUNCTION, LANGUAGE_RHAI};
pub use modules::{ModuleRegistry, MODULE_DIR_NAME, MODULE_EXTENSION};
