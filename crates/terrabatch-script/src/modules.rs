//! The lock-guarded registry of loadable script modules.
//!
//! Replaces implicit mutation of a global load path with an explicit
//! registry: modules are registered by file name exactly once, concurrent
//! registration from parallel consumer runs is serialized by the registry
//! lock, and per-file failures never abort a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Directory sibling to a script holding its candidate modules.
pub const MODULE_DIR_NAME: &str = "modules";

/// File extension a candidate module must carry.
pub const MODULE_EXTENSION: &str = "rhai";

/// Append-only set of loadable script modules, keyed by file name.
///
/// De-duplication is name-based, not content-based: registering a second
/// file with an already-known name is a no-op.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Mutex<BTreeMap<String, PathBuf>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single module file. Returns whether the name was new.
    pub fn register_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "module file has no usable name, skipping");
            return false;
        };
        let mut modules = self.modules.lock();
        if modules.contains_key(name) {
            debug!(name, "module already registered, skipping");
            return false;
        }
        modules.insert(name.to_string(), path.to_path_buf());
        debug!(name, path = %path.display(), "module registered");
        true
    }

    /// Scan a directory and register every file carrying the module
    /// extension. Unreadable entries are logged and skipped; a missing
    /// directory registers nothing. Returns the number of new names.
    pub fn register_dir(&self, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "module directory not readable, skipping");
                return 0;
            }
        };

        let mut added = 0;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "unreadable directory entry, skipping");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some(MODULE_EXTENSION) {
                continue;
            }
            if self.register_file(&path) {
                added += 1;
            }
        }
        added
    }

    /// Snapshot of registered modules as `(file name, path)` pairs, in
    /// name order.
    pub fn modules(&self) -> Vec<(String, PathBuf)> {
        self.modules
            .lock()
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.lock().is_empty()
    }
}
