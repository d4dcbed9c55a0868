//! Best-effort binder from untyped string parameters onto an
//! [`ActionConfiguration`].
//!
//! Each action service declares a [`PropertySchema`], a registration table
//! mapping property keys to their declared [`PropertyShape`]. Binding walks
//! the request parameters once: keys absent from the schema are ignored,
//! per-key parse failures are logged and skipped, and the remaining keys
//! continue to bind. This is a merge, not a transactional apply.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::configuration::{ActionConfiguration, PropertyValue};
use crate::error::ConfigError;

/// Built-in scalar keys bound onto the configuration struct itself rather
/// than the property bag.
const NAME_KEY: &str = "name";
const DESCRIPTION_KEY: &str = "description";
const FAIL_IGNORED_KEY: &str = "failIgnored";

/// Keys owned by the management boundary and the flow manager. Never bound
/// from the parameter map, so they are always populated regardless of the
/// untyped input.
const RESERVED_KEYS: [&str; 2] = ["serviceId", "workingDir"];

/// The declared shape of a bindable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyShape {
    /// A single literal string.
    Scalar,
    /// An ordered `,`-separated list.
    List,
    /// A `;`-separated list of `key=value` pairs.
    Map,
}

/// Registration table of bindable keys for one configuration type.
///
/// Declared once per action service; keys not present here are silently
/// ignored at bind time.
#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    shapes: BTreeMap<String, PropertyShape>,
}

impl PropertySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scalar property.
    pub fn scalar(mut self, key: impl Into<String>) -> Self {
        self.shapes.insert(key.into(), PropertyShape::Scalar);
        self
    }

    /// Register an ordered-list property.
    pub fn list(mut self, key: impl Into<String>) -> Self {
        self.shapes.insert(key.into(), PropertyShape::List);
        self
    }

    /// Register a string-keyed map property.
    pub fn map(mut self, key: impl Into<String>) -> Self {
        self.shapes.insert(key.into(), PropertyShape::Map);
        self
    }

    /// The declared shape for a key, if registered.
    pub fn shape(&self, key: &str) -> Option<PropertyShape> {
        self.shapes.get(key).copied()
    }
}

/// Merge untyped request parameters onto a configuration.
///
/// Built-in identity keys (`name`, `description`, `failIgnored`) bind onto
/// the struct fields; everything else resolves through `schema`. Never
/// fails: problems bind nothing for that key and log a warning.
pub fn bind(
    config: &mut ActionConfiguration,
    schema: &PropertySchema,
    params: &BTreeMap<String, String>,
) {
    for (key, value) in params {
        if RESERVED_KEYS.contains(&key.as_str()) {
            debug!(key, "reserved key is caller-owned, skipping");
            continue;
        }
        if bind_builtin(config, key, value) {
            continue;
        }
        match schema.shape(key) {
            Some(PropertyShape::Scalar) => {
                config.set_property(key.clone(), PropertyValue::Scalar(value.clone()));
            }
            Some(PropertyShape::List) => {
                config.set_property(key.clone(), PropertyValue::List(parse_list(value)));
            }
            Some(PropertyShape::Map) => match parse_map(value) {
                Ok(entries) => {
                    config.set_property(key.clone(), PropertyValue::Map(entries));
                }
                Err(e) => warn!(key, error = %e, "skipping malformed map property"),
            },
            None => debug!(key, "unknown property key, ignored"),
        }
    }
}

/// Bind a built-in identity key onto the struct fields. Returns true if the
/// key was handled (even when its value failed to parse).
fn bind_builtin(config: &mut ActionConfiguration, key: &str, value: &str) -> bool {
    match key {
        NAME_KEY => config.set_name(value),
        DESCRIPTION_KEY => config.set_description(value),
        FAIL_IGNORED_KEY => match value.parse::<bool>() {
            Ok(flag) => config.set_fail_ignored(flag),
            Err(_) => warn!(key, value, "failIgnored is not a boolean, ignored"),
        },
        _ => return false,
    }
    true
}

/// Split a `,`-separated value preserving order, duplicates, and empty
/// tokens.
fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Split a `;`-separated value into `key=value` pairs, splitting each pair
/// on the first `=`. Duplicate keys keep the last-seen value. A pair
/// without `=` fails the whole key.
fn parse_map(value: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut entries = BTreeMap::new();
    for token in value.split(';') {
        let (k, v) = token.split_once('=').ok_or_else(|| ConfigError::MalformedPair {
            token: token.to_string(),
        })?;
        entries.insert(k.to_string(), v.to_string());
    }
    Ok(entries)
}
