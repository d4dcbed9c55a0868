//! The declarative configuration attached to one action instance.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A dynamically-bound property value.
///
/// Every bindable property has exactly one of three shapes; the shape is
/// declared up front by the owning service's
/// [`PropertySchema`](crate::PropertySchema), not discovered at bind time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A single literal string.
    Scalar(String),
    /// An ordered list of strings. Duplicates and empty tokens are preserved.
    List(Vec<String>),
    /// A string-keyed map. Last write wins on duplicate keys.
    Map(BTreeMap<String, String>),
}

impl PropertyValue {
    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The list value, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The map value, if this is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            PropertyValue::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// The declarative, dynamically-bound parameter set for one action instance.
///
/// Built per management request: constructed with identity fields, merged
/// with the untyped request parameters via [`bind`](crate::bind), then
/// finalized by the caller (`service_id`) and the owning flow manager
/// (`working_dir`). Immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfiguration {
    id: String,
    name: String,
    description: String,
    service_id: String,
    fail_ignored: bool,
    working_dir: Option<PathBuf>,
    properties: BTreeMap<String, PropertyValue>,
}

impl ActionConfiguration {
    /// Create a configuration with identity fields and an empty property bag.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            service_id: String::new(),
            fail_ignored: false,
            working_dir: None,
            properties: BTreeMap::new(),
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

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn fail_ignored(&self) -> bool {
        self.fail_ignored
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// All bound properties, in key order.
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// A scalar property by key.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_scalar)
    }

    /// A list property by key.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.properties.get(key).and_then(PropertyValue::as_list)
    }

    /// A map property by key.
    pub fn map(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.properties.get(key).and_then(PropertyValue::as_map)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_fail_ignored(&mut self, fail_ignored: bool) {
        self.fail_ignored = fail_ignored;
    }

    /// Set by the management boundary after binding, never from the
    /// untyped parameter map.
    pub fn set_service_id(&mut self, service_id: impl Into<String>) {
        self.service_id = service_id.into();
    }

    /// Set once by the owning flow manager. A repeated call replaces the
    /// previous value and logs, since the configuration is expected to be
    /// frozen after scheduling.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if let Some(old) = &self.working_dir {
            tracing::warn!(
                config = %self.id,
                old = %old.display(),
                new = %dir.display(),
                "working_dir reassigned on a bound configuration"
            );
        }
        self.working_dir = Some(dir);
    }

    /// Insert or replace a bound property. Replacement implements the
    /// "clear existing values" semantics for list and map shapes.
    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
    }
}
