//! Schema-agnostic view over cluster objects.
//!
//! Validators read arbitrary kinds through [`Resource`], a thin wrapper over a
//! JSON tree with typed path accessors. Well-known kinds can still be decoded
//! into strongly typed structs with [`Resource::decode`].
//!
//! ```rust
//! use assayer_domain::Resource;
//!
//! let node = Resource::new(serde_json::json!({
//!     "metadata": {"name": "cp-1", "labels": {"node-role.kubernetes.io/control-plane": ""}},
//!     "spec": {"unschedulable": false},
//! }));
//! assert_eq!(node.name(), "cp-1");
//! assert_eq!(node.nested_bool(&["spec", "unschedulable"]), Some(false));
//! assert!(node.has_label("node-role.kubernetes.io/control-plane"));
//! ```

use std::fmt;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Group/version/kind coordinates plus the REST plural, enough to address a
/// kind without discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl ResourceKind {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced,
        }
    }

    pub fn nodes() -> Self {
        Self::new("", "v1", "Node", "nodes", false)
    }

    pub fn namespaces() -> Self {
        Self::new("", "v1", "Namespace", "namespaces", false)
    }

    pub fn pods() -> Self {
        Self::new("", "v1", "Pod", "pods", true)
    }

    pub fn cluster_role_bindings() -> Self {
        Self::new(
            "rbac.authorization.k8s.io",
            "v1",
            "ClusterRoleBinding",
            "clusterrolebindings",
            false,
        )
    }

    pub fn network_policies() -> Self {
        Self::new("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies", true)
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// Namespace/name pair identifying one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource {
    value: Value,
}

impl Resource {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn nested(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.value, |current, segment| current.get(*segment))
    }

    pub fn nested_str(&self, path: &[&str]) -> Option<&str> {
        self.nested(path).and_then(Value::as_str)
    }

    pub fn nested_bool(&self, path: &[&str]) -> Option<bool> {
        self.nested(path).and_then(Value::as_bool)
    }

    pub fn nested_i64(&self, path: &[&str]) -> Option<i64> {
        self.nested(path).and_then(Value::as_i64)
    }

    pub fn nested_slice(&self, path: &[&str]) -> Option<&[Value]> {
        self.nested(path).and_then(Value::as_array).map(Vec::as_slice)
    }

    pub fn nested_map(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.nested(path).and_then(Value::as_object)
    }

    pub fn name(&self) -> &str {
        self.nested_str(&["metadata", "name"]).unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.nested_str(&["metadata", "namespace"])
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.nested_map(&["metadata", "labels"])
            .and_then(|labels| labels.get(key))
            .and_then(Value::as_str)
    }

    pub fn has_label(&self, key: &str) -> bool {
        self.nested_map(&["metadata", "labels"])
            .is_some_and(|labels| labels.contains_key(key))
    }

    /// Decodes the tree into a strongly typed struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone())
            .with_context(|| format!("failed to decode resource {:?}", self.name()))
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
