//! Resource identities and the desired-state object.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// API group/version of the desired-state kind.
pub const API_VERSION: &str = "projctl.konflux.dev/v1beta1";

/// Kind of the desired-state object.
pub const DESIRED_STATE_KIND: &str = "ProjectDevelopmentStream";

/// Identity of a namespaced object within a known kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl std::str::FromStr for NamespacedName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(Self::new(ns, name)),
            _ => Err(format!("expected <namespace>/<name>, got '{}'", s)),
        }
    }
}

/// Store key of a document: (kind, namespace, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(doc: &Document) -> Self {
        Self::new(doc.kind(), doc.namespace(), doc.name())
    }

    /// Key of the desired-state object with the given identity.
    pub fn desired_state(target: &NamespacedName) -> Self {
        Self::new(DESIRED_STATE_KIND, &target.namespace, &target.name)
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// A `ProjectDevelopmentStream`: identity plus the ordered resource templates
/// that should exist in its namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub namespace: String,
    pub name: String,
    pub templates: Vec<Document>,
}

impl DesiredState {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        templates: Vec<Document>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            templates,
        }
    }

    /// Interpret a stored document as a desired state.
    ///
    /// Templates come from `spec.resources`; a missing list means no templates.
    /// Every entry must be a mapping.
    pub fn from_document(doc: &Document) -> Result<Self, String> {
        let templates = match doc.get(&["spec", "resources"]) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    if item.is_object() {
                        Ok(Document::new(item.clone()))
                    } else {
                        Err(format!("spec.resources[{}] is not a mapping", i))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err("spec.resources is not a list".to_string()),
        };

        Ok(Self::new(doc.namespace(), doc.name(), templates))
    }

    /// Render as a storable document.
    pub fn to_document(&self) -> Document {
        let mut doc =
            Document::with_identity(API_VERSION, DESIRED_STATE_KIND, &self.namespace, &self.name);
        let resources = self
            .templates
            .iter()
            .map(|t| t.as_value().clone())
            .collect();
        doc.set(&["spec", "resources"], Value::Array(resources));
        doc
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }
}
