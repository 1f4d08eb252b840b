//! Resolution of templates into concrete resources.

use projctl_log::Logger;

use crate::document::Document;
use crate::resource::{DesiredState, ResourceKey};

/// A template copy bound to its owner's namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteResource {
    document: Document,
}

impl ConcreteResource {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::of(&self.document)
    }
}

/// Copy every template of `owner`, forcing the copy into the owner's namespace.
///
/// Desired-state objects may not target foreign namespaces: a template naming
/// another namespace is logged and overridden.
pub fn resolve(owner: &DesiredState, log: &Logger) -> Vec<ConcreteResource> {
    owner
        .templates
        .iter()
        .map(|template| {
            let mut document = template.clone();
            let original = document.namespace();
            if !original.is_empty() && original != owner.namespace {
                log.info(
                    "Resource namespace set to ProjectDevelopmentStream namespace",
                    &[
                        ("kind", document.kind()),
                        ("name", document.name()),
                        ("PDS namespace", owner.namespace.as_str()),
                        ("resource original namespace", original),
                    ],
                );
            }
            document.set_namespace(&owner.namespace);
            ConcreteResource { document }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use projctl_log::RecordingSink;
    use serde_json::json;
    use std::sync::Arc;

    fn template(name: &str, namespace: Option<&str>) -> Document {
        let mut doc = Document::new(json!({
            "apiVersion": "example.com/v1",
            "kind": "Foo",
            "metadata": {"name": name, "labels": {"app": "x"}},
            "spec": {"x": 1}
        }));
        if let Some(ns) = namespace {
            doc.set_namespace(ns);
        }
        doc
    }

    #[test]
    fn test_namespace_defaulted_and_overridden() {
        let sink = Arc::new(RecordingSink::new());
        let log = Logger::new(sink.clone());
        let owner = DesiredState::new(
            "team-a",
            "stream",
            vec![
                template("unset", None),
                template("same", Some("team-a")),
                template("foreign", Some("team-b")),
            ],
        );

        let resolved = resolve(&owner, &log);

        assert_eq!(resolved.len(), 3);
        for item in &resolved {
            assert_eq!(item.document().namespace(), "team-a");
        }
        let names: Vec<&str> = resolved.iter().map(|r| r.document().name()).collect();
        assert_eq!(names, vec!["unset", "same", "foreign"]);

        // Only the foreign namespace is reported
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("name"), Some("foreign"));
        assert_eq!(records[0].field("resource original namespace"), Some("team-b"));
        assert_eq!(records[0].field("PDS namespace"), Some("team-a"));
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let owner = DesiredState::new("team-a", "stream", vec![template("a", None)]);
        let resolved = resolve(&owner, &Logger::noop());
        let doc = resolved[0].document();
        assert_eq!(doc.get(&["metadata", "labels", "app"]), Some(&json!("x")));
        assert_eq!(doc.get(&["spec", "x"]), Some(&json!(1)));
        assert_eq!(resolved[0].key(), ResourceKey::new("Foo", "team-a", "a"));
    }

    #[test]
    fn test_templates_untouched() {
        let owner = DesiredState::new("team-a", "stream", vec![template("a", Some("team-b"))]);
        let _ = resolve(&owner, &Logger::noop());
        assert_eq!(owner.templates[0].namespace(), "team-b");
    }
}
