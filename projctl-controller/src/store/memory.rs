//! In-memory ResourceStore with change notifications.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use super::error::{Result, StoreError};
use super::event::StoreEvent;
use super::traits::{ResourceStore, VersionToken, Versioned};
use crate::document::Document;
use crate::resource::ResourceKey;

const EVENT_CAPACITY: usize = 256;

struct Entry {
    document: Document,
    revision: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ResourceKey, Entry>,
    revision: u64,
}

impl Inner {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Store backed by a hash map.
///
/// Versions come from a store-wide revision counter, so every write yields a
/// token that has never been handed out before.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Inner::default()),
            events,
        }
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// List all documents of a kind, ordered by namespace and name.
    pub async fn list(&self, kind: &str) -> Vec<Versioned> {
        let inner = self.inner.read().await;
        let mut keys: Vec<&ResourceKey> =
            inner.entries.keys().filter(|k| k.kind == kind).collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|k| inner.entries.get(k))
            .map(|e| Versioned {
                document: e.document.clone(),
                version: token(e.revision),
            })
            .collect()
    }

    /// Remove a document.
    pub async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.entries.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        debug!(%key, "Deleted document");
        let _ = self.events.send(StoreEvent::Deleted { key: key.clone() });
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn token(revision: u64) -> VersionToken {
    VersionToken::new(revision.to_string())
}

fn validate(document: &Document) -> Result<ResourceKey> {
    if !document.is_object() {
        return Err(StoreError::Invalid("document is not a mapping".into()));
    }
    let key = ResourceKey::of(document);
    if key.kind.is_empty() || key.name.is_empty() {
        return Err(StoreError::Invalid(format!(
            "document requires kind and metadata.name, got '{}'",
            key
        )));
    }
    Ok(key)
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, key: &ResourceKey) -> Result<Versioned> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(key)
            .map(|e| Versioned {
                document: e.document.clone(),
                version: token(e.revision),
            })
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn create(&self, mut document: Document) -> Result<Versioned> {
        let key = validate(&document)?;
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }

        if document.get(&["metadata", "uid"]).is_none() {
            document.set(
                &["metadata", "uid"],
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        if document.get(&["metadata", "creationTimestamp"]).is_none() {
            document.set(
                &["metadata", "creationTimestamp"],
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let revision = inner.next_revision();
        inner.entries.insert(
            key.clone(),
            Entry {
                document: document.clone(),
                revision,
            },
        );
        debug!(%key, revision, "Created document");

        let version = token(revision);
        let _ = self.events.send(StoreEvent::Created {
            key,
            version: version.clone(),
        });
        Ok(Versioned { document, version })
    }

    async fn update(&self, document: Document, version: &VersionToken) -> Result<Versioned> {
        let key = validate(&document)?;
        let mut inner = self.inner.write().await;
        let current = match inner.entries.get(&key) {
            Some(entry) => entry.revision,
            None => return Err(StoreError::NotFound(key.to_string())),
        };
        if token(current) != *version {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: version.to_string(),
                current: current.to_string(),
            });
        }

        let revision = inner.next_revision();
        inner.entries.insert(
            key.clone(),
            Entry {
                document: document.clone(),
                revision,
            },
        );
        debug!(%key, revision, "Updated document");

        let version = token(revision);
        let _ = self.events.send(StoreEvent::Updated {
            key,
            version: version.clone(),
        });
        Ok(Versioned { document, version })
    }
}
