//! Shared fixtures for the reconcile integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use projctl_controller::document::Document;
use projctl_controller::store::Result;
use projctl_controller::{
    DesiredState, MemoryStore, NamespacedName, ResourceKey, ResourceStore, StoreError,
    VersionToken, Versioned,
};
use serde_json::{Value, json};
use tokio::sync::Notify;

/// Build a `Foo` template with the given spec.
pub fn foo(name: &str, spec: Value) -> Document {
    Document::new(json!({
        "apiVersion": "example.com/v1",
        "kind": "Foo",
        "metadata": {"name": name},
        "spec": spec
    }))
}

/// Store a desired state in `store` and return its identity.
pub async fn seed_stream<S>(
    store: &S,
    namespace: &str,
    name: &str,
    templates: Vec<Document>,
) -> NamespacedName
where
    S: ResourceStore + ?Sized,
{
    let desired = DesiredState::new(namespace, name, templates);
    store.create(desired.to_document()).await.unwrap();
    desired.namespaced_name()
}

#[derive(Default)]
struct Faults {
    fail_get: HashSet<String>,
    fail_create: HashSet<String>,
    fail_update: HashSet<String>,
    race_update: HashSet<String>,
    block_get: HashSet<String>,
}

/// MemoryStore wrapper that injects failures for selected object names.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    faults: Mutex<Faults>,
    /// Signalled when a blocked get has been entered.
    pub blocked: Notify,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap()
    }

    /// Make `get` of `name` fail with `Unavailable`.
    pub fn fail_get(&self, name: &str) {
        self.faults().fail_get.insert(name.to_string());
    }

    /// Make `create` of `name` fail with `Unavailable`.
    pub fn fail_create(&self, name: &str) {
        self.faults().fail_create.insert(name.to_string());
    }

    /// Make `update` of `name` fail with `Internal`.
    pub fn fail_update(&self, name: &str) {
        self.faults().fail_update.insert(name.to_string());
    }

    /// Let another writer modify `name` between its read and the next update.
    pub fn race_update(&self, name: &str) {
        self.faults().race_update.insert(name.to_string());
    }

    /// Make `get` of `name` hang until the caller gives up.
    pub fn block_get(&self, name: &str) {
        self.faults().block_get.insert(name.to_string());
    }

    pub fn clear(&self) {
        *self.faults() = Faults::default();
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn get(&self, key: &ResourceKey) -> Result<Versioned> {
        let (fail, block) = {
            let faults = self.faults();
            (
                faults.fail_get.contains(&key.name),
                faults.block_get.contains(&key.name),
            )
        };
        if fail {
            return Err(StoreError::Unavailable(format!("get {}", key)));
        }
        if block {
            self.blocked.notify_one();
            std::future::pending::<()>().await;
        }
        self.inner.get(key).await
    }

    async fn create(&self, document: Document) -> Result<Versioned> {
        if self.faults().fail_create.contains(document.name()) {
            return Err(StoreError::Unavailable(format!("create {}", document)));
        }
        self.inner.create(document).await
    }

    async fn update(&self, document: Document, version: &VersionToken) -> Result<Versioned> {
        let (fail, race) = {
            let mut faults = self.faults();
            let name = document.name();
            (
                faults.fail_update.contains(name),
                faults.race_update.remove(name),
            )
        };
        if fail {
            return Err(StoreError::Internal(format!("update {}", document)));
        }
        if race {
            let current = self.inner.get(&ResourceKey::of(&document)).await?;
            let mut other = current.document;
            other.set(&["metadata", "labels", "touched-by"], json!("someone-else"));
            self.inner.update(other, &current.version).await?;
        }
        self.inner.update(document, version).await
    }
}
