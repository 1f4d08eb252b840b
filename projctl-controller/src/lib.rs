//! projctl-controller: reconciles `ProjectDevelopmentStream` resource templates
//! into a document store.

pub mod controller;
pub mod document;
pub mod manifest;
pub mod reconciler;
pub mod resource;
pub mod store;

pub use controller::{Controller, ControllerConfig, watch_store};
pub use document::Document;
pub use manifest::ManifestError;
pub use reconciler::{BatchResult, Outcome, ReconcileError, Reconciler, StreamReconciler};
pub use resource::{DesiredState, NamespacedName, ResourceKey};
pub use store::{MemoryStore, ResourceStore, StoreError, StoreEvent, VersionToken, Versioned};
