//! ResourceStore trait definitions.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::document::Document;
use crate::resource::ResourceKey;

/// Opaque revision marker of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document together with the version it was read or written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub document: Document,
    pub version: VersionToken,
}

/// Keyed store of semi-structured documents addressed by (kind, namespace, name).
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a document. Absence is reported as `StoreError::NotFound`.
    async fn get(&self, key: &ResourceKey) -> Result<Versioned>;

    /// Create a new document. The key is derived from the document itself.
    async fn create(&self, document: Document) -> Result<Versioned>;

    /// Replace a document, provided `version` still matches the stored one.
    ///
    /// A stale version fails with `StoreError::Conflict`.
    async fn update(&self, document: Document, version: &VersionToken) -> Result<Versioned>;
}
