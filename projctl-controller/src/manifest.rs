//! Loading of seed documents from a manifest directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::Document;
use crate::store::{ResourceStore, StoreError};

/// Errors that can occur while loading manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid document in '{path}': {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to store document: {0}")]
    Store(#[from] StoreError),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Read every `.yaml`, `.yml` and `.json` file directly under `dir`, in path order.
pub async fn load_dir(dir: &Path) -> Result<Vec<Document>> {
    let read_err = |source| ManifestError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        if path.is_file() && is_manifest(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.clone(),
                source,
            })?;
        let parsed = parse(&path, &contents)?;
        debug!(path = %path.display(), documents = parsed.len(), "Loaded manifest");
        documents.extend(parsed);
    }
    Ok(documents)
}

/// Parse the documents of one manifest file.
///
/// YAML files may hold several `---` separated documents; empty ones are
/// skipped. A JSON file holds one document or an array of documents.
pub fn parse(path: &Path, contents: &str) -> Result<Vec<Document>> {
    let parse_err = |message: String| ManifestError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let values: Vec<Value> = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        match serde_json::from_str(contents).map_err(|e| parse_err(e.to_string()))? {
            Value::Array(items) => items,
            value => vec![value],
        }
    } else {
        let mut values = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(contents) {
            let value = Value::deserialize(doc).map_err(|e| parse_err(e.to_string()))?;
            if !value.is_null() {
                values.push(value);
            }
        }
        values
    };

    values
        .into_iter()
        .map(|value| {
            let doc = Document::new(value);
            if !doc.is_object() || doc.kind().is_empty() || doc.name().is_empty() {
                return Err(ManifestError::Invalid {
                    path: path.to_path_buf(),
                    message: "document requires kind and metadata.name".to_string(),
                });
            }
            Ok(doc)
        })
        .collect()
}

/// Create each document in `store`. Returns the number of documents created.
pub async fn seed<S>(store: &S, documents: Vec<Document>) -> Result<usize>
where
    S: ResourceStore + ?Sized,
{
    let count = documents.len();
    for doc in documents {
        let label = doc.to_string();
        store.create(doc).await?;
        debug!(document = %label, "Seeded document");
    }
    info!(count, "Seeded store");
    Ok(count)
}
