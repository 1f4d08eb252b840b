//! Convergence engine - drives each concrete resource toward its template.
//!
//! Items are processed one at a time in order. A failing item is logged and
//! recorded; it never stops the items after it.

use projctl_log::Logger;
use tokio_util::sync::CancellationToken;

use super::cancellable;
use super::outcome::{ItemOutcome, Outcome};
use super::resolve::ConcreteResource;
use crate::document::Document;
use crate::store::ResourceStore;

/// Build the document to write over `existing`.
///
/// Only `spec` is taken from `desired`, and only when `desired` has a `spec`
/// mapping. Every other field of `existing` is kept as is.
pub fn candidate_for(existing: &Document, desired: &Document) -> Document {
    let mut candidate = existing.clone();
    if let Some(spec) = desired.spec() {
        candidate.set_spec(spec.clone());
    }
    candidate
}

/// Converge `items` against `store`.
///
/// Returns one outcome per item, in item order. When `cancel` fires the
/// in-flight store call is abandoned and only the outcomes decided so far are
/// returned.
pub async fn converge<S>(
    store: &S,
    items: &[ConcreteResource],
    log: &Logger,
    cancel: &CancellationToken,
) -> Vec<ItemOutcome>
where
    S: ResourceStore + ?Sized,
{
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        let doc = item.document();
        let item_log = log.with_values(&[
            ("apiVersion", doc.api_version()),
            ("kind", doc.kind()),
            ("name", doc.name()),
        ]);
        item_log.info("Creating/Updating resource", &[]);

        match converge_one(store, item, &item_log, cancel).await {
            Some(outcome) => outcomes.push(ItemOutcome {
                key: item.key(),
                outcome,
            }),
            None => {
                let remaining = (items.len() - outcomes.len()).to_string();
                log.info(
                    "Convergence pass cancelled",
                    &[("remaining", remaining.as_str())],
                );
                break;
            }
        }
    }

    outcomes
}

/// `None` means the pass was cancelled before an outcome was reached.
async fn converge_one<S>(
    store: &S,
    item: &ConcreteResource,
    log: &Logger,
    cancel: &CancellationToken,
) -> Option<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let existing = match cancellable(cancel, store.get(&item.key())).await? {
        Ok(existing) => existing,
        Err(e) if e.is_not_found() => {
            log.info("Creating new resource", &[]);
            let created = cancellable(cancel, store.create(item.document().clone())).await?;
            return Some(match created {
                Ok(_) => {
                    log.info("Resource created", &[]);
                    Outcome::Created
                }
                Err(e) => {
                    log.error(&e, "Failed to create resource", &[]);
                    Outcome::CreateFailed
                }
            });
        }
        Err(e) => {
            log.error(&e, "Failed to read existing resource", &[]);
            return Some(Outcome::ReadFailed);
        }
    };

    let candidate = candidate_for(&existing.document, item.document());
    if candidate.semantically_equal(&existing.document) {
        log.info("Resource already up to date", &[]);
        return Some(Outcome::Unchanged);
    }

    let version = existing.version.as_str();
    let outcome = match cancellable(cancel, store.update(candidate, &existing.version)).await? {
        Ok(_) => {
            log.info("Resource updated", &[("version", version)]);
            Outcome::Updated
        }
        Err(e) if e.is_conflict() => {
            log.error(
                &e,
                "Failed to update resource, requeue requested",
                &[("version", version)],
            );
            Outcome::Conflict
        }
        Err(e) => {
            log.error(&e, "Failed to update resource", &[("version", version)]);
            Outcome::UpdateFailed
        }
    };
    Some(outcome)
}
