//! ProjectDevelopmentStream reconciler - the entry point invoked per trigger.

use std::sync::Arc;

use async_trait::async_trait;
use projctl_log::Logger;
use tokio_util::sync::CancellationToken;

use super::error::ReconcileError;
use super::outcome::BatchResult;
use super::{Reconciler, cancellable, converge, resolve};
use crate::resource::{DesiredState, NamespacedName, ResourceKey};
use crate::store::ResourceStore;

/// Reconciles the resource templates of `ProjectDevelopmentStream` objects.
pub struct StreamReconciler<S: ?Sized> {
    store: Arc<S>,
    log: Logger,
}

impl<S> StreamReconciler<S>
where
    S: ResourceStore + ?Sized,
{
    pub fn new(store: Arc<S>, log: Logger) -> Self {
        Self {
            store,
            log: log.with_name("projectdevelopmentstream"),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one convergence pass for the stream named by `target`.
    ///
    /// A stream that no longer exists is not an error: there is nothing to do
    /// until a new notification arrives.
    pub async fn handle_trigger(
        &self,
        target: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, ReconcileError> {
        let log = self.log.with_values(&[
            ("PDS namespace", target.namespace.as_str()),
            ("PDS name", target.name.as_str()),
        ]);

        let key = ResourceKey::desired_state(target);
        let owner = match cancellable(cancel, self.store.get(&key)).await {
            None => return Ok(BatchResult::from_outcomes(Vec::new(), true)),
            Some(Ok(found)) => found.document,
            Some(Err(e)) if e.is_not_found() => {
                log.info("ProjectDevelopmentStream not found, ignoring", &[]);
                return Ok(BatchResult::default());
            }
            Some(Err(e)) => {
                log.error(&e, "Unable to fetch ProjectDevelopmentStream", &[]);
                return Err(ReconcileError::OwnerRead {
                    target: target.clone(),
                    source: e,
                });
            }
        };

        let desired = DesiredState::from_document(&owner).map_err(|message| {
            ReconcileError::InvalidOwner {
                target: target.clone(),
                message,
            }
        })?;

        let count = desired.templates.len().to_string();
        log.info(
            "Applying resources from ProjectDevelopmentStream",
            &[("resources", count.as_str())],
        );

        let items = resolve(&desired, &log);
        let outcomes = converge(self.store.as_ref(), &items, &log, cancel).await;
        let cancelled = outcomes.len() < items.len();
        let result = BatchResult::from_outcomes(outcomes, cancelled);

        let summary = result.summary().to_string();
        let requeue = result.requeue.to_string();
        log.info(
            "Finished applying resources",
            &[("summary", summary.as_str()), ("requeue", requeue.as_str())],
        );

        Ok(result)
    }
}

#[async_trait]
impl<S> Reconciler for StreamReconciler<S>
where
    S: ResourceStore + ?Sized + 'static,
{
    async fn reconcile(
        &self,
        target: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, ReconcileError> {
        self.handle_trigger(target, cancel).await
    }
}
