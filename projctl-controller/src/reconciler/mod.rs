//! Reconciliation of desired-state objects.
//!
//! A pass reads the owning `ProjectDevelopmentStream`, resolves its templates
//! into concrete resources, converges each one against the store and
//! aggregates the per-item outcomes into a [`BatchResult`].

pub mod converge;
pub mod error;
pub mod outcome;
pub mod resolve;
pub mod stream;

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::resource::NamespacedName;

pub use converge::{candidate_for, converge};
pub use error::ReconcileError;
pub use outcome::{BatchResult, ItemOutcome, Outcome, Summary};
pub use resolve::{ConcreteResource, resolve};
pub use stream::StreamReconciler;

/// Trait for desired-state reconcilers driven by the controller loop.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Run one pass for `target`.
    ///
    /// `Ok` with `requeue` set asks for a prompt retry; `Err` asks for a retry
    /// with backoff.
    async fn reconcile(
        &self,
        target: &NamespacedName,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, ReconcileError>;
}

/// Await `fut` unless `cancel` fires first, in which case `fut` is dropped.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
