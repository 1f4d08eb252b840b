//! Reconciliation error types.

use thiserror::Error;

use crate::resource::NamespacedName;
use crate::store::StoreError;

/// Errors that fail a whole pass.
///
/// Per-item store failures never surface here; they are reported as outcomes.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The owning object could not be read for a reason other than absence.
    #[error("failed to read ProjectDevelopmentStream {target}: {source}")]
    OwnerRead {
        target: NamespacedName,
        #[source]
        source: StoreError,
    },

    /// The owning object exists but is not a usable desired state.
    #[error("invalid ProjectDevelopmentStream {target}: {message}")]
    InvalidOwner {
        target: NamespacedName,
        message: String,
    },
}
