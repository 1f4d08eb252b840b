//! Per-item outcomes and their aggregation into a pass result.

use std::fmt;

use serde::Serialize;

use crate::resource::ResourceKey;

/// Result of converging a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    CreateFailed,
    ReadFailed,
    UpdateFailed,
    /// Update rejected because the resource changed since it was read.
    Conflict,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::CreateFailed | Outcome::ReadFailed | Outcome::UpdateFailed
        )
    }
}

/// Outcome paired with the resource it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub key: ResourceKey,
    pub outcome: Outcome,
}

/// Aggregate result of one convergence pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// At least one item hit a write conflict; run the pass again soon.
    pub requeue: bool,
    /// The pass was interrupted and `outcomes` covers only a prefix of the items.
    pub cancelled: bool,
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>, cancelled: bool) -> Self {
        let requeue = outcomes.iter().any(|o| o.outcome == Outcome::Conflict);
        Self {
            requeue,
            cancelled,
            outcomes,
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for item in &self.outcomes {
            match item.outcome {
                Outcome::Created => summary.created += 1,
                Outcome::Updated => summary.updated += 1,
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::CreateFailed | Outcome::ReadFailed | Outcome::UpdateFailed => {
                    summary.failed += 1
                }
                Outcome::Conflict => summary.conflicts += 1,
            }
        }
        summary
    }
}

/// Outcome counts of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub conflicts: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} unchanged={} failed={} conflicts={}",
            self.created, self.updated, self.unchanged, self.failed, self.conflicts
        )
    }
}
