//! Change notifications emitted by the store.

use crate::resource::{DESIRED_STATE_KIND, NamespacedName, ResourceKey};
use crate::store::traits::VersionToken;

/// Events emitted after a write has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A document was created.
    Created { key: ResourceKey, version: VersionToken },
    /// A document was replaced.
    Updated { key: ResourceKey, version: VersionToken },
    /// A document was removed.
    Deleted { key: ResourceKey },
}

impl StoreEvent {
    pub fn key(&self) -> &ResourceKey {
        match self {
            StoreEvent::Created { key, .. }
            | StoreEvent::Updated { key, .. }
            | StoreEvent::Deleted { key } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::Created { .. } => "created",
            StoreEvent::Updated { .. } => "updated",
            StoreEvent::Deleted { .. } => "deleted",
        }
    }

    /// Trigger for the owning desired-state object, if this event concerns one.
    pub fn desired_state_trigger(&self) -> Option<NamespacedName> {
        let key = self.key();
        (key.kind == DESIRED_STATE_KIND).then(|| key.namespaced_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_state_trigger() {
        let event = StoreEvent::Updated {
            key: ResourceKey::new(DESIRED_STATE_KIND, "team-a", "stream"),
            version: VersionToken::new("2"),
        };
        assert_eq!(
            event.desired_state_trigger(),
            Some(NamespacedName::new("team-a", "stream"))
        );
        assert_eq!(event.kind(), "updated");

        let other = StoreEvent::Deleted {
            key: ResourceKey::new("ConfigMap", "team-a", "cm"),
        };
        assert_eq!(other.desired_state_trigger(), None);
    }
}
