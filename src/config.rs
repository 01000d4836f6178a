use serde::{Deserialize, Serialize};

use crate::core::id::{EntityId, PLACEHOLDER_MAX, PLACEHOLDER_MIN};

/// What to do when a locally modified entity turns out to have been deleted
/// on the server.
///
/// The asymmetry with the unmodified case (which always deletes locally) is a
/// deliberate product tradeoff, so it stays configurable rather than
/// hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Re-create the entity remotely, keeping the local edits.
    #[default]
    ResurrectLocal,
    /// Honor the remote deletion and drop the local copy, edits included.
    AcceptRemoteDelete,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Policy for the modified-locally/deleted-remotely conflict.
    pub deletion_policy: DeletionPolicy,
    /// Inclusive bounds of the reserved placeholder-id range. Must stay
    /// disjoint from any id the remote service hands out.
    pub placeholder_min: EntityId,
    pub placeholder_max: EntityId,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            deletion_policy: DeletionPolicy::default(),
            placeholder_min: PLACEHOLDER_MIN,
            placeholder_max: PLACEHOLDER_MAX,
        }
    }
}
