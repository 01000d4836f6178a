use serde::{Deserialize, Serialize};

use super::entity::DirtyState;
use super::id::EntityId;

/// A saved filter query.
///
/// The remote protocol has no query endpoints, so saved queries are a
/// local-only collection: they get placeholder ids and dirty-state plumbing
/// like every entity, but no reconciliation pass ever runs for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: EntityId,
    pub name: String,
    pub query: String,
    pub dirty: DirtyState,
}

impl SavedQuery {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            query: query.into(),
            dirty: DirtyState::Unmodified,
        }
    }

    pub fn same_content(&self, other: &SavedQuery) -> bool {
        self.id == other.id && self.name == other.name && self.query == other.query
    }
}
