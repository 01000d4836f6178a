use serde::{Deserialize, Serialize};

use super::entity::DirtyState;
use super::id::EntityId;

/// A label tasks can be tagged with (many-to-many).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: EntityId,
    pub name: String,
    pub color_index: u8,
    /// Open tasks carrying this label. Derived locally; excluded from
    /// structural equality.
    pub task_count: u32,
    pub dirty: DirtyState,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            color_index: 0,
            task_count: 0,
            dirty: DirtyState::Unmodified,
        }
    }

    pub fn same_content(&self, other: &Label) -> bool {
        self.id == other.id && self.name == other.name && self.color_index == other.color_index
    }

    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "color": self.color_index,
        })
    }
}
