use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::entity::DirtyState;
use super::id::{self, EntityId};

/// A free-text note attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: EntityId,
    pub task_id: EntityId,
    pub content: String,
    pub posted: NaiveDateTime,
    pub dirty: DirtyState,
}

impl Note {
    pub fn new(task_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            task_id,
            content: content.into(),
            posted: chrono::Local::now().naive_local(),
            dirty: DirtyState::Unmodified,
        }
    }

    /// Structural equality, ignoring dirty state and the post timestamp
    /// (which the server rewrites on its own clock).
    pub fn same_content(&self, other: &Note) -> bool {
        self.id == other.id && self.task_id == other.task_id && self.content == other.content
    }

    pub fn payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if !id::is_placeholder(self.id) {
            map.insert("note_id".into(), self.id.into());
        }
        map.insert("item_id".into(), self.task_id.into());
        map.insert("content".into(), self.content.clone().into());
        serde_json::Value::Object(map)
    }
}
