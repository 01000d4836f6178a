use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::entity::DirtyState;
use super::id::{self, EntityId};

/// Highest task priority. The protocol's numbering is reversed: 4 is the
/// most urgent, 1 the default.
pub const PRIORITY_HIGHEST: u8 = 4;
pub const PRIORITY_LOWEST: u8 = 1;

/// A task inside a project.
///
/// Tasks carry a one-based `position` scoped to their project, a label-id
/// set, and the natural-language due string the server's date parser
/// understands (e.g. `every day`, `tomorrow at 9`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub project_id: EntityId,
    pub content: String,
    pub due_date: Option<NaiveDateTime>,
    /// Natural-language due string, parsed server-side. A string starting
    /// with `ev` marks a recurring task.
    pub due_string: Option<String>,
    /// Nesting depth within the project, 1–5.
    pub indent_level: u8,
    pub priority: u8,
    pub label_ids: Vec<EntityId>,
    /// Notes attached to this task. Derived locally; excluded from
    /// structural equality.
    pub note_count: u32,
    pub completed: bool,
    pub position: i32,
    pub dirty: DirtyState,
}

impl Task {
    pub fn new(project_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            project_id,
            content: content.into(),
            due_date: None,
            due_string: None,
            indent_level: 1,
            priority: PRIORITY_LOWEST,
            label_ids: Vec::new(),
            note_count: 0,
            completed: false,
            position: 1,
            dirty: DirtyState::Unmodified,
        }
    }

    /// Whether the due string denotes a recurring schedule.
    pub fn is_recurring(&self) -> bool {
        self.due_string
            .as_deref()
            .is_some_and(|s| s.to_lowercase().starts_with("ev"))
    }

    /// A task whose content starts with `*` is a heading and cannot be
    /// completed.
    pub fn can_be_completed(&self) -> bool {
        !self.content.starts_with('*')
    }

    /// Case-insensitive due-string comparison, treating `None` and `None`
    /// as equal.
    pub fn same_due_string(&self, other: &Task) -> bool {
        match (&self.due_string, &other.due_string) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    /// Label-id sets compare unordered.
    pub fn same_labels(&self, other: &Task) -> bool {
        let a: HashSet<EntityId> = self.label_ids.iter().copied().collect();
        let b: HashSet<EntityId> = other.label_ids.iter().copied().collect();
        a == b
    }

    /// Structural equality, ignoring dirty state and the derived note count.
    pub fn same_content(&self, other: &Task) -> bool {
        self.id == other.id
            && self.project_id == other.project_id
            && self.due_date == other.due_date
            && self.same_due_string(other)
            && self.indent_level == other.indent_level
            && self.position == other.position
            && self.priority == other.priority
            && self.completed == other.completed
            && self.content == other.content
            && self.same_labels(other)
    }

    pub fn payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if !id::is_placeholder(self.id) {
            map.insert("id".into(), self.id.into());
        }
        map.insert("project_id".into(), self.project_id.into());
        map.insert("content".into(), self.content.clone().into());
        if let Some(due) = self.due_string.as_deref().filter(|s| !s.is_empty()) {
            map.insert("date_string".into(), due.into());
        }
        map.insert("priority".into(), self.priority.into());
        map.insert("indent".into(), self.indent_level.into());
        map.insert("item_order".into(), self.position.into());
        serde_json::Value::Object(map)
    }
}
