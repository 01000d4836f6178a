use serde::{Deserialize, Serialize};

use super::entity::DirtyState;
use super::id::{self, EntityId};

/// A project — the top-level grouping tasks live in.
///
/// Projects carry a one-based `position` in the global project list; after
/// any reorder pass the positions form a dense `1..N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub color_index: u8,
    /// Nesting depth in the project list, 1–4.
    pub indent_level: u8,
    pub position: i32,
    /// Open (uncompleted, undeleted) tasks in this project. Derived locally;
    /// excluded from structural equality.
    pub task_count: u32,
    pub dirty: DirtyState,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            color_index: 0,
            indent_level: 1,
            position: 1,
            task_count: 0,
            dirty: DirtyState::Unmodified,
        }
    }

    /// A name starting with `*` marks a heading-only group of projects.
    pub fn is_group(&self) -> bool {
        self.name.starts_with('*')
    }

    /// Name with the group marker stripped.
    pub fn display_name(&self) -> &str {
        self.name.strip_prefix('*').unwrap_or(&self.name)
    }

    /// Structural equality, ignoring dirty state and the derived task count.
    pub fn same_content(&self, other: &Project) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.indent_level == other.indent_level
            && self.position == other.position
            && self.color_index == other.color_index
    }

    pub fn payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if !id::is_placeholder(self.id) {
            map.insert("id".into(), self.id.into());
        }
        map.insert("name".into(), self.name.clone().into());
        map.insert("color".into(), self.color_index.into());
        map.insert("indent".into(), self.indent_level.into());
        map.insert("order".into(), self.position.into());
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_marker_is_recognized_and_stripped() {
        let group = Project::new("*Home");
        assert!(group.is_group());
        assert_eq!(group.display_name(), "Home");

        let plain = Project::new("Home");
        assert!(!plain.is_group());
        assert_eq!(plain.display_name(), "Home");
    }

    #[test]
    fn task_count_does_not_affect_equality() {
        let mut a = Project::new("Home");
        a.id = 3;
        let mut b = a.clone();
        b.task_count = 12;
        assert!(a.same_content(&b));

        b.name = "Work".into();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn placeholder_id_is_left_out_of_the_payload() {
        let mut p = Project::new("Home");
        p.id = 2_000_000;
        assert!(p.payload().get("id").is_none());

        p.id = 55;
        assert_eq!(p.payload()["id"], 55);
    }
}
