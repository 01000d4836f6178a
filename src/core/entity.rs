use serde::{Deserialize, Serialize};

use super::id::EntityId;
use super::{Label, Note, Project, SavedQuery, Task};

/// The class of local mutation not yet acknowledged by the last successful
/// reconciliation of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirtyState {
    #[default]
    Unmodified,
    Modified,
    Deleted,
    Added,
}

/// The five syncable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Project,
    Task,
    Label,
    Note,
    Query,
}

/// A grouping within which order positions must stay dense: all projects
/// globally, or the tasks of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Projects,
    Tasks { project_id: EntityId },
}

/// One syncable entity of any kind.
///
/// The reconciler never branches on runtime type; everything kind-specific
/// (structural equality, wire payload, foreign-key rewrite) sits behind this
/// enum's methods or the per-kind store/gateway operations it dispatches to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Project(Project),
    Task(Task),
    Label(Label),
    Note(Note),
    Query(SavedQuery),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Project(_) => EntityKind::Project,
            Entity::Task(_) => EntityKind::Task,
            Entity::Label(_) => EntityKind::Label,
            Entity::Note(_) => EntityKind::Note,
            Entity::Query(_) => EntityKind::Query,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Entity::Project(p) => p.id,
            Entity::Task(t) => t.id,
            Entity::Label(l) => l.id,
            Entity::Note(n) => n.id,
            Entity::Query(q) => q.id,
        }
    }

    pub fn dirty(&self) -> DirtyState {
        match self {
            Entity::Project(p) => p.dirty,
            Entity::Task(t) => t.dirty,
            Entity::Label(l) => l.dirty,
            Entity::Note(n) => n.dirty,
            Entity::Query(q) => q.dirty,
        }
    }

    pub fn set_dirty(&mut self, dirty: DirtyState) {
        match self {
            Entity::Project(p) => p.dirty = dirty,
            Entity::Task(t) => t.dirty = dirty,
            Entity::Label(l) => l.dirty = dirty,
            Entity::Note(n) => n.dirty = dirty,
            Entity::Query(q) => q.dirty = dirty,
        }
    }

    /// List position for the ordered kinds, `None` for the rest.
    pub fn position(&self) -> Option<i32> {
        match self {
            Entity::Project(p) => Some(p.position),
            Entity::Task(t) => Some(t.position),
            _ => None,
        }
    }

    /// Structural comparison of two same-kind entities, ignoring dirty state
    /// and derived bookkeeping counters. Different kinds never compare equal.
    pub fn same_content(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Project(a), Entity::Project(b)) => a.same_content(b),
            (Entity::Task(a), Entity::Task(b)) => a.same_content(b),
            (Entity::Label(a), Entity::Label(b)) => a.same_content(b),
            (Entity::Note(a), Entity::Note(b)) => a.same_content(b),
            (Entity::Query(a), Entity::Query(b)) => a.same_content(b),
            _ => false,
        }
    }

    /// Key/value wire payload consumed by gateway implementations.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Entity::Project(p) => p.payload(),
            Entity::Task(t) => t.payload(),
            Entity::Label(l) => l.payload(),
            Entity::Note(n) => n.payload(),
            Entity::Query(q) => serde_json::json!({ "name": q.name, "query": q.query }),
        }
    }
}

impl From<Project> for Entity {
    fn from(p: Project) -> Self {
        Entity::Project(p)
    }
}

impl From<Task> for Entity {
    fn from(t: Task) -> Self {
        Entity::Task(t)
    }
}

impl From<Label> for Entity {
    fn from(l: Label) -> Self {
        Entity::Label(l)
    }
}

impl From<Note> for Entity {
    fn from(n: Note) -> Self {
        Entity::Note(n)
    }
}

impl From<SavedQuery> for Entity {
    fn from(q: SavedQuery) -> Self {
        Entity::Query(q)
    }
}
