pub mod memory;

use chrono::NaiveDateTime;

use crate::core::entity::{DirtyState, Entity, EntityKind};
use crate::core::id::EntityId;
use crate::core::{Label, Note, Project, SavedQuery, Task};
use crate::error::StoreError;

pub use memory::MemoryStore;

/// A cross-project move recorded locally and flushed to the server on the
/// next sync pass, before the destination project's remote task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub task_id: EntityId,
    pub from_project: EntityId,
    pub to_project: EntityId,
}

/// Contract for the on-device persistence collaborator.
///
/// Getters return rows as stored, `Deleted` ones included — filtering is the
/// caller's business (the reconciler needs the deleted rows, the client
/// facade hides them). `upsert_*` persists the entity exactly as given,
/// dirty state included.
///
/// When `previous_id` is passed to an upsert, the implementation must
/// rewrite every foreign reference from `previous_id` to the entity's new id
/// (task→project, note→task, task↔label, pending-move and reorder-flag
/// bookkeeping) *before* discarding the row stored under the old id.
///
/// Implementations provide their own transaction/locking discipline; the
/// engine performs no locking of its own.
pub trait LocalStore {
    fn projects(&self) -> Result<Vec<Project>, StoreError>;
    fn project(&self, id: EntityId) -> Result<Option<Project>, StoreError>;
    fn upsert_project(&mut self, project: &Project, previous_id: Option<EntityId>) -> Result<(), StoreError>;
    /// Physically removes the row; marking entities `Deleted` is done via
    /// `upsert_project`.
    fn remove_project(&mut self, id: EntityId) -> Result<(), StoreError>;

    fn tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn task(&self, id: EntityId) -> Result<Option<Task>, StoreError>;
    fn tasks_in_project(&self, project_id: EntityId) -> Result<Vec<Task>, StoreError>;
    fn upsert_task(&mut self, task: &Task, previous_id: Option<EntityId>) -> Result<(), StoreError>;
    fn remove_task(&mut self, id: EntityId) -> Result<(), StoreError>;

    fn labels(&self) -> Result<Vec<Label>, StoreError>;
    fn label(&self, id: EntityId) -> Result<Option<Label>, StoreError>;
    fn upsert_label(&mut self, label: &Label, previous_id: Option<EntityId>) -> Result<(), StoreError>;
    fn remove_label(&mut self, id: EntityId) -> Result<(), StoreError>;

    fn notes(&self) -> Result<Vec<Note>, StoreError>;
    fn note(&self, id: EntityId) -> Result<Option<Note>, StoreError>;
    fn notes_for_task(&self, task_id: EntityId) -> Result<Vec<Note>, StoreError>;
    fn upsert_note(&mut self, note: &Note, previous_id: Option<EntityId>) -> Result<(), StoreError>;
    fn remove_note(&mut self, id: EntityId) -> Result<(), StoreError>;

    fn queries(&self) -> Result<Vec<SavedQuery>, StoreError>;
    fn query(&self, id: EntityId) -> Result<Option<SavedQuery>, StoreError>;
    fn upsert_query(&mut self, query: &SavedQuery) -> Result<(), StoreError>;
    fn remove_query(&mut self, id: EntityId) -> Result<(), StoreError>;

    /// Scope-level "needs remote reorder" flag for the global project list.
    fn projects_need_reorder(&self) -> Result<bool, StoreError>;
    fn set_projects_need_reorder(&mut self, flag: bool) -> Result<(), StoreError>;

    /// Per-project "needs remote reorder" flag for that project's tasks.
    fn tasks_need_reorder(&self, project_id: EntityId) -> Result<bool, StoreError>;
    fn set_tasks_need_reorder(&mut self, project_id: EntityId, flag: bool) -> Result<(), StoreError>;

    fn record_pending_move(&mut self, pending: PendingMove) -> Result<(), StoreError>;
    fn pending_moves_into(&self, to_project: EntityId) -> Result<Vec<PendingMove>, StoreError>;
    fn clear_pending_moves_into(&mut self, to_project: EntityId) -> Result<(), StoreError>;

    fn last_sync_time(&self) -> Result<Option<NaiveDateTime>, StoreError>;
    fn set_last_sync_time(&mut self, time: NaiveDateTime) -> Result<(), StoreError>;

    /// Kind-dispatched upsert used by the reconciler.
    fn upsert_entity(&mut self, entity: &Entity, previous_id: Option<EntityId>) -> Result<(), StoreError> {
        match entity {
            Entity::Project(p) => self.upsert_project(p, previous_id),
            Entity::Task(t) => self.upsert_task(t, previous_id),
            Entity::Label(l) => self.upsert_label(l, previous_id),
            Entity::Note(n) => self.upsert_note(n, previous_id),
            Entity::Query(q) => self.upsert_query(q),
        }
    }

    /// Kind-dispatched physical removal.
    fn remove_entity(&mut self, kind: EntityKind, id: EntityId) -> Result<(), StoreError> {
        match kind {
            EntityKind::Project => self.remove_project(id),
            EntityKind::Task => self.remove_task(id),
            EntityKind::Label => self.remove_label(id),
            EntityKind::Note => self.remove_note(id),
            EntityKind::Query => self.remove_query(id),
        }
    }

    /// Whether any same-kind row (deleted or not) already uses `id`.
    fn entity_exists(&self, kind: EntityKind, id: EntityId) -> Result<bool, StoreError> {
        Ok(match kind {
            EntityKind::Project => self.project(id)?.is_some(),
            EntityKind::Task => self.task(id)?.is_some(),
            EntityKind::Label => self.label(id)?.is_some(),
            EntityKind::Note => self.note(id)?.is_some(),
            EntityKind::Query => self.query(id)?.is_some(),
        })
    }

    /// Recomputes the derived open-task count of every project, persisting
    /// only the projects whose count changed.
    fn refresh_project_task_counts(&mut self) -> Result<(), StoreError> {
        let tasks = self.tasks()?;
        for mut project in self.projects()? {
            let count = tasks
                .iter()
                .filter(|t| {
                    t.project_id == project.id && !t.completed && t.dirty != DirtyState::Deleted
                })
                .count() as u32;
            if project.task_count != count {
                project.task_count = count;
                self.upsert_project(&project, None)?;
            }
        }
        Ok(())
    }

    /// Recomputes the derived open-task count of every label.
    fn refresh_label_task_counts(&mut self) -> Result<(), StoreError> {
        let tasks = self.tasks()?;
        for mut label in self.labels()? {
            let count = tasks
                .iter()
                .filter(|t| {
                    !t.completed && t.dirty != DirtyState::Deleted && t.label_ids.contains(&label.id)
                })
                .count() as u32;
            if label.task_count != count {
                label.task_count = count;
                self.upsert_label(&label, None)?;
            }
        }
        Ok(())
    }

    /// Recomputes the derived note count of every task.
    fn refresh_note_counts(&mut self) -> Result<(), StoreError> {
        let notes = self.notes()?;
        for mut task in self.tasks()? {
            let count = notes
                .iter()
                .filter(|n| n.task_id == task.id && n.dirty != DirtyState::Deleted)
                .count() as u32;
            if task.note_count != count {
                task.note_count = count;
                self.upsert_task(&task, None)?;
            }
        }
        Ok(())
    }
}
