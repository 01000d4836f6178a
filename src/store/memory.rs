use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;

use crate::core::id::EntityId;
use crate::core::{Label, Note, Project, SavedQuery, Task};
use crate::error::StoreError;

use super::{LocalStore, PendingMove};

/// In-memory [`LocalStore`].
///
/// Reference implementation of the remap and flag contract; also the fixture
/// every test in this crate builds on. Rows are keyed by id in ordered maps
/// so listings are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: BTreeMap<EntityId, Project>,
    tasks: BTreeMap<EntityId, Task>,
    labels: BTreeMap<EntityId, Label>,
    notes: BTreeMap<EntityId, Note>,
    queries: BTreeMap<EntityId, SavedQuery>,
    projects_reordered: bool,
    tasks_reordered: HashSet<EntityId>,
    pending_moves: Vec<PendingMove>,
    last_sync: Option<NaiveDateTime>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites every reference to a project id (used on placeholder remap).
    fn rewrite_project_refs(&mut self, old: EntityId, new: EntityId) {
        let ids: Vec<EntityId> = self.tasks.keys().copied().collect();
        for id in ids {
            if let Some(task) = self.tasks.get_mut(&id) {
                if task.project_id == old {
                    task.project_id = new;
                }
            }
        }
        for pending in &mut self.pending_moves {
            if pending.from_project == old {
                pending.from_project = new;
            }
            if pending.to_project == old {
                pending.to_project = new;
            }
        }
        if self.tasks_reordered.remove(&old) {
            self.tasks_reordered.insert(new);
        }
    }

    fn rewrite_task_refs(&mut self, old: EntityId, new: EntityId) {
        for note in self.notes.values_mut() {
            if note.task_id == old {
                note.task_id = new;
            }
        }
        for pending in &mut self.pending_moves {
            if pending.task_id == old {
                pending.task_id = new;
            }
        }
    }

    fn rewrite_label_refs(&mut self, old: EntityId, new: EntityId) {
        for task in self.tasks.values_mut() {
            for label_id in &mut task.label_ids {
                if *label_id == old {
                    *label_id = new;
                }
            }
        }
    }
}

impl LocalStore for MemoryStore {
    fn projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.projects.values().cloned().collect())
    }

    fn project(&self, id: EntityId) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.get(&id).cloned())
    }

    fn upsert_project(&mut self, project: &Project, previous_id: Option<EntityId>) -> Result<(), StoreError> {
        if let Some(old) = previous_id.filter(|&old| old != project.id) {
            // References first, then the transitional row.
            self.rewrite_project_refs(old, project.id);
            self.projects.remove(&old);
        }
        self.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn remove_project(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.projects.remove(&id);
        Ok(())
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.values().cloned().collect())
    }

    fn task(&self, id: EntityId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn tasks_in_project(&self, project_id: EntityId) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn upsert_task(&mut self, task: &Task, previous_id: Option<EntityId>) -> Result<(), StoreError> {
        if let Some(old) = previous_id.filter(|&old| old != task.id) {
            self.rewrite_task_refs(old, task.id);
            self.tasks.remove(&old);
        }
        self.tasks.insert(task.id, task.clone());
        Ok(())
    }

    fn remove_task(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.tasks.remove(&id);
        Ok(())
    }

    fn labels(&self) -> Result<Vec<Label>, StoreError> {
        Ok(self.labels.values().cloned().collect())
    }

    fn label(&self, id: EntityId) -> Result<Option<Label>, StoreError> {
        Ok(self.labels.get(&id).cloned())
    }

    fn upsert_label(&mut self, label: &Label, previous_id: Option<EntityId>) -> Result<(), StoreError> {
        if let Some(old) = previous_id.filter(|&old| old != label.id) {
            self.rewrite_label_refs(old, label.id);
            self.labels.remove(&old);
        }
        self.labels.insert(label.id, label.clone());
        Ok(())
    }

    fn remove_label(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.labels.remove(&id);
        Ok(())
    }

    fn notes(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self.notes.values().cloned().collect())
    }

    fn note(&self, id: EntityId) -> Result<Option<Note>, StoreError> {
        Ok(self.notes.get(&id).cloned())
    }

    fn notes_for_task(&self, task_id: EntityId) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .notes
            .values()
            .filter(|n| n.task_id == task_id)
            .cloned()
            .collect())
    }

    fn upsert_note(&mut self, note: &Note, previous_id: Option<EntityId>) -> Result<(), StoreError> {
        if let Some(old) = previous_id.filter(|&old| old != note.id) {
            self.notes.remove(&old);
        }
        self.notes.insert(note.id, note.clone());
        Ok(())
    }

    fn remove_note(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.notes.remove(&id);
        Ok(())
    }

    fn queries(&self) -> Result<Vec<SavedQuery>, StoreError> {
        Ok(self.queries.values().cloned().collect())
    }

    fn query(&self, id: EntityId) -> Result<Option<SavedQuery>, StoreError> {
        Ok(self.queries.get(&id).cloned())
    }

    fn upsert_query(&mut self, query: &SavedQuery) -> Result<(), StoreError> {
        self.queries.insert(query.id, query.clone());
        Ok(())
    }

    fn remove_query(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.queries.remove(&id);
        Ok(())
    }

    fn projects_need_reorder(&self) -> Result<bool, StoreError> {
        Ok(self.projects_reordered)
    }

    fn set_projects_need_reorder(&mut self, flag: bool) -> Result<(), StoreError> {
        self.projects_reordered = flag;
        Ok(())
    }

    fn tasks_need_reorder(&self, project_id: EntityId) -> Result<bool, StoreError> {
        Ok(self.tasks_reordered.contains(&project_id))
    }

    fn set_tasks_need_reorder(&mut self, project_id: EntityId, flag: bool) -> Result<(), StoreError> {
        if flag {
            self.tasks_reordered.insert(project_id);
        } else {
            self.tasks_reordered.remove(&project_id);
        }
        Ok(())
    }

    fn record_pending_move(&mut self, pending: PendingMove) -> Result<(), StoreError> {
        // A later move of the same task supersedes the earlier record.
        self.pending_moves.retain(|p| p.task_id != pending.task_id);
        self.pending_moves.push(pending);
        Ok(())
    }

    fn pending_moves_into(&self, to_project: EntityId) -> Result<Vec<PendingMove>, StoreError> {
        Ok(self
            .pending_moves
            .iter()
            .filter(|p| p.to_project == to_project)
            .copied()
            .collect())
    }

    fn clear_pending_moves_into(&mut self, to_project: EntityId) -> Result<(), StoreError> {
        self.pending_moves.retain(|p| p.to_project != to_project);
        Ok(())
    }

    fn last_sync_time(&self) -> Result<Option<NaiveDateTime>, StoreError> {
        Ok(self.last_sync)
    }

    fn set_last_sync_time(&mut self, time: NaiveDateTime) -> Result<(), StoreError> {
        self.last_sync = Some(time);
        Ok(())
    }
}
