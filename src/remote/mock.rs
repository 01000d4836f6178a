//! Scripted in-memory gateway used by the sync tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::Duration;

use crate::core::id::EntityId;
use crate::core::{Label, Note, Project, Task};
use crate::error::SyncError;

use super::RemoteGateway;

#[derive(Debug, Default)]
struct RemoteState {
    projects: BTreeMap<EntityId, Project>,
    tasks: BTreeMap<EntityId, Task>,
    labels: BTreeMap<EntityId, Label>,
    notes: BTreeMap<EntityId, Note>,
}

/// Fake server holding its own entity tables. Records every call by name and
/// can be scripted to fail a single operation, so tests can assert both the
/// calls a pass issues and how it aborts.
#[derive(Debug)]
pub struct MockGateway {
    state: RefCell<RemoteState>,
    next_id: Cell<EntityId>,
    calls: RefCell<Vec<String>>,
    fail_op: RefCell<Option<&'static str>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(RemoteState::default()),
            next_id: Cell::new(100),
            calls: RefCell::new(Vec::new()),
            fail_op: RefCell::new(None),
        }
    }

    pub fn seed_project(&self, project: Project) {
        self.state.borrow_mut().projects.insert(project.id, project);
    }

    pub fn seed_task(&self, task: Task) {
        self.state.borrow_mut().tasks.insert(task.id, task);
    }

    pub fn seed_label(&self, label: Label) {
        self.state.borrow_mut().labels.insert(label.id, label);
    }

    pub fn seed_note(&self, note: Note) {
        self.state.borrow_mut().notes.insert(note.id, note);
    }

    pub fn remote_task(&self, id: EntityId) -> Option<Task> {
        self.state.borrow().tasks.get(&id).cloned()
    }

    pub fn remote_project(&self, id: EntityId) -> Option<Project> {
        self.state.borrow().projects.get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(op))
            .count()
    }

    /// Makes the named operation fail with `RemoteUnavailable` on every
    /// invocation.
    pub fn fail_on(&self, op: &'static str) {
        *self.fail_op.borrow_mut() = Some(op);
    }

    fn record(&self, call: String) -> Result<(), SyncError> {
        let op = call.split('(').next().unwrap_or(&call).to_string();
        self.calls.borrow_mut().push(call);
        if self.fail_op.borrow().as_deref() == Some(op.as_str()) {
            return Err(SyncError::RemoteUnavailable("scripted failure".into()));
        }
        Ok(())
    }

    fn assign_id(&self) -> EntityId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl RemoteGateway for MockGateway {
    fn projects(&self) -> Result<Vec<Project>, SyncError> {
        self.record("projects()".into())?;
        Ok(self.state.borrow().projects.values().cloned().collect())
    }

    fn add_project(&self, project: &Project) -> Result<Project, SyncError> {
        self.record(format!("add_project({})", project.id))?;
        let mut stored = project.clone();
        stored.id = self.assign_id();
        self.state.borrow_mut().projects.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_project(&self, project: &Project) -> Result<Project, SyncError> {
        self.record(format!("update_project({})", project.id))?;
        self.state.borrow_mut().projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    fn delete_project(&self, id: EntityId) -> Result<(), SyncError> {
        self.record(format!("delete_project({id})"))?;
        self.state.borrow_mut().projects.remove(&id);
        Ok(())
    }

    fn reorder_projects(&self, ordered_ids: &[EntityId]) -> Result<(), SyncError> {
        self.record(format!("reorder_projects({ordered_ids:?})"))?;
        let mut state = self.state.borrow_mut();
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(project) = state.projects.get_mut(id) {
                project.position = index as i32 + 1;
            }
        }
        Ok(())
    }

    fn active_tasks(&self, project_id: EntityId) -> Result<Vec<Task>, SyncError> {
        self.record(format!("active_tasks({project_id})"))?;
        Ok(self
            .state
            .borrow()
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && !t.completed)
            .cloned()
            .collect())
    }

    fn completed_tasks(&self, project_id: EntityId) -> Result<Vec<Task>, SyncError> {
        self.record(format!("completed_tasks({project_id})"))?;
        Ok(self
            .state
            .borrow()
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && t.completed)
            .cloned()
            .collect())
    }

    fn add_task(&self, task: &Task) -> Result<Task, SyncError> {
        self.record(format!("add_task({})", task.id))?;
        let mut stored = task.clone();
        stored.id = self.assign_id();
        self.state.borrow_mut().tasks.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_task(&self, task: &Task) -> Result<Task, SyncError> {
        self.record(format!("update_task({})", task.id))?;
        self.state.borrow_mut().tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    fn delete_task(&self, id: EntityId) -> Result<(), SyncError> {
        self.record(format!("delete_task({id})"))?;
        self.state.borrow_mut().tasks.remove(&id);
        Ok(())
    }

    fn reorder_tasks(&self, project_id: EntityId, ordered_ids: &[EntityId]) -> Result<(), SyncError> {
        self.record(format!("reorder_tasks({project_id}, {ordered_ids:?})"))?;
        let mut state = self.state.borrow_mut();
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(task) = state.tasks.get_mut(id) {
                task.position = index as i32 + 1;
            }
        }
        Ok(())
    }

    fn complete_tasks(&self, ids: &[EntityId]) -> Result<(), SyncError> {
        self.record(format!("complete_tasks({ids:?})"))?;
        let mut state = self.state.borrow_mut();
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id) {
                task.completed = true;
            }
        }
        Ok(())
    }

    fn uncomplete_tasks(&self, ids: &[EntityId]) -> Result<(), SyncError> {
        self.record(format!("uncomplete_tasks({ids:?})"))?;
        let mut state = self.state.borrow_mut();
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id) {
                task.completed = false;
            }
        }
        Ok(())
    }

    fn advance_recurrence(&self, id: EntityId) -> Result<Task, SyncError> {
        self.record(format!("advance_recurrence({id})"))?;
        let mut state = self.state.borrow_mut();
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(SyncError::RemoteRejected(crate::error::RejectReason::TaskNotFound))?;
        task.due_date = task.due_date.map(|d| d + Duration::days(1));
        task.completed = false;
        Ok(task.clone())
    }

    fn move_tasks(
        &self,
        ids: &[EntityId],
        from_project: EntityId,
        to_project: EntityId,
    ) -> Result<(), SyncError> {
        self.record(format!("move_tasks({ids:?}, {from_project}, {to_project})"))?;
        let mut state = self.state.borrow_mut();
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id) {
                task.project_id = to_project;
            }
        }
        Ok(())
    }

    fn labels(&self) -> Result<Vec<Label>, SyncError> {
        self.record("labels()".into())?;
        Ok(self.state.borrow().labels.values().cloned().collect())
    }

    fn add_label(&self, label: &Label) -> Result<Label, SyncError> {
        self.record(format!("add_label({})", label.id))?;
        let mut stored = label.clone();
        stored.id = self.assign_id();
        self.state.borrow_mut().labels.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_label(&self, label: &Label) -> Result<Label, SyncError> {
        // A real implementation recovers the previous remote-visible name
        // from a listing here, because the wire protocol keys label
        // mutation by name.
        self.record(format!("update_label({})", label.id))?;
        self.state.borrow_mut().labels.insert(label.id, label.clone());
        Ok(label.clone())
    }

    fn delete_label(&self, id: EntityId) -> Result<(), SyncError> {
        self.record(format!("delete_label({id})"))?;
        self.state.borrow_mut().labels.remove(&id);
        Ok(())
    }

    fn notes_for_task(&self, task_id: EntityId) -> Result<Vec<Note>, SyncError> {
        self.record(format!("notes_for_task({task_id})"))?;
        Ok(self
            .state
            .borrow()
            .notes
            .values()
            .filter(|n| n.task_id == task_id)
            .cloned()
            .collect())
    }

    fn add_note(&self, note: &Note) -> Result<Note, SyncError> {
        self.record(format!("add_note({})", note.id))?;
        let mut stored = note.clone();
        stored.id = self.assign_id();
        self.state.borrow_mut().notes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_note(&self, note: &Note) -> Result<Note, SyncError> {
        self.record(format!("update_note({})", note.id))?;
        self.state.borrow_mut().notes.insert(note.id, note.clone());
        Ok(note.clone())
    }

    fn delete_note(&self, id: EntityId) -> Result<(), SyncError> {
        self.record(format!("delete_note({id})"))?;
        self.state.borrow_mut().notes.remove(&id);
        Ok(())
    }
}
