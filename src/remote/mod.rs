#[cfg(test)]
pub mod mock;

use crate::core::id::EntityId;
use crate::core::{Label, Note, Project, Task};
use crate::error::SyncError;

/// Contract for the wire-protocol collaborator.
///
/// Every call either returns an authoritative snapshot or a typed
/// [`SyncError`]; the reconciler treats any failure as aborting the current
/// pass. Timeouts, connection retries and authentication are entirely the
/// implementation's responsibility.
///
/// Protocol quirks stay on this side of the boundary. In particular the
/// server keys label mutation by *name* rather than id, so renaming a label
/// requires recovering its previous remote-visible name from a full label
/// listing — `update_label` implementations do that internally and never
/// leak it to the reconciler.
pub trait RemoteGateway {
    fn projects(&self) -> Result<Vec<Project>, SyncError>;
    /// Returns the project with its server-assigned permanent id.
    fn add_project(&self, project: &Project) -> Result<Project, SyncError>;
    fn update_project(&self, project: &Project) -> Result<Project, SyncError>;
    fn delete_project(&self, id: EntityId) -> Result<(), SyncError>;
    /// Replaces the server-side project ordering with `ordered_ids`.
    fn reorder_projects(&self, ordered_ids: &[EntityId]) -> Result<(), SyncError>;

    /// Uncompleted tasks of one project.
    fn active_tasks(&self, project_id: EntityId) -> Result<Vec<Task>, SyncError>;
    /// Completed tasks of one project.
    fn completed_tasks(&self, project_id: EntityId) -> Result<Vec<Task>, SyncError>;
    fn add_task(&self, task: &Task) -> Result<Task, SyncError>;
    fn update_task(&self, task: &Task) -> Result<Task, SyncError>;
    fn delete_task(&self, id: EntityId) -> Result<(), SyncError>;
    fn reorder_tasks(&self, project_id: EntityId, ordered_ids: &[EntityId]) -> Result<(), SyncError>;
    fn complete_tasks(&self, ids: &[EntityId]) -> Result<(), SyncError>;
    fn uncomplete_tasks(&self, ids: &[EntityId]) -> Result<(), SyncError>;
    /// Advances a recurring task to its next occurrence and returns the
    /// task with the server-computed due fields.
    fn advance_recurrence(&self, id: EntityId) -> Result<Task, SyncError>;
    fn move_tasks(
        &self,
        ids: &[EntityId],
        from_project: EntityId,
        to_project: EntityId,
    ) -> Result<(), SyncError>;

    fn labels(&self) -> Result<Vec<Label>, SyncError>;
    fn add_label(&self, label: &Label) -> Result<Label, SyncError>;
    fn update_label(&self, label: &Label) -> Result<Label, SyncError>;
    fn delete_label(&self, id: EntityId) -> Result<(), SyncError>;

    fn notes_for_task(&self, task_id: EntityId) -> Result<Vec<Note>, SyncError>;
    fn add_note(&self, note: &Note) -> Result<Note, SyncError>;
    fn update_note(&self, note: &Note) -> Result<Note, SyncError>;
    fn delete_note(&self, id: EntityId) -> Result<(), SyncError>;
}
