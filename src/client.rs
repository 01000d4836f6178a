//! Local mutation facade.
//!
//! All user-visible edits go through [`Client`]: it assigns placeholder ids
//! to new entities, tracks dirty state, keeps list positions dense, records
//! pending cross-project moves and raises the reorder flags the next sync
//! pass consumes. Every mutation is applied to the local store immediately;
//! nothing here talks to the network except [`Client::sync`].

use crate::config::SyncConfig;
use crate::core::entity::{DirtyState, Entity, EntityKind, Scope};
use crate::core::id::{generate_placeholder, EntityId};
use crate::core::{Account, Label, Note, Project, SavedQuery, Task};
use crate::error::{StoreError, SyncError};
use crate::remote::RemoteGateway;
use crate::store::{LocalStore, PendingMove};
use crate::sync::{reorder_scope, SyncEngine, SyncOutcome, SyncProgress, NO_PREVIOUS_POSITION};

pub struct Client<S, R> {
    store: S,
    engine: SyncEngine<R>,
    account: Account,
}

impl<S: LocalStore, R: RemoteGateway> Client<S, R> {
    pub fn new(store: S, gateway: R, account: Account, config: SyncConfig) -> Self {
        Self {
            store,
            engine: SyncEngine::new(gateway, config),
            account,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one full sync pass against the remote service.
    pub fn sync(&mut self, progress: &mut dyn SyncProgress) -> Result<SyncOutcome, SyncError> {
        self.engine.sync_all(&mut self.store, &self.account, progress)
    }

    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    fn fresh_id(&self, kind: EntityKind) -> Result<EntityId, SyncError> {
        let config = self.engine.config();
        let id = generate_placeholder(config.placeholder_min, config.placeholder_max, |id| {
            self.store.entity_exists(kind, id)
        })?;
        Ok(id)
    }

    fn require_entitlement(&self) -> Result<(), SyncError> {
        if self.account.is_entitled() {
            Ok(())
        } else {
            Err(SyncError::PermissionDenied)
        }
    }

    // --- projects ---

    /// Live projects in position order.
    pub fn projects(&self) -> Result<Vec<Project>, SyncError> {
        let mut projects: Vec<Project> = self
            .store
            .projects()?
            .into_iter()
            .filter(|p| p.dirty != DirtyState::Deleted)
            .collect();
        projects.sort_by_key(|p| p.position);
        Ok(projects)
    }

    pub fn add_project(&mut self, mut project: Project) -> Result<EntityId, SyncError> {
        project.id = self.fresh_id(EntityKind::Project)?;
        project.dirty = DirtyState::Added;
        self.store.upsert_project(&project, None)?;
        reorder_scope(&mut self.store, Scope::Projects, project.id, NO_PREVIOUS_POSITION)?;
        Ok(project.id)
    }

    pub fn update_project(&mut self, mut project: Project) -> Result<(), SyncError> {
        let stored = self
            .store
            .project(project.id)?
            .ok_or_else(|| StoreError::new("no such project"))?;
        project.dirty = updated_dirty(stored.dirty);
        self.store.upsert_project(&project, None)?;
        if project.position != stored.position {
            reorder_scope(&mut self.store, Scope::Projects, project.id, stored.position)?;
        }
        Ok(())
    }

    /// Deletes a project together with its tasks and their notes.
    pub fn delete_project(&mut self, id: EntityId) -> Result<(), SyncError> {
        let Some(project) = self.store.project(id)? else {
            return Ok(());
        };
        for task in self.store.tasks_in_project(id)? {
            self.delete_task_row(task)?;
        }
        self.tombstone(Entity::Project(project.clone()))?;
        reorder_scope(&mut self.store, Scope::Projects, id, project.position)?;
        Ok(())
    }

    // --- tasks ---

    /// Live tasks of one project in position order.
    pub fn tasks_in_project(&self, project_id: EntityId) -> Result<Vec<Task>, SyncError> {
        let mut tasks: Vec<Task> = self
            .store
            .tasks_in_project(project_id)?
            .into_iter()
            .filter(|t| t.dirty != DirtyState::Deleted)
            .collect();
        tasks.sort_by_key(|t| t.position);
        Ok(tasks)
    }

    pub fn add_task(&mut self, mut task: Task) -> Result<EntityId, SyncError> {
        task.id = self.fresh_id(EntityKind::Task)?;
        task.dirty = DirtyState::Added;
        let project_id = task.project_id;
        self.store.upsert_task(&task, None)?;
        reorder_scope(
            &mut self.store,
            Scope::Tasks { project_id },
            task.id,
            NO_PREVIOUS_POSITION,
        )?;
        self.store.refresh_project_task_counts()?;
        Ok(task.id)
    }

    /// Applies an edit, handling project changes and position changes.
    ///
    /// A cross-project move of an already-synced task is recorded for the
    /// next pass; a task the server has never seen just changes its foreign
    /// key.
    pub fn update_task(&mut self, mut task: Task) -> Result<(), SyncError> {
        let stored = self
            .store
            .task(task.id)?
            .ok_or_else(|| StoreError::new("no such task"))?;
        task.dirty = updated_dirty(stored.dirty);
        self.store.upsert_task(&task, None)?;

        if task.project_id != stored.project_id {
            if stored.dirty != DirtyState::Added {
                self.store.record_pending_move(PendingMove {
                    task_id: task.id,
                    from_project: stored.project_id,
                    to_project: task.project_id,
                })?;
            }
            reorder_scope(
                &mut self.store,
                Scope::Tasks { project_id: stored.project_id },
                task.id,
                stored.position,
            )?;
            reorder_scope(
                &mut self.store,
                Scope::Tasks { project_id: task.project_id },
                task.id,
                NO_PREVIOUS_POSITION,
            )?;
        } else if task.position != stored.position {
            reorder_scope(
                &mut self.store,
                Scope::Tasks { project_id: task.project_id },
                task.id,
                stored.position,
            )?;
        }
        self.store.refresh_project_task_counts()?;
        self.store.refresh_label_task_counts()?;
        Ok(())
    }

    /// Marks a task completed. Heading tasks cannot be completed; the call
    /// is a no-op for them.
    pub fn complete_task(&mut self, id: EntityId) -> Result<(), SyncError> {
        let Some(mut task) = self.store.task(id)? else {
            return Ok(());
        };
        if !task.can_be_completed() || task.completed {
            return Ok(());
        }
        task.completed = true;
        task.dirty = updated_dirty(task.dirty);
        self.store.upsert_task(&task, None)?;
        self.store.refresh_project_task_counts()?;
        self.store.refresh_label_task_counts()?;
        Ok(())
    }

    pub fn uncomplete_task(&mut self, id: EntityId) -> Result<(), SyncError> {
        let Some(mut task) = self.store.task(id)? else {
            return Ok(());
        };
        if !task.completed {
            return Ok(());
        }
        task.completed = false;
        task.dirty = updated_dirty(task.dirty);
        self.store.upsert_task(&task, None)?;
        self.store.refresh_project_task_counts()?;
        self.store.refresh_label_task_counts()?;
        Ok(())
    }

    pub fn delete_task(&mut self, id: EntityId) -> Result<(), SyncError> {
        let Some(task) = self.store.task(id)? else {
            return Ok(());
        };
        let scope = Scope::Tasks { project_id: task.project_id };
        let position = task.position;
        self.delete_task_row(task)?;
        reorder_scope(&mut self.store, scope, id, position)?;
        self.store.refresh_project_task_counts()?;
        self.store.refresh_label_task_counts()?;
        Ok(())
    }

    /// Tombstones a task and its notes, without reordering or count upkeep.
    fn delete_task_row(&mut self, task: Task) -> Result<(), SyncError> {
        for note in self.store.notes_for_task(task.id)? {
            self.tombstone(Entity::Note(note))?;
        }
        self.tombstone(Entity::Task(task))
    }

    // --- labels ---

    /// Live labels sorted by name.
    pub fn labels(&self) -> Result<Vec<Label>, SyncError> {
        let mut labels: Vec<Label> = self
            .store
            .labels()?
            .into_iter()
            .filter(|l| l.dirty != DirtyState::Deleted)
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    pub fn add_label(&mut self, mut label: Label) -> Result<EntityId, SyncError> {
        self.require_entitlement()?;
        label.id = self.fresh_id(EntityKind::Label)?;
        label.dirty = DirtyState::Added;
        self.store.upsert_label(&label, None)?;
        Ok(label.id)
    }

    pub fn update_label(&mut self, mut label: Label) -> Result<(), SyncError> {
        self.require_entitlement()?;
        let stored = self
            .store
            .label(label.id)?
            .ok_or_else(|| StoreError::new("no such label"))?;
        label.dirty = updated_dirty(stored.dirty);
        self.store.upsert_label(&label, None)?;
        Ok(())
    }

    /// Deletes a label. Tasks referencing it are left alone; their label
    /// sets catch up from the server on the next pass.
    pub fn delete_label(&mut self, id: EntityId) -> Result<(), SyncError> {
        self.require_entitlement()?;
        let Some(label) = self.store.label(id)? else {
            return Ok(());
        };
        self.tombstone(Entity::Label(label))
    }

    // --- notes ---

    /// Live notes of one task, oldest first.
    pub fn notes_for_task(&self, task_id: EntityId) -> Result<Vec<Note>, SyncError> {
        let mut notes: Vec<Note> = self
            .store
            .notes_for_task(task_id)?
            .into_iter()
            .filter(|n| n.dirty != DirtyState::Deleted)
            .collect();
        notes.sort_by_key(|n| n.posted);
        Ok(notes)
    }

    pub fn add_note(&mut self, mut note: Note) -> Result<EntityId, SyncError> {
        self.require_entitlement()?;
        note.id = self.fresh_id(EntityKind::Note)?;
        note.dirty = DirtyState::Added;
        self.store.upsert_note(&note, None)?;
        self.store.refresh_note_counts()?;
        Ok(note.id)
    }

    pub fn update_note(&mut self, mut note: Note) -> Result<(), SyncError> {
        self.require_entitlement()?;
        let stored = self
            .store
            .note(note.id)?
            .ok_or_else(|| StoreError::new("no such note"))?;
        note.dirty = updated_dirty(stored.dirty);
        self.store.upsert_note(&note, None)?;
        Ok(())
    }

    pub fn delete_note(&mut self, id: EntityId) -> Result<(), SyncError> {
        self.require_entitlement()?;
        let Some(note) = self.store.note(id)? else {
            return Ok(());
        };
        self.tombstone(Entity::Note(note))?;
        self.store.refresh_note_counts()?;
        Ok(())
    }

    // --- saved queries ---

    /// Saved queries never leave the device, but they share the placeholder
    /// and dirty-state plumbing of the synced kinds.
    pub fn queries(&self) -> Result<Vec<SavedQuery>, SyncError> {
        Ok(self
            .store
            .queries()?
            .into_iter()
            .filter(|q| q.dirty != DirtyState::Deleted)
            .collect())
    }

    pub fn add_query(&mut self, mut query: SavedQuery) -> Result<EntityId, SyncError> {
        query.id = self.fresh_id(EntityKind::Query)?;
        query.dirty = DirtyState::Added;
        self.store.upsert_query(&query)?;
        Ok(query.id)
    }

    pub fn update_query(&mut self, mut query: SavedQuery) -> Result<(), SyncError> {
        let stored = self
            .store
            .query(query.id)?
            .ok_or_else(|| StoreError::new("no such query"))?;
        query.dirty = updated_dirty(stored.dirty);
        self.store.upsert_query(&query)?;
        Ok(())
    }

    pub fn delete_query(&mut self, id: EntityId) -> Result<(), SyncError> {
        self.store.remove_query(id)?;
        Ok(())
    }

    /// Marks an entity deleted, or drops it outright when the server has
    /// never seen it.
    fn tombstone(&mut self, mut entity: Entity) -> Result<(), SyncError> {
        if entity.dirty() == DirtyState::Added {
            self.store.remove_entity(entity.kind(), entity.id())?;
        } else {
            entity.set_dirty(DirtyState::Deleted);
            self.store.upsert_entity(&entity, None)?;
        }
        Ok(())
    }
}

/// An edit leaves `Added` alone (the server still has nothing to update
/// against) and otherwise marks the entity `Modified`.
fn updated_dirty(current: DirtyState) -> DirtyState {
    match current {
        DirtyState::Added => DirtyState::Added,
        _ => DirtyState::Modified,
    }
}
