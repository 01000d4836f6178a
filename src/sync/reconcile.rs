//! Conflict classification and action application for one entity collection.
//!
//! A reconciliation pass compares a local snapshot (each entity carrying its
//! dirty state) against a remote snapshot (implicitly authoritative and
//! unmodified) and derives exactly one [`SyncAction`] per id present in
//! either. Actions are applied immediately; a gateway failure aborts the
//! rest of the collection without rolling back what was already applied —
//! re-running later re-derives the remaining actions from current state, so
//! retries are idempotent by construction.

use std::collections::HashMap;

use crate::config::DeletionPolicy;
use crate::core::entity::{DirtyState, Entity};
use crate::core::id::EntityId;
use crate::core::Task;
use crate::error::SyncError;
use crate::remote::RemoteGateway;
use crate::store::LocalStore;

/// What to do about one local/remote id pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    NoOp,
    UpdateLocalToRemote,
    UpdateRemoteToLocal,
    AddRemoteToLocal,
    AddLocalToRemote,
    DeleteRemote,
    DeleteLocal,
}

/// Derives the action for one pairing. `None` means the side has no copy of
/// the id.
pub fn classify(
    local: Option<&Entity>,
    remote: Option<&Entity>,
    policy: DeletionPolicy,
) -> SyncAction {
    match (local, remote) {
        (None, None) => SyncAction::NoOp,
        (None, Some(_)) => SyncAction::AddRemoteToLocal,
        (Some(local), None) => match local.dirty() {
            DirtyState::Added => SyncAction::AddLocalToRemote,
            // Remote copy is gone (or never existed for a tombstone).
            DirtyState::Deleted | DirtyState::Unmodified => SyncAction::DeleteLocal,
            // Modified locally, deleted remotely. No timestamp exists to
            // arbitrate, so the policy decides.
            DirtyState::Modified => match policy {
                DeletionPolicy::ResurrectLocal => SyncAction::AddLocalToRemote,
                DeletionPolicy::AcceptRemoteDelete => SyncAction::DeleteLocal,
            },
        },
        (Some(local), Some(remote)) => {
            if local.dirty() == DirtyState::Deleted {
                return SyncAction::DeleteRemote;
            }
            if local.dirty() != DirtyState::Unmodified {
                // Simultaneous edits have no arbiter either; the local copy
                // wins unconditionally.
                SyncAction::UpdateLocalToRemote
            } else if local.same_content(remote) {
                SyncAction::NoOp
            } else {
                SyncAction::UpdateRemoteToLocal
            }
        }
    }
}

/// Runs one reconciliation pass over a single collection.
pub(crate) fn reconcile_collection<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    policy: DeletionPolicy,
    local: Vec<Entity>,
    remote_snapshot: Vec<Entity>,
) -> Result<(), SyncError> {
    if local.is_empty() && remote_snapshot.is_empty() {
        return Ok(());
    }

    let mut local_by_id: HashMap<EntityId, Entity> =
        local.into_iter().map(|e| (e.id(), e)).collect();

    for remote_entity in &remote_snapshot {
        let local_entity = local_by_id.remove(&remote_entity.id());
        let action = classify(local_entity.as_ref(), Some(remote_entity), policy);
        log::debug!(
            "reconcile {:?} {}: {:?}",
            remote_entity.kind(),
            remote_entity.id(),
            action
        );
        apply(store, gateway, local_entity.as_ref(), Some(remote_entity), action)?;
    }

    // Whatever is left locally has no remote copy.
    let mut leftovers: Vec<Entity> = local_by_id.into_values().collect();
    leftovers.sort_by_key(|e| e.id());
    for local_entity in &leftovers {
        let action = classify(Some(local_entity), None, policy);
        log::debug!(
            "reconcile {:?} {} (no remote copy): {:?}",
            local_entity.kind(),
            local_entity.id(),
            action
        );
        apply(store, gateway, Some(local_entity), None, action)?;
    }

    Ok(())
}

fn apply<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    local: Option<&Entity>,
    remote: Option<&Entity>,
    action: SyncAction,
) -> Result<(), SyncError> {
    match (action, local, remote) {
        (SyncAction::AddRemoteToLocal, _, Some(remote)) => {
            let mut pulled = remote.clone();
            pulled.set_dirty(DirtyState::Unmodified);
            store.upsert_entity(&pulled, None)?;
            Ok(())
        }
        (SyncAction::UpdateRemoteToLocal, _, Some(remote)) => {
            let mut pulled = remote.clone();
            pulled.set_dirty(DirtyState::Unmodified);
            store.upsert_entity(&pulled, None)?;
            Ok(())
        }
        (SyncAction::AddLocalToRemote, Some(local), _) => add_local_to_remote(store, gateway, local),
        (SyncAction::DeleteLocal, Some(local), _) => {
            store.remove_entity(local.kind(), local.id())?;
            Ok(())
        }
        (SyncAction::DeleteRemote, Some(local), _) => delete_remote(store, gateway, local),
        (SyncAction::UpdateLocalToRemote, Some(local), Some(remote)) => {
            update_local_to_remote(store, gateway, local, remote)
        }
        _ => Ok(()),
    }
}

/// Pushes a locally created entity and adopts the server-assigned permanent
/// id. The store rewrites every foreign reference from the placeholder
/// before discarding the transitional row.
fn add_local_to_remote<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    local: &Entity,
) -> Result<(), SyncError> {
    log::info!("pushing new {:?} {} to remote", local.kind(), local.id());
    match local {
        Entity::Project(p) => {
            let mut created = gateway.add_project(p)?;
            created.dirty = DirtyState::Unmodified;
            store.upsert_project(&created, Some(p.id))?;
        }
        Entity::Task(t) => {
            let mut created = gateway.add_task(t)?;
            created.dirty = DirtyState::Unmodified;
            store.upsert_task(&created, Some(t.id))?;
        }
        Entity::Label(l) => {
            let mut created = gateway.add_label(l)?;
            created.dirty = DirtyState::Unmodified;
            store.upsert_label(&created, Some(l.id))?;
        }
        Entity::Note(n) => {
            let mut created = gateway.add_note(n)?;
            created.dirty = DirtyState::Unmodified;
            store.upsert_note(&created, Some(n.id))?;
        }
        // Saved queries are local-only and never reach a pass.
        Entity::Query(_) => {}
    }
    Ok(())
}

/// Deletes the remote copy, then the local tombstone.
fn delete_remote<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    local: &Entity,
) -> Result<(), SyncError> {
    log::info!("deleting {:?} {} remotely", local.kind(), local.id());
    match local {
        Entity::Project(p) => gateway.delete_project(p.id)?,
        Entity::Task(t) => gateway.delete_task(t.id)?,
        Entity::Label(l) => gateway.delete_label(l.id)?,
        Entity::Note(n) => gateway.delete_note(n.id)?,
        Entity::Query(_) => {}
    }
    store.remove_entity(local.kind(), local.id())?;
    Ok(())
}

fn update_local_to_remote<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    local: &Entity,
    remote: &Entity,
) -> Result<(), SyncError> {
    match (local, remote) {
        (Entity::Task(local_task), Entity::Task(remote_task)) => {
            push_task(store, gateway, local_task, remote_task)
        }
        (Entity::Project(p), _) => {
            let mut updated = gateway.update_project(p)?;
            updated.dirty = DirtyState::Unmodified;
            store.upsert_project(&updated, None)?;
            Ok(())
        }
        (Entity::Label(l), _) => {
            // The gateway recovers the previous remote-visible name itself;
            // the rename quirk never surfaces here.
            let mut updated = gateway.update_label(l)?;
            updated.dirty = DirtyState::Unmodified;
            store.upsert_label(&updated, None)?;
            Ok(())
        }
        (Entity::Note(n), _) => {
            let mut updated = gateway.update_note(n)?;
            updated.dirty = DirtyState::Unmodified;
            store.upsert_note(&updated, None)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Pushes a modified task, handling completion toggles before the regular
/// field update.
fn push_task<S: LocalStore, R: RemoteGateway>(
    store: &mut S,
    gateway: &R,
    local: &Task,
    remote: &Task,
) -> Result<(), SyncError> {
    let mut local = local.clone();
    let mut remote_mirror = remote.clone();

    if local.completed && !remote_mirror.completed {
        if local.is_recurring() && local.same_due_string(&remote_mirror) {
            // Completing a recurring task advances its schedule instead of
            // closing it: the task stays open with the server-computed next
            // due date. Both copies adopt the advanced fields, so a field
            // edit made alongside the completion still falls through to the
            // regular update below without clobbering the new date.
            log::info!("advancing recurrence of task {}", local.id);
            let advanced = gateway.advance_recurrence(local.id)?;
            local.completed = false;
            local.due_date = advanced.due_date;
            local.due_string = advanced.due_string.clone();
            remote_mirror.due_date = advanced.due_date;
            remote_mirror.due_string = advanced.due_string;
        } else {
            gateway.complete_tasks(&[local.id])?;
            remote_mirror.completed = true;
        }
    } else if !local.completed && remote_mirror.completed {
        gateway.uncomplete_tasks(&[local.id])?;
        remote_mirror.completed = false;
    }

    if !local.same_content(&remote_mirror) {
        let mut updated = gateway.update_task(&local)?;
        updated.dirty = DirtyState::Unmodified;
        store.upsert_task(&updated, None)?;
    } else if local.dirty == DirtyState::Modified {
        // The completion toggle was the only difference; just settle the
        // dirty state.
        local.dirty = DirtyState::Unmodified;
        store.upsert_task(&local, None)?;
    }
    Ok(())
}
