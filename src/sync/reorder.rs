//! Dense list reordering.
//!
//! Positions within a scope are one-based and must stay dense (`1..=N`, no
//! gaps, no duplicates) across inserts, moves and deletes. The mutated
//! entity is persisted with its requested position first; this pass then
//! resolves the collision it may have caused and compacts the rest.

use std::cmp::Ordering;

use crate::core::entity::{DirtyState, Scope};
use crate::core::id::EntityId;
use crate::error::StoreError;
use crate::store::LocalStore;

/// Sentinel for "the entity had no position before" — inserts, and moves
/// into a new scope, land before the existing occupant of their position,
/// pushing it and its followers down.
pub const NO_PREVIOUS_POSITION: i32 = i32::MAX;

/// Restores dense ordering in `scope` after `moved_id` was inserted, moved
/// or deleted.
///
/// Tie-break: an entity moved *up* (new position < old) lands before the
/// current occupant of that position, one moved *down* lands after it.
/// That reproduces insert semantics rather than swap semantics.
///
/// Only entities whose computed position differs from their stored one are
/// persisted, without touching their dirty state; any such change raises the
/// scope's "needs remote reorder" flag for the next sync pass to consume.
pub fn reorder_scope<S: LocalStore>(
    store: &mut S,
    scope: Scope,
    moved_id: EntityId,
    previous_position: i32,
) -> Result<(), StoreError> {
    match scope {
        Scope::Projects => {
            let mut rows: Vec<_> = store
                .projects()?
                .into_iter()
                .filter(|p| p.dirty != DirtyState::Deleted)
                .collect();
            let new_position = rows
                .iter()
                .find(|p| p.id == moved_id)
                .map(|p| p.position)
                .unwrap_or(previous_position);
            sort_for_insert(&mut rows, moved_id, new_position < previous_position, |p| {
                (p.id, p.position)
            });

            let mut changed = false;
            for (index, row) in rows.iter_mut().enumerate() {
                let want = index as i32 + 1;
                if row.position != want {
                    row.position = want;
                    store.upsert_project(row, None)?;
                    changed = true;
                }
            }
            if changed {
                store.set_projects_need_reorder(true)?;
            }
        }
        Scope::Tasks { project_id } => {
            let mut rows: Vec<_> = store
                .tasks_in_project(project_id)?
                .into_iter()
                .filter(|t| t.dirty != DirtyState::Deleted)
                .collect();
            let new_position = rows
                .iter()
                .find(|t| t.id == moved_id)
                .map(|t| t.position)
                .unwrap_or(previous_position);
            sort_for_insert(&mut rows, moved_id, new_position < previous_position, |t| {
                (t.id, t.position)
            });

            let mut changed = false;
            for (index, row) in rows.iter_mut().enumerate() {
                let want = index as i32 + 1;
                if row.position != want {
                    row.position = want;
                    store.upsert_task(row, None)?;
                    changed = true;
                }
            }
            if changed {
                store.set_tasks_need_reorder(project_id, true)?;
            }
        }
    }
    Ok(())
}

/// Stable sort by position; on a position tie involving the moved entity the
/// `place_before` flag decides which side of the occupant it lands on.
fn sort_for_insert<T>(
    rows: &mut [T],
    moved_id: EntityId,
    place_before: bool,
    key: impl Fn(&T) -> (EntityId, i32),
) {
    rows.sort_by(|a, b| {
        let (a_id, a_pos) = key(a);
        let (b_id, b_pos) = key(b);
        match a_pos.cmp(&b_pos) {
            Ordering::Equal if a_id == moved_id => {
                if place_before {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            Ordering::Equal if b_id == moved_id => {
                if place_before {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            other => other,
        }
    });
}
