//! The synchronization engine.
//!
//! One pass runs the collections in dependency order — projects, labels,
//! tasks, then notes — so that by the time a collection is reconciled every
//! id it references is already permanent. Local ordering changes and pending
//! cross-project moves are flushed to the server *before* the corresponding
//! remote listing is taken; otherwise the listing would disagree with clean
//! local rows and the reconciler would pull the stale server state back.
//! Any failure aborts the pass where it happened; nothing is rolled back,
//! and the next pass re-derives the remaining work from current state.

pub mod reconcile;
pub mod reorder;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SyncConfig;
use crate::core::entity::{DirtyState, Entity};
use crate::core::id::{is_placeholder, EntityId};
use crate::core::Account;
use crate::error::SyncError;
use crate::remote::RemoteGateway;
use crate::store::LocalStore;

use reconcile::reconcile_collection;

pub use reconcile::{classify, SyncAction};
pub use reorder::{reorder_scope, NO_PREVIOUS_POSITION};

/// Observer for pass progress. Percentages are whole numbers in `0..=100`
/// and never decrease within one pass; the message is a short human-readable
/// description of the current step.
pub trait SyncProgress {
    fn update(&mut self, percent: u8, message: &str);
}

/// Discards progress updates.
pub struct NullProgress;

impl SyncProgress for NullProgress {
    fn update(&mut self, _percent: u8, _message: &str) {}
}

/// How a [`SyncEngine::sync_all`] invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    /// Another pass was already running; nothing was done.
    AlreadyInFlight,
}

/// Clamps the raw band percentages so the observer only ever sees a
/// monotonic sequence.
struct Reporter<'a> {
    sink: &'a mut dyn SyncProgress,
    last: u8,
}

impl Reporter<'_> {
    fn report(&mut self, percent: u8, message: &str) {
        let percent = percent.max(self.last).min(100);
        if percent != self.last {
            self.last = percent;
            self.sink.update(percent, message);
        }
    }
}

/// Truncates an entity name for progress messages.
fn shorten(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

/// Resets the in-flight flag however the pass ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives full bidirectional passes against one remote gateway.
pub struct SyncEngine<R> {
    gateway: R,
    config: SyncConfig,
    in_flight: AtomicBool,
}

impl<R: RemoteGateway> SyncEngine<R> {
    pub fn new(gateway: R, config: SyncConfig) -> Self {
        Self {
            gateway,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gateway(&self) -> &R {
        &self.gateway
    }

    /// Whether a pass is currently running.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs one full pass. A concurrent invocation while a pass is running
    /// is a no-op reported as [`SyncOutcome::AlreadyInFlight`].
    ///
    /// The last-sync timestamp is committed only when the whole pass
    /// succeeds, so an interrupted pass looks like it never ran.
    pub fn sync_all<S: LocalStore>(
        &self,
        store: &mut S,
        account: &Account,
        progress: &mut dyn SyncProgress,
    ) -> Result<SyncOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("sync already in flight, skipping");
            return Ok(SyncOutcome::AlreadyInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);
        let mut reporter = Reporter { sink: progress, last: 0 };

        log::info!("sync pass started");
        reporter.report(5, "syncing projects");

        self.sync_projects(store)?;
        reporter.report(20, "syncing labels");

        self.sync_labels(store)?;
        reporter.report(30, "syncing tasks");

        let note_candidates = self.sync_tasks(store, &mut reporter)?;
        reporter.report(70, "syncing notes");

        if account.is_entitled() {
            self.sync_notes(store, &note_candidates, &mut reporter)?;
        } else {
            log::debug!("account not entitled, skipping note sync");
        }
        reporter.report(100, "done");

        store.set_last_sync_time(chrono::Local::now().naive_local())?;
        log::info!("sync pass completed");
        Ok(SyncOutcome::Completed)
    }

    fn sync_projects<S: LocalStore>(&self, store: &mut S) -> Result<(), SyncError> {
        if store.projects_need_reorder()? {
            let ordered = ordered_ids(store.projects()?.into_iter().map(|p| (p.id, p.position, p.dirty)));
            self.gateway.reorder_projects(&ordered)?;
            store.set_projects_need_reorder(false)?;
        }

        let local: Vec<Entity> = store.projects()?.into_iter().map(Entity::from).collect();
        let remote: Vec<Entity> = self.gateway.projects()?.into_iter().map(Entity::from).collect();
        reconcile_collection(store, &self.gateway, self.config.deletion_policy, local, remote)
    }

    fn sync_labels<S: LocalStore>(&self, store: &mut S) -> Result<(), SyncError> {
        let local: Vec<Entity> = store.labels()?.into_iter().map(Entity::from).collect();
        let remote: Vec<Entity> = self.gateway.labels()?.into_iter().map(Entity::from).collect();
        reconcile_collection(store, &self.gateway, self.config.deletion_policy, local, remote)
    }

    /// Tasks are reconciled project by project. Every pending cross-project
    /// move is flushed up front, so a moved task never shows up under its
    /// old project in any listing taken during this pass.
    ///
    /// Returns the ids of remote tasks that carry notes; the note pass uses
    /// the server-reported counts because local ones may be stale.
    fn sync_tasks<S: LocalStore>(
        &self,
        store: &mut S,
        reporter: &mut Reporter<'_>,
    ) -> Result<HashSet<EntityId>, SyncError> {
        let projects = store.projects()?;
        for project in &projects {
            self.flush_pending_moves(store, project.id)?;
        }

        // Tasks orphaned by a project deletion have no listing left to be
        // reconciled against. Tombstones get their remote delete issued
        // directly; any other orphan is dropped locally, the same way a
        // remote-absent clean row would be.
        let live_projects: HashSet<EntityId> = projects
            .iter()
            .filter(|p| p.dirty != DirtyState::Deleted)
            .map(|p| p.id)
            .collect();
        for task in store.tasks()? {
            if live_projects.contains(&task.project_id) {
                continue;
            }
            if task.dirty == DirtyState::Deleted {
                self.gateway.delete_task(task.id)?;
            }
            store.remove_task(task.id)?;
        }

        let mut note_candidates = HashSet::new();
        let band = projects.len().max(1) as u32;
        for (index, project) in projects.iter().enumerate() {
            if project.dirty == DirtyState::Deleted || is_placeholder(project.id) {
                continue;
            }
            if store.tasks_need_reorder(project.id)? {
                let ordered = ordered_ids(
                    store
                        .tasks_in_project(project.id)?
                        .into_iter()
                        .map(|t| (t.id, t.position, t.dirty)),
                );
                self.gateway.reorder_tasks(project.id, &ordered)?;
                store.set_tasks_need_reorder(project.id, false)?;
            }

            let local: Vec<Entity> = store
                .tasks_in_project(project.id)?
                .into_iter()
                .map(Entity::from)
                .collect();
            let mut remote = self.gateway.active_tasks(project.id)?;
            remote.extend(self.gateway.completed_tasks(project.id)?);
            note_candidates.extend(remote.iter().filter(|t| t.note_count > 0).map(|t| t.id));
            let remote: Vec<Entity> = remote.into_iter().map(Entity::from).collect();
            reconcile_collection(store, &self.gateway, self.config.deletion_policy, local, remote)?;

            reporter.report(
                30 + (40 * (index as u32 + 1) / band) as u8,
                &format!("synced tasks of {}", shorten(project.display_name(), 30)),
            );
        }

        store.refresh_project_task_counts()?;
        store.refresh_label_task_counts()?;
        Ok(note_candidates)
    }

    fn flush_pending_moves<S: LocalStore>(
        &self,
        store: &mut S,
        to_project: EntityId,
    ) -> Result<(), SyncError> {
        let pending = store.pending_moves_into(to_project)?;
        if pending.is_empty() {
            return Ok(());
        }
        // One call per source project.
        let mut sources: Vec<EntityId> = pending.iter().map(|p| p.from_project).collect();
        sources.sort_unstable();
        sources.dedup();
        for from_project in sources {
            let ids: Vec<EntityId> = pending
                .iter()
                .filter(|p| p.from_project == from_project)
                .map(|p| p.task_id)
                .collect();
            log::info!("moving {} task(s) from {from_project} to {to_project}", ids.len());
            self.gateway.move_tasks(&ids, from_project, to_project)?;
        }
        store.clear_pending_moves_into(to_project)?;
        Ok(())
    }

    /// Notes are reconciled task by task, skipping tasks that provably have
    /// no notes on either side. Completed tasks get no remote listing; their
    /// own notes stand in for it, so tombstones and edits still flush.
    fn sync_notes<S: LocalStore>(
        &self,
        store: &mut S,
        remote_with_notes: &HashSet<EntityId>,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), SyncError> {
        // Same orphan rule as tasks: a tombstoned note whose task is gone
        // gets its remote delete issued directly. A clean note orphaned by a
        // remote task deletion is simply dropped.
        let live_tasks: HashSet<EntityId> = store.tasks()?.iter().map(|t| t.id).collect();
        for note in store.notes()? {
            if live_tasks.contains(&note.task_id) {
                continue;
            }
            if note.dirty == DirtyState::Deleted {
                self.gateway.delete_note(note.id)?;
            }
            store.remove_note(note.id)?;
        }

        let tasks = store.tasks()?;
        let band = tasks.len().max(1) as u32;
        for (index, task) in tasks.iter().enumerate() {
            if task.dirty == DirtyState::Deleted {
                continue;
            }
            let local_notes = store.notes_for_task(task.id)?;
            let remote: Vec<Entity> = if task.completed {
                if local_notes.iter().all(|n| n.dirty == DirtyState::Unmodified) {
                    continue;
                }
                local_notes
                    .iter()
                    .filter(|n| n.dirty != DirtyState::Added)
                    .map(|n| {
                        let mut mirror = n.clone();
                        mirror.dirty = DirtyState::Unmodified;
                        Entity::Note(mirror)
                    })
                    .collect()
            } else {
                if local_notes.is_empty() && !remote_with_notes.contains(&task.id) {
                    continue;
                }
                self.gateway
                    .notes_for_task(task.id)?
                    .into_iter()
                    .map(Entity::from)
                    .collect()
            };
            let local: Vec<Entity> = local_notes.into_iter().map(Entity::from).collect();
            reconcile_collection(store, &self.gateway, self.config.deletion_policy, local, remote)?;

            reporter.report(
                70 + (30 * (index as u32 + 1) / band) as u8,
                &format!("synced notes of {}", shorten(&task.content, 30)),
            );
        }
        store.refresh_note_counts()?;
        Ok(())
    }
}

/// Ids of the live rows in position order, the shape reorder calls expect.
/// Placeholder ids are left out; the server learns about those rows when
/// they are pushed, position included.
fn ordered_ids<I>(rows: I) -> Vec<EntityId>
where
    I: Iterator<Item = (EntityId, i32, DirtyState)>,
{
    let mut rows: Vec<_> = rows
        .filter(|&(id, _, dirty)| dirty != DirtyState::Deleted && !is_placeholder(id))
        .collect();
    rows.sort_by_key(|&(_, position, _)| position);
    rows.into_iter().map(|(id, _, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Note, Project, Task};
    use crate::remote::mock::MockGateway;
    use crate::store::{MemoryStore, PendingMove};
    use chrono::Duration;

    struct Recorded(Vec<u8>);

    impl SyncProgress for Recorded {
        fn update(&mut self, percent: u8, _message: &str) {
            self.0.push(percent);
        }
    }

    fn entitled_account() -> Account {
        let mut account = Account::new(1, "me@example.com");
        account.entitled_until = Some(chrono::Local::now().naive_local() + Duration::days(30));
        account
    }

    fn engine(gateway: MockGateway) -> SyncEngine<MockGateway> {
        SyncEngine::new(gateway, SyncConfig::default())
    }

    #[test]
    fn full_pass_runs_collections_in_dependency_order() {
        let gateway = MockGateway::new();
        let mut project = Project::new("Home");
        project.id = 1;
        gateway.seed_project(project);
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        task.note_count = 1;
        gateway.seed_task(task);
        let mut note = Note::new(10, "under the rug too");
        note.id = 20;
        gateway.seed_note(note);

        let engine = engine(gateway);
        let mut store = MemoryStore::new();
        let outcome = engine
            .sync_all(&mut store, &entitled_account(), &mut NullProgress)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Completed);

        let calls = engine.gateway.calls();
        let first = |op: &str| calls.iter().position(|c| c.starts_with(op)).unwrap();
        assert!(first("projects") < first("labels"));
        assert!(first("labels") < first("active_tasks"));
        assert!(first("active_tasks") < first("notes_for_task"));

        // Everything was pulled and the pass was committed.
        assert_eq!(store.projects().unwrap().len(), 1);
        assert_eq!(store.tasks().unwrap().len(), 1);
        assert_eq!(store.notes().unwrap().len(), 1);
        assert!(store.last_sync_time().unwrap().is_some());
    }

    #[test]
    fn concurrent_invocation_is_a_silent_noop() {
        let engine = engine(MockGateway::new());
        engine.in_flight.store(true, Ordering::SeqCst);

        let mut store = MemoryStore::new();
        let outcome = engine
            .sync_all(&mut store, &entitled_account(), &mut NullProgress)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadyInFlight);
        assert!(engine.gateway.calls().is_empty());
        assert!(store.last_sync_time().unwrap().is_none());
    }

    #[test]
    fn failed_pass_leaves_no_timestamp_and_releases_the_guard() {
        let gateway = MockGateway::new();
        gateway.fail_on("labels");
        let engine = engine(gateway);
        let mut store = MemoryStore::new();

        let err = engine
            .sync_all(&mut store, &entitled_account(), &mut NullProgress)
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
        assert!(store.last_sync_time().unwrap().is_none());
        assert!(!engine.in_flight.load(Ordering::SeqCst));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one_hundred() {
        let gateway = MockGateway::new();
        for i in 1..=3 {
            let mut p = Project::new(format!("P{i}"));
            p.id = i;
            p.position = i as i32;
            gateway.seed_project(p);
        }
        let engine = engine(gateway);
        let mut store = MemoryStore::new();
        let mut progress = Recorded(Vec::new());

        engine.sync_all(&mut store, &entitled_account(), &mut progress).unwrap();

        assert!(progress.0.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.0.first(), Some(&5));
        assert_eq!(progress.0.last(), Some(&100));
    }

    #[test]
    fn base_account_skips_the_note_pass() {
        let gateway = MockGateway::new();
        let mut project = Project::new("Home");
        project.id = 1;
        gateway.seed_project(project);
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        task.note_count = 3;
        gateway.seed_task(task);

        let engine = engine(gateway);
        let mut store = MemoryStore::new();
        engine
            .sync_all(&mut store, &Account::new(1, "me@example.com"), &mut NullProgress)
            .unwrap();

        assert_eq!(engine.gateway.call_count("notes_for_task"), 0);
        assert!(store.last_sync_time().unwrap().is_some());
    }

    #[test]
    fn pending_move_is_flushed_before_any_task_listing() {
        let gateway = MockGateway::new();
        for id in [1, 2] {
            let mut p = Project::new(format!("P{id}"));
            p.id = id;
            p.position = id as i32;
            gateway.seed_project(p);
        }
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        gateway.seed_task(task.clone());

        let mut store = MemoryStore::new();
        task.project_id = 2;
        store.upsert_task(&task, None).unwrap();
        store
            .record_pending_move(PendingMove { task_id: 10, from_project: 1, to_project: 2 })
            .unwrap();

        let engine = engine(gateway);
        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();

        let calls = engine.gateway.calls();
        let move_at = calls.iter().position(|c| c.starts_with("move_tasks")).unwrap();
        let listing_at = calls.iter().position(|c| c.starts_with("active_tasks")).unwrap();
        assert!(move_at < listing_at);
        assert_eq!(engine.gateway.remote_task(10).unwrap().project_id, 2);
        assert!(store.pending_moves_into(2).unwrap().is_empty());
        // The moved task matches the post-move listing, so no push follows.
        assert_eq!(engine.gateway.call_count("update_task"), 0);
        assert_eq!(store.task(10).unwrap().unwrap().project_id, 2);
    }

    #[test]
    fn reorder_flag_is_consumed_before_the_listing() {
        let gateway = MockGateway::new();
        for id in [1, 2, 3] {
            let mut p = Project::new(format!("P{id}"));
            p.id = id;
            p.position = id as i32;
            gateway.seed_project(p);
        }
        let engine = engine(gateway);

        let mut store = MemoryStore::new();
        for id in [1, 2, 3] {
            let mut p = Project::new(format!("P{id}"));
            // Local order is reversed.
            p.id = id;
            p.position = 4 - id as i32;
            store.upsert_project(&p, None).unwrap();
        }
        store.set_projects_need_reorder(true).unwrap();

        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();

        let calls = engine.gateway.calls();
        assert_eq!(engine.gateway.call_count("reorder_projects"), 1);
        let reorder_at = calls.iter().position(|c| c.starts_with("reorder_projects")).unwrap();
        let listing_at = calls.iter().position(|c| c.starts_with("projects")).unwrap();
        assert!(reorder_at < listing_at);
        assert!(calls.contains(&"reorder_projects([3, 2, 1])".to_string()));
        assert!(!store.projects_need_reorder().unwrap());
        // The server adopted the local order, so nothing gets pulled back.
        assert_eq!(engine.gateway.call_count("update_project"), 0);
        assert_eq!(store.project(3).unwrap().unwrap().position, 1);
    }

    #[test]
    fn clean_noteless_tasks_skip_the_note_listing() {
        let gateway = MockGateway::new();
        let mut project = Project::new("Home");
        project.id = 1;
        gateway.seed_project(project);
        let mut with_notes = Task::new(1, "sweep");
        with_notes.id = 10;
        with_notes.note_count = 1;
        gateway.seed_task(with_notes);
        let mut without = Task::new(1, "dust");
        without.id = 11;
        gateway.seed_task(without);

        let engine = engine(gateway);
        let mut store = MemoryStore::new();
        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();

        assert_eq!(engine.gateway.call_count("notes_for_task"), 1);
        assert!(engine.gateway.calls().contains(&"notes_for_task(10)".to_string()));
    }

    #[test]
    fn clean_task_orphaned_by_a_remote_project_delete_is_dropped() {
        let gateway = MockGateway::new();
        let mut store = MemoryStore::new();
        let mut project = Project::new("Home");
        project.id = 1;
        store.upsert_project(&project, None).unwrap();
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        store.upsert_task(&task, None).unwrap();

        // The server knows neither the project nor the task.
        let engine = engine(gateway);
        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();

        assert!(store.project(1).unwrap().is_none());
        assert!(store.task(10).unwrap().is_none());
        // Nothing was ever on the server, so nothing is deleted there.
        assert_eq!(engine.gateway.call_count("delete_task"), 0);
    }

    #[test]
    fn deleted_note_under_a_completed_task_is_flushed() {
        let gateway = MockGateway::new();
        let mut project = Project::new("Home");
        project.id = 1;
        gateway.seed_project(project.clone());
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        task.completed = true;
        gateway.seed_task(task.clone());
        let mut note = Note::new(10, "obsolete");
        note.id = 20;
        gateway.seed_note(note.clone());

        let mut store = MemoryStore::new();
        store.upsert_project(&project, None).unwrap();
        store.upsert_task(&task, None).unwrap();
        note.dirty = DirtyState::Deleted;
        store.upsert_note(&note, None).unwrap();

        let engine = engine(gateway);
        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();

        assert_eq!(engine.gateway.call_count("delete_note"), 1);
        assert!(store.note(20).unwrap().is_none());
        // Completed tasks never get a remote note listing.
        assert_eq!(engine.gateway.call_count("notes_for_task"), 0);
    }

    #[test]
    fn second_pass_issues_no_mutations() {
        let gateway = MockGateway::new();
        let mut project = Project::new("Home");
        project.id = 1;
        gateway.seed_project(project);
        let mut task = Task::new(1, "sweep");
        task.id = 10;
        gateway.seed_task(task);

        let engine = engine(gateway);
        let mut store = MemoryStore::new();
        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();
        let before = engine.gateway.calls().len();

        engine.sync_all(&mut store, &entitled_account(), &mut NullProgress).unwrap();
        let mutating = engine.gateway.calls()[before..]
            .iter()
            .filter(|c| {
                !c.starts_with("projects")
                    && !c.starts_with("labels")
                    && !c.starts_with("active_tasks")
                    && !c.starts_with("completed_tasks")
                    && !c.starts_with("notes_for_task")
            })
            .count();
        assert_eq!(mutating, 0);
    }
}
