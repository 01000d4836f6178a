//! Offline-first sync engine for a personal task-management client.
//!
//! The crate keeps a local cache of projects, tasks, labels, notes and saved
//! queries reconciled against an authoritative remote service. Local edits are
//! tracked per entity as a dirty state; a sync pass classifies every
//! local/remote id pairing into exactly one action, pushes or pulls as needed,
//! remaps placeholder ids once the server assigns permanent ones, and keeps
//! user-visible list ordering dense.
//!
//! The wire transport ([`remote::RemoteGateway`]) and the persistence engine
//! ([`store::LocalStore`]) are collaborator traits; this crate defines their
//! contracts and ships an in-memory store for tests and prototyping.

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod remote;
pub mod store;
pub mod sync;

pub use client::Client;
pub use config::{DeletionPolicy, SyncConfig};
pub use error::{RejectReason, StoreError, SyncError};
pub use sync::{SyncEngine, SyncOutcome, SyncProgress};
