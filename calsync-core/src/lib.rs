//! Core of calsync: recurring-event expansion and two-way synchronization
//! between a displayed event list and a remote document store.
//!
//! - `event` holds the template/occurrence model and lenient date coercion
//! - `recurrence` expands a template into occurrences up to a `Horizon`
//! - `store` is the remote store boundary (plus an in-memory store)
//! - `sync` owns the local cache and implements load and commit

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod horizon;
pub mod recurrence;
pub mod store;
pub mod sync;

pub use cache::EventCache;
pub use error::{SyncError, SyncResult};
pub use event::*;
pub use horizon::Horizon;
pub use store::{EventStore, MemoryStore};
pub use sync::{
    ChangeSet, CommitReport, LoadReport, Operation, SyncFailure, SyncOptions, Synchronizer,
};
