//! Reconciliation of local intent and entity declarations with a remote
//! NLU catalog.
//!
//! The [`SyncOrchestrator`] fetches the remote snapshot, diffs it against the
//! local [`Catalog`](parlance_core::Catalog) and the on-disk [`CacheStore`],
//! then issues the minimal set of remote writes and deletes.

pub mod cache;
pub mod client;
pub mod diff;
pub mod error;
pub mod orchestrator;

pub use cache::CacheStore;
pub use client::{CatalogClient, HttpCatalogClient};
pub use error::{CacheError, CatalogError, SyncError};
pub use orchestrator::{
    SyncOptions, SyncOrchestrator, SyncOutcome, SyncReport, SyncTask, TaskOutcome,
};
