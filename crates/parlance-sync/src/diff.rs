//! Pure comparisons between local declarations, the remote snapshot, and the
//! cache. Nothing here performs I/O.

use std::collections::HashSet;

use parlance_core::{CleanTarget, IntentDefinition, Named, Registry, RemoteItem};

/// Items to delete remotely and/or from the cache.
///
/// Cached names with no local declaration come first. With `force_sync`,
/// remote items with no local declaration follow. Names are unique; the
/// first occurrence wins, so a name found in both places stays cache-origin.
pub fn compute_clean_list<T: Named>(
    local: &Registry<T>,
    remote: &[RemoteItem],
    cached: &[String],
    force_sync: bool,
) -> Vec<CleanTarget> {
    let cache_drift = cached
        .iter()
        .filter(|name| !local.contains(name))
        .map(|name| CleanTarget::cached(name.as_str()));

    let remote_drift = remote
        .iter()
        .filter(|_| force_sync)
        .filter(|item| !local.contains(&item.name))
        .map(|item| CleanTarget::remote(item.name.as_str(), item.id.as_str()));

    let mut seen = HashSet::new();
    cache_drift
        .chain(remote_drift)
        .filter(|target| seen.insert(target.name.clone()))
        .collect()
}

/// How one local intent reaches the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentWrite {
    Create,
    Update { id: String },
}

/// Create-vs-update decision for every local intent, in registration order.
pub fn plan_intent_writes<'a>(
    local: &'a Registry<IntentDefinition>,
    remote: &[RemoteItem],
) -> Vec<(&'a IntentDefinition, IntentWrite)> {
    local
        .iter()
        .map(|intent| {
            let write = match find_remote(remote, &intent.name) {
                Some(item) => IntentWrite::Update {
                    id: item.id.clone(),
                },
                None => IntentWrite::Create,
            };
            (intent, write)
        })
        .collect()
}

/// A clean target resolved against the remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Present remotely: delete by remote id, then drop any cache entry.
    Remote { name: String, id: String },
    /// Unknown to the catalog: only the cache entry goes.
    CacheOnly { name: String },
}

impl Deletion {
    pub fn name(&self) -> &str {
        match self {
            Deletion::Remote { name, .. } | Deletion::CacheOnly { name } => name,
        }
    }
}

pub fn match_remote(targets: &[CleanTarget], remote: &[RemoteItem]) -> Vec<Deletion> {
    targets
        .iter()
        .map(|target| match find_remote(remote, &target.name) {
            Some(item) => Deletion::Remote {
                name: item.name.clone(),
                id: item.id.clone(),
            },
            None => Deletion::CacheOnly {
                name: target.name.clone(),
            },
        })
        .collect()
}

fn find_remote<'a>(remote: &'a [RemoteItem], name: &str) -> Option<&'a RemoteItem> {
    remote.iter().find(|item| item.name == name)
}
