//! Sync orchestrator.
//!
//! Sequences remote fetch, entity and intent updates, and the optional
//! clean passes. Task order matters: entities must exist remotely before the
//! intents that reference them, and force-sync removes remote-only entities
//! before anything is written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parlance_core::config::SyncConfig;
use parlance_core::{Catalog, ItemKind, RemoteItem};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::client::CatalogClient;
use crate::diff::{self, Deletion, IntentWrite};
use crate::error::SyncError;

/// Which clean passes run around the updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete cached intents that are no longer declared locally.
    pub clean: bool,
    /// Make the remote catalog mirror local declarations exactly.
    pub force_sync: bool,
}

impl From<SyncConfig> for SyncOptions {
    fn from(config: SyncConfig) -> Self {
        Self {
            clean: config.clean,
            force_sync: config.clean_force_sync,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTask {
    CleanEntities,
    UpdateEntities,
    UpdateIntents,
    CleanIntents,
}

/// Ordered task list for `options`.
///
/// Without force-sync, `clean` only cleans intents: entities still used by
/// surviving intents must not be deleted speculatively.
pub fn plan_tasks(options: SyncOptions) -> Vec<SyncTask> {
    let mut tasks = vec![SyncTask::UpdateEntities, SyncTask::UpdateIntents];
    if options.force_sync {
        tasks.insert(0, SyncTask::CleanEntities);
        tasks.push(SyncTask::CleanIntents);
    } else if options.clean {
        tasks.push(SyncTask::CleanIntents);
    }
    tasks
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum TaskOutcome {
    /// Payload identical to the cache; no remote call made.
    Skipped,
    /// Nothing to push; the cache was rewritten to match.
    NoUpdateRequired,
    Updated { written: usize, skipped: usize },
    Cleaned { remote: usize, cache_only: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    /// Entity cleanup was rejected once and succeeded on the second attempt.
    SuccessRetry,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub tasks: Vec<(SyncTask, TaskOutcome)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Remote state captured once at the start of a run.
struct Snapshot {
    intents: Vec<RemoteItem>,
    entities: Vec<RemoteItem>,
}

struct Cleanup {
    result: TaskOutcome,
    retried: bool,
}

/// Tally of one pass over a delete list, with each failed deletion kept
/// alongside its error in attempt order.
#[derive(Default)]
struct DeleteBatch {
    removed_remote: usize,
    removed_cache: usize,
    failed: Vec<(Deletion, SyncError)>,
}

/// Drives one catalog towards the local declarations.
///
/// At most one sync may run against a cache directory at a time.
pub struct SyncOrchestrator {
    client: Arc<dyn CatalogClient>,
    cache: CacheStore,
}

impl SyncOrchestrator {
    pub fn new(client: Arc<dyn CatalogClient>, cache: CacheStore) -> Self {
        Self { client, cache }
    }

    /// Run a full sync. The first failing task aborts the rest, except for a
    /// retryable entity-cleanup rejection, whose failed deletions are
    /// attempted once more.
    pub async fn sync(&self, local: &Catalog, options: SyncOptions) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        info!(
            intents = local.intents.len(),
            entities = local.entities.len(),
            clean = options.clean,
            force_sync = options.force_sync,
            "Syncing catalog"
        );
        if options.force_sync {
            info!("Force syncing remote catalog to local declarations");
        }

        let snapshot = self.fetch_snapshot().await?;
        let mut outcome = SyncOutcome::Success;
        let mut results = Vec::new();

        for task in plan_tasks(options) {
            let result = match task {
                SyncTask::UpdateEntities => self.update_entities(local).await?,
                SyncTask::UpdateIntents => self.update_intents(local, &snapshot).await?,
                SyncTask::CleanEntities => {
                    let cleanup = self.clean(ItemKind::Entities, local, &snapshot, options).await?;
                    if cleanup.retried {
                        outcome = SyncOutcome::SuccessRetry;
                    }
                    cleanup.result
                }
                SyncTask::CleanIntents => {
                    self.clean(ItemKind::Intents, local, &snapshot, options)
                        .await?
                        .result
                }
            };
            debug!(?task, ?result, "Sync task finished");
            results.push((task, result));
        }

        let report = SyncReport {
            outcome,
            tasks: results,
            started_at,
            finished_at: Utc::now(),
        };
        info!(outcome = ?report.outcome, "Catalog sync complete");
        Ok(report)
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        let (intents, entities) = tokio::try_join!(
            self.client.list(ItemKind::Intents),
            self.client.list(ItemKind::Entities),
        )?;
        debug!(
            remote_intents = intents.len(),
            remote_entities = entities.len(),
            "Fetched remote snapshot"
        );
        Ok(Snapshot { intents, entities })
    }

    async fn update_entities(&self, local: &Catalog) -> Result<TaskOutcome, SyncError> {
        let entities: Vec<_> = local.entities.iter().cloned().collect();
        let candidate = serde_json::to_value(&entities).map_err(crate::error::CacheError::from)?;
        let matched = self.cache.read_entities()?.as_ref() == Some(&candidate);

        if matched {
            debug!("Entities unchanged, skipping");
            return Ok(TaskOutcome::Skipped);
        }
        if entities.is_empty() {
            self.cache.write_entities(&entities)?;
            return Ok(TaskOutcome::NoUpdateRequired);
        }

        info!(count = entities.len(), "Updating entities");
        self.client.replace_entities(&entities).await?;
        self.cache.write_entities(&entities)?;
        Ok(TaskOutcome::Updated {
            written: 1,
            skipped: 0,
        })
    }

    async fn update_intents(&self, local: &Catalog, snapshot: &Snapshot) -> Result<TaskOutcome, SyncError> {
        let mut written = 0;
        let mut skipped = 0;

        for (intent, write) in diff::plan_intent_writes(&local.intents, &snapshot.intents) {
            let candidate = match &write {
                IntentWrite::Update { id } => intent.with_id(id),
                IntentWrite::Create => intent.clone(),
            };
            let value = serde_json::to_value(&candidate).map_err(crate::error::CacheError::from)?;
            if self.cache.read_intent(&candidate.name)?.as_ref() == Some(&value) {
                debug!(intent = %candidate.name, "Intent unchanged, skipping");
                skipped += 1;
                continue;
            }

            info!(intent = %candidate.name, ?write, "Updating intent");
            match &write {
                IntentWrite::Update { id } => self.client.update_intent(id, &candidate).await?,
                IntentWrite::Create => self.client.create_intent(&candidate).await?,
            }
            self.cache.write_intent(&candidate)?;
            written += 1;
        }

        if written == 0 && skipped > 0 {
            return Ok(TaskOutcome::Skipped);
        }
        Ok(TaskOutcome::Updated { written, skipped })
    }

    /// Every deletion in the batch is attempted; the first failure is
    /// reported once the batch is done. A retryable entity rejection re-sends
    /// only the deletions that failed, since the rest are already gone.
    async fn clean(
        &self,
        kind: ItemKind,
        local: &Catalog,
        snapshot: &Snapshot,
        options: SyncOptions,
    ) -> Result<Cleanup, SyncError> {
        let cached = self.cache.cached_names(kind)?;
        let (targets, remote) = match kind {
            ItemKind::Intents => (
                diff::compute_clean_list(&local.intents, &snapshot.intents, &cached, options.force_sync),
                &snapshot.intents,
            ),
            ItemKind::Entities => (
                diff::compute_clean_list(&local.entities, &snapshot.entities, &cached, options.force_sync),
                &snapshot.entities,
            ),
        };
        let deletions = diff::match_remote(&targets, remote);
        info!(
            %kind,
            count = deletions.len(),
            names = ?deletions.iter().map(Deletion::name).collect::<Vec<_>>(),
            "Cleaning catalog"
        );

        let mut batch = self.delete_batch(kind, deletions).await;
        let mut retried = false;
        let retryable = batch.failed.first().is_some_and(|(_, err)| err.is_retryable());
        if kind == ItemKind::Entities && retryable {
            let failed: Vec<Deletion> = batch.failed.drain(..).map(|(deletion, _)| deletion).collect();
            warn!(
                names = ?failed.iter().map(Deletion::name).collect::<Vec<_>>(),
                "Entity cleanup rejected, retrying failed deletions once"
            );
            let second = self.delete_batch(kind, failed).await;
            batch.removed_remote += second.removed_remote;
            batch.removed_cache += second.removed_cache;
            batch.failed = second.failed;
            retried = true;
        }

        match batch.failed.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(Cleanup {
                result: TaskOutcome::Cleaned {
                    remote: batch.removed_remote,
                    cache_only: batch.removed_cache,
                },
                retried,
            }),
        }
    }

    async fn delete_batch(&self, kind: ItemKind, deletions: Vec<Deletion>) -> DeleteBatch {
        let mut batch = DeleteBatch::default();
        for deletion in deletions {
            match self.delete_one(kind, &deletion).await {
                Ok(()) => match deletion {
                    Deletion::Remote { .. } => batch.removed_remote += 1,
                    Deletion::CacheOnly { .. } => batch.removed_cache += 1,
                },
                Err(err) => {
                    warn!(%kind, name = deletion.name(), error = %err, "Delete failed");
                    batch.failed.push((deletion, err));
                }
            }
        }
        batch
    }

    /// Entities live in one aggregate cache file that the next update
    /// rewrites, so only intent deletions touch the cache.
    async fn delete_one(&self, kind: ItemKind, deletion: &Deletion) -> Result<(), SyncError> {
        match (kind, deletion) {
            (_, Deletion::Remote { name, id }) => {
                self.client.delete(kind, id).await?;
                if kind == ItemKind::Intents {
                    self.cache.delete_intent(name)?;
                }
            }
            (ItemKind::Intents, Deletion::CacheOnly { name }) => self.cache.delete_intent(name)?,
            (ItemKind::Entities, Deletion::CacheOnly { .. }) => {}
        }
        Ok(())
    }
}

/// Compact view of a report for start-up logs.
pub fn report_summary(report: &SyncReport) -> Value {
    serde_json::json!({
        "outcome": report.outcome,
        "tasks": report.tasks.len(),
        "duration_ms": (report.finished_at - report.started_at).num_milliseconds(),
    })
}
