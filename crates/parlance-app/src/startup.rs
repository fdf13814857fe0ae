//! Application start sequence: optionally push the catalog, then freeze
//! registration. A failed push is logged and never keeps the webhook down.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parlance_core::config::CatalogConfig;
use parlance_core::ParlanceConfig;
use parlance_dialog::Assistant;
use parlance_sync::{CacheStore, CatalogClient, HttpCatalogClient, SyncOptions, SyncOrchestrator};

/// Cache subdirectory used for the api.ai catalog.
const CACHE_DIR: &str = "api_ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// Started without syncing.
    Success,
    NoCachePathSpecified,
    NoTokenSpecified,
    UpdateSuccess,
    UpdateFail,
}

impl StartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartStatus::Success => "SUCCESS",
            StartStatus::NoCachePathSpecified => "NO_CACHE_PATH_SPECIFIED",
            StartStatus::NoTokenSpecified => "NO_TOKEN_SPECIFIED",
            StartStatus::UpdateSuccess => "UPDATE_SUCCESS",
            StartStatus::UpdateFail => "UPDATE_FAIL",
        }
    }
}

impl fmt::Display for StartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start against the HTTP catalog named in `config`.
pub async fn start(assistant: &mut Assistant, config: &ParlanceConfig) -> StartStatus {
    start_with(assistant, config, |catalog: &CatalogConfig, token: &str| {
        Arc::new(HttpCatalogClient::new(catalog.base_url.clone(), token)) as Arc<dyn CatalogClient>
    })
    .await
}

/// Start with a caller-provided catalog client factory.
pub async fn start_with<F>(assistant: &mut Assistant, config: &ParlanceConfig, make_client: F) -> StartStatus
where
    F: FnOnce(&CatalogConfig, &str) -> Arc<dyn CatalogClient>,
{
    assistant.mark_started();

    if !config.sync.update {
        return StartStatus::Success;
    }
    let Some(cache_path) = config.cache.path.as_deref() else {
        tracing::error!("A cache path must be set to update the catalog");
        return StartStatus::NoCachePathSpecified;
    };
    let Some(token) = config.catalog.token.as_deref() else {
        tracing::error!("A catalog token must be set to update the catalog");
        return StartStatus::NoTokenSpecified;
    };

    tracing::info!(base_url = %config.catalog.base_url, "Updating catalog...");
    let cache = CacheStore::new(Path::new(cache_path).join(CACHE_DIR));
    let orchestrator = SyncOrchestrator::new(make_client(&config.catalog, token), cache);

    match orchestrator
        .sync(assistant.catalog(), SyncOptions::from(config.sync))
        .await
    {
        Ok(report) => {
            tracing::info!(
                summary = %parlance_sync::orchestrator::report_summary(&report),
                "Catalog updated successfully"
            );
            StartStatus::UpdateSuccess
        }
        Err(e) => {
            tracing::error!(error = %e, "Error updating catalog");
            StartStatus::UpdateFail
        }
    }
}
