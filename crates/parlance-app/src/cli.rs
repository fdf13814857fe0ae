//! CLI argument definitions for the Parlance binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use parlance_core::config::SyncConfig;
use parlance_core::ParlanceConfig;
use std::path::PathBuf;

/// Parlance: serve a voice assistant webhook and keep its NLU catalog in sync.
#[derive(Parser, Debug, Default)]
#[command(name = "parlance", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Webhook server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory for the catalog sync cache.
    #[arg(long = "cache-path")]
    pub cache_path: Option<PathBuf>,

    /// Push intents and entities to the catalog on start.
    #[arg(long = "update")]
    pub update: bool,

    /// Delete cached intents no longer declared locally.
    #[arg(long = "clean")]
    pub clean: bool,

    /// Make the catalog mirror the local declarations exactly.
    #[arg(long = "force-sync")]
    pub force_sync: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Priority: --config flag > PARLANCE_CONFIG env var > ./parlance.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLANCE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("parlance.toml")
    }

    /// Priority: --port flag > PARLANCE_PORT env var > config file value > 3000.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("PARLANCE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        3000
    }

    pub fn resolve_cache_path(&self, config_path: Option<&str>) -> Option<String> {
        self.cache_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| config_path.map(str::to_string))
    }

    /// Priority: PARLANCE_CATALOG_TOKEN env var > config file value.
    pub fn resolve_token(&self, config_token: Option<&str>) -> Option<String> {
        std::env::var("PARLANCE_CATALOG_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| config_token.map(str::to_string))
    }

    /// Flags can only switch sync modes on.
    pub fn resolve_sync(&self, config: SyncConfig) -> SyncConfig {
        SyncConfig {
            update: config.update || self.update,
            clean: config.clean || self.clean,
            clean_force_sync: config.clean_force_sync || self.force_sync,
        }
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Fold every override into `config`.
    pub fn apply(&self, config: &mut ParlanceConfig) {
        config.server.port = self.resolve_port(config.server.port);
        config.cache.path = self.resolve_cache_path(config.cache.path.as_deref());
        config.catalog.token = self.resolve_token(config.catalog.token.as_deref());
        config.sync = self.resolve_sync(config.sync);
        if let Some(level) = self.resolve_log_level() {
            config.general.log_level = level;
        }
    }
}
