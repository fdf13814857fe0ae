//! File-backed snapshot of what was last pushed to the remote catalog.
//!
//! Layout under the cache root:
//! - `intents/<name>.json`, one file per intent payload
//! - `entities.json`, the full entity array as last replaced remotely
//!
//! A missing cache is an empty cache. Unparseable files read as absent so
//! that the next sync overwrites them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parlance_core::{EntityDefinition, IntentDefinition, ItemKind};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CacheError;

const INTENTS_DIR: &str = "intents";
const ENTITIES_FILE: &str = "entities.json";

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `None` for names that would leave the intents directory.
    fn intent_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.root.join(INTENTS_DIR).join(format!("{}.json", name)))
    }

    fn entities_path(&self) -> PathBuf {
        self.root.join(ENTITIES_FILE)
    }

    /// Names of every cached item of `kind`.
    pub fn cached_names(&self, kind: ItemKind) -> Result<Vec<String>, CacheError> {
        match kind {
            ItemKind::Intents => self.cached_intent_names(),
            ItemKind::Entities => self.cached_entity_names(),
        }
    }

    fn cached_intent_names(&self) -> Result<Vec<String>, CacheError> {
        let dir = self.root.join(INTENTS_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))? {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn cached_entity_names(&self) -> Result<Vec<String>, CacheError> {
        let names = match self.read_entities()? {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Ok(names)
    }

    /// Cached payload for intent `name`, if present and readable.
    pub fn read_intent(&self, name: &str) -> Result<Option<Value>, CacheError> {
        match self.intent_path(name) {
            Some(path) => read_json(&path),
            None => Ok(None),
        }
    }

    /// Cached entity array, if present and readable.
    pub fn read_entities(&self) -> Result<Option<Value>, CacheError> {
        read_json(&self.entities_path())
    }

    pub fn write_intent(&self, intent: &IntentDefinition) -> Result<(), CacheError> {
        let path = self
            .intent_path(&intent.name)
            .ok_or_else(|| CacheError::InvalidName(intent.name.clone()))?;
        write_json(&path, intent)
    }

    pub fn write_entities(&self, entities: &[EntityDefinition]) -> Result<(), CacheError> {
        write_json(&self.entities_path(), &entities)
    }

    /// Remove the cached payload for intent `name`. Missing files are fine,
    /// as are remote names that could never have been cached.
    pub fn delete_intent(&self, name: &str) -> Result<(), CacheError> {
        let Some(path) = self.intent_path(name) else {
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(intent = name, "Removed intent from cache");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

fn read_json(path: &Path) -> Result<Option<Value>, CacheError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let content = serde_json::to_string(value)?;
    std::fs::write(path, content).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}
