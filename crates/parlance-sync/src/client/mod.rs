//! Remote catalog client contract and its HTTP implementation.

mod http;

pub use http::HttpCatalogClient;

use async_trait::async_trait;
use parlance_core::{EntityDefinition, IntentDefinition, ItemKind, RemoteItem};

use crate::error::CatalogError;

/// Operations the sync engine needs from the remote NLU catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Every item of `kind` currently stored remotely.
    async fn list(&self, kind: ItemKind) -> Result<Vec<RemoteItem>, CatalogError>;

    async fn create_intent(&self, intent: &IntentDefinition) -> Result<(), CatalogError>;

    async fn update_intent(&self, id: &str, intent: &IntentDefinition) -> Result<(), CatalogError>;

    /// Replace the full remote entity collection.
    async fn replace_entities(&self, entities: &[EntityDefinition]) -> Result<(), CatalogError>;

    async fn delete(&self, kind: ItemKind, id: &str) -> Result<(), CatalogError>;
}
