use tracing::debug;

use crate::error::RegistrationError;
use crate::intent::IntentConfig;
use crate::registry::Registry;
use crate::types::{EntityDefinition, EntityOptions, IntentDefinition, TermEntry};

/// Local declarations: the desired state pushed to the remote catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub intents: Registry<IntentDefinition>,
    pub entities: Registry<EntityDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register an intent payload. The first registration of a
    /// key wins.
    pub fn register_intent(
        &mut self,
        key: &str,
        config: &IntentConfig,
    ) -> Result<&IntentDefinition, RegistrationError> {
        if self.intents.contains(key) {
            return Err(RegistrationError::DuplicateIntent(key.to_string()));
        }
        let intent = IntentDefinition::configure(key, config)?;
        self.intents
            .insert(intent)
            .map_err(|rejected| RegistrationError::DuplicateIntent(rejected.name))?;
        debug!(intent = key, "Intent registered");
        self.intents
            .get(key)
            .ok_or_else(|| RegistrationError::DuplicateIntent(key.to_string()))
    }

    pub fn register_entity(
        &mut self,
        key: &str,
        entries: Vec<TermEntry>,
        options: EntityOptions,
    ) -> Result<(), RegistrationError> {
        if key.is_empty() {
            return Err(RegistrationError::MissingEntityKey);
        }
        self.entities
            .insert(EntityDefinition::new(key, entries, options))
            .map_err(|rejected| RegistrationError::DuplicateEntity(rejected.name))?;
        debug!(entity = key, "Entity registered");
        Ok(())
    }
}
