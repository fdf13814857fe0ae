use thiserror::Error;

/// Top-level error type for Parlance.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ParlanceError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParlanceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ParlanceError {
    fn from(err: toml::de::Error) -> Self {
        ParlanceError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ParlanceError {
    fn from(err: toml::ser::Error) -> Self {
        ParlanceError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ParlanceError {
    fn from(err: serde_json::Error) -> Self {
        ParlanceError::Serialization(err.to_string())
    }
}

/// Configuration mistakes made while declaring intents, entities, and
/// action groups. Always raised at startup, never recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("An intent key must be specified")]
    MissingIntentKey,
    #[error("Intent with key already exists: {0}")]
    DuplicateIntent(String),
    #[error("Intent key may not contain a path separator: {0}")]
    InvalidIntentKey(String),
    #[error("Entity key must be a non-empty string")]
    MissingEntityKey,
    #[error("Entity with key already exists: {0}")]
    DuplicateEntity(String),
    #[error("Action group exists with key: {0}")]
    DuplicateActionGroup(String),
    #[error("Invalid userSays template in intent {intent}: {template}")]
    InvalidTemplate { intent: String, template: String },
}

/// A specialized `Result` type for Parlance operations.
pub type Result<T> = std::result::Result<T, ParlanceError>;
