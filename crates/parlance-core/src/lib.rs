pub mod catalog;
pub mod config;
pub mod error;
pub mod intent;
pub mod registry;
pub mod types;

pub use catalog::Catalog;
pub use config::ParlanceConfig;
pub use error::{ParlanceError, RegistrationError, Result};
pub use intent::IntentConfig;
pub use registry::{Named, Registry};
pub use types::*;
