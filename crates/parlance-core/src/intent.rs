//! Intent declarations and their compilation into catalog payloads.
//!
//! Training phrases are written with inline placeholders such as
//! `"book a table for @{sys.number:two}"`. Each placeholder becomes an
//! annotated `userSays` part and, the first time an entity is seen, a
//! response parameter bound to `$<name>`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::RegistrationError;
use crate::types::{
    AffectedContext, IntentDefinition, IntentResponse, ResponseParameter, UserSays, UserSaysPart,
};

pub const DEFAULT_PRIORITY: u32 = 500_000;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@\{([^}]*)\}").expect("Invalid placeholder regex"))
}

/// Declarative options for an intent. Anything left unset takes the
/// catalog defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentConfig {
    pub user_says: Vec<String>,
    pub contexts: Vec<String>,
    pub affected_contexts: Vec<AffectedContext>,
    pub fallback_intent: bool,
    pub priority: Option<u32>,
    pub auto: Option<bool>,
    pub reset_contexts: bool,
    pub webhook_used: Option<bool>,
    pub webhook_for_slot_filling: Option<bool>,
}

impl IntentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_says<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_says = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts = contexts.into_iter().map(Into::into).collect();
        self
    }

    pub fn affected_context(mut self, name: impl Into<String>, lifespan: u32) -> Self {
        self.affected_contexts.push(AffectedContext {
            name: name.into(),
            lifespan: Some(lifespan),
        });
        self
    }

    pub fn fallback(mut self) -> Self {
        self.fallback_intent = true;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn reset_contexts(mut self) -> Self {
        self.reset_contexts = true;
        self
    }
}

impl IntentDefinition {
    /// Build the catalog payload for intent `key`.
    ///
    /// `id` and `name` both start out as the key; the single response's
    /// action is the key so that webhook calls route back to the handler.
    pub fn configure(key: &str, config: &IntentConfig) -> Result<Self, RegistrationError> {
        if key.is_empty() {
            return Err(RegistrationError::MissingIntentKey);
        }
        // The key doubles as the cache file name.
        if key.contains(['/', '\\']) {
            return Err(RegistrationError::InvalidIntentKey(key.to_string()));
        }

        let mut parameters = Vec::new();
        let mut user_says = Vec::with_capacity(config.user_says.len());
        for template in &config.user_says {
            user_says.push(compile_user_says(key, template, &mut parameters)?);
        }

        let response = IntentResponse {
            reset_contexts: config.reset_contexts,
            action: key.to_string(),
            parameters,
            affected_contexts: config.affected_contexts.clone(),
        };

        Ok(Self {
            id: key.to_string(),
            name: key.to_string(),
            auto: config.auto.unwrap_or(true),
            responses: vec![response],
            contexts: config.contexts.clone(),
            affected_contexts: config.affected_contexts.clone(),
            user_says,
            webhook_used: config.webhook_used.unwrap_or(true),
            webhook_for_slot_filling: config.webhook_for_slot_filling.unwrap_or(true),
            fallback_intent: config.fallback_intent,
            priority: config.priority.unwrap_or(DEFAULT_PRIORITY),
        })
    }
}

/// Compile one training phrase. New entities are appended to `parameters`.
pub fn compile_user_says(
    intent: &str,
    template: &str,
    parameters: &mut Vec<ResponseParameter>,
) -> Result<UserSays, RegistrationError> {
    let invalid = || RegistrationError::InvalidTemplate {
        intent: intent.to_string(),
        template: template.to_string(),
    };

    let mut data = Vec::new();
    let mut cursor = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            data.push(plain(&template[cursor..whole.start()]));
        }
        cursor = whole.end();

        let (entity, text) = inner.as_str().split_once(':').ok_or_else(invalid)?;
        if entity.is_empty() || text.is_empty() {
            return Err(invalid());
        }
        let alias = entity.strip_prefix("sys.").unwrap_or(entity);
        if alias.is_empty() {
            return Err(invalid());
        }
        let data_type = format!("@{}", entity);

        if !parameters.iter().any(|p| p.name == alias) {
            parameters.push(ResponseParameter {
                data_type: data_type.clone(),
                name: alias.to_string(),
                value: format!("${}", alias),
            });
        }

        data.push(UserSaysPart {
            text: text.to_string(),
            alias: Some(alias.to_string()),
            meta: Some(data_type),
        });
    }

    if cursor < template.len() {
        data.push(plain(&template[cursor..]));
    }

    Ok(UserSays {
        data,
        is_template: false,
        count: 0,
    })
}

fn plain(text: &str) -> UserSaysPart {
    UserSaysPart {
        text: text.to_string(),
        alias: None,
        meta: None,
    }
}
