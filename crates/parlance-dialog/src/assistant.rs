use std::sync::Arc;

use parlance_core::{
    Catalog, EntityOptions, IntentConfig, ParlanceConfig, RegistrationError, TermEntry,
};
use tracing::{info, warn};

use crate::conversation::Conversation;
use crate::dispatcher::{DialogOutcome, Dispatcher};
use crate::error::{DialogError, HandlerError};
use crate::handler::{handler_fn, Completion, IntentHandler};
use crate::speech::SpeechOutput;
use crate::store::ActionGroup;
use crate::webhook::WebhookRequest;

/// A voice application: the catalog declarations pushed to the NLU plus the
/// handlers and action groups that answer its webhook.
///
/// Registration happens through `&mut self` before the assistant is shared;
/// once served it sits behind an `Arc` and is only read.
pub struct Assistant {
    catalog: Catalog,
    dispatcher: Dispatcher,
    started: bool,
}

impl Assistant {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            catalog: Catalog::new(),
            dispatcher: Dispatcher::new(error_message),
            started: false,
        }
    }

    pub fn from_config(config: &ParlanceConfig) -> Self {
        Self::new(config.general.error_message.clone())
    }

    /// Register an intent handler. With a config the intent is also declared
    /// to the catalog; without one it can only be reached through
    /// [`Conversation::invoke_intent`] or as an action already defined
    /// remotely.
    pub fn intent<H>(
        &mut self,
        key: &str,
        config: Option<IntentConfig>,
        handler: H,
    ) -> Result<&mut Self, RegistrationError>
    where
        H: IntentHandler + 'static,
    {
        if key.is_empty() {
            return Err(RegistrationError::MissingIntentKey);
        }
        if self.dispatcher.contains(key) {
            return Err(RegistrationError::DuplicateIntent(key.to_string()));
        }

        if let Some(config) = config {
            self.catalog.register_intent(key, &config)?;
            if config.fallback_intent {
                self.dispatcher.set_fallback(key);
            }
        }
        self.dispatcher.register(key, Arc::new(handler))?;
        Ok(self)
    }

    /// [`intent`](Self::intent) for a synchronous closure.
    pub fn intent_fn<F>(
        &mut self,
        key: &str,
        config: Option<IntentConfig>,
        f: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Conversation<'_>, &mut SpeechOutput) -> Result<Completion, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.intent(key, config, handler_fn(f))
    }

    /// Declare an entity. Ignored with a warning once started.
    pub fn entity(
        &mut self,
        key: &str,
        entries: Vec<TermEntry>,
        options: EntityOptions,
    ) -> Result<&mut Self, RegistrationError> {
        if self.started {
            warn!(entity = key, "Entities may only be added before start; ignoring");
            return Ok(self);
        }
        self.catalog.register_entity(key, entries, options)?;
        Ok(self)
    }

    /// Add an action group to the session store.
    pub fn action(&mut self, group: ActionGroup) -> Result<&mut Self, RegistrationError> {
        self.dispatcher.reducers_mut().register_group(group)?;
        Ok(self)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Freeze entity and action group registration.
    pub fn mark_started(&mut self) {
        self.started = true;
        self.dispatcher.reducers_mut().mark_started();
        info!(
            intents = self.catalog.intents.len(),
            entities = self.catalog.entities.len(),
            handlers = self.dispatcher.keys().count(),
            "Assistant started"
        );
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub async fn handle(&self, request: &WebhookRequest) -> Result<DialogOutcome, DialogError> {
        self.dispatcher.run_primary(request).await
    }
}
