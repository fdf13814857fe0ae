//! The contextual request object handed to every intent handler.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::events::EventKey;
use crate::handler::Response;
use crate::store::SessionStore;
use crate::webhook::{Context, WebhookRequest, AUDIO_OUTPUT, SCREEN_OUTPUT};

pub struct Conversation<'a> {
    request: &'a WebhookRequest,
    dispatcher: &'a Dispatcher,
    store: SessionStore<'a>,
    contexts_out: Vec<Context>,
}

impl<'a> Conversation<'a> {
    pub(crate) fn new(
        request: &'a WebhookRequest,
        dispatcher: &'a Dispatcher,
        carried: &Map<String, Value>,
    ) -> Self {
        Self {
            request,
            dispatcher,
            store: SessionStore::new(dispatcher.reducers(), carried),
            contexts_out: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.request.session_id
    }

    /// What the user said, as resolved by the NLU.
    pub fn user_input(&self) -> &str {
        &self.request.result.resolved_query
    }

    pub fn has_screen(&self) -> bool {
        self.request.has_surface_capability(SCREEN_OUTPUT)
    }

    pub fn has_audio(&self) -> bool {
        self.request.has_surface_capability(AUDIO_OUTPUT)
    }

    pub fn request(&self) -> &WebhookRequest {
        self.request
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.request.argument(name)
    }

    /// Argument as a single string: first element of an array, empty when
    /// missing or null.
    pub fn argument_string(&self, name: &str) -> String {
        let value = match self.argument(name) {
            Some(Value::Array(items)) => items.first(),
            other => other,
        };
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn contexts(&self) -> Vec<Context> {
        self.request.contexts()
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.request.context(name)
    }

    /// Add an output context. Setting the same name twice keeps the latest.
    pub fn set_context(
        &mut self,
        name: impl Into<String>,
        lifespan: u32,
        parameters: Map<String, Value>,
    ) {
        let name = name.into();
        self.contexts_out.retain(|c| c.name != name);
        self.contexts_out.push(Context {
            name,
            lifespan,
            parameters,
        });
    }

    /// Re-set `contexts` (or the incoming ones) with one extra turn of
    /// lifespan so they survive this exchange. Returns what was restored.
    pub fn restore_contexts(&mut self, contexts: Option<&[Context]>) -> Vec<Context> {
        let contexts = match contexts {
            Some(list) => list.to_vec(),
            None => self.contexts(),
        };
        for context in &contexts {
            self.set_context(
                context.name.clone(),
                context.lifespan + 1,
                context.parameters.clone(),
            );
        }
        contexts
    }

    pub fn contexts_out(&self) -> &[Context] {
        &self.contexts_out
    }

    pub fn dispatch(&mut self, event: impl Into<EventKey>, payload: &Value) {
        self.store.dispatch(event, payload);
    }

    /// Current sub-state of `namespace`.
    pub fn state(&self, namespace: &str) -> Option<&Value> {
        self.store.get(namespace)
    }

    pub fn store(&self) -> &SessionStore<'a> {
        &self.store
    }

    /// Run another intent inside this one and return what it produced: its
    /// explicit response or resolved value, or else its speech builder.
    /// `None` when the key is unknown or the handler fails.
    pub async fn invoke_intent(&mut self, key: &str) -> Option<Response> {
        let dispatcher = self.dispatcher;
        let Some(handler) = dispatcher.handler(key) else {
            warn!(intent = key, "Intent does not exist");
            return None;
        };

        debug!(intent = key, "Nested intent invoked");
        self.dispatch(EventKey::IntentInvoked, &Value::String(key.to_string()));

        let (result, speech) = dispatcher.execute(key, handler.as_ref(), self).await;
        match result {
            Ok(completion) => Some(completion.res.unwrap_or(Response::Speech(speech))),
            Err(err) => {
                warn!(intent = key, error = %err, "Nested intent invocation failed");
                None
            }
        }
    }

    pub(crate) fn into_parts(self) -> (Map<String, Value>, Vec<Context>) {
        (self.store.into_outbound(), self.contexts_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> WebhookRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_argument_string() {
        let dispatcher = Dispatcher::new("An error occurred.");
        let req = request(json!({
            "result": {"parameters": {
                "response": ["yes", "no"],
                "name": "Ada",
                "empty": [],
                "nothing": null,
                "count": 3
            }}
        }));
        let conv = Conversation::new(&req, &dispatcher, &Map::new());
        assert_eq!(conv.argument_string("response"), "yes");
        assert_eq!(conv.argument_string("name"), "Ada");
        assert_eq!(conv.argument_string("empty"), "");
        assert_eq!(conv.argument_string("nothing"), "");
        assert_eq!(conv.argument_string("missing"), "");
        assert_eq!(conv.argument_string("count"), "3");
    }

    #[test]
    fn test_restore_contexts_extends_lifespan() {
        let dispatcher = Dispatcher::new("An error occurred.");
        let req = request(json!({
            "result": {"contexts": [
                {"name": "game", "lifespan": 1, "parameters": {"round": 2}},
                {"name": "_actions_on_google_", "lifespan": 99, "parameters": {}}
            ]}
        }));
        let mut conv = Conversation::new(&req, &dispatcher, &Map::new());
        let restored = conv.restore_contexts(None);

        assert_eq!(restored.len(), 1);
        assert_eq!(conv.contexts_out().len(), 1);
        assert_eq!(conv.contexts_out()[0].name, "game");
        assert_eq!(conv.contexts_out()[0].lifespan, 2);
        assert_eq!(conv.contexts_out()[0].parameters["round"], 2);
    }

    #[test]
    fn test_restore_explicit_list() {
        let dispatcher = Dispatcher::new("An error occurred.");
        let req = WebhookRequest::for_action("input.unknown");
        let mut conv = Conversation::new(&req, &dispatcher, &Map::new());
        let saved = vec![Context::new("fallback_response_context", 2)];
        conv.restore_contexts(Some(&saved));
        assert_eq!(conv.contexts_out()[0].lifespan, 3);
    }

    #[test]
    fn test_set_context_replaces_same_name() {
        let dispatcher = Dispatcher::new("An error occurred.");
        let req = WebhookRequest::for_action("input.welcome");
        let mut conv = Conversation::new(&req, &dispatcher, &Map::new());
        conv.set_context("game", 1, Map::new());
        conv.set_context("game", 5, Map::new());
        assert_eq!(conv.contexts_out().len(), 1);
        assert_eq!(conv.contexts_out()[0].lifespan, 5);
    }

    #[tokio::test]
    async fn test_invoke_unknown_intent_is_none() {
        let dispatcher = Dispatcher::new("An error occurred.");
        let req = WebhookRequest::for_action("input.welcome");
        let mut conv = Conversation::new(&req, &dispatcher, &Map::new());
        assert!(conv.invoke_intent("input.missing").await.is_none());
    }
}
