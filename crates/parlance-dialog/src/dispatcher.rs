//! Intent dispatch and the per-request invocation state machine.
//!
//! A primary invocation walks `Start -> HandlerRunning -> OutputCollected ->
//! Finalized`, dispatching the lifecycle events to the session store along
//! the way. A failing handler is diverted through `Error` and answered with
//! the configured error message, so every request ends `Finalized`.

use std::sync::Arc;

use indexmap::IndexMap;
use parlance_core::RegistrationError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::conversation::Conversation;
use crate::error::{DialogError, HandlerError};
use crate::events::EventKey;
use crate::handler::{Call, Completion, IntentHandler, Response};
use crate::speech::SpeechOutput;
use crate::state_machine::{InvocationState, Lifecycle};
use crate::store::ReducerRegistry;
use crate::webhook::{
    session_context, Context, GooglePayload, ResponseData, WebhookRequest, WebhookResponse,
};

/// Terminal reply of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// `true` for `ask`, `false` for `tell`.
    pub expect_user_response: bool,
    pub speech: String,
    pub display_text: String,
    pub is_ssml: bool,
    pub args: Vec<Value>,
}

impl Reply {
    fn from_response(call: Call, res: &Response, args: Vec<Value>) -> Self {
        // A top-level resolve is delivered as an ask with plain text.
        let as_text = call == Call::Resolve;
        let speech = if as_text { res.render_text() } else { res.render() };
        Self {
            expect_user_response: call != Call::Tell,
            is_ssml: !as_text && res.is_ssml(),
            display_text: res.render_text(),
            speech,
            args,
        }
    }

    fn tell(text: &str) -> Self {
        Self {
            expect_user_response: false,
            speech: text.to_string(),
            display_text: text.to_string(),
            is_ssml: false,
            args: Vec::new(),
        }
    }
}

/// Everything a finished request produced.
#[derive(Debug, Clone)]
pub struct DialogOutcome {
    pub intent: String,
    pub state: InvocationState,
    pub reply: Reply,
    /// The value the invocation resolved with (the error message on failure).
    pub resolved: Value,
    pub session_data: Map<String, Value>,
    pub contexts_out: Vec<Context>,
}

impl DialogOutcome {
    pub fn to_webhook_response(&self) -> WebhookResponse {
        let mut context_out = self.contexts_out.clone();
        context_out.push(session_context(&self.session_data));
        WebhookResponse {
            speech: self.reply.speech.clone(),
            display_text: self.reply.display_text.clone(),
            data: ResponseData {
                google: GooglePayload {
                    expect_user_response: self.reply.expect_user_response,
                    is_ssml: self.reply.is_ssml,
                    no_input_prompts: self.reply.args.clone(),
                },
            },
            context_out,
        }
    }
}

pub struct Dispatcher {
    handlers: IndexMap<String, Arc<dyn IntentHandler>>,
    reducers: ReducerRegistry,
    error_message: String,
    fallback: Option<String>,
}

impl Dispatcher {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            handlers: IndexMap::new(),
            reducers: ReducerRegistry::new(),
            error_message: error_message.into(),
            fallback: None,
        }
    }

    pub fn register(
        &mut self,
        key: &str,
        handler: Arc<dyn IntentHandler>,
    ) -> Result<(), RegistrationError> {
        if key.is_empty() {
            return Err(RegistrationError::MissingIntentKey);
        }
        if self.handlers.contains_key(key) {
            return Err(RegistrationError::DuplicateIntent(key.to_string()));
        }
        self.handlers.insert(key.to_string(), handler);
        debug!(intent = key, "Intent handler registered");
        Ok(())
    }

    /// Route unknown intent keys to `key`. The first fallback set wins.
    pub fn set_fallback(&mut self, key: &str) {
        if self.fallback.is_none() {
            self.fallback = Some(key.to_string());
        }
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn handler(&self, key: &str) -> Option<&Arc<dyn IntentHandler>> {
        self.handlers.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn reducers(&self) -> &ReducerRegistry {
        &self.reducers
    }

    pub fn reducers_mut(&mut self) -> &mut ReducerRegistry {
        &mut self.reducers
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// The handler key a request's action resolves to.
    fn route<'k>(&'k self, action: &'k str) -> Option<&'k str> {
        if self.handlers.contains_key(action) {
            return Some(action);
        }
        self.fallback
            .as_deref()
            .filter(|key| self.handlers.contains_key(*key))
    }

    /// Run one handler with a fresh speech builder. Shared by primary and
    /// nested invocations.
    pub(crate) async fn execute(
        &self,
        key: &str,
        handler: &dyn IntentHandler,
        conv: &mut Conversation<'_>,
    ) -> (Result<Completion, HandlerError>, SpeechOutput) {
        debug!(intent = key, "Intent action invoked");
        let mut speech = SpeechOutput::new();
        let result = handler.handle(conv, &mut speech).await;
        (result, speech)
    }

    /// Handle one webhook request from start to `Finalized`.
    pub async fn run_primary(&self, request: &WebhookRequest) -> Result<DialogOutcome, DialogError> {
        let mut lifecycle = Lifecycle::new();
        let carried = request.session_data();
        let mut conv = Conversation::new(request, self, &carried);

        info!(
            session_id = %request.session_id,
            action = request.action(),
            input = %request.result.resolved_query,
            "Handling request"
        );

        let Some(key) = self.route(request.action()) else {
            error!(action = request.action(), "No intent registered for action");
            lifecycle.advance(InvocationState::Error)?;
            lifecycle.advance(InvocationState::Finalized)?;
            return Ok(self.failed(request.action(), lifecycle.state(), conv));
        };
        let handler = self
            .handlers
            .get(key)
            .ok_or_else(|| DialogError::MalformedRequest(format!("no handler for {}", key)))?;

        conv.dispatch(EventKey::StartResponse, &Value::Null);
        lifecycle.advance(InvocationState::HandlerRunning)?;

        let (result, speech) = self.execute(key, handler.as_ref(), &mut conv).await;
        let completion = match result {
            Ok(completion) => completion,
            Err(err) => {
                error!(intent = key, error = %err, "Error occurred in intent");
                lifecycle.advance(InvocationState::Error)?;
                lifecycle.advance(InvocationState::Finalized)?;
                return Ok(self.failed(key, lifecycle.state(), conv));
            }
        };

        let Completion { call, res, args } = completion;
        let res = res.unwrap_or(Response::Speech(speech));
        let output = res.to_output_value();

        conv.dispatch(EventKey::IntentInvoked, &Value::String(key.to_string()));
        conv.dispatch(EventKey::Output, &json!({ "key": key, "output": output }));
        conv.dispatch(EventKey::FinishResponse, &Value::Null);
        lifecycle.advance(InvocationState::OutputCollected)?;

        let reply = Reply::from_response(call, &res, args);
        lifecycle.advance(InvocationState::Finalized)?;
        debug!(intent = key, ask = reply.expect_user_response, "Response finalized");

        let (session_data, contexts_out) = conv.into_parts();
        Ok(DialogOutcome {
            intent: key.to_string(),
            state: lifecycle.state(),
            reply,
            resolved: output,
            session_data,
            contexts_out,
        })
    }

    fn failed(&self, key: &str, state: InvocationState, conv: Conversation<'_>) -> DialogOutcome {
        let (session_data, contexts_out) = conv.into_parts();
        DialogOutcome {
            intent: key.to_string(),
            state,
            reply: Reply::tell(&self.error_message),
            resolved: Value::String(self.error_message.clone()),
            session_data,
            contexts_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::store::ActionGroup;
    use async_trait::async_trait;

    const ERROR_MESSAGE: &str = "An error occurred.";

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ERROR_MESSAGE)
    }

    fn register_fn<F>(dispatcher: &mut Dispatcher, key: &str, f: F)
    where
        F: Fn(&mut Conversation<'_>, &mut SpeechOutput) -> Result<Completion, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        dispatcher.register(key, Arc::new(handler_fn(f))).unwrap();
    }

    #[tokio::test]
    async fn test_welcome_ask() {
        let mut d = dispatcher();
        register_fn(&mut d, "input.welcome", |_, _| Ok(Completion::ask_with("hi")));

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        assert_eq!(outcome.reply.speech, "hi");
        assert!(outcome.reply.expect_user_response);
        assert_eq!(outcome.state, InvocationState::Finalized);
        assert_eq!(outcome.resolved, json!("hi"));
    }

    #[tokio::test]
    async fn test_speech_builder_used_when_no_response() {
        let mut d = dispatcher();
        register_fn(&mut d, "input.bye", |_, speech| {
            speech.say("Goodbye.");
            Ok(Completion::tell())
        });

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.bye"))
            .await
            .unwrap();
        assert_eq!(outcome.reply.speech, "<speak>Goodbye.</speak>");
        assert_eq!(outcome.reply.display_text, "Goodbye.");
        assert!(outcome.reply.is_ssml);
        assert!(!outcome.reply.expect_user_response);
    }

    #[tokio::test]
    async fn test_handler_error_replies_error_message() {
        let mut d = dispatcher();
        register_fn(&mut d, "input.welcome", |_, _| Err(HandlerError::failed("boom")));

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        assert_eq!(outcome.reply.speech, ERROR_MESSAGE);
        assert!(!outcome.reply.expect_user_response);
        assert_eq!(outcome.resolved, json!(ERROR_MESSAGE));
        assert_eq!(outcome.state, InvocationState::Finalized);
    }

    #[tokio::test]
    async fn test_top_level_resolve_becomes_ask() {
        let mut d = dispatcher();
        register_fn(&mut d, "input.value", |_, _| Ok(Completion::resolve("forty two")));

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.value"))
            .await
            .unwrap();
        assert!(outcome.reply.expect_user_response);
        assert_eq!(outcome.reply.speech, "forty two");
        assert!(!outcome.reply.is_ssml);
    }

    #[tokio::test]
    async fn test_unknown_action_without_fallback() {
        let d = dispatcher();
        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.nope"))
            .await
            .unwrap();
        assert_eq!(outcome.reply.speech, ERROR_MESSAGE);
        assert_eq!(outcome.state, InvocationState::Finalized);
    }

    #[tokio::test]
    async fn test_unknown_action_routes_to_fallback() {
        let mut d = dispatcher();
        register_fn(&mut d, "input.unknown", |_, _| Ok(Completion::ask_with("Say again?")));
        d.set_fallback("input.unknown");

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.nope"))
            .await
            .unwrap();
        assert_eq!(outcome.intent, "input.unknown");
        assert_eq!(outcome.reply.speech, "Say again?");
    }

    #[tokio::test]
    async fn test_lifecycle_events_reach_store() {
        let mut d = dispatcher();
        d.reducers_mut()
            .register_group(
                ActionGroup::new("trace", json!({"events": []}))
                    .on("APP_START_RESPONSE", |s: &Value, _: &Value| push(s, json!("start")))
                    .on("APP_INTENT_INVOKED", |s: &Value, p: &Value| push(s, p.clone()))
                    .on("APP_OUTPUT", |s: &Value, p: &Value| push(s, p["key"].clone()))
                    .on("APP_FINISH_RESPONSE", |s: &Value, _: &Value| push(s, json!("finish"))),
            )
            .unwrap();
        register_fn(&mut d, "input.welcome", |_, _| Ok(Completion::ask_with("hi")));

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        assert_eq!(
            outcome.session_data["trace"]["events"],
            json!(["start", "input.welcome", "input.welcome", "finish"])
        );
    }

    fn push(state: &Value, item: Value) -> Option<Value> {
        let mut next = state.clone();
        next["events"].as_array_mut()?.push(item);
        Some(next)
    }

    struct Outer;

    #[async_trait]
    impl IntentHandler for Outer {
        async fn handle(
            &self,
            conv: &mut Conversation<'_>,
            speech: &mut SpeechOutput,
        ) -> Result<Completion, HandlerError> {
            speech.say("Here is a fact.");
            if let Some(inner) = conv.invoke_intent("input.fact.tell").await {
                speech.say(inner.render_text());
            }
            if conv.invoke_intent("input.missing").await.is_none() {
                speech.say("Anything else?");
            }
            Ok(Completion::ask())
        }
    }

    #[tokio::test]
    async fn test_nested_invocation() {
        let mut d = dispatcher();
        d.register("input.fact", Arc::new(Outer)).unwrap();
        register_fn(&mut d, "input.fact.tell", |_, speech| {
            speech.say("Cats sleep a lot.");
            Ok(Completion::tell())
        });

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.fact"))
            .await
            .unwrap();
        assert_eq!(
            outcome.reply.speech,
            "<speak>Here is a fact. Cats sleep a lot. Anything else?</speak>"
        );
        assert!(outcome.reply.expect_user_response);
        assert_eq!(outcome.state, InvocationState::Finalized);
    }

    #[tokio::test]
    async fn test_session_context_in_response() {
        let mut d = dispatcher();
        d.reducers_mut()
            .register_group(ActionGroup::new("facts", json!({"told": 0})))
            .unwrap();
        register_fn(&mut d, "input.welcome", |conv, _| {
            conv.set_context("game", 2, Map::new());
            Ok(Completion::ask_with("hi"))
        });

        let outcome = d
            .run_primary(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        let response = outcome.to_webhook_response();
        assert_eq!(response.context_out.len(), 2);
        assert_eq!(response.context_out[0].name, "game");
        assert_eq!(response.context_out[1].name, "_actions_on_google_");
        assert!(response.data.google.expect_user_response);
    }

    #[test]
    fn test_register_rejects_duplicates_and_empty_keys() {
        let mut d = dispatcher();
        let handler = Arc::new(handler_fn(|_, _| Ok(Completion::tell())));
        d.register("input.welcome", handler.clone()).unwrap();
        assert!(matches!(
            d.register("input.welcome", handler.clone()),
            Err(RegistrationError::DuplicateIntent(_))
        ));
        assert!(matches!(
            d.register("", handler),
            Err(RegistrationError::MissingIntentKey)
        ));
    }
}
