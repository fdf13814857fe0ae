//! Webhook-side runtime: turns an incoming NLU request into spoken output.
//!
//! An [`Assistant`] owns the declared intents, their handlers, and the
//! reducer-based session store. Each request runs one intent through the
//! invocation state machine in [`dispatcher`].

pub mod assistant;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handler;
pub mod speech;
pub mod state_machine;
pub mod store;
pub mod webhook;

pub use assistant::Assistant;
pub use conversation::Conversation;
pub use dispatcher::{DialogOutcome, Dispatcher, Reply};
pub use error::{DialogError, HandlerError};
pub use events::EventKey;
pub use handler::{handler_fn, Call, Completion, IntentHandler, Response};
pub use speech::{Phrase, PhraseOptions, SpeechOutput};
pub use state_machine::InvocationState;
pub use store::{ActionGroup, ReducerRegistry, SessionStore};
pub use webhook::{Context, WebhookRequest, WebhookResponse};
