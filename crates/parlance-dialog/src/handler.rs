//! Intent handlers and the completion they must return.
//!
//! A handler always ends its turn by returning a [`Completion`]: `tell`
//! closes the conversation, `ask` keeps the microphone open, and `resolve`
//! hands a plain value back to an intent that invoked it.

use async_trait::async_trait;
use serde_json::Value;

use crate::conversation::Conversation;
use crate::error::HandlerError;
use crate::speech::SpeechOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Tell,
    Ask,
    Resolve,
}

/// What an intent produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Speech(SpeechOutput),
    Text(String),
    Value(Value),
}

impl Response {
    /// Spoken form: `<speak>` markup for speech, plain text otherwise.
    pub fn render(&self) -> String {
        match self {
            Response::Speech(speech) => speech.render(),
            Response::Text(text) => text.clone(),
            Response::Value(Value::String(text)) => text.clone(),
            Response::Value(value) => value.to_string(),
        }
    }

    pub fn render_text(&self) -> String {
        match self {
            Response::Speech(speech) => speech.render_text(),
            other => other.render(),
        }
    }

    pub fn is_ssml(&self) -> bool {
        match self {
            Response::Speech(_) => true,
            other => other.render().starts_with("<speak>"),
        }
    }

    /// Payload of the `APP_OUTPUT` event: the phrase list for speech.
    pub fn to_output_value(&self) -> Value {
        match self {
            Response::Speech(speech) => {
                serde_json::to_value(speech).unwrap_or(Value::Array(Vec::new()))
            }
            Response::Text(text) => Value::String(text.clone()),
            Response::Value(value) => value.clone(),
        }
    }
}

impl From<SpeechOutput> for Response {
    fn from(speech: SpeechOutput) -> Self {
        Response::Speech(speech)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Response::Text(text.to_string())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Response::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub call: Call,
    /// `None` means "whatever was said into the speech builder".
    pub res: Option<Response>,
    /// Extra prompts passed along with `ask`.
    pub args: Vec<Value>,
}

impl Completion {
    /// Ask using the speech builder.
    pub fn ask() -> Self {
        Self::new(Call::Ask, None)
    }

    /// Tell using the speech builder.
    pub fn tell() -> Self {
        Self::new(Call::Tell, None)
    }

    pub fn ask_with(res: impl Into<Response>) -> Self {
        Self::new(Call::Ask, Some(res.into()))
    }

    pub fn tell_with(res: impl Into<Response>) -> Self {
        Self::new(Call::Tell, Some(res.into()))
    }

    /// Hand `value` back to the invoking intent.
    pub fn resolve(value: impl Into<Value>) -> Self {
        Self::new(Call::Resolve, Some(Response::Value(value.into())))
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    fn new(call: Call, res: Option<Response>) -> Self {
        Self {
            call,
            res,
            args: Vec::new(),
        }
    }
}

#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(
        &self,
        conv: &mut Conversation<'_>,
        speech: &mut SpeechOutput,
    ) -> Result<Completion, HandlerError>;
}

/// Adapter for handlers that never invoke other intents.
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> IntentHandler for FnHandler<F>
where
    F: Fn(&mut Conversation<'_>, &mut SpeechOutput) -> Result<Completion, HandlerError>
        + Send
        + Sync,
{
    async fn handle(
        &self,
        conv: &mut Conversation<'_>,
        speech: &mut SpeechOutput,
    ) -> Result<Completion, HandlerError> {
        (self.0)(conv, speech)
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Conversation<'_>, &mut SpeechOutput) -> Result<Completion, HandlerError>
        + Send
        + Sync,
{
    FnHandler(f)
}
