use std::fmt;

/// Name of an event dispatched through the session store.
///
/// The four lifecycle events fire on every invocation; skills add their own
/// with [`EventKey::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    StartResponse,
    IntentInvoked,
    Output,
    FinishResponse,
    Custom(String),
}

impl EventKey {
    pub fn as_str(&self) -> &str {
        match self {
            EventKey::StartResponse => "APP_START_RESPONSE",
            EventKey::IntentInvoked => "APP_INTENT_INVOKED",
            EventKey::Output => "APP_OUTPUT",
            EventKey::FinishResponse => "APP_FINISH_RESPONSE",
            EventKey::Custom(name) => name,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKey {
    fn from(name: &str) -> Self {
        match name {
            "APP_START_RESPONSE" => EventKey::StartResponse,
            "APP_INTENT_INVOKED" => EventKey::IntentInvoked,
            "APP_OUTPUT" => EventKey::Output,
            "APP_FINISH_RESPONSE" => EventKey::FinishResponse,
            other => EventKey::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventKey {
    fn from(name: String) -> Self {
        EventKey::from(name.as_str())
    }
}
