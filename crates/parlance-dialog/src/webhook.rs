//! api.ai v1 webhook request and response bodies.
//!
//! Session data survives between turns inside the `_actions_on_google_`
//! output context, whose `data` parameter holds the JSON-encoded session map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SESSION_CONTEXT: &str = "_actions_on_google_";
const SESSION_CONTEXT_LIFESPAN: u32 = 100;

pub const SCREEN_OUTPUT: &str = "actions.capability.SCREEN_OUTPUT";
pub const AUDIO_OUTPUT: &str = "actions.capability.AUDIO_OUTPUT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub lifespan: u32,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Context {
    pub fn new(name: impl Into<String>, lifespan: u32) -> Self {
        Self {
            name: name.into(),
            lifespan,
            parameters: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub result: QueryResult,
    #[serde(default)]
    pub original_request: Option<OriginalRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub resolved_query: String,
    /// Action name, which is the key of the matched intent.
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub contexts: Vec<Context>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginalRequest {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl WebhookRequest {
    /// Minimal request resolving to `action`, mostly for tests and tools.
    pub fn for_action(action: impl Into<String>) -> Self {
        Self {
            result: QueryResult {
                action: action.into(),
                ..QueryResult::default()
            },
            ..Self::default()
        }
    }

    pub fn action(&self) -> &str {
        &self.result.action
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.result.parameters.get(name)
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.result.contexts.iter().find(|c| c.name == name)
    }

    /// User-visible contexts, without the session carrier.
    pub fn contexts(&self) -> Vec<Context> {
        self.result
            .contexts
            .iter()
            .filter(|c| c.name != SESSION_CONTEXT)
            .cloned()
            .collect()
    }

    /// Session data carried back from the previous turn. Accepts the data
    /// either JSON-encoded or inline; anything else is an empty session.
    pub fn session_data(&self) -> Map<String, Value> {
        let Some(data) = self
            .context(SESSION_CONTEXT)
            .and_then(|c| c.parameters.get("data"))
        else {
            return Map::new();
        };
        match data {
            Value::Object(map) => map.clone(),
            Value::String(encoded) => match serde_json::from_str(encoded) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }

    pub fn has_surface_capability(&self, capability: &str) -> bool {
        self.original_request
            .as_ref()
            .and_then(|r| r.data.pointer("/surface/capabilities"))
            .and_then(Value::as_array)
            .is_some_and(|caps| {
                caps.iter()
                    .any(|c| c.get("name").and_then(Value::as_str) == Some(capability))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub speech: String,
    pub display_text: String,
    pub data: ResponseData,
    pub context_out: Vec<Context>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub google: GooglePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePayload {
    pub expect_user_response: bool,
    pub is_ssml: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_input_prompts: Vec<Value>,
}

/// Output context carrying `data` to the next turn.
pub fn session_context(data: &Map<String, Value>) -> Context {
    let mut context = Context::new(SESSION_CONTEXT, SESSION_CONTEXT_LIFESPAN);
    let encoded = Value::Object(data.clone()).to_string();
    context
        .parameters
        .insert("data".to_string(), Value::String(encoded));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> WebhookRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_parses_minimal_request() {
        let req = request(json!({
            "sessionId": "s-1",
            "result": {"resolvedQuery": "hi", "action": "input.welcome"}
        }));
        assert_eq!(req.session_id, "s-1");
        assert_eq!(req.result.resolved_query, "hi");
        assert_eq!(req.action(), "input.welcome");
        assert!(req.session_data().is_empty());
        assert!(!req.has_surface_capability(SCREEN_OUTPUT));
    }

    #[test]
    fn test_session_data_from_encoded_context() {
        let req = request(json!({
            "result": {
                "contexts": [
                    {"name": "_actions_on_google_", "lifespan": 99,
                     "parameters": {"data": "{\"fallback\":{\"count\":1}}"}},
                    {"name": "game", "lifespan": 2, "parameters": {}}
                ]
            }
        }));
        assert_eq!(req.session_data()["fallback"]["count"], 1);
        let visible = req.contexts();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "game");
    }

    #[test]
    fn test_session_data_inline_object() {
        let req = request(json!({
            "result": {"contexts": [
                {"name": "_actions_on_google_", "parameters": {"data": {"facts": {"current": 2}}}}
            ]}
        }));
        assert_eq!(req.session_data()["facts"]["current"], 2);
    }

    #[test]
    fn test_corrupt_session_data_is_empty() {
        let req = request(json!({
            "result": {"contexts": [
                {"name": "_actions_on_google_", "parameters": {"data": "{nope"}}
            ]}
        }));
        assert!(req.session_data().is_empty());
    }

    #[test]
    fn test_surface_capabilities() {
        let req = request(json!({
            "result": {},
            "originalRequest": {"source": "google", "data": {"surface": {"capabilities": [
                {"name": "actions.capability.AUDIO_OUTPUT"}
            ]}}}
        }));
        assert!(req.has_surface_capability(AUDIO_OUTPUT));
        assert!(!req.has_surface_capability(SCREEN_OUTPUT));
    }

    #[test]
    fn test_session_context_roundtrip() {
        let mut data = Map::new();
        data.insert("fallback".into(), json!({"count": 2}));
        let ctx = session_context(&data);

        let req = request(json!({"result": {"contexts": [ctx]}}));
        assert_eq!(req.session_data(), data);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = WebhookResponse {
            speech: "<speak>hi</speak>".into(),
            display_text: "hi".into(),
            data: ResponseData {
                google: GooglePayload {
                    expect_user_response: true,
                    is_ssml: true,
                    no_input_prompts: vec![],
                },
            },
            context_out: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["displayText"], "hi");
        assert_eq!(json["data"]["google"]["expectUserResponse"], true);
        assert_eq!(json["data"]["google"]["isSsml"], true);
        assert!(json["data"]["google"].get("noInputPrompts").is_none());
        assert!(json["contextOut"].as_array().unwrap().is_empty());
    }
}
