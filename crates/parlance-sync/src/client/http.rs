use async_trait::async_trait;
use parlance_core::{EntityDefinition, IntentDefinition, ItemKind, RemoteItem};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::CatalogClient;
use crate::error::CatalogError;

/// [`CatalogClient`] over the api.ai v1 REST contract with bearer auth.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%method, %url, "Catalog request");
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, CatalogError> {
        let response = builder
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| CatalogError::Transport(e.to_string()))
    }

    /// Writes and deletes only succeed with an explicit `status.code` of 200.
    async fn write<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
    ) -> Result<(), CatalogError> {
        let mut builder = self.request(method, path);
        if let Some(payload) = payload {
            builder = builder.json(payload);
        }
        let body = self.send_json(builder).await?;
        match status_code(&body) {
            Some(200) => Ok(()),
            code => Err(CatalogError::Rejected {
                code: code.unwrap_or(0),
                details: body,
            }),
        }
    }
}

fn status_code(body: &Value) -> Option<u16> {
    body.get("status")?
        .get("code")?
        .as_u64()
        .and_then(|c| u16::try_from(c).ok())
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list(&self, kind: ItemKind) -> Result<Vec<RemoteItem>, CatalogError> {
        let body = self.send_json(self.request(Method::GET, kind.path())).await?;
        match body {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => {
                serde_json::from_value(body).map_err(|e| CatalogError::Transport(e.to_string()))
            }
            other => Err(CatalogError::Rejected {
                code: status_code(&other).unwrap_or(0),
                details: other,
            }),
        }
    }

    async fn create_intent(&self, intent: &IntentDefinition) -> Result<(), CatalogError> {
        self.write(Method::POST, "intents/", Some(intent)).await
    }

    async fn update_intent(&self, id: &str, intent: &IntentDefinition) -> Result<(), CatalogError> {
        self.write(Method::PUT, &format!("intents/{}", id), Some(intent))
            .await
    }

    async fn replace_entities(&self, entities: &[EntityDefinition]) -> Result<(), CatalogError> {
        self.write(Method::PUT, "entities", Some(entities)).await
    }

    async fn delete(&self, kind: ItemKind, id: &str) -> Result<(), CatalogError> {
        self.write::<Value>(Method::DELETE, &format!("{}/{}", kind.path(), id), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use parlance_core::{EntityOptions, IntentConfig};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        calls: Vec<String>,
        auth: Vec<String>,
        bodies: Vec<Value>,
    }

    type Shared = Arc<Mutex<Recorded>>;

    fn record(state: &Shared, call: String, headers: &HeaderMap, body: Option<Value>) {
        let mut rec = state.lock().unwrap();
        rec.calls.push(call);
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            rec.auth.push(auth.to_string());
        }
        if let Some(body) = body {
            rec.bodies.push(body);
        }
    }

    fn ok() -> Json<Value> {
        Json(json!({"status": {"code": 200, "errorType": "success"}}))
    }

    /// Minimal api.ai lookalike. Deleting id `in-use` is rejected with 400.
    async fn spawn_fake_catalog() -> (String, Shared) {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route(
                "/v1/intents",
                get(|State(s): State<Shared>, h: HeaderMap| async move {
                    record(&s, "GET intents".into(), &h, None);
                    Json(json!([{"id": "1", "name": "input.welcome", "priority": 500000}]))
                }),
            )
            .route(
                "/v1/entities",
                get(|State(s): State<Shared>, h: HeaderMap| async move {
                    record(&s, "GET entities".into(), &h, None);
                    Json(Value::Null)
                })
                .put(|State(s): State<Shared>, h: HeaderMap, Json(body): Json<Value>| async move {
                    record(&s, "PUT entities".into(), &h, Some(body));
                    ok()
                }),
            )
            .route(
                "/v1/intents/",
                post(|State(s): State<Shared>, h: HeaderMap, Json(body): Json<Value>| async move {
                    record(&s, "POST intents".into(), &h, Some(body));
                    ok()
                }),
            )
            .route(
                "/v1/intents/{id}",
                put(
                    |State(s): State<Shared>, Path(id): Path<String>, h: HeaderMap, Json(body): Json<Value>| async move {
                        record(&s, format!("PUT intents/{}", id), &h, Some(body));
                        ok()
                    },
                )
                .delete(|State(s): State<Shared>, Path(id): Path<String>, h: HeaderMap| async move {
                    record(&s, format!("DELETE intents/{}", id), &h, None);
                    Json(json!({"status": {"code": 500}}))
                }),
            )
            .route(
                "/v1/entities/{id}",
                delete(|State(s): State<Shared>, Path(id): Path<String>, h: HeaderMap| async move {
                    record(&s, format!("DELETE entities/{}", id), &h, None);
                    if id == "in-use" {
                        Json(json!({"status": {"code": 400, "errorDetails": "Some entity names are in use"}}))
                    } else {
                        ok()
                    }
                }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), state)
    }

    #[tokio::test]
    async fn test_list_parses_remote_items() {
        let (url, state) = spawn_fake_catalog().await;
        let client = HttpCatalogClient::new(url, "dev-token");

        let intents = client.list(ItemKind::Intents).await.unwrap();
        assert_eq!(intents, vec![RemoteItem::new("1", "input.welcome")]);

        let rec = state.lock().unwrap();
        assert_eq!(rec.auth, vec!["Bearer dev-token"]);
    }

    #[tokio::test]
    async fn test_list_null_body_is_empty() {
        let (url, _) = spawn_fake_catalog().await;
        let client = HttpCatalogClient::new(url, "t");
        assert!(client.list(ItemKind::Entities).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_update_intent_routes() {
        let (url, state) = spawn_fake_catalog().await;
        let client = HttpCatalogClient::new(format!("{}/", url), "t");
        let intent = IntentDefinition::configure("input.welcome", &IntentConfig::new()).unwrap();

        client.create_intent(&intent).await.unwrap();
        client.update_intent("1", &intent.with_id("1")).await.unwrap();

        let rec = state.lock().unwrap();
        assert_eq!(rec.calls, vec!["POST intents", "PUT intents/1"]);
        assert_eq!(rec.bodies[0]["name"], "input.welcome");
        assert_eq!(rec.bodies[1]["id"], "1");
    }

    #[tokio::test]
    async fn test_replace_entities_sends_full_array() {
        let (url, state) = spawn_fake_catalog().await;
        let client = HttpCatalogClient::new(url, "t");
        let entities = vec![EntityDefinition::new("colour", vec![], EntityOptions::default())];

        client.replace_entities(&entities).await.unwrap();

        let rec = state.lock().unwrap();
        assert_eq!(rec.bodies[0], json!([{"name": "colour", "entries": [], "isEnum": false, "automatedExpansion": false}]));
    }

    #[tokio::test]
    async fn test_non_200_status_is_rejection() {
        let (url, _) = spawn_fake_catalog().await;
        let client = HttpCatalogClient::new(url, "t");

        let err = client.delete(ItemKind::Entities, "in-use").await.unwrap_err();
        assert!(matches!(err, CatalogError::Rejected { code: 400, .. }));
        assert!(err.is_retryable());

        let err = client.delete(ItemKind::Intents, "7").await.unwrap_err();
        assert!(matches!(err, CatalogError::Rejected { code: 500, .. }));
        assert!(!err.is_retryable());

        client.delete(ItemKind::Entities, "ok").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpCatalogClient::new(format!("http://{}/v1", addr), "t");
        let err = client.list(ItemKind::Intents).await.unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)));
    }
}
