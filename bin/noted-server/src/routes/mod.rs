//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec (disable with `NOTED_ENABLE_SWAGGER=false`)
//! - Health route (public)
//! - `/v1` REST routes and the `/api/chat` stream (bearer token required)

mod api;
pub mod doc;
mod health;
mod v1;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{auth, cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let require_user = middleware::from_fn_with_state(state.clone(), auth::require_user);

    let mut app = Router::new()
        .merge(health::router())
        .nest("/v1", v1::router().route_layer(require_user.clone()))
        .nest("/api", api::router().route_layer(require_user));

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use futures::stream;
    use http_body_util::BodyExt;
    use noted_core::completion::{CompletionProvider, CompletionStream, PromptMessage};
    use noted_core::entities::UserProfile;
    use noted_core::services::profiles::{self, NewProfile};
    use noted_core::{NotedError, SqliteStore};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    /// Replies with fixed chunks and remembers every prompt it saw.
    struct ScriptedProvider {
        chunks: Vec<&'static str>,
        fail_after: Option<usize>,
        prompts: Mutex<Vec<Vec<PromptMessage>>>,
    }

    impl ScriptedProvider {
        fn new(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                fail_after: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn stream(
            &self,
            _model: &str,
            messages: Vec<PromptMessage>,
        ) -> noted_core::Result<CompletionStream> {
            self.prompts.lock().unwrap().push(messages);
            let mut items: Vec<noted_core::Result<String>> =
                self.chunks.iter().map(|c| Ok(c.to_string())).collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(NotedError::Completion("upstream closed".into())));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    struct Harness {
        app: Router,
        user: UserProfile,
        provider: Arc<ScriptedProvider>,
    }

    async fn harness(provider: ScriptedProvider) -> Harness {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = profiles::create_profile(
            &store,
            NewProfile {
                email: "ada@example.test".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let provider = Arc::new(provider);
        let config = Config {
            enable_swagger: false,
            ..Config::default()
        };
        let state = Arc::new(AppState::new(config, store, provider.clone()));
        Harness {
            app: build(state),
            user,
            provider,
        }
    }

    impl Harness {
        fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.user.api_token));
            match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            }
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, String) {
            let response = self.app.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }

        async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let (status, text) = self.send(self.request(method, uri, body)).await;
            let value = if text.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap()
            };
            (status, value)
        }

        async fn create_chat(&self, prompt: &str) -> String {
            let (status, body) = self
                .json("POST", "/v1/chats", Some(json!({ "prompt": prompt })))
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["chat"]["id"].as_str().unwrap().to_owned()
        }
    }

    fn user_message(id: &str, text: &str) -> Value {
        json!({ "id": id, "role": "user", "parts": [{ "type": "text", "text": text }] })
    }

    /// `data:` payloads of an SSE body, in order.
    fn sse_data(body: &str) -> Vec<String> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.trim().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let h = harness(ScriptedProvider::new(vec![])).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn api_rejects_missing_or_unknown_token() {
        let h = harness(ScriptedProvider::new(vec![])).await;

        let anonymous = Request::builder().uri("/v1/chats").body(Body::empty()).unwrap();
        assert_eq!(h.send(anonymous).await.0, StatusCode::UNAUTHORIZED);

        let forged = Request::builder()
            .uri("/v1/chats")
            .header(header::AUTHORIZATION, "Bearer nt_forged")
            .body(Body::empty())
            .unwrap();
        assert_eq!(h.send(forged).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn responses_carry_trace_id() {
        let h = harness(ScriptedProvider::new(vec![])).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(req).await.unwrap();
        assert!(response.headers().contains_key(trace::X_TRACE_ID));
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let h = harness(ScriptedProvider::new(vec![])).await;
        let (status, body) = h
            .json("POST", "/v1/chats", Some(json!({ "prompt": "   " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt is required");

        let (_, chats) = h.json("GET", "/v1/chats", None).await;
        assert_eq!(chats, json!([]));
    }

    #[tokio::test]
    async fn stream_requires_chat_id_and_messages() {
        let h = harness(ScriptedProvider::new(vec![])).await;

        let (status, body) = h
            .json("POST", "/api/chat", Some(json!({ "messages": [user_message("u1", "hi")] })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "chat_id or id is required");

        let (status, body) = h
            .json("POST", "/api/chat", Some(json!({ "chat_id": "c1" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "messages array is required");

        let (status, _) = h
            .json(
                "POST",
                "/api/chat",
                Some(json!({ "chat_id": "missing", "messages": [user_message("u1", "hi")] })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn streamed_turn_links_prompt_and_persists_reply() {
        let h = harness(ScriptedProvider::new(vec!["Hel", "lo"])).await;
        let chat_id = h.create_chat("plan my day").await;

        let req = h.request(
            "POST",
            "/api/chat",
            Some(json!({ "chat_id": chat_id, "messages": [user_message("u1", "plan my day")] })),
        );
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);

        let frames = sse_data(&body);
        assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
        let events: Vec<Value> = frames[..frames.len() - 1]
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect();
        let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
        assert_eq!(
            kinds,
            ["start", "text-start", "text-delta", "text-delta", "text-end", "finish"]
        );
        let assistant_id = events[0]["messageId"].as_str().unwrap().to_owned();

        let (_, rows) = h
            .json("GET", &format!("/v1/chats/{chat_id}/messages"), None)
            .await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["role"], "user");
        assert_eq!(rows[0]["chat_context_id"], "u1");
        assert_eq!(rows[1]["role"], "assistant");
        assert_eq!(rows[1]["content"], "Hello");
        assert_eq!(rows[1]["chat_context_id"], assistant_id.as_str());

        let prompts = h.provider.prompts.lock().unwrap();
        assert_eq!(prompts[0].len(), 1);
    }

    #[tokio::test]
    async fn history_with_step_markers_is_accepted() {
        let h = harness(ScriptedProvider::new(vec!["Sure"])).await;
        let chat_id = h.create_chat("hi").await;

        let assistant = json!({
            "id": "a1",
            "role": "assistant",
            "parts": [
                { "type": "step-start" },
                { "type": "text", "text": "hello", "state": "done" }
            ]
        });
        let req = h.request(
            "POST",
            "/api/chat",
            Some(json!({
                "chat_id": chat_id,
                "messages": [user_message("u1", "hi"), assistant, user_message("u2", "more")]
            })),
        );
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(sse_data(&body).last().map(String::as_str), Some("[DONE]"));

        let prompts = h.provider.prompts.lock().unwrap();
        let contents: Vec<&str> = prompts[0].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello", "more"]);
    }

    #[tokio::test]
    async fn blank_message_id_is_rejected_before_streaming() {
        let h = harness(ScriptedProvider::new(vec!["ok"])).await;
        let chat_id = h.create_chat("first").await;

        for prompt in ["second", "third"] {
            let (status, body) = h
                .json(
                    "POST",
                    "/api/chat",
                    Some(json!({ "chat_id": chat_id, "messages": [user_message("", prompt)] })),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "message id is required");
        }

        assert!(h.provider.prompts.lock().unwrap().is_empty());
        let (_, rows) = h
            .json("GET", &format!("/v1/chats/{chat_id}/messages"), None)
            .await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_stream_reports_error_and_persists_nothing() {
        let mut provider = ScriptedProvider::new(vec!["par", "tial"]);
        provider.fail_after = Some(1);
        let h = harness(provider).await;
        let chat_id = h.create_chat("hi").await;

        let req = h.request(
            "POST",
            "/api/chat",
            Some(json!({ "id": chat_id, "messages": [user_message("u1", "hi")] })),
        );
        let (_, body) = h.send(req).await;
        let frames = sse_data(&body);
        let error: Value = serde_json::from_str(&frames[frames.len() - 2]).unwrap();
        assert_eq!(error["type"], "error");

        let (_, rows) = h
            .json("GET", &format!("/v1/chats/{chat_id}/messages"), None)
            .await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_load_and_repeated_reconcile_are_idempotent() {
        let h = harness(ScriptedProvider::new(vec![])).await;
        let chat_id = h.create_chat("first").await;

        let (_, first) = h
            .json("GET", &format!("/v1/chats/{chat_id}/session"), None)
            .await;
        let (_, second) = h
            .json("GET", &format!("/v1/chats/{chat_id}/session"), None)
            .await;
        assert_eq!(first, second);
        assert_eq!(first["messages"].as_array().unwrap().len(), 1);

        let uri = format!("/v1/chats/{chat_id}/reconcile");
        let reply = json!({ "id": "a1", "role": "assistant", "content": "answer" });
        let (_, r1) = h.json("POST", &uri, Some(reply.clone())).await;
        let (_, r2) = h.json("POST", &uri, Some(reply)).await;
        assert_eq!(r1["outcome"], "inserted");
        assert_eq!(r2["outcome"], "updated");
        assert_eq!(r1["message_id"], r2["message_id"]);

        let (_, rows) = h
            .json("GET", &format!("/v1/chats/{chat_id}/messages"), None)
            .await;
        assert_eq!(rows.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn notes_and_projects_round_trip_through_http() {
        let h = harness(ScriptedProvider::new(vec![])).await;

        let (status, project) = h
            .json("POST", "/v1/projects", Some(json!({ "name": "Home Lab" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(project["slug"], "home_lab");

        let (_, note) = h
            .json(
                "POST",
                "/v1/notes",
                Some(json!({ "title": "Rack layout", "project_id": project["id"] })),
            )
            .await;
        let note_id = note["id"].as_str().unwrap();

        let (_, filed) = h.json("GET", "/v1/projects/slug/home_lab/notes", None).await;
        assert_eq!(filed.as_array().unwrap().len(), 1);

        let (_, found) = h.json("GET", "/v1/notes/search?title=RACK", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (status, _) = h
            .json("PATCH", &format!("/v1/notes/{note_id}"), Some(json!({ "project_id": null })))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, history) = h
            .json("GET", &format!("/v1/notes/{note_id}/actions"), None)
            .await;
        assert_eq!(history[0]["event_type"], "remove_from_project");

        let (_, activity) = h.json("GET", "/v1/activity", None).await;
        assert_eq!(activity["notes"].as_array().unwrap().len(), 1);
        assert_eq!(activity["projects"].as_array().unwrap().len(), 1);
    }
}
