//! HTTP route handlers for the UI API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use coagent::core::pending::Decision;
use coagent::core::view::RenderedPage;
use coagent::io::config::{CoagentConfig, SuggestionsConfig};
use coagent::io::protocol::decode_event;
use coagent::session::SessionInput;
use tracing::{debug, warn};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(get_config))
        .route("/suggestions", get(get_suggestions))
        .route("/view", get(get_view))
        .route("/agent/events", post(post_agent_event))
        .route("/actions/{id}/accept", post(accept_action))
        .route("/actions/{id}/reject", post(reject_action))
        .route("/actions/{id}", delete(teardown_action))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/config - the effective configuration.
async fn get_config(State(state): State<AppState>) -> Json<CoagentConfig> {
    Json(state.config.as_ref().clone())
}

/// GET /api/suggestions - follow-up suggestion settings for the chat.
async fn get_suggestions(State(state): State<AppState>) -> Json<SuggestionsConfig> {
    Json(state.config.suggestions.clone())
}

/// GET /api/view - the page as currently rendered.
async fn get_view(State(state): State<AppState>) -> Json<RenderedPage> {
    Json(state.page.borrow().clone())
}

/// POST /api/agent/events - one agent event as JSON.
async fn post_agent_event(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let event = decode_event(&body).map_err(|err| {
        debug!(error = %err, "rejected agent event");
        (StatusCode::BAD_REQUEST, format!("{err:#}"))
    })?;
    submit(&state, SessionInput::Agent(event)).await
}

/// POST /api/actions/:id/accept
async fn accept_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let decision = Decision::Accept;
    submit(&state, SessionInput::Decide { action_id, decision }).await
}

/// POST /api/actions/:id/reject
async fn reject_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let decision = Decision::Reject;
    submit(&state, SessionInput::Decide { action_id, decision }).await
}

/// DELETE /api/actions/:id - the action's component went away.
async fn teardown_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    submit(&state, SessionInput::Teardown { action_id }).await
}

async fn submit(
    state: &AppState,
    input: SessionInput,
) -> Result<StatusCode, (StatusCode, String)> {
    state.submit(input).await.map_err(|err| {
        warn!(error = %err, "dropping input");
        (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    })?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use coagent::core::view::{Outcome, View};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let (state, _task) = AppState::start(CoagentConfig::default());
        let router = Router::new()
            .nest("/api", api_router())
            .with_state(state.clone());
        (router, state)
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1 << 20).await.expect("body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn wait_for_page<F>(state: &AppState, predicate: F) -> RenderedPage
    where
        F: FnMut(&RenderedPage) -> bool,
    {
        let mut page = state.page.clone();
        let found = timeout(Duration::from_secs(5), page.wait_for(predicate))
            .await
            .expect("page update in time")
            .expect("session alive");
        found.clone()
    }

    #[tokio::test]
    async fn health_and_suggestions() {
        let (router, _) = app();
        let (status, body) = call(&router, Method::GET, "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, body) = call(&router, Method::GET, "/api/suggestions", "").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(json["min_suggestions"], 1);
        assert_eq!(json["max_suggestions"], 6);
    }

    #[tokio::test]
    async fn config_reports_agent_defaults() {
        let (router, _) = app();
        let (_, body) = call(&router, Method::GET, "/api/config", "").await;
        let json: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(json["agent"]["name"], "AG_UI");
        assert_eq!(json["agent"]["endpoint_url"], "http://localhost:8000/copilotkit");
    }

    #[tokio::test]
    async fn snapshot_event_updates_view() {
        let (router, state) = app();
        let (_, body) = call(&router, Method::GET, "/api/view", "").await;
        let json: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(json["welcome"], true);

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/agent/events",
            r#"{"type":"STATE_SNAPSHOT","agentName":"AG_UI",
                "snapshot":{"searchProgress":[{"topic":"volcanoes","completed":false}]}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let page = wait_for_page(&state, |page| !page.state_view.is_none()).await;
        let View::SearchProgress { rows } = page.state_view else {
            panic!("expected progress view");
        };
        assert!(rows[0].label.contains("volcanoes"));
    }

    #[tokio::test]
    async fn malformed_event_is_rejected() {
        let (router, _) = app();
        let (status, body) = call(&router, Method::POST, "/api/agent/events", "{nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("decode agent event"));
    }

    #[tokio::test]
    async fn accept_without_backend_subscriber_changes_nothing() {
        let (router, state) = app();
        call(
            &router,
            Method::POST,
            "/api/agent/events",
            r#"{"type":"ACTION","id":"call-1","name":"confirm_changes","status":"executing",
                "arguments":{"japanese":["雨"],"english":["rain"]},"requiresResponse":true}"#,
        )
        .await;
        let page = wait_for_page(&state, |page| !page.prompts.is_empty()).await;
        assert!(!page.prompts[0].controls_enabled);

        let (status, _) = call(&router, Method::POST, "/api/actions/call-1/accept", "").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        // Inputs are processed in order, so once the snapshot shows the
        // decision has been handled too.
        call(
            &router,
            Method::POST,
            "/api/agent/events",
            r#"{"type":"STATE_SNAPSHOT","snapshot":{"searchProgress":[{"topic":"rain","completed":true}]}}"#,
        )
        .await;
        let page = wait_for_page(&state, |page| !page.state_view.is_none()).await;
        assert_eq!(page.prompts[0].outcome, None);
    }

    #[tokio::test]
    async fn accept_with_backend_subscriber_sends_response() {
        let (router, state) = app();
        let mut responses = state.responses.subscribe();
        state.submit(SessionInput::Refresh).await.expect("refresh");
        call(
            &router,
            Method::POST,
            "/api/agent/events",
            r#"{"type":"ACTION","id":"call-1","name":"confirm_changes","status":"executing",
                "arguments":{"japanese":["雨"],"english":["rain"]},"requiresResponse":true}"#,
        )
        .await;
        let page = wait_for_page(&state, |page| !page.prompts.is_empty()).await;
        assert!(page.prompts[0].controls_enabled);

        call(&router, Method::POST, "/api/actions/call-1/reject", "").await;
        let response = timeout(Duration::from_secs(5), responses.recv())
            .await
            .expect("response in time")
            .expect("response");
        assert_eq!(response.payload, "Changes rejected");

        let page = wait_for_page(&state, |page| {
            page.prompts.first().is_some_and(|prompt| prompt.outcome.is_some())
        })
        .await;
        assert_eq!(page.prompts[0].outcome, Some(Outcome::Rejected));
        assert_eq!(page.prompts[0].outcome_text.as_deref(), Some("Rejected"));
    }

    #[tokio::test]
    async fn teardown_route_removes_prompt() {
        let (router, state) = app();
        call(
            &router,
            Method::POST,
            "/api/agent/events",
            r#"{"type":"ACTION","id":"call-1","name":"confirm_changes","status":"executing",
                "requiresResponse":true}"#,
        )
        .await;
        wait_for_page(&state, |page| !page.prompts.is_empty()).await;

        let (status, _) = call(&router, Method::DELETE, "/api/actions/call-1", "").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for_page(&state, |page| page.prompts.is_empty()).await;
    }
}
