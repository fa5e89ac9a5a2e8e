//! Agent runtime HTTP server.
//!
//! `POST /invocations` runs one agent turn and streams it back as SSE; every
//! event is a `data: {"event": {...}}` line and a successful turn ends with
//! `data: [DONE]`. A failed turn aborts the body instead, so the caller sees
//! a broken stream rather than a clean end. `GET /ping` is the health check.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::InvocationRequest;
use crate::agent::{Agent, ConverseEvent};
use crate::config::{AgentConfig, Config};
use crate::error::{AgentLineError, Result};
use crate::providers::{ClaudeProvider, LLMProvider};
use crate::session::SessionRegistry;
use crate::tools::{runtime_registry, ToolRegistry};

/// Stream terminator written after a successful turn.
pub const DONE_MARKER: &str = "[DONE]";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// An agent shared by the turns of one session; the lock serializes them.
pub type AgentHandle = Mutex<Agent>;

/// Shared state of the runtime server.
#[derive(Clone)]
pub struct RuntimeState {
    sessions: Arc<SessionRegistry<AgentHandle>>,
}

impl RuntimeState {
    /// Build state whose sessions get agents over `provider` and `tools`.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        agent_config: AgentConfig,
        session_ttl: Duration,
    ) -> Self {
        let sessions = SessionRegistry::new(session_ttl, move |session_id: &str| {
            Mutex::new(
                Agent::new(Arc::clone(&provider), Arc::clone(&tools), &agent_config)
                    .with_session(session_id),
            )
        });
        Self {
            sessions: Arc::new(sessions),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry<AgentHandle> {
        &self.sessions
    }
}

/// Build the runtime router.
pub fn router(state: RuntimeState) -> Router {
    Router::new()
        .route("/invocations", post(invocations))
        .route("/ping", get(ping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

async fn invocations(
    State(state): State<RuntimeState>,
    Json(request): Json<InvocationRequest>,
) -> impl IntoResponse {
    let session_id = request.session_id.unwrap_or_default();
    let prompt = request.prompt;
    info!(session = %session_id, prompt_chars = prompt.chars().count(), "Invocation received");

    let handle = state.sessions.get_or_create(&session_id);
    let (event_tx, event_rx) = mpsc::channel::<ConverseEvent>(64);
    let (done_tx, done_rx) = oneshot::channel::<Result<()>>();

    tokio::spawn(async move {
        let mut agent = handle.lock().await;
        let result = agent.run_turn(&prompt, &event_tx).await.map(|_| ());
        drop(event_tx);
        let _ = done_tx.send(result);
    });

    let events = stream::unfold(event_rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((
            Ok::<Event, AgentLineError>(Event::default().data(event.to_sse_data())),
            rx,
        ))
    });

    let tail = stream::once(async move {
        match done_rx.await {
            Ok(Ok(())) => Ok(Event::default().data(DONE_MARKER)),
            Ok(Err(e)) => {
                error!(session = %session_id, error = %e, "Agent turn failed");
                Err(e)
            }
            Err(_) => Err(AgentLineError::Runtime(
                "agent task ended without a result".to_string(),
            )),
        }
    });

    Sse::new(events.chain(tail)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

/// Serve the agent runtime until `shutdown` resolves.
///
/// # Errors
///
/// Returns a config error when no Anthropic API key is configured, or an I/O
/// error when the listener cannot bind.
pub async fn serve<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate_runtime()?;
    let provider_config = config.providers.anthropic.clone().unwrap_or_default();
    let api_key = provider_config
        .api_key
        .ok_or_else(|| AgentLineError::Config("Anthropic API key not configured".to_string()))?;
    let mut provider = ClaudeProvider::new(&api_key);
    if let Some(api_base) = provider_config.api_base.as_deref() {
        provider = provider.with_api_base(api_base);
    }

    let tools = Arc::new(runtime_registry(&config.tools).await);
    let state = RuntimeState::new(
        Arc::new(provider),
        tools,
        config.agent.clone(),
        Duration::from_secs(config.session.ttl_secs),
    );

    let addr = format!("{}:{}", config.runtime.host, config.runtime.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, model = %config.agent.model, "Agent runtime listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    crate::log_component!(info, "runtime", "Agent runtime stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{Script, ScriptedProvider};
    use crate::relay::{classify_line, StreamEvent};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state_with(scripts: Vec<Script>) -> (RuntimeState, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(scripts));
        let state = RuntimeState::new(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::default(),
            Duration::from_secs(900),
        );
        (state, provider)
    }

    fn invocation(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/invocations")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (state, _) = state_with(vec![]);
        let response = router(state)
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "Healthy");
    }

    #[tokio::test]
    async fn test_invocation_streams_events_then_done() {
        let (state, _) = state_with(vec![Script::Text(vec!["Hi", " there"])]);
        let response = router(state)
            .oneshot(invocation(json!({"prompt": "hello", "session_id": "U1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let events: Vec<StreamEvent> = text
            .lines()
            .filter(|l| !l.is_empty())
            .map(classify_line)
            .filter(|e| *e != StreamEvent::Ignore)
            .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta {
                    text: "Hi".to_string()
                },
                StreamEvent::TextDelta {
                    text: " there".to_string()
                },
                StreamEvent::BlockEnd,
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_aborts_body() {
        let (state, _) = state_with(vec![Script::FailAfter(vec!["partial"])]);
        let response = router(state)
            .oneshot(invocation(json!({"prompt": "hello", "session_id": "U1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_session_reused_across_invocations() {
        let (state, provider) = state_with(vec![
            Script::Text(vec!["first"]),
            Script::Text(vec!["second"]),
        ]);
        let app = router(state.clone());

        for prompt in ["one", "two"] {
            let response = app
                .clone()
                .oneshot(invocation(json!({"prompt": prompt, "session_id": "C9"})))
                .await
                .unwrap();
            to_bytes(response.into_body(), usize::MAX).await.unwrap();
        }

        assert_eq!(state.sessions().len(), 1);
        // system + one + first + two
        assert_eq!(provider.requests()[1].len(), 4);
    }

    #[tokio::test]
    async fn test_missing_session_id_uses_fresh_agent() {
        let (state, provider) = state_with(vec![
            Script::Text(vec!["a"]),
            Script::Text(vec!["b"]),
        ]);
        let app = router(state.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(invocation(json!({"prompt": "hi"})))
                .await
                .unwrap();
            to_bytes(response.into_body(), usize::MAX).await.unwrap();
        }

        assert!(state.sessions().is_empty());
        // system + hi only: nothing carried over
        assert_eq!(provider.requests()[1].len(), 2);
    }
}
