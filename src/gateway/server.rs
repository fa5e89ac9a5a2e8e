//! LINE webhook HTTP server.
//!
//! Verifies the delivery signature, acknowledges immediately and hands the
//! parsed events to the [`ConversationRouter`] on a background task, so the
//! platform's delivery timeout never covers the agent turn.
//!
//! Batch tasks are tracked; on shutdown the server stops accepting deliveries
//! first, then waits up to `gateway.shutdown_grace_secs` for running turns.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::idempotency::{IdempotencyStore, DEFAULT_MAX_ENTRIES};
use crate::channels::{
    parse_webhook, ChatEvent, ConversationRouter, LineClient, LineSignatureVerifier,
    SignatureVerifier, SIGNATURE_HEADER,
};
use crate::config::Config;
use crate::error::Result;
use crate::runtime::HttpAgentRuntime;

/// Maximum accepted webhook body size.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state of the webhook server.
#[derive(Clone)]
pub struct GatewayState {
    verifier: Arc<dyn SignatureVerifier>,
    router: Arc<ConversationRouter>,
    deliveries: Arc<IdempotencyStore>,
    batches: Arc<Mutex<JoinSet<()>>>,
}

impl GatewayState {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        router: Arc<ConversationRouter>,
        dedupe_ttl: Duration,
    ) -> Self {
        Self {
            verifier,
            router,
            deliveries: Arc::new(IdempotencyStore::new(dedupe_ttl, DEFAULT_MAX_ENTRIES)),
            batches: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    fn lock_batches(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one delivery's events on a tracked background task.
    fn spawn_batch(&self, events: Vec<ChatEvent>) {
        let router = Arc::clone(&self.router);
        let mut batches = self.lock_batches();
        while batches.try_join_next().is_some() {}
        batches.spawn(async move {
            let outcomes = router.process_batch(events).await;
            debug!(turns = outcomes.len(), "Webhook batch finished");
        });
    }

    /// Batches still running.
    pub fn in_flight(&self) -> usize {
        let mut batches = self.lock_batches();
        while batches.try_join_next().is_some() {}
        batches.len()
    }

    /// Wait for running batches, aborting whatever is left after `grace`.
    ///
    /// Returns how many batches were aborted.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut batches = std::mem::take(&mut *self.lock_batches());
        if batches.is_empty() {
            return 0;
        }

        info!(in_flight = batches.len(), "Waiting for webhook batches to finish");
        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = batches.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Webhook batch task failed");
                }
            }
        })
        .await;
        if finished.is_ok() {
            return 0;
        }

        let aborted = batches.len();
        warn!(
            aborted,
            grace_secs = grace.as_secs(),
            "Aborting webhook batches still running after shutdown grace period"
        );
        batches.shutdown().await;
        aborted
    }

    /// Drop events whose `webhookEventId` was already handled.
    fn fresh_events(&self, events: Vec<ChatEvent>) -> Vec<ChatEvent> {
        events
            .into_iter()
            .filter(|event| match event.webhook_event_id.as_deref() {
                Some(id) if !self.deliveries.first_delivery(id) => {
                    info!(
                        webhook_event_id = %id,
                        redelivery = event.is_redelivery,
                        "Skipping already handled webhook event"
                    );
                    false
                }
                _ => true,
            })
            .collect()
    }
}

/// Build the webhook router; `path` is where the platform posts deliveries.
pub fn router(state: GatewayState, path: &str) -> Router {
    Router::new()
        .route(path, post(webhook))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn webhook(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.verifier.verify(&body, signature) {
        warn!(body_bytes = body.len(), "Rejected webhook with invalid signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "invalid signature" })),
        )
            .into_response();
    }

    let events = match parse_webhook(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Rejected malformed webhook body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "malformed body" })),
            )
                .into_response();
        }
    };

    let events = state.fresh_events(events);
    debug!(events = events.len(), "Webhook delivery accepted");

    if !events.is_empty() {
        state.spawn_batch(events);
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Serve the webhook bridge until `shutdown` resolves, then drain in-flight
/// batches.
///
/// # Errors
///
/// Returns a config error when LINE credentials are missing, or an I/O error
/// when the listener cannot bind.
pub async fn serve<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate_webhook()?;

    let sender = Arc::new(LineClient::new(&config.line));
    let runtime = Arc::new(HttpAgentRuntime::new(&config.runtime)?);
    let conversation_router = Arc::new(ConversationRouter::new(runtime, sender, &config.relay));
    let verifier = Arc::new(LineSignatureVerifier::new(&config.line.channel_secret));
    let state = GatewayState::new(
        verifier,
        conversation_router,
        Duration::from_secs(config.gateway.dedupe_ttl_secs),
    );

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        path = %config.gateway.path,
        runtime = %config.runtime.url,
        "Webhook gateway listening"
    );

    axum::serve(listener, router(state.clone(), &config.gateway.path))
        .with_graceful_shutdown(shutdown)
        .await?;

    state
        .drain(Duration::from_secs(config.gateway.shutdown_grace_secs))
        .await;
    crate::log_component!(info, "gateway", "Webhook gateway stopped");
    Ok(())
}
