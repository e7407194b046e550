//! Inbound webhook server.
//!
//! `GET /webhook` answers the platform subscription handshake;
//! `POST /webhook` receives event batches and spawns one handling task per
//! messaging event, acknowledging the delivery immediately, since the platform
//! retries slow webhooks, so the reply work must never block the 200.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::state::AppState;

/// `GET /webhook` query parameters of the subscription handshake
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Inbound event batch envelope
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Sender,
    pub message: Option<InboundMessage>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub payload: Option<String>,
}

impl MessagingEvent {
    /// Text carried by the event: message text, or the postback payload
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .or_else(|| self.postback.as_ref().and_then(|p| p.payload.as_deref()))
    }
}

/// Start the webhook server; runs until `shutdown` is cancelled.
pub async fn run_webhook_server(
    state: Arc<AppState>,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    log::info!("Starting webhook server on http://{}", addr);
    log::info!("  GET  /webhook - platform handshake");
    log::info!("  POST /webhook - inbound events");
    log::info!("  GET  /        - liveness");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// Route table, separated out so tests can drive it without a socket
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/webhook", get(verify_handler).post(events_handler))
        .with_state(state)
}

async fn home_handler() -> &'static str {
    "Kaiwa is alive!"
}

async fn verify_handler(Query(params): Query<VerifyParams>) -> impl IntoResponse {
    let token_matches = params.verify_token.as_deref() == Some(config::VERIFY_TOKEN.as_str());
    if params.mode.as_deref() == Some("subscribe") && token_matches {
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        log::warn!("Webhook verification failed (mode={:?})", params.mode);
        (StatusCode::FORBIDDEN, "Verification token mismatch".to_string())
    }
}

async fn events_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> impl IntoResponse {
    for entry in payload.entry {
        for event in entry.messaging {
            let Some(text) = event.text().map(str::to_string) else {
                continue;
            };
            let sender_id = event.sender.id.clone();
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state.handle_and_deliver(&sender_id, &text).await;
            });
        }
    }
    (StatusCode::OK, "ok")
}
