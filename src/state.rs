//! Application state: the single owner of all per-user maps.
//!
//! Everything the webhook path touches hangs off [`AppState`], injected
//! explicitly rather than living in process-wide globals, so the whole
//! engine can be driven in tests with a mock gateway.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::commands::{self, ResponsePayload};
use crate::core::config;
use crate::genai::GenClient;
use crate::memory::{MemoryStore, Role};
use crate::messenger::MessagingGateway;
use crate::quiz::QuizEngine;
use crate::roster::RecipientRoster;

pub struct AppState {
    pub memory: MemoryStore,
    pub roster: Arc<RecipientRoster>,
    pub quiz: Arc<QuizEngine>,
    pub broadcaster: Broadcaster,
    pub genai: GenClient,
    pub gateway: Arc<dyn MessagingGateway>,
    admins: Vec<String>,
}

impl AppState {
    /// Wire up the engine around a gateway and generation client.
    /// Admins default to the configured allow-list.
    pub fn new(gateway: Arc<dyn MessagingGateway>, genai: GenClient) -> Arc<Self> {
        Self::with_admins(gateway, genai, config::ADMIN_IDS.clone())
    }

    /// Constructor with an explicit admin list, used by tests
    pub fn with_admins(
        gateway: Arc<dyn MessagingGateway>,
        genai: GenClient,
        admins: Vec<String>,
    ) -> Arc<Self> {
        let roster = Arc::new(RecipientRoster::new());
        Arc::new(Self {
            memory: MemoryStore::default(),
            roster: Arc::clone(&roster),
            quiz: Arc::new(QuizEngine::new(Arc::clone(&gateway))),
            broadcaster: Broadcaster::new(Arc::clone(&gateway), roster),
            genai,
            gateway,
            admins,
        })
    }

    /// Static allow-list check; failures are access events, not errors.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|admin| admin == user_id)
    }

    /// Core inbound entry point: one platform delivery, one reply payload.
    ///
    /// An open quiz session consumes the message before any command
    /// dispatch; otherwise the text is routed through the registry.
    pub async fn handle(&self, sender_id: &str, text: &str) -> ResponsePayload {
        if self.roster.observe(sender_id) {
            log::info!("New user observed: {sender_id}");
        }
        self.memory.append(sender_id, Role::User, text);

        if let Some(verdict) = self.quiz.answer(sender_id, text) {
            return ResponsePayload::Text(verdict);
        }

        // A bare choice letter with no open session is a stale quiz answer,
        // not free chat.
        let trimmed = text.trim();
        if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return ResponsePayload::text(
                "🎯 Aucun quiz actif ! Tape /quiz pour en lancer un nouveau.",
            );
        }

        commands::dispatch(self, sender_id, text).await
    }

    /// Handle one inbound message and push the reply out through the
    /// gateway. Used by the webhook path; delivery failures are logged,
    /// never propagated.
    pub async fn handle_and_deliver(&self, sender_id: &str, text: &str) {
        let payload = self.handle(sender_id, text).await;
        crate::messenger::deliver(self.gateway.as_ref(), sender_id, &payload).await;
    }
}
