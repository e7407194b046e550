//! Command registry and dispatch.
//!
//! Commands are registered once in a static table; help text is generated
//! from the same table, so the two can never drift. Handlers share one
//! signature and return a [`ResponsePayload`]; any handler fault is
//! converted into a canned "retry" reply at the dispatch boundary: one
//! failing command must never take down the dispatcher or leak raw error
//! text to an end user.

pub mod admin;
pub mod ai;
pub mod broadcast;
pub mod help;
pub mod image;
pub mod memory;
pub mod quiz;
pub mod start;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use std::panic::AssertUnwindSafe;

use crate::core::error::AppResult;
use crate::state::AppState;

/// Command prefix recognized in inbound text
pub const PREFIX: char = '/';

/// What a handler hands back to the messaging layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Text(String),
    Image { url: String, caption: String },
}

impl ResponsePayload {
    pub fn text(s: impl Into<String>) -> Self {
        ResponsePayload::Text(s.into())
    }
}

pub type HandlerFuture<'a> = BoxFuture<'a, AppResult<ResponsePayload>>;

/// Uniform handler signature: `(state, sender_id, arg_string)`
pub type HandlerFn = for<'a> fn(&'a AppState, &'a str, &'a str) -> HandlerFuture<'a>;

/// One registered command
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
    handler: HandlerFn,
}

/// The static registry. Order is the order shown by `/help`.
static REGISTRY: Lazy<Vec<CommandSpec>> = Lazy::new(|| {
    vec![
        CommandSpec {
            name: "start",
            description: "🌟 Présentation du bot",
            admin_only: false,
            handler: start::execute,
        },
        CommandSpec {
            name: "ai",
            description: "🧠 Chat libre avec l'IA",
            admin_only: false,
            handler: ai::execute,
        },
        CommandSpec {
            name: "quiz",
            description: "🎯 Lance un quiz chronométré",
            admin_only: false,
            handler: quiz::execute,
        },
        CommandSpec {
            name: "image",
            description: "🎨 Génère des images IA",
            admin_only: false,
            handler: image::execute,
        },
        CommandSpec {
            name: "memory",
            description: "💾 Voir l'historique de conversation",
            admin_only: false,
            handler: memory::execute,
        },
        CommandSpec {
            name: "help",
            description: "❓ Cette aide",
            admin_only: false,
            handler: help::execute,
        },
        CommandSpec {
            name: "admin",
            description: "🔐 Panneau admin",
            admin_only: true,
            handler: admin::execute,
        },
        CommandSpec {
            name: "broadcast",
            description: "📢 Diffusion générale",
            admin_only: true,
            handler: broadcast::execute,
        },
    ]
});

/// All registered commands, for help generation and the admin panel
pub fn registry() -> &'static [CommandSpec] {
    &REGISTRY
}

fn lookup(name: &str) -> Option<&'static CommandSpec> {
    REGISTRY.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Static greeting for an empty inbound message
const GREETING: &str = "👋 Konnichiwa ! Je suis Kaiwa, ton compagnon IA. Tape /help pour découvrir mes commandes !";

/// Canned reply when a handler faults
const HANDLER_FAULT: &str = "😵 Oups, cette commande a rencontré un problème. Réessaie dans un instant !";

/// Route one inbound text to its handler.
///
/// Never returns an error: faults become canned replies, unknown commands
/// point at `/help`, and non-command text goes to the free-chat handler.
pub async fn dispatch(state: &AppState, sender_id: &str, raw_text: &str) -> ResponsePayload {
    let raw_text = raw_text.trim();
    if raw_text.is_empty() {
        return ResponsePayload::text(GREETING);
    }

    let (spec, args) = if let Some(stripped) = raw_text.strip_prefix(PREFIX) {
        let (name, args) = match stripped.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (stripped, ""),
        };
        match lookup(name) {
            Some(spec) => (spec, args),
            None => {
                return ResponsePayload::text(format!(
                    "❓ Commande /{} inconnue. Tape /help pour voir ce que je sais faire !",
                    name.to_lowercase()
                ));
            }
        }
    } else {
        // Plain text is free chat.
        let Some(spec) = lookup("ai") else {
            return ResponsePayload::text(GREETING);
        };
        (spec, raw_text)
    };

    if spec.admin_only && !state.is_admin(sender_id) {
        log::info!("Access denied: {sender_id} tried /{}", spec.name);
        return ResponsePayload::text(format!(
            "🔐 Accès refusé ! La commande /{} est réservée aux administrateurs.\nTon ID : {sender_id}",
            spec.name
        ));
    }

    run_handler(spec, state, sender_id, args).await
}

/// Invoke one handler, absorbing both `Err` returns and panics.
async fn run_handler(
    spec: &CommandSpec,
    state: &AppState,
    sender_id: &str,
    args: &str,
) -> ResponsePayload {
    let fut = (spec.handler)(state, sender_id, args);
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(payload)) => payload,
        Ok(Err(e)) => {
            log::error!("Command /{} failed for {sender_id}: {e}", spec.name);
            ResponsePayload::text(HANDLER_FAULT)
        }
        Err(_) => {
            log::error!("Command /{} panicked for {sender_id}", spec.name);
            ResponsePayload::text(HANDLER_FAULT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use crate::genai::GenClient;
    use crate::messenger::MessagingGateway;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullGateway;

    #[async_trait]
    impl MessagingGateway for NullGateway {
        async fn send(&self, _: &str, _: &str) -> AppResult<()> {
            Ok(())
        }
        async fn send_image(&self, _: &str, _: &str, _: &str) -> AppResult<()> {
            Ok(())
        }
    }

    fn test_state() -> Arc<AppState> {
        AppState::with_admins(
            Arc::new(NullGateway),
            GenClient::new(Vec::new()),
            vec!["admin1".to_string()],
        )
    }

    fn panicking<'a>(_: &'a AppState, _: &'a str, _: &'a str) -> HandlerFuture<'a> {
        Box::pin(async move { panic!("boom") })
    }

    fn erroring<'a>(_: &'a AppState, _: &'a str, _: &'a str) -> HandlerFuture<'a> {
        Box::pin(async move { Err(crate::core::error::AppError::Validation("bad".into())) })
    }

    #[tokio::test]
    async fn faulting_handler_does_not_poison_dispatch() {
        let state = test_state();
        let spec = CommandSpec {
            name: "x",
            description: "test",
            admin_only: false,
            handler: panicking,
        };
        let reply = run_handler(&spec, &state, "u1", "").await;
        assert_eq!(reply, ResponsePayload::text(HANDLER_FAULT));

        // A subsequent normal dispatch still works.
        let help = dispatch(&state, "u1", "/help").await;
        assert!(matches!(help, ResponsePayload::Text(t) if t.contains("GUIDE")));
    }

    #[tokio::test]
    async fn erring_handler_gets_canned_reply() {
        let state = test_state();
        let spec = CommandSpec {
            name: "y",
            description: "test",
            admin_only: false,
            handler: erroring,
        };
        let reply = run_handler(&spec, &state, "u1", "").await;
        assert_eq!(reply, ResponsePayload::text(HANDLER_FAULT));
    }

    #[tokio::test]
    async fn unknown_command_points_at_help() {
        let state = test_state();
        let reply = dispatch(&state, "u1", "/frobnicate now").await;
        assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("/frobnicate") && t.contains("/help")));
    }

    #[tokio::test]
    async fn empty_text_gets_greeting() {
        let state = test_state();
        let reply = dispatch(&state, "u1", "   ").await;
        assert_eq!(reply, ResponsePayload::text(GREETING));
    }

    #[tokio::test]
    async fn admin_command_denied_for_regular_user() {
        let state = test_state();
        let reply = dispatch(&state, "u1", "/broadcast hello").await;
        assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("Accès refusé")));
    }

    #[tokio::test]
    async fn admin_command_allowed_for_admin() {
        let state = test_state();
        let reply = dispatch(&state, "admin1", "/broadcast").await;
        // Empty args shows usage, which proves the gate passed.
        assert!(matches!(reply, ResponsePayload::Text(t) if t.contains("USAGE")));
    }

    #[test]
    fn registry_has_unique_case_insensitive_names() {
        let mut names: Vec<String> = registry().iter().map(|c| c.name.to_lowercase()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("HELP").is_some());
        assert!(lookup("Broadcast").is_some());
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn admin_commands_are_flagged() {
        assert!(lookup("admin").unwrap().admin_only);
        assert!(lookup("broadcast").unwrap().admin_only);
        assert!(!lookup("ai").unwrap().admin_only);
    }
}
