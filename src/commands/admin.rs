//! `/admin`: operator panel: counters, service probe, resets.
//!
//! Output is summarized diagnostics only; raw upstream errors never reach
//! chat, even for admins.

use super::{registry, HandlerFuture, ResponsePayload};
use crate::genai::ChatMessage;
use crate::state::AppState;

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let args = args.trim();
        let (verb, target) = match args.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb.to_lowercase(), rest.trim()),
            None => (args.to_lowercase(), ""),
        };
        let text = match verb.as_str() {
            "" => panel(state, sender_id),
            "stats" => stats(state),
            "users" => users(state),
            "quiz" => quiz(state),
            "memory" => memory(state),
            "test" => test_services(state).await,
            "reset-memory" if !target.is_empty() => {
                if state.memory.reset_user(target) {
                    log::info!("Admin {sender_id} wiped conversation memory for {target}");
                    format!("🗑️ Mémoire de {target} effacée !")
                } else {
                    format!("❓ Aucune conversation en mémoire pour {target}.")
                }
            }
            "reset-memory" => {
                let count = state.memory.reset();
                log::info!("Admin {sender_id} wiped conversation memory ({count} users)");
                format!("🗑️ Mémoire effacée ! {count} conversations supprimées.")
            }
            "reset-quiz" => {
                let count = state.quiz.reset();
                log::info!("Admin {sender_id} closed all quiz sessions ({count})");
                format!("🗑️ Quiz arrêtés ! {count} sessions fermées.")
            }
            other => format!(
                "❓ Action '{other}' inconnue !\n\nUtilise /admin sans paramètre pour voir les options disponibles."
            ),
        };
        Ok(ResponsePayload::Text(text))
    })
}

fn panel(state: &AppState, sender_id: &str) -> String {
    format!(
        "🔐 PANNEAU ADMIN\n\n\
         📊 COMMANDES DISPONIBLES :\n\
         • /admin stats - Statistiques détaillées\n\
         • /admin users - Liste des utilisateurs\n\
         • /admin quiz - Sessions de quiz actives\n\
         • /admin memory - État de la mémoire\n\
         • /admin test - Test des services\n\
         • /admin reset-memory [user] - Vider la mémoire (tout ou un utilisateur)\n\
         • /admin reset-quiz - Arrêter tous les quiz\n\
         • /broadcast [msg] - Diffusion générale\n\n\
         📈 ÉTAT ACTUEL :\n\
         👥 Utilisateurs : {}\n\
         💾 Conversations : {}\n\
         🎯 Quiz actifs : {}\n\
         🔐 Admin ID : {}\n\n\
         ✅ Système opérationnel",
        state.roster.len(),
        state.memory.user_count(),
        state.quiz.active_count(),
        sender_id,
    )
}

fn stats(state: &AppState) -> String {
    let total_users = state.roster.len();
    let sessions = state.memory.user_count();
    let total_messages = state.memory.total_entries();
    let avg = if sessions > 0 {
        total_messages as f64 / sessions as f64
    } else {
        0.0
    };
    format!(
        "📊 STATISTIQUES COMPLÈTES\n\n\
         👥 UTILISATEURS :\n\
         • Total : {total_users}\n\
         • Avec conversation : {sessions}\n\n\
         💬 CONVERSATIONS :\n\
         • Messages total : {total_messages}\n\
         • Moyenne/user : {avg:.1}\n\n\
         🎯 QUIZ :\n\
         • Sessions actives : {}\n\n\
         🛠️ COMMANDES : {} enregistrées",
        state.quiz.active_count(),
        registry().len(),
    )
}

fn users(state: &AppState) -> String {
    let users = state.roster.snapshot();
    if users.is_empty() {
        return "👥 Aucun utilisateur enregistré !".to_string();
    }

    // Cap the listing so the reply stays sendable.
    let mut text = format!("👥 LISTE DES UTILISATEURS ({}) :\n\n", users.len());
    for (i, user_id) in users.iter().take(20).enumerate() {
        let status = if state.quiz.has_open(user_id) {
            "🎯"
        } else if !state.memory.entries_for(user_id).is_empty() {
            "💬"
        } else {
            "👤"
        };
        text.push_str(&format!("{status} {}. {user_id}\n", i + 1));
    }
    if users.len() > 20 {
        text.push_str(&format!("\n... et {} autres utilisateurs", users.len() - 20));
    }
    text
}

fn quiz(state: &AppState) -> String {
    let count = state.quiz.active_count();
    if count == 0 {
        "🎯 Aucun quiz actif actuellement !".to_string()
    } else {
        format!("🎯 QUIZ ACTIFS : {count} session(s) en cours")
    }
}

fn memory(state: &AppState) -> String {
    let sessions = state.memory.user_count();
    if sessions == 0 {
        return "💾 Aucune conversation en mémoire !".to_string();
    }
    let total = state.memory.total_entries();
    format!(
        "💾 ÉTAT DE LA MÉMOIRE :\n\n\
         📊 Sessions : {sessions}\n\
         📨 Messages total : {total}\n\
         📈 Moyenne/session : {:.1}\n\
         💽 Capacité/session : {} messages max",
        total as f64 / sessions as f64,
        state.memory.capacity(),
    )
}

/// Live probe of each external service, summarized as ✅/❌ lines
async fn test_services(state: &AppState) -> String {
    let mut results = Vec::new();

    if state.genai.backends().is_empty() {
        results.push("🧠 Génération : ❌ (aucun backend configuré)".to_string());
    } else {
        let probe = state
            .genai
            .generate(&[ChatMessage::user("Test")], 10, 0.1, None)
            .await;
        results.push(format!(
            "🧠 Génération : {}",
            if probe.is_some() { "✅" } else { "❌" }
        ));
    }

    results.push(format!(
        "📱 API d'envoi : {}",
        if crate::core::config::PAGE_ACCESS_TOKEN.is_empty() {
            "❌ (token absent)"
        } else {
            "✅"
        }
    ));
    results.push(format!("💾 Mémoire : ✅ ({} sessions)", state.memory.user_count()));
    results.push(format!("👥 Roster : ✅ ({} utilisateurs)", state.roster.len()));

    format!("🔍 TESTS SYSTÈME :\n\n{}", results.join("\n"))
}
