//! `/broadcast`: admin fan-out through the broadcast coordinator.
//!
//! Each coordinator outcome is reported distinctly so the admin always
//! knows whether anything was actually sent.

use super::{HandlerFuture, ResponsePayload};
use crate::broadcast::BroadcastOutcome;
use crate::core::config;
use crate::state::AppState;

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = args.trim();
        if body.is_empty() {
            return Ok(ResponsePayload::text(format!(
                "📢 COMMANDE BROADCAST\n\n\
                 📋 USAGE :\n/broadcast [ton message]\n\n\
                 📊 ÉTAT ACTUEL :\n\
                 • 👥 Utilisateurs : {}\n\
                 • 📱 Prêt pour diffusion\n\n\
                 ⚠️ Message limité à {} caractères, protection anti-doublon intégrée.",
                state.roster.len(),
                config::broadcast::MAX_BODY_CHARS,
            )));
        }

        if body.chars().count() > config::broadcast::MAX_BODY_CHARS {
            return Ok(ResponsePayload::text(format!(
                "❌ Message trop long ! Maximum {} caractères.\n📏 Caractères actuels : {}",
                config::broadcast::MAX_BODY_CHARS,
                body.chars().count()
            )));
        }

        let formatted = format!("📢🎌 ANNONCE OFFICIELLE !\n\n{body}\n\n⚡ Message de l'équipe Kaiwa 💖");

        log::info!(
            "Admin {sender_id} launches broadcast: '{}…'",
            body.chars().take(50).collect::<String>()
        );

        let text = match state.broadcaster.broadcast(&formatted).await {
            BroadcastOutcome::Duplicate => {
                "🚫 Broadcast bloqué - message identique envoyé récemment !".to_string()
            }
            BroadcastOutcome::InFlight => {
                "🚫 Un broadcast identique est déjà en cours d'envoi !".to_string()
            }
            BroadcastOutcome::Done {
                sent,
                total,
                errors,
            } => {
                if total == 0 {
                    "📢 Aucun utilisateur à notifier ! La liste est vide.".to_string()
                } else {
                    let success_rate = sent as f64 / total as f64 * 100.0;
                    let mut report = format!(
                        "📊 BROADCAST TERMINÉ !\n\n\
                         ✅ Envoyés : {sent}\n\
                         📱 Total destinataires : {total}\n\
                         ❌ Erreurs : {errors}\n\
                         📈 Taux de succès : {success_rate:.1}%"
                    );
                    if sent == 0 {
                        report.push_str("\n\n💡 Aucun envoi réussi ! Vérifie le token d'accès et la connectivité.");
                    } else if errors > 0 {
                        report.push_str(&format!(
                            "\n\n⚠️ {errors} erreur(s) : utilisateurs ayant bloqué le bot ou limites API."
                        ));
                    } else {
                        report.push_str("\n\n🎉 Broadcast parfaitement réussi !");
                    }
                    report
                }
            }
        };
        Ok(ResponsePayload::Text(text))
    })
}
