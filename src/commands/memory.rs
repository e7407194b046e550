//! `/memory`: shows the caller their remembered conversation turns.

use super::{HandlerFuture, ResponsePayload};
use crate::memory::Role;
use crate::state::AppState;

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, _args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let entries = state.memory.entries_for(sender_id);
        if entries.is_empty() {
            return Ok(ResponsePayload::text(
                "💾 Aucune conversation précédente ! C'est notre premier échange ! ✨",
            ));
        }

        let mut text = String::from("💾🎌 MÉMOIRE DE NOS CONVERSATIONS !\n\n");
        for (i, entry) in entries.iter().enumerate() {
            let emoji = match entry.role {
                Role::User => "🗨️",
                Role::Bot => "🤖",
            };
            let preview: String = entry.content.chars().take(60).collect();
            let ellipsis = if entry.content.chars().count() > 60 { "..." } else { "" };
            text.push_str(&format!("{emoji} {}. {preview}{ellipsis}\n", i + 1));
        }

        text.push_str(&format!(
            "\n💭 {}/{} messages sauvegardés",
            entries.len(),
            state.memory.capacity()
        ));

        if state.quiz.has_open(sender_id) {
            text.push_str("\n🎯 Un quiz est en cours !");
        }

        if let Some(last) = entries.last() {
            text.push_str(&format!(
                "\n🕐 Dernière activité : {}",
                last.timestamp.format("%d/%m %H:%M")
            ));
        }

        text.push_str(&format!(
            "\n\n💡 La mémoire se vide automatiquement après {} messages !",
            state.memory.capacity()
        ));
        Ok(ResponsePayload::Text(text))
    })
}
