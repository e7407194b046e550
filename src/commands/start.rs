//! `/start`: model-generated self-introduction with a static fallback.

use super::{HandlerFuture, ResponsePayload};
use crate::genai::ChatMessage;
use crate::state::AppState;

const FALLBACK: &str = "🌟 Salut ! Je suis Kaiwa, ton assistant IA personnel !\n\n\
🤖 Je peux t'aider avec :\n\
• 💬 Conversations intelligentes\n\
• 🎨 Génération d'images\n\
• 🎯 Quiz chronométrés\n\
• 💾 Et bien plus encore !\n\n\
✨ Tape /help pour découvrir toutes mes commandes !";

pub fn execute<'a>(state: &'a AppState, _sender_id: &'a str, _args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let messages = [
            ChatMessage::system(
                "Tu es Kaiwa, un assistant IA sympathique. Présente-toi avec joie en français. \
                 INTERDIT : aucune description d'action entre *étoiles*. \
                 Parle directement, maximum 300 caractères.",
            ),
            ChatMessage::user("Présente-toi !"),
        ];

        let text = match state.genai.generate(&messages, 150, 0.9, None).await {
            Some(mut intro) => {
                if !intro.to_lowercase().contains("/help") {
                    intro.push_str("\n\n✨ Tape /help pour découvrir toutes mes fonctionnalités !");
                }
                intro
            }
            None => FALLBACK.to_string(),
        };
        Ok(ResponsePayload::Text(text))
    })
}
