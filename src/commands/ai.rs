//! Free chat with the generation backends.

use rand::seq::SliceRandom;

use super::{HandlerFuture, ResponsePayload};
use crate::core::config;
use crate::genai::ChatMessage;
use crate::memory::Role;
use crate::state::AppState;

/// Persona prompt sent as the system turn of every free-chat request
const PERSONA: &str = "Tu es Kaiwa, un compagnon IA sympathique et utile. \
Réponds en français de manière naturelle et amicale. \
STRICTEMENT INTERDIT : aucune description d'action entre *étoiles*. \
Parle directement comme un vrai assistant, maximum 400 caractères. \
Reste professionnel mais chaleureux.";

/// Conversation starters shown when `/ai` is called without text
const TOPICS: &[&str] = &[
    "Quel est ton anime préféré ? 🎌",
    "Raconte-moi ton personnage favori ! ⭐",
    "Manga ou anime ? Et pourquoi ? 🤔",
    "Quelle série regardes-tu en ce moment ? 📺",
    "Parle-moi de tes hobbies ! 🎮",
];

const CREATOR_KEYWORDS: &[&str] = &["créateur", "createur", "qui t'a créé", "qui t'a fait", "developer"];

/// Canned degrade reply for total backend exhaustion
const NO_RESULT: &str = "💭 Mon cerveau IA a un petit bug ! Peux-tu répéter s'il te plaît ? 🔄";

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let args = args.trim();
        if args.is_empty() {
            let topic = TOPICS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(TOPICS[0]);
            return Ok(ResponsePayload::text(format!("💭 {topic} ✨")));
        }

        let lowered = args.to_lowercase();
        if CREATOR_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return Ok(ResponsePayload::text(
                "🎌 Mon créateur m'a donné vie pour être votre compagnon IA ! ✨ Tape /help pour voir ce que je sais faire 💖",
            ));
        }

        let mut messages = vec![ChatMessage::system(PERSONA)];
        messages.extend(state.memory.context_for(sender_id));
        messages.push(ChatMessage::user(args));

        match state
            .genai
            .generate(&messages, config::genai::CHAT_MAX_TOKENS, 0.8, None)
            .await
        {
            Some(reply) => {
                state.memory.append(sender_id, Role::Bot, &reply);
                Ok(ResponsePayload::text(format!("🤖 {reply}")))
            }
            None => Ok(ResponsePayload::text(NO_RESULT)),
        }
    })
}
