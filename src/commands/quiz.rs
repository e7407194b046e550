//! `/quiz`: opens a timed multiple-choice session.
//!
//! Questions come from the generation backends (strict-JSON prompt) with a
//! built-in bank as the exhaustion fallback, so the command works even
//! with every backend down.

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{HandlerFuture, ResponsePayload};
use crate::genai::ChatMessage;
use crate::quiz::{QuizQuestion, QuizStart};
use crate::state::AppState;

const GENERATION_PROMPT: &str = "Génère une question de quiz de culture générale (anime, manga, \
Japon ou culture pop) en français. Réponds UNIQUEMENT avec un objet JSON strict, sans texte \
autour, de la forme : {\"question\": \"...\", \"choices\": {\"A\": \"...\", \"B\": \"...\", \
\"C\": \"...\"}, \"correct\": \"A\", \"explanation\": \"...\"}";

/// Shape expected back from the generation backend
#[derive(Deserialize)]
struct GeneratedQuestion {
    question: String,
    choices: BTreeMap<String, String>,
    correct: String,
    explanation: String,
}

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, _args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let question = generate_question(state).await.unwrap_or_else(bank_question);

        let text = match state.quiz.start(sender_id, question) {
            QuizStart::Opened(prompt) => prompt,
            QuizStart::AlreadyOpen {
                prompt,
                remaining_secs,
            } => format!(
                "⏳ Tu as déjà un quiz en cours ({remaining_secs}s restantes) !\n\n{prompt}"
            ),
        };
        Ok(ResponsePayload::Text(text))
    })
}

/// Ask a backend for a question; any shape problem falls back to the bank.
async fn generate_question(state: &AppState) -> Option<QuizQuestion> {
    let messages = [ChatMessage::user(GENERATION_PROMPT)];
    let raw = state.genai.generate(&messages, 300, 0.9, None).await?;

    // Models sometimes wrap the object in a code fence.
    let raw = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: GeneratedQuestion = match serde_json::from_str(raw) {
        Ok(q) => q,
        Err(e) => {
            log::warn!("Generated quiz question was not valid JSON: {e}");
            return None;
        }
    };

    if !parsed.choices.contains_key(&parsed.correct) || parsed.choices.len() < 2 {
        log::warn!("Generated quiz question had inconsistent choices");
        return None;
    }

    Some(QuizQuestion {
        prompt: parsed.question,
        choices: parsed.choices.into_iter().collect(),
        correct_key: parsed.correct,
        explanation: parsed.explanation,
    })
}

/// Built-in question bank, the designed degrade path
fn bank_question() -> QuizQuestion {
    let bank = [
        (
            "Quelle est la capitale du Japon ?",
            [("A", "Osaka"), ("B", "Tokyo"), ("C", "Kyoto")],
            "B",
            "Tokyo est la capitale du Japon depuis 1868.",
        ),
        (
            "Comment s'appelle le célèbre chasseur de pirates au chapeau de paille ?",
            [("A", "Luffy"), ("B", "Zoro"), ("C", "Sanji")],
            "A",
            "Monkey D. Luffy est le capitaine de l'équipage du Chapeau de paille.",
        ),
        (
            "Que signifie le mot \"nakama\" ?",
            [("A", "Rival"), ("B", "Sensei"), ("C", "Compagnon")],
            "C",
            "Nakama désigne un compagnon ou un camarade très proche.",
        ),
        (
            "Quel studio a réalisé \"Le Voyage de Chihiro\" ?",
            [("A", "Ghibli"), ("B", "Toei"), ("C", "Kyoto Animation")],
            "A",
            "Le film du studio Ghibli a remporté l'Oscar du meilleur film d'animation en 2003.",
        ),
        (
            "Comment appelle-t-on une bande dessinée japonaise ?",
            [("A", "Manhwa"), ("B", "Manga"), ("C", "Anime")],
            "B",
            "Le manga est la bande dessinée japonaise ; l'anime est sa version animée.",
        ),
    ];

    let (prompt, choices, correct, explanation) = bank
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(bank[0]);

    QuizQuestion {
        prompt: prompt.to_string(),
        choices: choices
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        correct_key: correct.to_string(),
        explanation: explanation.to_string(),
    }
}
