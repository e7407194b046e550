//! `/image`: AI image generation via a seeded prompt URL.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{HandlerFuture, ResponsePayload};
use crate::core::config;
use crate::state::AppState;

const USAGE: &str = "🎨🎌 GÉNÉRATEUR D'IMAGES IA ! 🎌🎨\n\n\
🖼️ /image [description] - Génère ton image\n\
🌸 /image cute cat wearing hat - Exemple\n\
⚡ /image random - Surprise aléatoire\n\
🎭 /image styles - Voir les styles\n\n\
✨ Décris ton imagination, je la crée ! 💖";

const STYLES: &str = "🎨 STYLES DISPONIBLES :\n\n\
🌸 anime - Style anime classique\n\
⚡ realistic - Photo-réaliste\n\
🔥 cyberpunk - Futuriste néon\n\
🌙 fantasy - Monde magique\n\
🎭 artistic - Style artistique\n\
🌈 colorful - Explosion de couleurs\n\n\
💡 Combine les styles : \"anime cyberpunk girl\" ✨";

const RANDOM_THEMES: &[&str] = &[
    "beautiful landscape with mountains and sunset",
    "cute cat wearing a wizard hat with magical sparkles",
    "futuristic cyberpunk city with neon lights at night",
    "fantasy dragon flying over a medieval castle",
    "peaceful forest with sunlight filtering through trees",
    "space scene with planets and galaxies",
];

const FORBIDDEN_WORDS: &[&str] = &["nsfw", "nude", "explicit", "xxx", "sexual", "porn"];

pub fn execute<'a>(_state: &'a AppState, _sender_id: &'a str, args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move {
        let mut prompt = args.trim().to_lowercase();
        if prompt.is_empty() {
            return Ok(ResponsePayload::text(USAGE));
        }
        if prompt == "styles" {
            return Ok(ResponsePayload::text(STYLES));
        }
        if prompt == "random" {
            prompt = RANDOM_THEMES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(RANDOM_THEMES[0])
                .to_string();
        }

        if let Err(reason) = validate_prompt(&prompt) {
            return Ok(ResponsePayload::text(format!("❌ {reason}")));
        }

        let enhanced = format!("high quality, detailed, beautiful, {prompt}, masterpiece");
        let seed: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        let url = format!(
            "https://image.pollinations.ai/prompt/{}?width=768&height=768&seed={}&enhance=true&nologo=true",
            urlencoding::encode(&enhanced),
            seed
        );

        Ok(ResponsePayload::Image {
            url,
            caption: format!("🎨 Voilà ton image : \"{prompt}\" ✨"),
        })
    })
}

/// Length and banned-word checks on an image prompt
fn validate_prompt(prompt: &str) -> Result<(), String> {
    let chars = prompt.chars().count();
    if chars < config::validation::MIN_PROMPT_CHARS {
        return Err(format!(
            "Description trop courte ! Minimum {} caractères ! 📝",
            config::validation::MIN_PROMPT_CHARS
        ));
    }
    if chars > config::validation::MAX_PROMPT_CHARS {
        return Err(format!(
            "Description trop longue ! Maximum {} caractères ! ✂️",
            config::validation::MAX_PROMPT_CHARS
        ));
    }
    if FORBIDDEN_WORDS.iter().any(|w| prompt.contains(w)) {
        return Err("🚫 Contenu inapproprié détecté ! Reste respectueux ! 🌸".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_short_and_long_prompts() {
        assert!(validate_prompt("ab").is_err());
        assert!(validate_prompt(&"x".repeat(201)).is_err());
        assert!(validate_prompt("a sunset over tokyo").is_ok());
    }

    #[test]
    fn validate_rejects_forbidden_words() {
        assert!(validate_prompt("some nsfw thing").is_err());
    }
}
