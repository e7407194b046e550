//! Multi-backend text-generation client with failover.
//!
//! Backends are tried in preference order, each candidate model in the
//! backend's declared order, with a bounded per-attempt timeout and a
//! single short-backoff retry per (backend, model) pair. Every failure is
//! logged and swallowed: end-user replies must never hard-fail, so total
//! exhaustion surfaces as `None` and callers supply canned fallback text.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::env;
use tokio::time::sleep;

use crate::core::config;

/// One chat turn in the completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A configured generation backend: provider endpoint plus its candidate
/// models in failover order.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub models: Vec<String>,
}

/// `POST {base_url}/chat/completions` body (OpenAI-compatible shape)
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Failover text-generation client
pub struct GenClient {
    http: reqwest::Client,
    backends: Vec<BackendConfig>,
}

impl GenClient {
    pub fn new(backends: Vec<BackendConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            backends,
        }
    }

    /// Load backends from environment variables.
    ///
    /// Recognized providers: Mistral (`MISTRAL_API_KEY`, optional
    /// `MISTRAL_API_URL` / `MISTRAL_MODELS`) and OpenRouter
    /// (`OPENROUTER_API_KEY`, optional `OPENROUTER_API_URL` /
    /// `OPENROUTER_MODELS`). Model lists are comma-separated and ordered
    /// by failover priority. An empty result is legal: `generate` then
    /// always returns `None`.
    pub fn from_env() -> Self {
        let mut backends = Vec::new();

        if let Ok(key) = env::var("MISTRAL_API_KEY") {
            if !key.is_empty() {
                backends.push(BackendConfig {
                    name: "mistral".to_string(),
                    base_url: env::var("MISTRAL_API_URL")
                        .unwrap_or_else(|_| "https://api.mistral.ai/v1".to_string()),
                    api_key: key,
                    models: models_from_env(
                        "MISTRAL_MODELS",
                        &["mistral-small-latest", "open-mistral-7b"],
                    ),
                });
            }
        }

        if let Ok(key) = env::var("OPENROUTER_API_KEY") {
            if !key.is_empty() {
                backends.push(BackendConfig {
                    name: "openrouter".to_string(),
                    base_url: env::var("OPENROUTER_API_URL")
                        .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
                    api_key: key,
                    models: models_from_env(
                        "OPENROUTER_MODELS",
                        &["mistralai/mistral-small", "meta-llama/llama-3.1-8b-instruct"],
                    ),
                });
            }
        }

        Self::new(backends)
    }

    pub fn backends(&self) -> &[BackendConfig] {
        &self.backends
    }

    /// Generate a completion, failing over across every (backend, model)
    /// pair. Returns the first successful text, or `None` once every pair
    /// is exhausted.
    ///
    /// Backends whose name matches `preference_hint` are tried first; the
    /// rest are shuffled per call to spread load across providers.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
        preference_hint: Option<&str>,
    ) -> Option<String> {
        for backend in self.ordered_backends(preference_hint) {
            for model in &backend.models {
                for attempt in 0..=config::genai::MAX_RETRIES {
                    match self
                        .try_once(backend, model, messages, max_tokens, temperature)
                        .await
                    {
                        Ok(text) => {
                            log::info!(
                                "Generation served by {}/{} (attempt {})",
                                backend.name,
                                model,
                                attempt + 1
                            );
                            return Some(text);
                        }
                        Err(reason) => {
                            log::warn!(
                                "Generation attempt {} via {}/{} failed: {}",
                                attempt + 1,
                                backend.name,
                                model,
                                reason
                            );
                            if attempt < config::genai::MAX_RETRIES {
                                sleep(config::genai::retry_delay()).await;
                            }
                        }
                    }
                }
            }
        }
        log::warn!("All generation backends exhausted, returning no result");
        None
    }

    /// Backends reordered for one call: hinted ones first, remainder in
    /// random order.
    fn ordered_backends(&self, preference_hint: Option<&str>) -> Vec<&BackendConfig> {
        let (mut preferred, mut rest): (Vec<&BackendConfig>, Vec<&BackendConfig>) = self
            .backends
            .iter()
            .partition(|b| preference_hint.is_some_and(|hint| b.name.eq_ignore_ascii_case(hint)));
        rest.shuffle(&mut rand::thread_rng());
        preferred.extend(rest);
        preferred
    }

    /// One bounded attempt against a single (backend, model) pair.
    /// Any transport, status, decode or empty-text condition is an error
    /// string for the failover loop to log.
    async fn try_once(
        &self,
        backend: &BackendConfig,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, String> {
        let body = CompletionRequest {
            model,
            messages,
            max_tokens,
            temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", backend.base_url))
            .bearer_auth(&backend.api_key)
            .timeout(config::genai::attempt_timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("transport: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| format!("decode: {e}"))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            Err("empty completion".to_string())
        } else {
            Ok(text)
        }
    }
}

fn models_from_env(var: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(list) if !list.trim().is_empty() => list
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect(),
        _ => defaults.iter().map(|m| m.to_string()).collect(),
    }
}
