use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Webhook verification token
/// Read from VERIFY_TOKEN environment variable; the platform sends it back
/// during the GET handshake and we must echo the challenge only on a match.
pub static VERIFY_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("VERIFY_TOKEN").unwrap_or_else(|_| "change-me".to_string()));

/// Page access token for the outbound send API
/// Read from PAGE_ACCESS_TOKEN environment variable.
/// Empty means sends are disabled (useful for `kaiwa check` and tests).
pub static PAGE_ACCESS_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("PAGE_ACCESS_TOKEN").unwrap_or_default());

/// Base URL of the platform send API
/// Overridable via SEND_API_URL for local testing against a mock server.
pub static SEND_API_URL: Lazy<String> = Lazy::new(|| {
    env::var("SEND_API_URL")
        .unwrap_or_else(|_| "https://graph.facebook.com/v18.0/me/messages".to_string())
});

/// Administrator user IDs, comma-separated in the ADMIN_IDS environment variable
pub static ADMIN_IDS: Lazy<Vec<String>> = Lazy::new(|| {
    env::var("ADMIN_IDS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
});

/// Log file path
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "kaiwa.log".to_string()));

/// Path of the best-effort JSON snapshot (memory + roster)
pub static SNAPSHOT_PATH: Lazy<String> =
    Lazy::new(|| env::var("SNAPSHOT_PATH").unwrap_or_else(|_| "kaiwa_snapshot.json".to_string()));

/// Webhook server port
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEB_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
});

/// Conversation memory configuration
pub mod memory {
    /// Entries kept per user; the oldest is evicted past this bound.
    /// Source snapshots used 3..10 over time; 10 is the settled value.
    pub const CAPACITY: usize = 10;

    /// Maximum stored length of a single entry, in characters.
    /// Bounds the payload forwarded to the generation backends.
    pub const MAX_ENTRY_CHARS: usize = 1800;
}

/// Broadcast configuration
pub mod broadcast {
    use super::Duration;

    /// Window during which a byte-identical broadcast is refused
    pub const COOLDOWN_SECONDS: u64 = 30;

    /// Pause between consecutive recipient sends (upstream rate limits)
    pub const SEND_DELAY_MS: u64 = 250;

    /// Bounded signature history, oldest evicted first
    pub const HISTORY_CAP: usize = 10;

    /// Maximum broadcast body length, in characters
    pub const MAX_BODY_CHARS: usize = 1800;

    /// Cool-down duration
    pub fn cooldown() -> Duration {
        Duration::from_secs(COOLDOWN_SECONDS)
    }

    /// Inter-send delay duration
    pub fn send_delay() -> Duration {
        Duration::from_millis(SEND_DELAY_MS)
    }
}

/// Quiz configuration
pub mod quiz {
    use super::Duration;

    /// Seconds a quiz stays open before the expiry task resolves it
    pub const DURATION_SECS: u64 = 60;

    /// Quiz lifetime duration
    pub fn duration() -> Duration {
        Duration::from_secs(DURATION_SECS)
    }
}

/// Text-generation client configuration
pub mod genai {
    use super::Duration;

    /// Timeout of a single (backend, model) attempt (in seconds)
    pub const ATTEMPT_TIMEOUT_SECS: u64 = 20;

    /// Pause before the single retry of a failed attempt (in seconds)
    pub const RETRY_DELAY_SECS: u64 = 2;

    /// Retries per (backend, model) pair after the first attempt
    pub const MAX_RETRIES: u32 = 1;

    /// Default completion budget for free chat
    pub const CHAT_MAX_TOKENS: u32 = 200;

    /// Per-attempt timeout duration
    pub fn attempt_timeout() -> Duration {
        Duration::from_secs(ATTEMPT_TIMEOUT_SECS)
    }

    /// Retry backoff duration
    pub fn retry_delay() -> Duration {
        Duration::from_secs(RETRY_DELAY_SECS)
    }
}

/// Persistence configuration
pub mod persist {
    use super::Duration;

    /// Interval between background snapshot flushes (in seconds)
    pub const FLUSH_INTERVAL_SECS: u64 = 300;

    /// Flush interval duration
    pub fn flush_interval() -> Duration {
        Duration::from_secs(FLUSH_INTERVAL_SECS)
    }
}

/// Validation configuration
pub mod validation {
    /// Image prompt length bounds
    pub const MIN_PROMPT_CHARS: usize = 3;
    pub const MAX_PROMPT_CHARS: usize = 200;
}
