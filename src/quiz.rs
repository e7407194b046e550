//! Short-lived interactive quiz sessions with timeout-driven resolution.
//!
//! A user has at most one open session. Two paths can close it: the
//! owner's next inbound message, or the expiry task spawned at start.
//! Both paths funnel through a compare-and-swap on the session's
//! `resolved` flag, so exactly one wins; the loser is a no-op. Terminal
//! sessions are removed from the live map immediately, there is no
//! re-entrant state.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::config;
use crate::messenger::MessagingGateway;

/// One multiple-choice question
#[derive(Debug, Clone)]
pub struct QuizQuestion {
    pub prompt: String,
    /// (key, text) pairs in display order, e.g. ("A", "Tokyo")
    pub choices: Vec<(String, String)>,
    pub correct_key: String,
    pub explanation: String,
}

impl QuizQuestion {
    /// The question rendered as a sendable prompt
    pub fn render(&self) -> String {
        let mut text = format!("🎯 QUIZ !\n\n{}\n\n", self.prompt);
        for (key, choice) in &self.choices {
            text.push_str(&format!("{key}) {choice}\n"));
        }
        text.push_str(&format!(
            "\n⏱️ Tu as {} secondes ! Réponds avec la lettre de ton choix.",
            config::quiz::DURATION_SECS
        ));
        text
    }

    fn is_valid_key(&self, answer: &str) -> bool {
        self.choices
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(answer))
    }

    fn is_correct(&self, answer: &str) -> bool {
        self.correct_key.eq_ignore_ascii_case(answer)
    }
}

/// Live session state. `resolved` is the single-resolution guard shared
/// with the expiry task.
struct QuizSession {
    question: QuizQuestion,
    expires_at: Instant,
    resolved: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Per-user quiz coordinator
pub struct QuizEngine {
    sessions: DashMap<String, Arc<QuizSession>>,
    gateway: Arc<dyn MessagingGateway>,
    duration: Duration,
}

/// Result of a quiz-start attempt
pub enum QuizStart {
    /// New session opened; send this prompt
    Opened(String),
    /// A session is already open; re-shows it with remaining time
    AlreadyOpen { prompt: String, remaining_secs: u64 },
}

impl QuizEngine {
    pub fn new(gateway: Arc<dyn MessagingGateway>) -> Self {
        Self::with_duration(gateway, config::quiz::duration())
    }

    /// Constructor with explicit lifetime, used by tests
    pub fn with_duration(gateway: Arc<dyn MessagingGateway>, duration: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            gateway,
            duration,
        }
    }

    /// Open a session for `owner`, or re-show the one still open.
    ///
    /// Insertion goes through the map entry so two concurrent starts for
    /// the same owner (a duplicated webhook delivery) cannot both pass an
    /// is-open check and orphan a timer; one wins the slot, the other
    /// sees it occupied.
    pub fn start(self: &Arc<Self>, owner: &str, question: QuizQuestion) -> QuizStart {
        let prompt = question.render();
        let session = match self.sessions.entry(owner.to_string()) {
            Entry::Occupied(slot) => {
                let existing = slot.get();
                let remaining = existing
                    .expires_at
                    .saturating_duration_since(Instant::now())
                    .as_secs();
                return QuizStart::AlreadyOpen {
                    prompt: existing.question.render(),
                    remaining_secs: remaining,
                };
            }
            Entry::Vacant(slot) => {
                let session = Arc::new(QuizSession {
                    question,
                    expires_at: Instant::now() + self.duration,
                    resolved: Arc::new(AtomicBool::new(false)),
                    timer: Mutex::new(None),
                });
                slot.insert(Arc::clone(&session));
                session
            }
        };

        let engine = Arc::clone(self);
        let owner = owner.to_string();
        let duration = self.duration;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            engine.expire(&owner).await;
        });
        if let Ok(mut timer) = session.timer.lock() {
            *timer = Some(handle);
        }

        QuizStart::Opened(prompt)
    }

    /// Consume an inbound message from `owner` against their open session.
    ///
    /// Returns the verdict reply if a session was open and this path won
    /// the resolution race, `None` otherwise (no session, or the expiry
    /// task got there first).
    pub fn answer(&self, owner: &str, text: &str) -> Option<String> {
        let session = self.sessions.get(owner).map(|s| Arc::clone(&s))?;

        if session
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Expiry won; it also removes the session.
            return None;
        }

        self.sessions.remove(owner);
        if let Ok(mut timer) = session.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }

        let answer = text.trim();
        let question = &session.question;
        let reply = if question.is_correct(answer) {
            format!(
                "✅ Bonne réponse ! C'était bien {}.\n\n💡 {}",
                question.correct_key, question.explanation
            )
        } else if question.is_valid_key(answer) {
            format!(
                "❌ Raté ! La bonne réponse était {}.\n\n💡 {}",
                question.correct_key, question.explanation
            )
        } else {
            // Any non-choice text still consumes the session: no
            // free-rolling by spamming guesses.
            format!(
                "❌ \"{}\" n'est pas une réponse valide, le quiz est terminé. La bonne réponse était {}.\n\n💡 {}",
                answer, question.correct_key, question.explanation
            )
        };
        log::info!("Quiz for {owner} resolved by answer");
        Some(reply)
    }

    /// Timeout path: proactively sends the answer if the reply path has
    /// not already resolved the session. Called by the spawned timer, and
    /// directly by tests to force the race.
    pub async fn expire(&self, owner: &str) {
        let Some(session) = self.sessions.get(owner).map(|s| Arc::clone(&s)) else {
            return;
        };

        if session
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.sessions.remove(owner);
        let question = &session.question;
        let reply = format!(
            "⏰ Temps écoulé ! La bonne réponse était {}.\n\n💡 {}",
            question.correct_key, question.explanation
        );
        log::info!("Quiz for {owner} resolved by timeout");
        if let Err(e) = self.gateway.send(owner, &reply).await {
            log::warn!("Failed to send quiz timeout reply to {owner}: {e}");
        }
    }

    /// Whether `owner` currently has an open session
    pub fn has_open(&self, owner: &str) -> bool {
        self.sessions.contains_key(owner)
    }

    /// Number of open sessions
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Admin wipe. Aborts pending timers; returns sessions closed.
    pub fn reset(&self) -> usize {
        let mut count = 0;
        let owners: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        for owner in owners {
            if let Some((_, session)) = self.sessions.remove(&owner) {
                session.resolved.store(true, Ordering::Release);
                if let Ok(mut timer) = session.timer.lock() {
                    if let Some(handle) = timer.take() {
                        handle.abort();
                    }
                }
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct RecordingGateway {
        sends: AtomicUsize,
    }

    impl RecordingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn send(&self, _: &str, _: &str) -> AppResult<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_image(&self, _: &str, _: &str, _: &str) -> AppResult<()> {
            Ok(())
        }
    }

    fn question() -> QuizQuestion {
        QuizQuestion {
            prompt: "Capitale du Japon ?".to_string(),
            choices: vec![
                ("A".to_string(), "Osaka".to_string()),
                ("B".to_string(), "Tokyo".to_string()),
                ("C".to_string(), "Kyoto".to_string()),
            ],
            correct_key: "B".to_string(),
            explanation: "Tokyo est la capitale depuis 1868.".to_string(),
        }
    }

    fn engine(gateway: Arc<RecordingGateway>, secs: u64) -> Arc<QuizEngine> {
        Arc::new(QuizEngine::with_duration(gateway, Duration::from_secs(secs)))
    }

    #[tokio::test]
    async fn correct_answer_resolves_and_removes_session() {
        let gateway = RecordingGateway::new();
        let engine = engine(Arc::clone(&gateway), 60);
        assert!(matches!(engine.start("u1", question()), QuizStart::Opened(_)));

        let reply = engine.answer("u1", "b").unwrap();
        assert!(reply.contains("Bonne réponse"));
        assert!(reply.contains("Tokyo est la capitale"));
        assert!(!engine.has_open("u1"));

        // A later duplicate answer finds no quiz.
        assert_eq!(engine.answer("u1", "B"), None);
    }

    #[tokio::test]
    async fn wrong_or_invalid_answer_consumes_session() {
        let gateway = RecordingGateway::new();
        let engine = engine(Arc::clone(&gateway), 60);
        engine.start("u1", question());
        let reply = engine.answer("u1", "A").unwrap();
        assert!(reply.contains("Raté"));
        assert!(!engine.has_open("u1"));

        engine.start("u1", question());
        let reply = engine.answer("u1", "n'importe quoi").unwrap();
        assert!(reply.contains("pas une réponse valide"));
        assert!(!engine.has_open("u1"));
    }

    #[tokio::test]
    async fn second_start_returns_open_prompt() {
        let gateway = RecordingGateway::new();
        let engine = engine(Arc::clone(&gateway), 60);
        engine.start("u1", question());
        match engine.start("u1", question()) {
            QuizStart::AlreadyOpen { remaining_secs, .. } => {
                assert!(remaining_secs <= 60);
            }
            QuizStart::Opened(_) => panic!("second start must not open a new session"),
        }
        assert_eq!(engine.active_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_starts_open_exactly_one_session() {
        for _ in 0..50 {
            let gateway = RecordingGateway::new();
            let engine = engine(Arc::clone(&gateway), 60);
            let first = Arc::clone(&engine);
            let second = Arc::clone(&engine);
            let (a, b) = tokio::join!(
                tokio::spawn(
                    async move { matches!(first.start("u1", question()), QuizStart::Opened(_)) }
                ),
                tokio::spawn(
                    async move { matches!(second.start("u1", question()), QuizStart::Opened(_)) }
                ),
            );
            let opened = a.unwrap() as usize + b.unwrap() as usize;
            assert_eq!(opened, 1, "exactly one start may open a session");
            assert_eq!(engine.active_count(), 1);
            engine.reset();
        }
    }

    #[tokio::test]
    async fn expiry_sends_answer_exactly_once() {
        let gateway = RecordingGateway::new();
        let engine = engine(Arc::clone(&gateway), 60);
        engine.start("u1", question());

        engine.expire("u1").await;
        assert_eq!(gateway.sends.load(Ordering::SeqCst), 1);
        assert!(!engine.has_open("u1"));

        // Second expiry is a no-op: the session is gone.
        engine.expire("u1").await;
        assert_eq!(gateway.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn answer_and_expiry_race_resolves_exactly_once() {
        for _ in 0..50 {
            let gateway = RecordingGateway::new();
            let engine = engine(Arc::clone(&gateway), 60);
            engine.start("u1", question());

            let racing = Arc::clone(&engine);
            let expiry = tokio::spawn(async move { racing.expire("u1").await });
            let reply = engine.answer("u1", "B");
            expiry.await.unwrap();

            let timeout_sends = gateway.sends.load(Ordering::SeqCst);
            // Exactly one path produced output.
            assert_eq!(
                reply.is_some() as usize + timeout_sends,
                1,
                "reply={reply:?} timeout_sends={timeout_sends}"
            );
            assert!(!engine.has_open("u1"));
        }
    }

    #[tokio::test]
    async fn short_timer_fires_on_its_own() {
        let gateway = RecordingGateway::new();
        let engine = Arc::new(QuizEngine::with_duration(
            Arc::clone(&gateway) as Arc<dyn MessagingGateway>,
            Duration::from_millis(20),
        ));
        engine.start("u1", question());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(gateway.sends.load(Ordering::SeqCst), 1);
        assert!(!engine.has_open("u1"));
    }

    #[tokio::test]
    async fn reset_aborts_open_sessions() {
        let gateway = RecordingGateway::new();
        let engine = engine(Arc::clone(&gateway), 60);
        engine.start("u1", question());
        engine.start("u2", question());
        assert_eq!(engine.reset(), 2);
        assert_eq!(engine.active_count(), 0);
    }
}
