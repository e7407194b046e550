//! Best-effort persistence of memory and roster.
//!
//! A background task flushes a JSON snapshot periodically and once more on
//! shutdown. Loading is attempted at startup. Every failure here degrades
//! to in-memory-only operation with a warning; core correctness never
//! depends on this module succeeding.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::error::AppResult;
use crate::memory::ConversationEntry;
use crate::state::AppState;

/// Everything worth carrying across a restart. Quiz sessions are
/// deliberately absent: they are ephemeral and time-boxed.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub memory: Vec<(String, Vec<ConversationEntry>)>,
    pub roster: Vec<String>,
}

impl Snapshot {
    pub fn capture(state: &AppState) -> Self {
        Self {
            memory: state.memory.snapshot(),
            roster: state.roster.snapshot(),
        }
    }
}

/// Write the snapshot to `path`
pub async fn save(state: &AppState, path: &str) -> AppResult<()> {
    let snapshot = Snapshot::capture(state);
    let json = serde_json::to_vec_pretty(&snapshot)?;
    fs_err::tokio::write(path, json).await?;
    log::debug!(
        "Snapshot saved: {} users, {} conversations",
        snapshot.roster.len(),
        snapshot.memory.len()
    );
    Ok(())
}

/// Load a snapshot into the state, if one exists.
/// A missing or unreadable file is not an error.
pub async fn load(state: &AppState, path: &str) {
    let bytes = match fs_err::tokio::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::info!("No snapshot restored ({e}); starting fresh");
            return;
        }
    };
    match serde_json::from_slice::<Snapshot>(&bytes) {
        Ok(snapshot) => {
            log::info!(
                "Restoring snapshot: {} users, {} conversations",
                snapshot.roster.len(),
                snapshot.memory.len()
            );
            state.memory.restore(snapshot.memory);
            state.roster.restore(snapshot.roster);
        }
        Err(e) => log::warn!("Snapshot at {path} is unreadable ({e}); starting fresh"),
    }
}

/// Spawn the periodic flush task. It flushes one final time when the
/// token is cancelled, then exits.
pub fn spawn_flush_task(state: Arc<AppState>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = config::SNAPSHOT_PATH.clone();
        let mut ticker = tokio::time::interval(config::persist::flush_interval());
        // The first tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = save(&state, &path).await {
                        log::warn!("Periodic snapshot flush failed: {e}");
                    }
                }
                _ = shutdown.cancelled() => {
                    if let Err(e) = save(&state, &path).await {
                        log::warn!("Final snapshot flush failed: {e}");
                    }
                    log::info!("Persistence task stopped");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult as TestResult;
    use crate::genai::GenClient;
    use crate::memory::Role;
    use crate::messenger::MessagingGateway;
    use async_trait::async_trait;

    struct NullGateway;

    #[async_trait]
    impl MessagingGateway for NullGateway {
        async fn send(&self, _: &str, _: &str) -> TestResult<()> {
            Ok(())
        }
        async fn send_image(&self, _: &str, _: &str, _: &str) -> TestResult<()> {
            Ok(())
        }
    }

    fn test_state() -> Arc<AppState> {
        AppState::with_admins(Arc::new(NullGateway), GenClient::new(Vec::new()), Vec::new())
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let path = path.to_str().unwrap();

        let state = test_state();
        state.roster.observe("u1");
        state.memory.append("u1", Role::User, "bonjour");
        save(&state, path).await.unwrap();

        let restored = test_state();
        load(&restored, path).await;
        assert_eq!(restored.roster.len(), 1);
        assert_eq!(restored.memory.entries_for("u1").len(), 1);
        assert_eq!(restored.memory.entries_for("u1")[0].content, "bonjour");
    }

    #[tokio::test]
    async fn missing_snapshot_is_not_an_error() {
        let state = test_state();
        load(&state, "/nonexistent/kaiwa_snapshot.json").await;
        assert_eq!(state.roster.len(), 0);
    }
}
