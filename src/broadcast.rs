//! Idempotent mass-broadcast coordinator.
//!
//! Concurrent triggers of the same message body must collapse into one
//! effective send. Dedup is keyed by a signature of (body, recipient count
//! at send time): a signature seen within the cool-down window is refused,
//! and a signature currently in flight is refused distinctly, so the admin
//! can tell "already sent" from "still sending". The record is written
//! *before* the delivery loop starts; a second trigger arriving mid-send
//! observes it and backs off instead of racing.

use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::core::config;
use crate::messenger::MessagingGateway;
use crate::roster::RecipientRoster;

/// Result of one broadcast attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Delivery loop ran; `errors` counts recipients that failed
    Done {
        sent: usize,
        total: usize,
        errors: usize,
    },
    /// Identical signature already sent within the cool-down window
    Duplicate,
    /// Identical signature currently being delivered
    InFlight,
}

struct DedupState {
    /// Bounded (signature, sent_at) history, oldest first
    history: VecDeque<(String, Instant)>,
    /// Signatures with a delivery loop currently running
    in_flight: HashSet<String>,
}

/// Fan-out sender with de-duplication and per-signature mutual exclusion
pub struct Broadcaster {
    gateway: Arc<dyn MessagingGateway>,
    roster: Arc<RecipientRoster>,
    dedup: Mutex<DedupState>,
    cooldown: Duration,
    send_delay: Duration,
}

impl Broadcaster {
    pub fn new(gateway: Arc<dyn MessagingGateway>, roster: Arc<RecipientRoster>) -> Self {
        Self::with_timing(
            gateway,
            roster,
            config::broadcast::cooldown(),
            config::broadcast::send_delay(),
        )
    }

    /// Constructor with explicit timing, used by tests to avoid real waits
    pub fn with_timing(
        gateway: Arc<dyn MessagingGateway>,
        roster: Arc<RecipientRoster>,
        cooldown: Duration,
        send_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            roster,
            dedup: Mutex::new(DedupState {
                history: VecDeque::with_capacity(config::broadcast::HISTORY_CAP),
                in_flight: HashSet::new(),
            }),
            cooldown,
            send_delay,
        }
    }

    /// Send `body` to every known recipient.
    ///
    /// Never raises to the caller: per-recipient failures are counted and
    /// the loop continues. An empty roster returns zeros without recording
    /// a dedup entry (nothing was sent, nothing to deduplicate).
    pub async fn broadcast(&self, body: &str) -> BroadcastOutcome {
        let recipients = self.roster.snapshot();
        if recipients.is_empty() {
            return BroadcastOutcome::Done {
                sent: 0,
                total: 0,
                errors: 0,
            };
        }

        let signature = signature_of(body, recipients.len());

        {
            let mut dedup = self.dedup.lock().await;
            let now = Instant::now();
            dedup
                .history
                .retain(|(_, sent_at)| now.duration_since(*sent_at) < self.cooldown);

            if dedup.in_flight.contains(&signature) {
                log::info!("Broadcast {} refused: identical send in flight", &signature[..12]);
                return BroadcastOutcome::InFlight;
            }
            if dedup.history.iter().any(|(sig, _)| *sig == signature) {
                log::info!("Broadcast {} refused: duplicate within cool-down", &signature[..12]);
                return BroadcastOutcome::Duplicate;
            }

            // Recorded before delivery starts so a concurrent identical
            // trigger refuses instead of racing.
            dedup.history.push_back((signature.clone(), now));
            while dedup.history.len() > config::broadcast::HISTORY_CAP {
                dedup.history.pop_front();
            }
            dedup.in_flight.insert(signature.clone());
        }

        log::info!(
            "Broadcast {} starting: {} recipient(s)",
            &signature[..12],
            recipients.len()
        );

        let total = recipients.len();
        let mut sent = 0;
        let mut errors = 0;
        for (idx, recipient) in recipients.iter().enumerate() {
            match self.gateway.send(recipient, body).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    errors += 1;
                    log::warn!("Broadcast send to {recipient} failed: {e}");
                }
            }
            if idx + 1 < total {
                sleep(self.send_delay).await;
            }
        }

        self.dedup.lock().await.in_flight.remove(&signature);

        log::info!(
            "Broadcast {} finished: sent={} total={} errors={}",
            &signature[..12],
            sent,
            total,
            errors
        );
        BroadcastOutcome::Done {
            sent,
            total,
            errors,
        }
    }
}

/// Deterministic fingerprint of message body + recipient count
fn signature_of(body: &str, recipient_count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hasher.update(b":");
    hasher.update(recipient_count.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
