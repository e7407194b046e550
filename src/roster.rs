//! Roster of every user the bot has ever heard from.
//!
//! Grows monotonically; broadcast reads an owned snapshot so arrivals
//! during a delivery loop never affect it.

use dashmap::DashSet;

#[derive(Default)]
pub struct RecipientRoster {
    users: DashSet<String>,
}

impl RecipientRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sender. Returns true if the user is new.
    pub fn observe(&self, user_id: &str) -> bool {
        self.users.insert(user_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Copy-on-read snapshot for the broadcast delivery loop
    pub fn snapshot(&self) -> Vec<String> {
        self.users.iter().map(|u| u.key().clone()).collect()
    }

    /// Restore from a persisted snapshot
    pub fn restore(&self, users: Vec<String>) {
        for user in users {
            self.users.insert(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_is_idempotent() {
        let roster = RecipientRoster::new();
        assert!(roster.observe("u1"));
        assert!(!roster.observe("u1"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let roster = RecipientRoster::new();
        roster.observe("u1");
        let snap = roster.snapshot();
        roster.observe("u2");
        assert_eq!(snap.len(), 1);
        assert_eq!(roster.len(), 2);
    }
}
