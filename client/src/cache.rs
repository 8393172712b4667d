//! Client-side balance cache.
//!
//! A UI-latency mirror, not a source of truth: debits and credits are applied
//! optimistically as the user plays, and the cache is reconciled against the
//! server-authoritative balance on a poll. On any mismatch the server value
//! wins.

use std::time::{Duration, Instant};

use bingoo_types::UserId;
use tracing::debug;

use crate::{Client, Result};

/// Optimistic mirror of one user's point balance.
pub struct BalanceCache {
    user: UserId,
    points: u64,
    last_reconciled: Option<Instant>,
    max_age: Duration,
}

impl BalanceCache {
    pub fn new(user: UserId, max_age: Duration) -> Self {
        Self {
            user,
            points: 0,
            last_reconciled: None,
            max_age,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// The locally mirrored balance. May lag or lead the server value until
    /// the next reconcile.
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Optimistically apply a debit (bet placed, withdrawal requested).
    pub fn apply_debit(&mut self, amount: u64) {
        self.points = self.points.saturating_sub(amount);
    }

    /// Optimistically apply a credit (prize won, deposit made).
    pub fn apply_credit(&mut self, amount: u64) {
        self.points = self.points.saturating_add(amount);
    }

    /// Adopt a server-authoritative value. The server always wins.
    pub fn observe(&mut self, server_points: u64) {
        if self.points != server_points {
            debug!(
                user = %self.user,
                local = self.points,
                server = server_points,
                "balance cache corrected"
            );
        }
        self.points = server_points;
        self.last_reconciled = Some(Instant::now());
    }

    /// Whether the mirror is due for a reconcile.
    pub fn is_stale(&self) -> bool {
        match self.last_reconciled {
            Some(at) => at.elapsed() >= self.max_age,
            None => true,
        }
    }

    /// Fetch the authoritative balance and adopt it.
    pub async fn reconcile(&mut self, client: &Client) -> Result<u64> {
        let response = client.balance(&self.user).await?;
        self.observe(response.points);
        Ok(self.points)
    }

    /// Reconcile only when the mirror has aged past its window.
    pub async fn reconcile_if_stale(&mut self, client: &Client) -> Result<u64> {
        if self.is_stale() {
            self.reconcile(client).await
        } else {
            Ok(self.points)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> BalanceCache {
        BalanceCache::new("alice".to_string(), Duration::from_secs(5))
    }

    #[test]
    fn starts_stale_and_empty() {
        let cache = cache();
        assert_eq!(cache.points(), 0);
        assert!(cache.is_stale());
    }

    #[test]
    fn optimistic_updates_apply_locally() {
        let mut cache = cache();
        cache.observe(100);
        cache.apply_debit(30);
        cache.apply_credit(10);
        assert_eq!(cache.points(), 80);

        // Debits saturate instead of underflowing.
        cache.apply_debit(1_000);
        assert_eq!(cache.points(), 0);
    }

    #[test]
    fn server_value_wins_on_observe() {
        let mut cache = cache();
        cache.observe(100);
        cache.apply_debit(30);

        // The optimistic mirror drifted; the authoritative value replaces it.
        cache.observe(95);
        assert_eq!(cache.points(), 95);
        assert!(!cache.is_stale());
    }

    #[test]
    fn staleness_follows_max_age() {
        let mut cache = BalanceCache::new("alice".to_string(), Duration::ZERO);
        cache.observe(10);
        // A zero window is immediately stale again.
        assert!(cache.is_stale());
    }
}
