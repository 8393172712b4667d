//! Settlement: bet debits and prize credits against the ledger.
//!
//! Debits fail closed: any failure aborts the session start before a board
//! exists. Credits settle an outcome that is already fixed in the session
//! record, so transient write failures are retried with jittered backoff and
//! idempotency is guaranteed by the ledger's per-session WIN keying.

use std::sync::Arc;
use std::time::Duration;

use bingoo_types::{Transaction, UserId};
use rand::{Rng, RngCore};
use tracing::{debug, warn};

use crate::ledger::{Ledger, LedgerError};

/// Retry schedule for prize credits.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_millis(50),
        }
    }
}

pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    // "Equal jitter": delay is in [backoff/2, backoff].
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Ledger front door for the engine.
pub struct Settlement<L> {
    ledger: Arc<L>,
    retry: RetryPolicy,
}

impl<L: Ledger> Settlement<L> {
    pub fn new(ledger: Arc<L>, retry: RetryPolicy) -> Self {
        Self { ledger, retry }
    }

    /// Debit the bet for a new session. No retry: a failed debit aborts the
    /// start with no side effects.
    pub async fn place_bet(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        let tx = self.ledger.debit_bet(user, amount, session_id).await?;
        debug!(user = %user, session_id, amount, tx_id = tx.id, "bet debited");
        Ok(tx)
    }

    /// Credit the prize for a won session, retrying transient write failures.
    ///
    /// The amount must equal the prize recorded on the session; the outcome
    /// was fixed at board generation, so every attempt submits the same
    /// credit and the ledger deduplicates on session id.
    pub async fn award_prize(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        let mut delay = self.retry.base_delay;
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.ledger.credit_prize(user, amount, session_id).await {
                Ok(tx) => {
                    debug!(user = %user, session_id, amount, tx_id = tx.id, "prize credited");
                    return Ok(tx);
                }
                Err(LedgerError::WriteFailed(reason)) if attempt < attempts => {
                    warn!(
                        user = %user,
                        session_id,
                        attempt,
                        %reason,
                        "prize credit failed, retrying"
                    );
                    let sleep_for = jittered_backoff(&mut rand::thread_rng(), delay);
                    tokio::time::sleep(sleep_for).await;
                    delay = delay.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::mocks::FlakyLedger;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn alice() -> UserId {
        "alice".to_string()
    }

    #[test]
    fn backoff_stays_within_equal_jitter_window() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let delay = jittered_backoff(&mut rng, Duration::from_millis(100));
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(100));
        }
        assert_eq!(
            jittered_backoff(&mut rng, Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[tokio::test]
    async fn award_retries_through_transient_failures() {
        let ledger = Arc::new(FlakyLedger::new(MemoryLedger::new(), 2));
        let settlement = Settlement::new(
            ledger.clone(),
            RetryPolicy {
                attempts: 4,
                base_delay: Duration::from_millis(1),
            },
        );

        let tx = settlement.award_prize(&alice(), 100, 9).await.unwrap();
        assert_eq!(tx.amount, 100);
        assert_eq!(ledger.balance(&alice()).await.unwrap(), 100);
        assert_eq!(ledger.credit_attempts(), 3);
    }

    #[tokio::test]
    async fn award_gives_up_after_exhausting_attempts() {
        let ledger = Arc::new(FlakyLedger::new(MemoryLedger::new(), 10));
        let settlement = Settlement::new(
            ledger.clone(),
            RetryPolicy {
                attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        );

        let err = settlement.award_prize(&alice(), 100, 9).await.unwrap_err();
        assert!(matches!(err, LedgerError::WriteFailed(_)));
        assert_eq!(ledger.balance(&alice()).await.unwrap(), 0);

        // The outcome is still settleable later: once the fault clears, the
        // same credit lands exactly once.
        ledger.clear_faults();
        let tx = settlement.award_prize(&alice(), 100, 9).await.unwrap();
        assert_eq!(tx.amount, 100);
        assert_eq!(ledger.balance(&alice()).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn failed_debit_aborts_without_retry() {
        let ledger = Arc::new(MemoryLedger::new());
        let settlement = Settlement::new(ledger.clone(), RetryPolicy::default());

        let err = settlement.place_bet(&alice(), 5, 1).await.unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance { have: 0, need: 5 });
        assert!(ledger.transactions(&alice()).await.unwrap().is_empty());
    }
}
