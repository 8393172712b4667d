//! Test doubles for the engine.

use std::sync::atomic::{AtomicU32, Ordering};

use bingoo_types::{Transaction, UserId};

use crate::ledger::{Ledger, LedgerError};

/// Ledger wrapper that fails the first `faults` prize credits with a
/// transient write error, to exercise the settlement retry path.
pub struct FlakyLedger<L> {
    inner: L,
    faults: AtomicU32,
    credit_attempts: AtomicU32,
}

impl<L> FlakyLedger<L> {
    pub fn new(inner: L, faults: u32) -> Self {
        Self {
            inner,
            faults: AtomicU32::new(faults),
            credit_attempts: AtomicU32::new(0),
        }
    }

    /// Access the wrapped ledger (for test setup).
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Total `credit_prize` calls observed, including failed ones.
    pub fn credit_attempts(&self) -> u32 {
        self.credit_attempts.load(Ordering::Relaxed)
    }

    /// Stop injecting failures.
    pub fn clear_faults(&self) {
        self.faults.store(0, Ordering::Relaxed);
    }
}

impl<L: Ledger> Ledger for FlakyLedger<L> {
    async fn balance(&self, user: &UserId) -> Result<u64, LedgerError> {
        self.inner.balance(user).await
    }

    async fn debit_bet(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        self.inner.debit_bet(user, amount, session_id).await
    }

    async fn credit_prize(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        self.credit_attempts.fetch_add(1, Ordering::Relaxed);
        let remaining = self.faults.load(Ordering::Relaxed);
        if remaining > 0 {
            self.faults.store(remaining - 1, Ordering::Relaxed);
            return Err(LedgerError::WriteFailed("injected fault".to_string()));
        }
        self.inner.credit_prize(user, amount, session_id).await
    }

    async fn deposit(&self, user: &UserId, amount: u64) -> Result<Transaction, LedgerError> {
        self.inner.deposit(user, amount).await
    }

    async fn request_withdrawal(
        &self,
        user: &UserId,
        amount: u64,
    ) -> Result<Transaction, LedgerError> {
        self.inner.request_withdrawal(user, amount).await
    }

    async fn resolve_withdrawal(
        &self,
        withdrawal_id: u64,
        approve: bool,
    ) -> Result<Transaction, LedgerError> {
        self.inner.resolve_withdrawal(withdrawal_id, approve).await
    }

    async fn transactions(&self, user: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        self.inner.transactions(user).await
    }
}
