//! Point ledger.
//!
//! Every balance mutation in the system flows through a [`Ledger`]: bets are
//! debited atomically against the available balance, prizes are credited
//! exactly once per session, and deposits/withdrawals form the platform's
//! payment edge. [`MemoryLedger`] is the in-process implementation used by
//! the server and tests; persistent backends implement the same trait.

use std::collections::HashMap;
use std::future::Future;

use bingoo_types::{Transaction, TransactionKind, TransactionStatus, UserId};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::time::unix_now;

/// Ledger failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },
    /// Transient write failure. Credits for already-decided wins are retried;
    /// debit failures abort the session start.
    #[error("ledger write failed: {0}")]
    WriteFailed(String),
    #[error("withdrawal {0} not found or already resolved")]
    WithdrawalNotFound(u64),
}

/// Async point ledger.
///
/// Implementations must make `debit_bet` check-and-decrement atomic (a
/// rejected debit leaves no residue) and `credit_prize` idempotent per
/// session id.
pub trait Ledger: Send + Sync {
    /// Current balance; unknown users hold zero points.
    fn balance(&self, user: &UserId) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Debit a bet for a session. Fails with `InsufficientBalance` before any
    /// state changes when the user cannot cover `amount`.
    fn debit_bet(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> impl Future<Output = Result<Transaction, LedgerError>> + Send;

    /// Credit a prize for a winning session. Exactly once per session: a
    /// repeated call returns the recorded transaction without moving points.
    fn credit_prize(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> impl Future<Output = Result<Transaction, LedgerError>> + Send;

    /// Credit purchased points.
    fn deposit(
        &self,
        user: &UserId,
        amount: u64,
    ) -> impl Future<Output = Result<Transaction, LedgerError>> + Send;

    /// Reserve points for payout. The amount leaves the balance immediately
    /// and the transaction stays `Pending` until resolved.
    fn request_withdrawal(
        &self,
        user: &UserId,
        amount: u64,
    ) -> impl Future<Output = Result<Transaction, LedgerError>> + Send;

    /// Resolve a pending withdrawal: approve completes it, rejection fails it
    /// and refunds the reserved points.
    fn resolve_withdrawal(
        &self,
        withdrawal_id: u64,
        approve: bool,
    ) -> impl Future<Output = Result<Transaction, LedgerError>> + Send;

    /// All ledger entries for a user, oldest first.
    fn transactions(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Transaction>, LedgerError>> + Send;
}

#[derive(Default)]
struct LedgerInner {
    balances: HashMap<UserId, u64>,
    entries: Vec<Transaction>,
    /// Index into `entries` of the WIN recorded for each settled session.
    wins_by_session: HashMap<u64, usize>,
    next_id: u64,
}

impl LedgerInner {
    fn push(
        &mut self,
        user: &UserId,
        kind: TransactionKind,
        amount: u64,
        status: TransactionStatus,
        session_id: Option<u64>,
    ) -> Transaction {
        self.next_id += 1;
        let tx = Transaction {
            id: self.next_id,
            user: user.clone(),
            kind,
            amount,
            status,
            session_id,
            at: unix_now(),
        };
        self.entries.push(tx.clone());
        tx
    }
}

/// In-memory ledger. One lock guards balances and entries, which is what
/// makes the check-and-decrement in `debit_bet` atomic.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance directly (tests and dev bootstrap).
    pub async fn set_balance(&self, user: &UserId, points: u64) {
        let mut inner = self.inner.lock().await;
        inner.balances.insert(user.clone(), points);
    }
}

impl Ledger for MemoryLedger {
    async fn balance(&self, user: &UserId) -> Result<u64, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(inner.balances.get(user).copied().unwrap_or(0))
    }

    async fn debit_bet(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        let have = inner.balances.get(user).copied().unwrap_or(0);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }
        inner.balances.insert(user.clone(), have - amount);
        Ok(inner.push(
            user,
            TransactionKind::Bet,
            amount,
            TransactionStatus::Completed,
            Some(session_id),
        ))
    }

    async fn credit_prize(
        &self,
        user: &UserId,
        amount: u64,
        session_id: u64,
    ) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        if let Some(&index) = inner.wins_by_session.get(&session_id) {
            return Ok(inner.entries[index].clone());
        }
        let have = inner.balances.get(user).copied().unwrap_or(0);
        inner.balances.insert(user.clone(), have.saturating_add(amount));
        let tx = inner.push(
            user,
            TransactionKind::Win,
            amount,
            TransactionStatus::Completed,
            Some(session_id),
        );
        let index = inner.entries.len() - 1;
        inner.wins_by_session.insert(session_id, index);
        Ok(tx)
    }

    async fn deposit(&self, user: &UserId, amount: u64) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        let have = inner.balances.get(user).copied().unwrap_or(0);
        inner.balances.insert(user.clone(), have.saturating_add(amount));
        Ok(inner.push(
            user,
            TransactionKind::Deposit,
            amount,
            TransactionStatus::Completed,
            None,
        ))
    }

    async fn request_withdrawal(
        &self,
        user: &UserId,
        amount: u64,
    ) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        let have = inner.balances.get(user).copied().unwrap_or(0);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }
        inner.balances.insert(user.clone(), have - amount);
        Ok(inner.push(
            user,
            TransactionKind::Withdrawal,
            amount,
            TransactionStatus::Pending,
            None,
        ))
    }

    async fn resolve_withdrawal(
        &self,
        withdrawal_id: u64,
        approve: bool,
    ) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().await;
        let index = inner
            .entries
            .iter()
            .position(|tx| {
                tx.id == withdrawal_id
                    && tx.kind == TransactionKind::Withdrawal
                    && tx.status == TransactionStatus::Pending
            })
            .ok_or(LedgerError::WithdrawalNotFound(withdrawal_id))?;

        let (user, amount) = {
            let tx = &mut inner.entries[index];
            tx.status = if approve {
                TransactionStatus::Completed
            } else {
                TransactionStatus::Failed
            };
            (tx.user.clone(), tx.amount)
        };

        if !approve {
            // Rejected payout: return the reserved points.
            let have = inner.balances.get(&user).copied().unwrap_or(0);
            inner.balances.insert(user.clone(), have.saturating_add(amount));
            inner.push(
                &user,
                TransactionKind::Refund,
                amount,
                TransactionStatus::Completed,
                None,
            );
        }

        Ok(inner.entries[index].clone())
    }

    async fn transactions(&self, user: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .iter()
            .filter(|tx| &tx.user == user)
            .cloned()
            .collect())
    }
}
