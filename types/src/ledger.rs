use serde::{Deserialize, Serialize};

use crate::UserId;

/// Ledger entry kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TransactionKind {
    /// Bet debit taken when a session starts.
    Bet = 0,
    /// Prize credit for a winning session.
    Win = 1,
    /// Refund of a previously debited amount.
    Refund = 2,
    /// Points purchased from outside the platform.
    Deposit = 3,
    /// Points paid out of the platform; created pending, resolved by an
    /// operator action.
    Withdrawal = 4,
}

/// Ledger entry status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TransactionStatus {
    Pending = 0,
    Completed = 1,
    Failed = 2,
}

/// One ledger entry against a user's point balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub user: UserId,
    pub kind: TransactionKind,
    /// Points moved; always non-negative, direction is implied by `kind`.
    pub amount: u64,
    pub status: TransactionStatus,
    /// Session this entry settles, when the entry is a `Bet` or `Win`.
    pub session_id: Option<u64>,
    pub at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serde_names() {
        let json = serde_json::to_string(&TransactionKind::Withdrawal).unwrap();
        assert_eq!(json, "\"withdrawal\"");
        let back: TransactionKind = serde_json::from_str("\"bet\"").unwrap();
        assert_eq!(back, TransactionKind::Bet);
    }

    #[test]
    fn transaction_roundtrip() {
        let tx = Transaction {
            id: 7,
            user: "alice".to_string(),
            kind: TransactionKind::Win,
            amount: 100,
            status: TransactionStatus::Completed,
            session_id: Some(42),
            at: 1_700_000_000,
        };
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}
