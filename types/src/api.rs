//! Request/response bodies for the HTTP API.
//!
//! Prize positions are never exposed for unrevealed slots while a session is
//! active; [`board_view`] is the single place that masking happens.

use serde::{Deserialize, Serialize};

use crate::{
    CardSlot, FlipRecord, GameVariant, SessionState, Transaction, TransactionKind, UserId,
};

/// One slot as seen by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub index: u32,
    pub revealed: bool,
    pub art: u8,
    /// Only present once the slot is revealed (or the session is terminal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<u64>,
}

/// Project a board into client-visible slot views.
///
/// `reveal_all` is set for terminal sessions so clients can render the full
/// outcome; while the session is active, unrevealed slots expose art only.
pub fn board_view(board: &[CardSlot], reveal_all: bool) -> Vec<SlotView> {
    board
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let visible = slot.revealed || reveal_all;
            SlotView {
                index: index as u32,
                revealed: slot.revealed,
                art: slot.art,
                winning: visible.then_some(slot.winning),
                prize: if visible { slot.prize } else { None },
            }
        })
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub user: UserId,
    pub variant: GameVariant,
    pub bet: u64,
    #[serde(default)]
    pub use_points: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub session_id: u64,
    pub state: SessionState,
    pub board: Vec<SlotView>,
    pub flips_remaining: u32,
    pub balance: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlipRequest {
    pub session_id: u64,
    pub card_index: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlipResponse {
    pub winning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<u64>,
    pub state: SessionState,
    pub flips_remaining: u32,
    pub balance: u64,
}

/// Explicit finalize. `has_won`/`prize` are accepted for wire compatibility
/// with older clients but the server resolves the outcome from its own state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndGameRequest {
    pub session_id: u64,
    #[serde(default)]
    pub has_won: Option<bool>,
    #[serde(default)]
    pub prize: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndGameResponse {
    pub session_id: u64,
    pub state: SessionState,
    pub has_won: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: u64,
    pub user: UserId,
    pub variant: GameVariant,
    pub bet: u64,
    pub state: SessionState,
    pub has_won: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<u64>,
    pub board: Vec<SlotView>,
    pub flips: Vec<FlipRecord>,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user: UserId,
    pub points: u64,
}

/// Create a ledger entry directly (deposits and withdrawal requests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub user: UserId,
    pub kind: TransactionKind,
    pub amount: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

/// Operator resolution of a pending withdrawal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawalActionRequest {
    pub approve: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u8,
    pub error: String,
}
