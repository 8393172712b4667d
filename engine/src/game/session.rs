//! Session state transitions.
//!
//! Pure functions over [`GameSession`]: no ledger access and no I/O happen
//! here. The engine wraps these transitions with per-session locking and
//! settlement.

use bingoo_types::{FlipRecord, GameSession, SessionState};
use thiserror::Error;

use super::policy::{VariantConfig, WinRule};

/// Flip rejection. None of these variants touch the ledger.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlipError {
    #[error("card index {index} out of range for grid of {grid}")]
    IndexOutOfRange { index: u32, grid: usize },
    #[error("card {0} was already flipped")]
    AlreadyFlipped(u32),
    #[error("flip limit reached")]
    FlipLimit,
}

/// Result of applying one flip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlipOutcome {
    /// Whether the revealed slot was prize-bearing.
    pub winning: bool,
    /// Prize awarded by this flip (the session prize when the flip completes
    /// a win, zero otherwise).
    pub prize: u64,
    pub state: SessionState,
    /// True when the session was already terminal and the recorded outcome
    /// was returned without mutating anything.
    pub replay: bool,
}

/// Flips left before the session exhausts its budget.
pub fn flips_remaining(config: &VariantConfig, session: &GameSession) -> u32 {
    if session.state.is_terminal() {
        return 0;
    }
    config.max_flips.saturating_sub(session.flip_count())
}

/// Apply a flip to an active session, or replay the recorded outcome of a
/// terminal one.
///
/// Terminal sessions accept any flip call as a replay: the final result comes
/// back unchanged and the board, flip list, and prize are untouched. This
/// keeps client retries harmless — the caller can see `replay` and skip
/// settlement.
pub fn apply_flip(
    session: &mut GameSession,
    config: &VariantConfig,
    card_index: u32,
    now: u64,
) -> Result<FlipOutcome, FlipError> {
    if session.state.is_terminal() {
        return Ok(FlipOutcome {
            winning: session.has_won,
            prize: session.prize.unwrap_or(0),
            state: session.state,
            replay: true,
        });
    }

    let grid = session.board.len();
    let slot = session
        .board
        .get(card_index as usize)
        .ok_or(FlipError::IndexOutOfRange {
            index: card_index,
            grid,
        })?;
    if slot.revealed {
        return Err(FlipError::AlreadyFlipped(card_index));
    }
    if session.flip_count() >= config.max_flips {
        return Err(FlipError::FlipLimit);
    }

    // Reveal and classify.
    session.board[card_index as usize].revealed = true;
    let slot = session.board[card_index as usize].clone();

    let won = match config.win_rule {
        WinRule::PrizeSlot => slot.winning,
        WinRule::MatchPair => {
            slot.winning
                && session.board.iter().enumerate().any(|(i, other)| {
                    i != card_index as usize
                        && other.revealed
                        && other.winning
                        && other.pair == slot.pair
                })
        }
    };

    let prize = if won { slot.prize.unwrap_or(0) } else { 0 };
    session.flips.push(FlipRecord {
        session_id: session.id,
        card_index,
        winning: slot.winning,
        prize,
        at: now,
    });

    if won {
        session.state = SessionState::Won;
        session.has_won = true;
        session.prize = Some(prize);
        session.completed_at = Some(now);
    } else if session.flip_count() >= config.max_flips {
        session.state = SessionState::Lost;
        session.completed_at = Some(now);
    }

    Ok(FlipOutcome {
        winning: slot.winning,
        prize,
        state: session.state,
        replay: false,
    })
}

/// Finalize an active session as a forfeit; terminal sessions are untouched.
///
/// Returns whether the session transitioned.
pub fn forfeit(session: &mut GameSession, now: u64) -> bool {
    if session.state.is_terminal() {
        return false;
    }
    session.state = SessionState::Lost;
    session.completed_at = Some(now);
    true
}

/// Expire an abandoned session. Terminal sessions are untouched.
///
/// Returns whether the session transitioned. The bet stays debited and no
/// credit is ever issued for an expired session.
pub fn expire(session: &mut GameSession, now: u64) -> bool {
    if session.state.is_terminal() {
        return false;
    }
    session.state = SessionState::Expired;
    session.completed_at = Some(now);
    true
}
