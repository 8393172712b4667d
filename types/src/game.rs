use serde::{Deserialize, Serialize};

use crate::UserId;

/// Game variants offered by the platform.
///
/// The numeric table for each variant (grid size, minimum bet, prize bounds,
/// flip budget) lives in the engine's variant registry, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GameVariant {
    Grid9 = 0,
    Grid12 = 1,
    Grid16 = 2,
    CauseJackpot = 3,
}

impl GameVariant {
    /// All variants, in display order.
    pub fn all() -> &'static [GameVariant] {
        &[
            GameVariant::Grid9,
            GameVariant::Grid12,
            GameVariant::Grid16,
            GameVariant::CauseJackpot,
        ]
    }
}

impl TryFrom<u8> for GameVariant {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Grid9),
            1 => Ok(Self::Grid12),
            2 => Ok(Self::Grid16),
            3 => Ok(Self::CauseJackpot),
            other => Err(other),
        }
    }
}

/// Lifecycle of a game session.
///
/// `Created` exists only between construction and the bet debit; callers
/// observe `InProgress` or a terminal state. `Expired` is terminal and is
/// reached only through explicit expiry of abandoned sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Created,
    InProgress,
    Won,
    Lost,
    Expired,
}

impl SessionState {
    /// Terminal states accept no further flips and never touch the ledger again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Expired)
    }
}

/// One slot on a session's board.
///
/// Prize assignment is fixed at board generation and never mutated afterwards;
/// only `revealed` changes over the life of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardSlot {
    /// Whether this slot pays out when revealed (or matched, for pair rules).
    pub winning: bool,
    /// Prize value in points; `None` on non-winning slots.
    pub prize: Option<u64>,
    /// Pair identifier for match-pair variants; winning slots that share a
    /// pair id pay out together.
    pub pair: Option<u8>,
    /// Cosmetic asset id shown on the card face.
    pub art: u8,
    /// Whether the slot has been revealed by a flip.
    pub revealed: bool,
}

impl CardSlot {
    /// A non-winning slot with the given art.
    pub fn blank(art: u8) -> Self {
        Self {
            winning: false,
            prize: None,
            pair: None,
            art,
            revealed: false,
        }
    }
}

/// Record of a single flip within a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipRecord {
    pub session_id: u64,
    pub card_index: u32,
    pub winning: bool,
    /// Prize awarded by this flip; zero for non-winning reveals and for the
    /// first half of an unmatched pair.
    pub prize: u64,
    pub at: u64,
}

/// A single card-flip game session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    pub id: u64,
    pub user: UserId,
    pub variant: GameVariant,
    pub bet: u64,
    pub use_points: bool,
    /// RNG seed fixed at creation; board generation and nothing else consumes
    /// randomness, so settlement retries can never re-roll the outcome.
    pub seed: u64,
    pub state: SessionState,
    pub has_won: bool,
    /// Total prize for the session; set exactly once, on the winning flip.
    pub prize: Option<u64>,
    pub board: Vec<CardSlot>,
    pub flips: Vec<FlipRecord>,
    pub created_at: u64,
    /// Set when the session reaches a terminal state; once set, no further
    /// flips are accepted.
    pub completed_at: Option<u64>,
}

impl GameSession {
    /// Number of flips taken so far.
    pub fn flip_count(&self) -> u32 {
        self.flips.len() as u32
    }

    /// Whether `card_index` was already revealed.
    pub fn is_revealed(&self, card_index: u32) -> bool {
        self.board
            .get(card_index as usize)
            .map(|slot| slot.revealed)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_u8_roundtrip() {
        for variant in GameVariant::all() {
            let decoded = GameVariant::try_from(*variant as u8).unwrap();
            assert_eq!(*variant, decoded);
        }
        assert!(GameVariant::try_from(200).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!SessionState::Created.is_terminal());
        assert!(!SessionState::InProgress.is_terminal());
        assert!(SessionState::Won.is_terminal());
        assert!(SessionState::Lost.is_terminal());
        assert!(SessionState::Expired.is_terminal());
    }

    #[test]
    fn variant_serde_names() {
        let json = serde_json::to_string(&GameVariant::CauseJackpot).unwrap();
        assert_eq!(json, "\"cause_jackpot\"");
        let back: GameVariant = serde_json::from_str("\"grid9\"").unwrap();
        assert_eq!(back, GameVariant::Grid9);
    }
}
