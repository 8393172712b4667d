//! Bingoo game engine.
//!
//! This crate contains the server-authoritative card-flip logic: board
//! generation, prize policy, the session state machine, and settlement
//! against the point ledger.
//!
//! ## Determinism requirements
//! - Session randomness is drawn once, at creation, and stored on the
//!   session; board generation is its only consumer.
//! - Settlement retries re-submit an already-decided outcome; they never
//!   re-roll.
//!
//! ## Ordering requirements
//! Flips on one session are strictly sequential: the engine holds the
//! session's lock across the flip and any settlement it triggers, so two
//! concurrent flips can never both observe an in-progress session and race
//! to finalize it.
//!
//! The primary entrypoint is [`GameEngine`].

pub mod game;

mod engine;
mod ledger;
mod rng;
mod settlement;
mod time;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use engine::{
    CauseDirectory, EngineError, FlipResult, GameEngine, StartedGame, StaticCauses,
};
pub use game::board::generate_board;
pub use game::policy::{
    resolve_prize_policy, PolicyContext, PolicyError, PrizePlan, PrizeValuePolicy, VariantConfig,
    VariantInfo, VariantRegistry, WinRule,
};
pub use game::session::{apply_flip, flips_remaining, FlipError, FlipOutcome};
pub use ledger::{Ledger, LedgerError, MemoryLedger};
pub use rng::GameRng;
pub use settlement::{RetryPolicy, Settlement};
