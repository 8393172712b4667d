//! The game engine front door.
//!
//! [`GameEngine`] owns the session table and serializes all work on a session
//! behind a per-session async lock: a flip's settlement completes before the
//! next flip on that session is admitted, which is what makes terminal
//! transitions (and their single prize credit) race-free.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bingoo_types::{
    Cause, GameSession, GameVariant, Leaderboard, SessionState, Transaction, UserId,
    SESSION_HISTORY_LIMIT,
};
use rand::Rng;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::game::board::generate_board;
use crate::game::policy::{
    resolve_prize_policy, PolicyContext, PolicyError, VariantConfig, VariantInfo, VariantRegistry,
};
use crate::game::session::{self, FlipError};
use crate::ledger::{Ledger, LedgerError};
use crate::rng::GameRng;
use crate::settlement::{RetryPolicy, Settlement};
use crate::time::unix_now;

/// Engine operation failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("variant {0:?} is not active")]
    VariantInactive(GameVariant),
    #[error("bet {bet} below variant minimum {min}")]
    BetBelowMinimum { bet: u64, min: u64 },
    #[error("cause jackpot not eligible: {0}")]
    Eligibility(String),
    #[error("session {0} not found")]
    SessionNotFound(u64),
    #[error(transparent)]
    InvalidFlip(#[from] FlipError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<PolicyError> for EngineError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Eligibility(reason) => Self::Eligibility(reason),
        }
    }
}

/// Source of the currently active cause for the community jackpot.
pub trait CauseDirectory: Send + Sync {
    fn active_cause(&self) -> impl Future<Output = Option<Cause>> + Send;
}

/// Cause directory backed by a single settable slot.
#[derive(Default)]
pub struct StaticCauses {
    cause: RwLock<Option<Cause>>,
}

impl StaticCauses {
    pub fn new(cause: Option<Cause>) -> Self {
        Self {
            cause: RwLock::new(cause),
        }
    }

    pub async fn set(&self, cause: Option<Cause>) {
        *self.cause.write().await = cause;
    }
}

impl CauseDirectory for StaticCauses {
    async fn active_cause(&self) -> Option<Cause> {
        self.cause.read().await.clone()
    }
}

/// A freshly started session together with the post-debit balance.
#[derive(Clone, Debug)]
pub struct StartedGame {
    pub session: GameSession,
    pub balance: u64,
    pub flips_remaining: u32,
}

/// Outcome of a flip as returned to transports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlipResult {
    pub winning: bool,
    pub prize: Option<u64>,
    pub state: SessionState,
    pub flips_remaining: u32,
    pub balance: u64,
}

/// Card-flip game engine.
pub struct GameEngine<L, C> {
    registry: RwLock<VariantRegistry>,
    ledger: Arc<L>,
    settlement: Settlement<L>,
    causes: Arc<C>,
    sessions: Mutex<HashMap<u64, Arc<Mutex<GameSession>>>>,
    history: Mutex<HashMap<UserId, VecDeque<u64>>>,
    leaderboard: Mutex<Leaderboard>,
    /// Won sessions whose prize credit has not landed yet.
    pending_credits: Mutex<HashSet<u64>>,
    next_session_id: AtomicU64,
}

impl<L: Ledger, C: CauseDirectory> GameEngine<L, C> {
    pub fn new(ledger: Arc<L>, causes: Arc<C>) -> Self {
        Self::with_registry(ledger, causes, VariantRegistry::new(), RetryPolicy::default())
    }

    pub fn with_registry(
        ledger: Arc<L>,
        causes: Arc<C>,
        registry: VariantRegistry,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            settlement: Settlement::new(ledger.clone(), retry),
            ledger,
            causes,
            sessions: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
            leaderboard: Mutex::new(Leaderboard::default()),
            pending_credits: Mutex::new(HashSet::new()),
            next_session_id: AtomicU64::new(0),
        }
    }

    async fn config_for(&self, variant: GameVariant) -> Result<VariantConfig, EngineError> {
        let registry = self.registry.read().await;
        registry
            .get_config(variant)
            .cloned()
            .ok_or(EngineError::VariantInactive(variant))
    }

    async fn refresh_leaderboard(&self, user: &UserId) {
        if let Ok(points) = self.ledger.balance(user).await {
            self.leaderboard.lock().await.update(user, points);
        }
    }

    /// Start a new session: validate the bet, resolve the prize plan
    /// (cause eligibility is checked here, before any debit), debit the bet,
    /// and generate the board.
    pub async fn start_game(
        &self,
        user: UserId,
        variant: GameVariant,
        bet: u64,
        use_points: bool,
    ) -> Result<StartedGame, EngineError> {
        let config = {
            let registry = self.registry.read().await;
            if !registry.is_active(variant) {
                return Err(EngineError::VariantInactive(variant));
            }
            registry
                .get_config(variant)
                .cloned()
                .ok_or(EngineError::VariantInactive(variant))?
        };
        if bet < config.min_bet {
            return Err(EngineError::BetBelowMinimum {
                bet,
                min: config.min_bet,
            });
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        let seed: u64 = rand::thread_rng().gen();
        let mut rng = GameRng::new(seed, session_id);

        // Resolve the plan before touching the ledger so eligibility
        // rejections have no side effects.
        let plan = if variant == GameVariant::CauseJackpot {
            let cause = self
                .causes
                .active_cause()
                .await
                .ok_or_else(|| EngineError::Eligibility("no active cause".to_string()))?;
            resolve_prize_policy(&config, &PolicyContext::Cause(&cause), &mut rng)?
        } else {
            resolve_prize_policy(&config, &PolicyContext::Standard, &mut rng)?
        };

        // Debit fails closed: no session, no board.
        self.settlement.place_bet(&user, bet, session_id).await?;

        let board = generate_board(&config, &plan, &mut rng);
        let now = unix_now();
        let session = GameSession {
            id: session_id,
            user: user.clone(),
            variant,
            bet,
            use_points,
            seed,
            state: SessionState::InProgress,
            has_won: false,
            prize: None,
            board,
            flips: Vec::new(),
            created_at: now,
            completed_at: None,
        };

        info!(
            user = %user,
            session_id,
            variant = ?variant,
            bet,
            use_points,
            "game started"
        );

        self.sessions
            .lock()
            .await
            .insert(session_id, Arc::new(Mutex::new(session.clone())));
        {
            let mut history = self.history.lock().await;
            let entries = history.entry(user.clone()).or_default();
            entries.push_front(session_id);
            entries.truncate(SESSION_HISTORY_LIMIT);
        }

        let balance = self.ledger.balance(&user).await?;
        self.leaderboard.lock().await.update(&user, balance);

        Ok(StartedGame {
            session,
            balance,
            flips_remaining: config.max_flips,
        })
    }

    async fn session_handle(&self, session_id: u64) -> Result<Arc<Mutex<GameSession>>, EngineError> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(session_id))
    }

    /// Flip one card. Flips on a session are strictly sequential: the
    /// session lock is held until any settlement for this flip has finished.
    /// Flips on a terminal session replay the recorded outcome and never
    /// touch the ledger.
    pub async fn flip(&self, session_id: u64, card_index: u32) -> Result<FlipResult, EngineError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let config = self.config_for(session.variant).await?;

        let now = unix_now();
        let outcome = session::apply_flip(&mut session, &config, card_index, now)?;

        if outcome.state == SessionState::Won && !outcome.replay {
            match self
                .settlement
                .award_prize(&session.user, outcome.prize, session_id)
                .await
            {
                Ok(_) => {
                    self.refresh_leaderboard(&session.user).await;
                }
                Err(err) => {
                    // The win is already fixed in the session; park the
                    // credit for a later retry instead of dropping it.
                    warn!(
                        user = %session.user,
                        session_id,
                        prize = outcome.prize,
                        %err,
                        "prize credit deferred"
                    );
                    self.pending_credits.lock().await.insert(session_id);
                }
            }
            info!(
                user = %session.user,
                session_id,
                prize = outcome.prize,
                "session won"
            );
        } else if outcome.state == SessionState::Lost && !outcome.replay {
            info!(
                user = %session.user,
                session_id,
                flips = session.flip_count(),
                "session lost"
            );
        }

        let balance = self.ledger.balance(&session.user).await?;
        Ok(FlipResult {
            winning: outcome.winning,
            prize: (outcome.prize > 0).then_some(outcome.prize),
            state: outcome.state,
            flips_remaining: session::flips_remaining(&config, &session),
            balance,
        })
    }

    /// Explicit finalize. The outcome is resolved from server state: an
    /// active session is forfeited as lost, a terminal session returns its
    /// recorded result. Client-claimed outcomes are never trusted.
    pub async fn end_game(&self, session_id: u64) -> Result<GameSession, EngineError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        if session::forfeit(&mut session, unix_now()) {
            info!(user = %session.user, session_id, "session forfeited");
        }
        Ok(session.clone())
    }

    /// Expire in-progress sessions created at or before `cutoff`. Bets stay
    /// debited; no credit is ever issued for an expired session.
    pub async fn expire_idle(&self, cutoff: u64) -> Vec<u64> {
        let handles: Vec<(u64, Arc<Mutex<GameSession>>)> = {
            let sessions = self.sessions.lock().await;
            sessions.iter().map(|(id, s)| (*id, s.clone())).collect()
        };

        let mut expired = Vec::new();
        let now = unix_now();
        for (id, handle) in handles {
            let mut session = handle.lock().await;
            if session.state == SessionState::InProgress
                && session.created_at <= cutoff
                && session::expire(&mut session, now)
            {
                info!(user = %session.user, session_id = id, "session expired");
                expired.push(id);
            }
        }
        expired
    }

    /// Re-drive prize credits that failed after a win. Returns how many
    /// settled. Safe to call repeatedly: the ledger deduplicates per session.
    pub async fn retry_pending_credits(&self) -> usize {
        let ids: Vec<u64> = self.pending_credits.lock().await.iter().copied().collect();
        let mut settled = 0;
        for session_id in ids {
            let Ok(handle) = self.session_handle(session_id).await else {
                self.pending_credits.lock().await.remove(&session_id);
                continue;
            };
            let session = handle.lock().await;
            let Some(prize) = session.prize.filter(|_| session.has_won) else {
                self.pending_credits.lock().await.remove(&session_id);
                continue;
            };
            match self
                .settlement
                .award_prize(&session.user, prize, session_id)
                .await
            {
                Ok(_) => {
                    self.pending_credits.lock().await.remove(&session_id);
                    self.refresh_leaderboard(&session.user).await;
                    settled += 1;
                }
                Err(err) => {
                    warn!(session_id, %err, "pending prize credit still failing");
                }
            }
        }
        settled
    }

    /// Snapshot a session.
    pub async fn session(&self, session_id: u64) -> Result<GameSession, EngineError> {
        let handle = self.session_handle(session_id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// Recent sessions for a user, newest first.
    pub async fn user_sessions(&self, user: &UserId) -> Vec<GameSession> {
        let ids: Vec<u64> = {
            let history = self.history.lock().await;
            history
                .get(user)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default()
        };
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(session) = self.session(id).await {
                sessions.push(session);
            }
        }
        sessions
    }

    pub async fn balance(&self, user: &UserId) -> Result<u64, EngineError> {
        Ok(self.ledger.balance(user).await?)
    }

    pub async fn deposit(&self, user: &UserId, amount: u64) -> Result<Transaction, EngineError> {
        let tx = self.ledger.deposit(user, amount).await?;
        info!(user = %user, amount, "points deposited");
        self.refresh_leaderboard(user).await;
        Ok(tx)
    }

    pub async fn request_withdrawal(
        &self,
        user: &UserId,
        amount: u64,
    ) -> Result<Transaction, EngineError> {
        let tx = self.ledger.request_withdrawal(user, amount).await?;
        info!(user = %user, amount, withdrawal_id = tx.id, "withdrawal requested");
        self.refresh_leaderboard(user).await;
        Ok(tx)
    }

    pub async fn resolve_withdrawal(
        &self,
        withdrawal_id: u64,
        approve: bool,
    ) -> Result<Transaction, EngineError> {
        let tx = self.ledger.resolve_withdrawal(withdrawal_id, approve).await?;
        info!(withdrawal_id, approve, "withdrawal resolved");
        self.refresh_leaderboard(&tx.user).await;
        Ok(tx)
    }

    pub async fn transactions(&self, user: &UserId) -> Result<Vec<Transaction>, EngineError> {
        Ok(self.ledger.transactions(user).await?)
    }

    pub async fn leaderboard(&self) -> Leaderboard {
        self.leaderboard.lock().await.clone()
    }

    /// Total sessions held in memory.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Won sessions still waiting on their prize credit.
    pub async fn pending_credit_count(&self) -> usize {
        self.pending_credits.lock().await.len()
    }

    pub async fn variants(&self) -> Vec<VariantInfo> {
        self.registry.read().await.all_infos()
    }

    pub async fn set_variant_active(&self, variant: GameVariant, active: bool) {
        self.registry.write().await.set_active(variant, active);
        info!(variant = ?variant, active, "variant activation changed");
    }

    pub async fn set_variant_config(&self, config: VariantConfig) {
        info!(variant = ?config.variant, "variant config replaced");
        self.registry.write().await.set_config(config);
    }
}
