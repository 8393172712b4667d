use std::time::Duration;

use bingoo_types::api::{
    BalanceResponse, EndGameRequest, EndGameResponse, ErrorBody, FlipRequest, FlipResponse,
    SessionResponse, StartGameRequest, StartGameResponse, TransactionRequest,
    TransactionsResponse, WithdrawalActionRequest,
};
use bingoo_types::{
    GameVariant, Leaderboard, Transaction, TransactionKind, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Retry schedule for idempotent (GET) requests.
///
/// Mutating requests are sent exactly once: a timed-out `start` or `flip` may
/// have landed, and retrying it blindly could place a second bet. Terminal
/// flips are replays server-side, so callers that want to re-poll a flip can
/// safely re-issue it themselves.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Variant listing entry as served by `/v1/variants`.
#[derive(Clone, Debug, Deserialize)]
pub struct VariantSummary {
    pub variant: GameVariant,
    pub name: String,
    pub description: String,
    pub grid_size: usize,
    pub min_bet: u64,
    pub max_prize: u64,
    pub max_flips: u32,
    pub active: bool,
}

/// Typed HTTP client for the bingoo API.
pub struct Client {
    base: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_retry(base, RetryPolicy::default())
    }

    pub fn with_retry(base: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base)?,
            http: reqwest::Client::new(),
            retry,
        })
    }

    async fn decode_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => Error::Api {
                status,
                code: parsed.code,
                message: parsed.error,
            },
            Err(_) => Error::FailedWithBody { status, body },
        }
    }

    async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = self.base.join(path)?;
        let response = self.http.post(url).json(body).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::decode_error(response).await)
        }
    }

    async fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
        let url = self.base.join(path)?;
        let mut delay = self.retry.base_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.http.get(url.clone()).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json().await?);
                }
                Ok(response) if response.status().is_server_error()
                    && attempt <= self.retry.max_retries =>
                {
                    debug!(%url, status = %response.status(), attempt, "retrying query");
                }
                Ok(response) => return Err(Self::decode_error(response).await),
                Err(err) if attempt <= self.retry.max_retries => {
                    debug!(%url, %err, attempt, "retrying query after transport error");
                }
                Err(err) => return Err(err.into()),
            }
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }

    pub async fn start_game(&self, request: &StartGameRequest) -> Result<StartGameResponse> {
        self.post_json("v1/game/start", request).await
    }

    pub async fn flip(&self, session_id: u64, card_index: u32) -> Result<FlipResponse> {
        self.post_json(
            "v1/game/flip",
            &FlipRequest {
                session_id,
                card_index,
            },
        )
        .await
    }

    pub async fn end_game(&self, session_id: u64) -> Result<EndGameResponse> {
        self.post_json(
            "v1/game/end",
            &EndGameRequest {
                session_id,
                has_won: None,
                prize: None,
            },
        )
        .await
    }

    pub async fn session(&self, session_id: u64) -> Result<SessionResponse> {
        self.get_json(&format!("v1/session/{session_id}")).await
    }

    pub async fn user_sessions(&self, user: &UserId) -> Result<Vec<SessionResponse>> {
        self.get_json(&format!("v1/sessions/{user}")).await
    }

    pub async fn balance(&self, user: &UserId) -> Result<BalanceResponse> {
        self.get_json(&format!("v1/balance/{user}")).await
    }

    pub async fn deposit(&self, user: &UserId, amount: u64) -> Result<Transaction> {
        self.post_json(
            "v1/ledger/transaction",
            &TransactionRequest {
                user: user.clone(),
                kind: TransactionKind::Deposit,
                amount,
            },
        )
        .await
    }

    pub async fn request_withdrawal(&self, user: &UserId, amount: u64) -> Result<Transaction> {
        self.post_json(
            "v1/ledger/transaction",
            &TransactionRequest {
                user: user.clone(),
                kind: TransactionKind::Withdrawal,
                amount,
            },
        )
        .await
    }

    pub async fn resolve_withdrawal(&self, withdrawal_id: u64, approve: bool) -> Result<Transaction> {
        self.post_json(
            &format!("v1/ledger/withdrawal/{withdrawal_id}"),
            &WithdrawalActionRequest { approve },
        )
        .await
    }

    pub async fn transactions(&self, user: &UserId) -> Result<TransactionsResponse> {
        self.get_json(&format!("v1/ledger/transactions/{user}")).await
    }

    pub async fn leaderboard(&self) -> Result<Leaderboard> {
        self.get_json("v1/leaderboard").await
    }

    pub async fn variants(&self) -> Result<Vec<VariantSummary>> {
        self.get_json("v1/variants").await
    }
}
