//! HTTP backend for bingoo.
//!
//! Hosts the game engine behind an axum API with health probes, latency
//! metrics, per-IP rate limits, and CORS.

use std::sync::Arc;
use std::time::Instant;

use bingoo_engine::{GameEngine, MemoryLedger, RetryPolicy, StaticCauses, VariantRegistry};
use serde::Serialize;

mod api;
pub use api::Api;

mod metrics;
use metrics::{HttpMetrics, HttpMetricsSnapshot, SystemMetrics};

/// The engine composition served by this binary.
pub type Engine = GameEngine<MemoryLedger, StaticCauses>;

/// Runtime configuration, built from CLI args and environment.
#[derive(Clone, Debug, Serialize)]
pub struct ServerConfig {
    /// HTTP rate limit per IP in requests per second (None disables).
    pub http_rate_limit_per_second: Option<u64>,
    /// HTTP rate limit burst size (None disables).
    pub http_rate_limit_burst: Option<u32>,
    /// Game endpoint rate limit per IP in requests per minute (None disables).
    pub game_rate_limit_per_minute: Option<u64>,
    /// Game endpoint rate limit burst size (None disables).
    pub game_rate_limit_burst: Option<u32>,
    /// Max request body size in bytes (None disables limit).
    pub http_body_limit_bytes: Option<usize>,
    /// Age after which in-progress sessions are expired (None disables the
    /// sweeper).
    pub session_expiry_secs: Option<u64>,
    /// Interval between expiry sweeps.
    pub expiry_sweep_interval_secs: u64,
    /// Interval between retries of deferred prize credits.
    pub credit_retry_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_rate_limit_per_second: Some(50),
            http_rate_limit_burst: Some(100),
            game_rate_limit_per_minute: Some(120),
            game_rate_limit_burst: Some(20),
            http_body_limit_bytes: Some(64 * 1024),
            session_expiry_secs: None,
            expiry_sweep_interval_secs: 60,
            credit_retry_interval_secs: 30,
        }
    }
}

/// Health status for monitoring dashboards.
#[derive(Clone, Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub ready: bool,
    pub sessions: usize,
    pub pending_credits: usize,
    pub version: &'static str,
}

/// Shared server state: the engine plus observability.
pub struct Server {
    pub config: ServerConfig,
    engine: Engine,
    causes: Arc<StaticCauses>,
    ledger: Arc<MemoryLedger>,
    http_metrics: HttpMetrics,
    system_metrics: SystemMetrics,
    started_at: Instant,
}

impl Server {
    pub fn new() -> Self {
        Self::new_with_config(ServerConfig::default())
    }

    pub fn new_with_config(config: ServerConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let causes = Arc::new(StaticCauses::default());
        let engine = GameEngine::with_registry(
            ledger.clone(),
            causes.clone(),
            VariantRegistry::new(),
            RetryPolicy::default(),
        );
        Self {
            config,
            engine,
            causes,
            ledger,
            http_metrics: HttpMetrics::default(),
            system_metrics: SystemMetrics::new(),
            started_at: Instant::now(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn causes(&self) -> &StaticCauses {
        &self.causes
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub(crate) fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub fn http_metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.http_metrics.snapshot()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn health_status(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            ready: true,
            sessions: self.engine.session_count().await,
            pending_credits: self.engine.pending_credit_count().await,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub(crate) fn system_metrics(&self) -> &SystemMetrics {
        &self.system_metrics
    }

    /// Spawn the background maintenance loops: deferred credit retries and,
    /// when configured, expiry of abandoned sessions.
    pub fn start_maintenance(self: &Arc<Self>) {
        let server = self.clone();
        let retry_every = self.config.credit_retry_interval_secs.max(1);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(retry_every));
            loop {
                ticker.tick().await;
                let settled = server.engine.retry_pending_credits().await;
                if settled > 0 {
                    tracing::info!(settled, "deferred prize credits settled");
                }
            }
        });

        if let Some(expiry) = self.config.session_expiry_secs {
            let server = self.clone();
            let sweep_every = self.config.expiry_sweep_interval_secs.max(1);
            tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval(std::time::Duration::from_secs(sweep_every));
                loop {
                    ticker.tick().await;
                    let now = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    let cutoff = now.saturating_sub(expiry);
                    let expired = server.engine.expire_idle(cutoff).await;
                    if !expired.is_empty() {
                        tracing::info!(count = expired.len(), "idle sessions expired");
                    }
                }
            });
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}
