use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use governor::middleware::NoOpMiddleware;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Server;

mod http;

pub struct Api {
    server: Arc<Server>,
}

type IpGovernorConfig =
    tower_governor::governor::GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

fn parse_env_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

fn parse_env_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

fn parse_allowed_origins(var: &str) -> HashSet<String> {
    std::env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn governor_config(period: Duration, burst_size: u32) -> Option<Arc<IpGovernorConfig>> {
    GovernorConfigBuilder::default()
        .period(period)
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .map(Arc::new)
}

impl Api {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub fn router(&self) -> Router {
        let allowed_origins = parse_allowed_origins("ALLOWED_HTTP_ORIGINS");
        let allow_any_origin = allowed_origins.contains("*");
        if allowed_origins.is_empty() {
            tracing::warn!("ALLOWED_HTTP_ORIGINS is empty; all browser origins will be rejected");
        }
        let cors_origins = allowed_origins
            .iter()
            .filter(|origin| *origin != "*")
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Invalid origin in ALLOWED_HTTP_ORIGINS: {}", origin);
                    None
                }
            })
            .collect::<Vec<_>>();

        let cors = if allow_any_origin {
            CorsLayer::new().allow_origin(AllowOrigin::any())
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(cors_origins))
        }
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

        // Rate limits - environment variables override config
        let http_rate_per_sec = parse_env_u64("RATE_LIMIT_HTTP_PER_SEC")
            .or(self.server.config.http_rate_limit_per_second);
        let http_rate_burst =
            parse_env_u32("RATE_LIMIT_HTTP_BURST").or(self.server.config.http_rate_limit_burst);
        let game_rate_per_min = parse_env_u64("RATE_LIMIT_GAME_PER_MIN")
            .or(self.server.config.game_rate_limit_per_minute);
        let game_rate_burst =
            parse_env_u32("RATE_LIMIT_GAME_BURST").or(self.server.config.game_rate_limit_burst);

        let governor_conf = match (http_rate_per_sec, http_rate_burst) {
            (Some(rate_per_second), Some(burst_size))
                if rate_per_second > 0 && burst_size > 0 =>
            {
                let nanos_per_request = (1_000_000_000u64 / rate_per_second).max(1);
                governor_config(Duration::from_nanos(nanos_per_request), burst_size)
            }
            _ => None,
        };

        // Mutating game endpoints get a tighter per-minute budget.
        let game_governor_conf = match (game_rate_per_min, game_rate_burst) {
            (Some(rate_per_minute), Some(burst_size))
                if rate_per_minute > 0 && burst_size > 0 =>
            {
                let nanos_per_request = (60_000_000_000u64 / rate_per_minute).max(1);
                tracing::info!(
                    rate_per_minute,
                    burst_size,
                    "game endpoint rate limit configured"
                );
                governor_config(Duration::from_nanos(nanos_per_request), burst_size)
            }
            _ => None,
        };

        let game_routes = Router::new()
            .route("/v1/game/start", post(http::start_game))
            .route("/v1/game/flip", post(http::flip_card))
            .route("/v1/game/end", post(http::end_game));
        let game_routes = match game_governor_conf {
            Some(config) => game_routes.layer(GovernorLayer { config }),
            None => game_routes,
        };

        let router = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/livez", get(http::livez))
            .route("/readyz", get(http::readyz))
            .route("/health", get(http::health))
            .route("/config", get(http::config))
            .route("/metrics", get(http::prometheus_metrics))
            .route("/metrics/http", get(http::http_metrics))
            .route("/metrics/system", get(http::system_metrics))
            .route("/v1/variants", get(http::list_variants))
            .route("/v1/variants/activate", post(http::set_variant_active))
            .route("/v1/variants/config", post(http::set_variant_config))
            .route("/v1/session/:id", get(http::get_session))
            .route("/v1/sessions/:user", get(http::get_user_sessions))
            .route("/v1/balance/:user", get(http::get_balance))
            .route("/v1/leaderboard", get(http::get_leaderboard))
            .route("/v1/ledger/transaction", post(http::create_transaction))
            .route("/v1/ledger/withdrawal/:id", post(http::resolve_withdrawal))
            .route(
                "/v1/ledger/transactions/:user",
                get(http::get_transactions),
            )
            .merge(game_routes);

        let router = match governor_conf {
            Some(config) => router.layer(GovernorLayer { config }),
            None => router,
        };

        let router = match self.server.config.http_body_limit_bytes {
            Some(limit) if limit > 0 => router.layer(DefaultBodyLimit::max(limit)),
            _ => router,
        };

        router
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.server.clone())
    }
}
