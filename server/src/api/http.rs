use axum::{
    extract::{Path, State as AxumState},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use bingoo_engine::{EngineError, FlipError, LedgerError};
use bingoo_types::api::{
    board_view, BalanceResponse, EndGameRequest, EndGameResponse, ErrorBody, FlipRequest,
    FlipResponse, SessionResponse, StartGameRequest, StartGameResponse, TransactionRequest,
    TransactionsResponse, WithdrawalActionRequest,
};
use bingoo_types::{
    GameSession, Transaction, TransactionKind, ERROR_ELIGIBILITY, ERROR_INSUFFICIENT_BALANCE,
    ERROR_INVALID_BET, ERROR_INVALID_FLIP, ERROR_INVALID_REQUEST, ERROR_LEDGER_WRITE,
    ERROR_SESSION_NOT_FOUND, ERROR_VARIANT_INACTIVE, ERROR_WITHDRAWAL_NOT_FOUND,
    MAX_USER_ID_LENGTH,
};

use crate::Server;

/// Simple health response for basic liveness checks
#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

/// Readiness response for orchestrator probes
#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

fn engine_error_response(err: EngineError) -> Response {
    let (status, code) = match &err {
        EngineError::VariantInactive(_) => (StatusCode::BAD_REQUEST, ERROR_VARIANT_INACTIVE),
        EngineError::BetBelowMinimum { .. } => (StatusCode::BAD_REQUEST, ERROR_INVALID_BET),
        EngineError::Eligibility(_) => (StatusCode::CONFLICT, ERROR_ELIGIBILITY),
        EngineError::SessionNotFound(_) => (StatusCode::NOT_FOUND, ERROR_SESSION_NOT_FOUND),
        EngineError::InvalidFlip(flip) => match flip {
            FlipError::IndexOutOfRange { .. }
            | FlipError::AlreadyFlipped(_)
            | FlipError::FlipLimit => (StatusCode::BAD_REQUEST, ERROR_INVALID_FLIP),
        },
        EngineError::Ledger(ledger) => match ledger {
            LedgerError::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, ERROR_INSUFFICIENT_BALANCE)
            }
            LedgerError::WithdrawalNotFound(_) => {
                (StatusCode::NOT_FOUND, ERROR_WITHDRAWAL_NOT_FOUND)
            }
            LedgerError::WriteFailed(_) => (StatusCode::BAD_GATEWAY, ERROR_LEDGER_WRITE),
        },
    };
    (
        status,
        Json(ErrorBody {
            code,
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            code: ERROR_INVALID_REQUEST,
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn session_response(session: &GameSession) -> SessionResponse {
    let reveal_all = session.state.is_terminal();
    SessionResponse {
        id: session.id,
        user: session.user.clone(),
        variant: session.variant,
        bet: session.bet,
        state: session.state,
        has_won: session.has_won,
        prize: session.prize,
        board: board_view(&session.board, reveal_all),
        flips: session.flips.clone(),
        created_at: session.created_at,
        completed_at: session.completed_at,
    }
}

/// Basic health check endpoint - always returns ok if the service responds.
pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

/// Liveness probe endpoint.
pub(super) async fn livez() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

/// Readiness probe endpoint.
pub(super) async fn readyz(AxumState(server): AxumState<Arc<Server>>) -> Response {
    let status = server.health_status().await;
    if status.ready {
        (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                reason: None,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                reason: Some("not_initialized"),
            }),
        )
            .into_response()
    }
}

/// Detailed health status for monitoring dashboards.
pub(super) async fn health(AxumState(server): AxumState<Arc<Server>>) -> Response {
    let status = server.health_status().await;
    let http_status = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (http_status, Json(status)).into_response()
}

pub(super) async fn config(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.config.clone()).into_response()
}

fn metrics_auth_error(headers: &HeaderMap) -> Option<StatusCode> {
    let token = std::env::var("METRICS_AUTH_TOKEN").unwrap_or_default();
    if token.is_empty() {
        return None;
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    let custom = headers
        .get("x-metrics-token")
        .and_then(|value| value.to_str().ok())
        .map(str::trim);
    if bearer == Some(token.as_str()) || custom == Some(token.as_str()) {
        None
    } else {
        Some(StatusCode::UNAUTHORIZED)
    }
}

pub(super) async fn http_metrics(
    headers: HeaderMap,
    AxumState(server): AxumState<Arc<Server>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(server.http_metrics_snapshot()).into_response()
}

pub(super) async fn system_metrics(
    headers: HeaderMap,
    AxumState(server): AxumState<Arc<Server>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(server.system_metrics().snapshot()).into_response()
}

pub(super) async fn prometheus_metrics(
    headers: HeaderMap,
    AxumState(server): AxumState<Arc<Server>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    let body = render_prometheus_metrics(&server).await;
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response()
}

async fn render_prometheus_metrics(server: &Server) -> String {
    let mut out = String::with_capacity(2048);
    let http = server.http_metrics_snapshot();
    let system = server.system_metrics().snapshot();
    let status = server.health_status().await;

    let _ = writeln!(out, "# TYPE bingoo_http_requests_total counter");
    for (endpoint, snapshot) in [
        ("start_game", &http.start_game),
        ("flip", &http.flip),
        ("query", &http.query),
        ("ledger", &http.ledger),
    ] {
        let _ = writeln!(
            out,
            "bingoo_http_requests_total{{endpoint=\"{endpoint}\"}} {}",
            snapshot.count
        );
    }

    let _ = writeln!(out, "# TYPE bingoo_http_request_duration_ms gauge");
    for (endpoint, snapshot) in [
        ("start_game", &http.start_game),
        ("flip", &http.flip),
        ("query", &http.query),
        ("ledger", &http.ledger),
    ] {
        let _ = writeln!(
            out,
            "bingoo_http_request_duration_ms{{endpoint=\"{endpoint}\",stat=\"avg\"}} {:.3}",
            snapshot.avg_ms
        );
        let _ = writeln!(
            out,
            "bingoo_http_request_duration_ms{{endpoint=\"{endpoint}\",stat=\"max\"}} {}",
            snapshot.max_ms
        );
    }

    let _ = writeln!(out, "# TYPE bingoo_sessions gauge");
    let _ = writeln!(out, "bingoo_sessions {}", status.sessions);
    let _ = writeln!(out, "# TYPE bingoo_pending_credits gauge");
    let _ = writeln!(out, "bingoo_pending_credits {}", status.pending_credits);
    let _ = writeln!(out, "# TYPE bingoo_process_rss_bytes gauge");
    let _ = writeln!(out, "bingoo_process_rss_bytes {}", system.rss_bytes);
    let _ = writeln!(out, "# TYPE bingoo_uptime_seconds counter");
    let _ = writeln!(out, "bingoo_uptime_seconds {}", server.uptime_secs());

    out
}

pub(super) async fn list_variants(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.engine().variants().await).into_response()
}

#[derive(serde::Deserialize)]
pub(super) struct VariantActivationRequest {
    variant: bingoo_types::GameVariant,
    active: bool,
}

/// Operator action: enable or disable a variant.
pub(super) async fn set_variant_active(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<VariantActivationRequest>,
) -> Response {
    server
        .engine()
        .set_variant_active(request.variant, request.active)
        .await;
    Json(server.engine().variants().await).into_response()
}

/// Operator action: replace a variant's configuration.
pub(super) async fn set_variant_config(
    AxumState(server): AxumState<Arc<Server>>,
    Json(config): Json<bingoo_engine::VariantConfig>,
) -> Response {
    server.engine().set_variant_config(config).await;
    Json(server.engine().variants().await).into_response()
}

pub(super) async fn start_game(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<StartGameRequest>,
) -> Response {
    let started_at = Instant::now();
    if request.user.is_empty() || request.user.len() > MAX_USER_ID_LENGTH {
        return bad_request("invalid user id");
    }

    let result = server
        .engine()
        .start_game(request.user, request.variant, request.bet, request.use_points)
        .await;
    server.http_metrics().record_start_game(started_at.elapsed());

    match result {
        Ok(started) => Json(StartGameResponse {
            session_id: started.session.id,
            state: started.session.state,
            board: board_view(&started.session.board, false),
            flips_remaining: started.flips_remaining,
            balance: started.balance,
        })
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn flip_card(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<FlipRequest>,
) -> Response {
    let started_at = Instant::now();
    let result = server
        .engine()
        .flip(request.session_id, request.card_index)
        .await;
    server.http_metrics().record_flip(started_at.elapsed());

    match result {
        Ok(flip) => Json(FlipResponse {
            winning: flip.winning,
            prize: flip.prize,
            state: flip.state,
            flips_remaining: flip.flips_remaining,
            balance: flip.balance,
        })
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn end_game(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<EndGameRequest>,
) -> Response {
    let started_at = Instant::now();
    let result = server.engine().end_game(request.session_id).await;
    server.http_metrics().record_flip(started_at.elapsed());

    match result {
        Ok(session) => {
            // The outcome is server-resolved; a mismatching client claim is
            // worth flagging but never honored.
            if let Some(claimed) = request.has_won {
                if claimed != session.has_won {
                    tracing::warn!(
                        session_id = session.id,
                        claimed,
                        actual = session.has_won,
                        "client end-game claim contradicts server outcome"
                    );
                }
            }
            Json(EndGameResponse {
                session_id: session.id,
                state: session.state,
                has_won: session.has_won,
                prize: session.prize,
            })
            .into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn get_session(
    AxumState(server): AxumState<Arc<Server>>,
    Path(session_id): Path<u64>,
) -> Response {
    let started_at = Instant::now();
    let result = server.engine().session(session_id).await;
    server.http_metrics().record_query(started_at.elapsed());

    match result {
        Ok(session) => Json(session_response(&session)).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn get_user_sessions(
    AxumState(server): AxumState<Arc<Server>>,
    Path(user): Path<String>,
) -> Response {
    let started_at = Instant::now();
    let sessions = server.engine().user_sessions(&user).await;
    server.http_metrics().record_query(started_at.elapsed());

    let views: Vec<_> = sessions.iter().map(session_response).collect();
    Json(views).into_response()
}

pub(super) async fn get_balance(
    AxumState(server): AxumState<Arc<Server>>,
    Path(user): Path<String>,
) -> Response {
    let started_at = Instant::now();
    let result = server.engine().balance(&user).await;
    server.http_metrics().record_query(started_at.elapsed());

    match result {
        Ok(points) => Json(BalanceResponse { user, points }).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn get_leaderboard(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(server.engine().leaderboard().await).into_response()
}

pub(super) async fn create_transaction(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<TransactionRequest>,
) -> Response {
    let started_at = Instant::now();
    if request.user.is_empty() || request.user.len() > MAX_USER_ID_LENGTH {
        return bad_request("invalid user id");
    }
    if request.amount == 0 {
        return bad_request("amount must be greater than zero");
    }

    let result: Result<Transaction, EngineError> = match request.kind {
        TransactionKind::Deposit => server.engine().deposit(&request.user, request.amount).await,
        TransactionKind::Withdrawal => {
            server
                .engine()
                .request_withdrawal(&request.user, request.amount)
                .await
        }
        _ => {
            server.http_metrics().record_ledger(started_at.elapsed());
            return bad_request("only deposit and withdrawal entries can be created directly");
        }
    };
    server.http_metrics().record_ledger(started_at.elapsed());

    match result {
        Ok(tx) => Json(tx).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn resolve_withdrawal(
    AxumState(server): AxumState<Arc<Server>>,
    Path(withdrawal_id): Path<u64>,
    Json(request): Json<WithdrawalActionRequest>,
) -> Response {
    let started_at = Instant::now();
    let result = server
        .engine()
        .resolve_withdrawal(withdrawal_id, request.approve)
        .await;
    server.http_metrics().record_ledger(started_at.elapsed());

    match result {
        Ok(tx) => Json(tx).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(super) async fn get_transactions(
    AxumState(server): AxumState<Arc<Server>>,
    Path(user): Path<String>,
) -> Response {
    let started_at = Instant::now();
    let result = server.engine().transactions(&user).await;
    server.http_metrics().record_query(started_at.elapsed());

    match result {
        Ok(transactions) => Json(TransactionsResponse { transactions }).into_response(),
        Err(err) => engine_error_response(err),
    }
}
