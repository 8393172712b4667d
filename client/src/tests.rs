//! End-to-end tests: a real server on a random port, driven through the SDK.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bingoo_server::{Api, Server, ServerConfig};
use bingoo_types::api::StartGameRequest;
use bingoo_types::{
    Cause, CauseStatus, CommunityEntry, GameVariant, SessionState, TransactionKind,
    TransactionStatus, ERROR_ELIGIBILITY, ERROR_INSUFFICIENT_BALANCE, ERROR_SESSION_NOT_FOUND,
};
use tokio::time::sleep;

use crate::{BalanceCache, Client, Error};

struct TestContext {
    server: Arc<Server>,
    client: Client,
    _server_handle: tokio::task::JoinHandle<()>,
}

impl TestContext {
    async fn new() -> Self {
        // Rate limits off so bursts of test requests never trip them.
        let config = ServerConfig {
            http_rate_limit_per_second: None,
            http_rate_limit_burst: None,
            game_rate_limit_per_minute: None,
            game_rate_limit_burst: None,
            ..ServerConfig::default()
        };
        let server = Arc::new(Server::new_with_config(config));
        let api = Api::new(server.clone());
        let router = api.router();

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let actual_addr = listener.local_addr().unwrap();
        let base_url = format!("http://{actual_addr}");

        let server_handle = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server time to start
        sleep(Duration::from_millis(50)).await;

        Self {
            server,
            client: Client::new(&base_url).unwrap(),
            _server_handle: server_handle,
        }
    }
}

fn alice() -> String {
    "alice".to_string()
}

fn paid_cause() -> Cause {
    Cause {
        id: 1,
        title: "Animal shelter".to_string(),
        status: CauseStatus::Active,
        winning_amount: 400,
        max_communities: 2,
        communities: vec![
            CommunityEntry {
                id: 0,
                name: "north".to_string(),
                paid: true,
            },
            CommunityEntry {
                id: 1,
                name: "south".to_string(),
                paid: true,
            },
        ],
    }
}

#[tokio::test]
async fn full_game_flow_over_http() {
    let ctx = TestContext::new().await;

    ctx.client.deposit(&alice(), 100).await.unwrap();
    assert_eq!(ctx.client.balance(&alice()).await.unwrap().points, 100);

    let variants = ctx.client.variants().await.unwrap();
    assert_eq!(variants.len(), 4);
    let grid9 = variants
        .iter()
        .find(|v| v.variant == GameVariant::Grid9)
        .unwrap();
    assert_eq!(grid9.min_bet, 5);
    assert!(grid9.active);

    let started = ctx
        .client
        .start_game(&StartGameRequest {
            user: alice(),
            variant: GameVariant::Grid9,
            bet: 5,
            use_points: true,
        })
        .await
        .unwrap();
    assert_eq!(started.state, SessionState::InProgress);
    assert_eq!(started.balance, 95);
    assert_eq!(started.board.len(), 9);
    // Prize positions are never exposed on an active board.
    assert!(started
        .board
        .iter()
        .all(|slot| slot.winning.is_none() && slot.prize.is_none()));

    // Flip until the session resolves.
    let mut prize = None;
    let mut state = started.state;
    for index in 0..9u32 {
        let flip = ctx.client.flip(started.session_id, index).await.unwrap();
        state = flip.state;
        if flip.state == SessionState::Won {
            prize = flip.prize;
            break;
        }
        if flip.state == SessionState::Lost {
            break;
        }
    }
    assert!(state.is_terminal());

    let expected_balance = 95 + prize.unwrap_or(0);
    assert_eq!(
        ctx.client.balance(&alice()).await.unwrap().points,
        expected_balance
    );

    // The terminal session exposes the full board and its flip history.
    let session = ctx.client.session(started.session_id).await.unwrap();
    assert!(session.state.is_terminal());
    assert!(session.board.iter().all(|slot| slot.winning.is_some()));
    assert!(!session.flips.is_empty());

    let transactions = ctx.client.transactions(&alice()).await.unwrap().transactions;
    let bets = transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Bet)
        .count();
    let wins: Vec<_> = transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Win)
        .collect();
    assert_eq!(bets, 1);
    match prize {
        Some(prize) => {
            assert_eq!(wins.len(), 1);
            assert_eq!(wins[0].amount, prize);
        }
        None => assert!(wins.is_empty()),
    }

    let leaderboard = ctx.client.leaderboard().await.unwrap();
    assert_eq!(leaderboard.entries[0].user, alice());

    let history = ctx.client.user_sessions(&alice()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, started.session_id);
}

#[tokio::test]
async fn insufficient_balance_is_a_structured_rejection() {
    let ctx = TestContext::new().await;

    let err = ctx
        .client
        .start_game(&StartGameRequest {
            user: alice(),
            variant: GameVariant::Grid9,
            bet: 5,
            use_points: true,
        })
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
            assert_eq!(code, ERROR_INSUFFICIENT_BALANCE);
            assert!(message.contains("insufficient balance"));
        }
        other => panic!("expected Api error, got {other}"),
    }
}

#[tokio::test]
async fn ineligible_cause_is_a_conflict() {
    let ctx = TestContext::new().await;
    ctx.client.deposit(&alice(), 100).await.unwrap();

    let mut cause = paid_cause();
    cause.communities[1].paid = false;
    ctx.server.causes().set(Some(cause)).await;

    let err = ctx
        .client
        .start_game(&StartGameRequest {
            user: alice(),
            variant: GameVariant::CauseJackpot,
            bet: 10,
            use_points: true,
        })
        .await
        .unwrap_err();
    match err {
        Error::Api { status, code, .. } => {
            assert_eq!(status, reqwest::StatusCode::CONFLICT);
            assert_eq!(code, ERROR_ELIGIBILITY);
        }
        other => panic!("expected Api error, got {other}"),
    }
    // Nothing was debited.
    assert_eq!(ctx.client.balance(&alice()).await.unwrap().points, 100);

    // A fully paid roster makes the same start succeed.
    ctx.server.causes().set(Some(paid_cause())).await;
    let started = ctx
        .client
        .start_game(&StartGameRequest {
            user: alice(),
            variant: GameVariant::CauseJackpot,
            bet: 10,
            use_points: true,
        })
        .await
        .unwrap();
    assert_eq!(started.state, SessionState::InProgress);
    assert_eq!(started.balance, 90);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let ctx = TestContext::new().await;
    let err = ctx.client.flip(12345, 0).await.unwrap_err();
    match err {
        Error::Api { status, code, .. } => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            assert_eq!(code, ERROR_SESSION_NOT_FOUND);
        }
        other => panic!("expected Api error, got {other}"),
    }
}

#[tokio::test]
async fn balance_cache_reconciles_against_server() {
    let ctx = TestContext::new().await;
    ctx.client.deposit(&alice(), 100).await.unwrap();

    let mut cache = BalanceCache::new(alice(), Duration::from_secs(60));
    assert!(cache.is_stale());
    assert_eq!(cache.reconcile(&ctx.client).await.unwrap(), 100);
    assert!(!cache.is_stale());

    // Play a game; mirror the debit optimistically.
    let started = ctx
        .client
        .start_game(&StartGameRequest {
            user: alice(),
            variant: GameVariant::Grid9,
            bet: 5,
            use_points: true,
        })
        .await
        .unwrap();
    cache.apply_debit(5);
    assert_eq!(cache.points(), started.balance);

    // Drift the mirror; the server value wins on reconcile.
    cache.apply_debit(22);
    assert_ne!(cache.points(), started.balance);
    assert_eq!(cache.reconcile(&ctx.client).await.unwrap(), started.balance);

    // Within the freshness window, reconcile_if_stale is a no-op.
    cache.apply_credit(7);
    assert_eq!(
        cache.reconcile_if_stale(&ctx.client).await.unwrap(),
        started.balance + 7
    );
}

#[tokio::test]
async fn withdrawal_round_trip() {
    let ctx = TestContext::new().await;
    ctx.client.deposit(&alice(), 200).await.unwrap();

    let withdrawal = ctx.client.request_withdrawal(&alice(), 80).await.unwrap();
    assert_eq!(withdrawal.status, TransactionStatus::Pending);
    assert_eq!(ctx.client.balance(&alice()).await.unwrap().points, 120);

    let rejected = ctx
        .client
        .resolve_withdrawal(withdrawal.id, false)
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Failed);
    assert_eq!(ctx.client.balance(&alice()).await.unwrap().points, 200);

    let approved_req = ctx.client.request_withdrawal(&alice(), 50).await.unwrap();
    let approved = ctx
        .client
        .resolve_withdrawal(approved_req.id, true)
        .await
        .unwrap();
    assert_eq!(approved.status, TransactionStatus::Completed);
    assert_eq!(ctx.client.balance(&alice()).await.unwrap().points, 150);
}
