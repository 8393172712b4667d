use anyhow::{Context, Result};
use bingoo_server::{Api, Server, ServerConfig};
use bingoo_types::Cause;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// HTTP rate limit per IP in requests per second (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// HTTP rate limit burst size (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Game endpoint rate limit per IP in requests per minute (0 disables).
    #[arg(long)]
    game_rate_limit_per_minute: Option<u64>,

    /// Game endpoint rate limit burst size (0 disables).
    #[arg(long)]
    game_rate_limit_burst: Option<u32>,

    /// Max request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,

    /// Expire in-progress sessions older than this many seconds (omit to disable).
    #[arg(long)]
    session_expiry_secs: Option<u64>,

    /// Interval between expiry sweeps in seconds.
    #[arg(long)]
    expiry_sweep_interval_secs: Option<u64>,

    /// Interval between retries of deferred prize credits in seconds.
    #[arg(long)]
    credit_retry_interval_secs: Option<u64>,

    /// Path to a JSON file describing the active cause for the community
    /// jackpot.
    #[arg(long)]
    cause: Option<PathBuf>,

    /// Seed a user balance on startup, as `user=points`. Repeatable.
    #[arg(long)]
    grant: Vec<String>,
}

/// Maps an optional arg value to Option: 0 => None, Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn build_config(args: &Args) -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        http_rate_limit_per_second: map_optional_limit(
            args.http_rate_limit_per_second,
            defaults.http_rate_limit_per_second,
        ),
        http_rate_limit_burst: map_optional_limit(
            args.http_rate_limit_burst,
            defaults.http_rate_limit_burst,
        ),
        game_rate_limit_per_minute: map_optional_limit(
            args.game_rate_limit_per_minute,
            defaults.game_rate_limit_per_minute,
        ),
        game_rate_limit_burst: map_optional_limit(
            args.game_rate_limit_burst,
            defaults.game_rate_limit_burst,
        ),
        http_body_limit_bytes: map_optional_limit(
            args.http_body_limit_bytes,
            defaults.http_body_limit_bytes,
        ),
        session_expiry_secs: map_optional_limit(args.session_expiry_secs, None),
        expiry_sweep_interval_secs: args
            .expiry_sweep_interval_secs
            .filter(|&v| v > 0)
            .unwrap_or(defaults.expiry_sweep_interval_secs),
        credit_retry_interval_secs: args
            .credit_retry_interval_secs
            .filter(|&v| v > 0)
            .unwrap_or(defaults.credit_retry_interval_secs),
    }
}

fn parse_grant(raw: &str) -> Result<(String, u64)> {
    let (user, points) = raw
        .split_once('=')
        .with_context(|| format!("invalid grant (expected user=points): {raw}"))?;
    let user = user.trim();
    if user.is_empty() {
        anyhow::bail!("invalid grant (empty user): {raw}");
    }
    let points: u64 = points
        .trim()
        .parse()
        .with_context(|| format!("invalid grant points: {raw}"))?;
    Ok((user.to_string(), points))
}

fn is_production() -> bool {
    matches!(
        std::env::var("NODE_ENV").as_deref(),
        Ok("production") | Ok("prod")
    )
}

fn require_env(var: &str) -> Result<String> {
    let value = std::env::var(var).unwrap_or_default();
    if value.trim().is_empty() {
        anyhow::bail!("Missing required env: {var}");
    }
    Ok(value)
}

fn require_positive_u64(var: &str) -> Result<()> {
    let value = require_env(var)?;
    let parsed: u64 = value
        .parse()
        .with_context(|| format!("Invalid {var}: {value}"))?;
    if parsed == 0 {
        anyhow::bail!("Invalid {var}: {value}");
    }
    Ok(())
}

fn ensure_production_env() -> Result<()> {
    if !is_production() {
        return Ok(());
    }

    require_env("ALLOWED_HTTP_ORIGINS")?;
    require_env("METRICS_AUTH_TOKEN")?;
    require_positive_u64("RATE_LIMIT_HTTP_PER_SEC")?;
    require_positive_u64("RATE_LIMIT_HTTP_BURST")?;
    require_positive_u64("RATE_LIMIT_GAME_PER_MIN")?;
    require_positive_u64("RATE_LIMIT_GAME_BURST")?;

    Ok(())
}

fn load_cause(path: &PathBuf) -> Result<Cause> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cause file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid cause file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();
    ensure_production_env()?;

    let config = build_config(&args);
    let server = Arc::new(Server::new_with_config(config));

    if let Some(path) = &args.cause {
        let cause = load_cause(path)?;
        info!(cause_id = cause.id, title = %cause.title, "active cause loaded");
        server.causes().set(Some(cause)).await;
    }

    for raw in &args.grant {
        let (user, points) = parse_grant(raw)?;
        server.engine().deposit(&user, points).await?;
        info!(user = %user, points, "startup grant applied");
    }

    server.start_maintenance();
    let api = Api::new(server);
    let app = api.router();

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}
