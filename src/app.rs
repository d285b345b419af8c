/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (error envelope / CORS / request-id / limits / trace)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::OriginalUri,
    http::Method,
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::handlers::health::health};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::repos::{card_repo::PgCardRepo, user_repo::PgUserRepo};
use crate::services::auth::{Authenticator, InternalKey, TokenVerifier};
use crate::services::cache::{CacheClient, MemoryCacheClient, ValkeyClient};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,user_service=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    tracing::debug!(?config, "configuration loaded");

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to apply migrations")?;

    let cache: Arc<dyn CacheClient> = match &config.valkey_url {
        Some(url) => Arc::new(ValkeyClient::new(url).await?),
        None => Arc::new(MemoryCacheClient::new()),
    };
    tracing::info!(backend = cache.backend_name(), "identity cache ready");

    let auth = Authenticator::new(
        TokenVerifier::new(&config.jwt_secret, config.access_token_leeway_seconds),
        InternalKey::new(&config.internal_api_key),
    );

    Ok(AppState::new(
        Arc::new(PgUserRepo::new(pool.clone())),
        Arc::new(PgCardRepo::new(pool)),
        cache,
        auth,
        config.identity_cache_ttl_seconds,
    ))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let app = middleware::cors::apply(routes(state), config);
    middleware::error_envelope::apply(app)
}

/// Everything except CORS (which needs `Config`).
#[cfg(test)]
pub(crate) fn router(state: AppState) -> Router {
    middleware::error_envelope::apply(routes(state))
}

fn routes(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .fallback(no_route)
        .with_state(state);

    middleware::http::apply(app)
}

async fn no_route(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(format!("No route for {method} {}", uri.path()))
}
