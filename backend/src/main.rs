//! JobSwipe Backend
//!
//! REST backend for swipe-based job triage with SQLite persistence and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod search;
mod triage;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use search::SearchIndex;
use triage::{JobFeed, SessionRegistry, TriageSettings};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub feed: JobFeed,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the triage registry to the repository and start following the change feed.
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, config: Config) -> Self {
        let feed = JobFeed::new();
        let sessions = Arc::new(SessionRegistry::new(
            repo.clone(),
            repo.clone(),
            TriageSettings::from(&config),
        ));

        tokio::spawn(sessions.clone().follow(feed.subscribe()));

        Self {
            repo,
            search,
            feed,
            sessions,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting JobSwipe Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        distance = config.thresholds.distance,
        velocity = config.thresholds.velocity,
        settle_ms = config.settle_delay.as_millis() as u64,
        requeue_failed = config.requeue_failed,
        "Swipe settings"
    );

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (JOBSWIPE_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let search = Arc::new(SearchIndex::open(&config.index_path)?);
    tracing::info!("Building search index...");
    let jobs = repo.list_jobs().await?;
    search.rebuild(&jobs).await?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, search, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Jobs
        .route(
            "/jobs",
            get(api::list_jobs)
                .post(api::create_job)
                .delete(api::clear_jobs),
        )
        .route("/jobs/seed", post(api::seed_jobs))
        .route(
            "/jobs/{id}",
            get(api::get_job)
                .put(api::update_job)
                .delete(api::delete_job),
        )
        // Decisions
        .route(
            "/decisions",
            get(api::list_decisions).post(api::record_decision),
        )
        .route("/applied", get(api::list_applied_jobs))
        // Search
        .route("/search", get(api::search_jobs))
        // Triage sessions
        .route("/sessions", post(api::create_session))
        .route(
            "/sessions/{id}",
            get(api::get_session).delete(api::close_session),
        )
        .route("/sessions/{id}/drag", post(api::begin_drag))
        .route("/sessions/{id}/release", post(api::release_drag))
        .route("/sessions/{id}/swipe", post(api::swipe))
        .route("/sessions/{id}/reseed", post(api::reseed_session))
        .layer(middleware::from_fn(move |req, next| {
            auth::api_key_layer(psk.clone(), req, next)
        }));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
