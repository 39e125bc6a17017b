//! Substitutions Backend
//!
//! REST backend that tracks substitute-teacher coverage and weekly teacher
//! quotas, with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod quota;

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

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Substitutions Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        "Default weekly free hours: {}",
        config.default_weekly_free_hours
    );

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (SUBS_API_PSK). API access is open!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Counters may be left over from a week the server was down for
    let summary = quota::ensure_current_week(&repo).await?;
    tracing::info!(
        "Weekly counters current for {} ({} reset at startup)",
        summary.week,
        summary.reset_count
    );
    let _reset_task = quota::spawn_weekly_reset(repo.clone(), config.reset_interval_secs);

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Teachers
        .route("/teachers", get(api::list_teachers).post(api::create_teacher))
        .route(
            "/teachers/{id}",
            get(api::get_teacher)
                .put(api::update_teacher)
                .delete(api::delete_teacher),
        )
        // Weekly quotas
        .route("/quotas", get(api::list_quotas))
        .route("/quotas/reset", post(api::reset_weekly_counters))
        .route(
            "/quotas/{teacher_id}/increment",
            post(api::increment_teacher_substitution),
        )
        .route("/recommendation", get(api::get_recommended_teacher))
        // Substitutions
        .route(
            "/substitutions",
            get(api::list_substitutions).post(api::create_substitution),
        )
        .route(
            "/substitutions/{id}",
            get(api::get_substitution)
                .put(api::update_substitution)
                .delete(api::delete_substitution),
        )
        .route("/substitutions/{id}/seen", post(api::mark_substitution_seen))
        .route("/substitutions/{id}/confirm", post(api::confirm_substitution))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
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
