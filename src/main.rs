//! Team Recruitment Backend
//!
//! REST backend for forming teams: teams with role vacancies, joining by
//! preferred role, and rate-limited recruiting announcements. SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod repository;
mod service;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{JwtKeys, OAuthClient};
use config::Config;
use db::{SqliteAnnouncementRepository, SqliteAuthRepository, SqliteTeamRepository, TransactionManager};
use service::{AnnouncementService, AuthService, Clock, TeamService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub teams: TeamService,
    pub announcements: AnnouncementService,
    pub members: AuthService,
    pub jwt: JwtKeys,
    pub oauth: OAuthClient,
    pub config: Arc<Config>,
}

/// Wire repositories, services and auth collaborators from one config.
pub fn build_state(pool: SqlitePool, config: Config, clock: Clock) -> Result<AppState, reqwest::Error> {
    let tx = TransactionManager::new(pool.clone(), config.tx_timeout);
    let team_repo = Arc::new(SqliteTeamRepository::new(tx.clone()));
    let announcement_repo = Arc::new(SqliteAnnouncementRepository::new(tx.clone()));
    let auth_repo = Arc::new(SqliteAuthRepository::new(tx));

    let jwt = JwtKeys::new(&config.jwt);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let oauth = OAuthClient::new(config.oauth.clone(), http);

    Ok(AppState {
        pool,
        teams: TeamService::new(team_repo.clone(), auth_repo.clone()),
        announcements: AnnouncementService::new(announcement_repo, team_repo, clock.clone()),
        members: AuthService::new(auth_repo, jwt.clone(), clock),
        jwt,
        oauth,
        config: Arc::new(config),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Team Recruitment Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Transaction deadline: {:?}", config.tx_timeout);

    if config.jwt.secret.is_empty() {
        tracing::warn!("No JWT secret configured (TEAMUP_JWT_SECRET). Tokens are signed with an empty key!");
    }
    if config.oauth.client_id.is_empty() {
        tracing::warn!("No OAuth client configured (TEAMUP_OAUTH_CLIENT_ID). Login will fail.");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;

    let bind_addr = config.bind_addr;
    let state = build_state(pool, config, service::system_clock())?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

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

    // Clone keys for the auth layer
    let keys = state.jwt.clone();

    // API routes; handlers taking a MemberIdentity reject anonymous callers
    let api_routes = Router::new()
        // Auth
        .route("/auth/login", get(api::login))
        .route("/auth/logout", post(api::logout))
        .route("/auth/signup", post(api::signup))
        .route("/me", get(api::me))
        // Teams
        .route("/teams", post(api::create_team))
        .route("/teams/{id}", get(api::get_team).delete(api::delete_team))
        .route("/teams/{id}/join", post(api::join_team))
        // Announcements
        .route(
            "/announcements",
            get(api::list_announcements).post(api::post_announcement),
        )
        .route("/announcements/{id}", get(api::get_announcement))
        // Apply JWT auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::jwt_auth_layer(keys.clone(), req, next)
        }));

    // Health check and OAuth redirect target (no auth required)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/login/oauth2/code/google", get(api::oauth_callback));

    Router::new()
        .nest("/v1", api_routes)
        .merge(root_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
